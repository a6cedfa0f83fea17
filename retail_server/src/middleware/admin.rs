//! Admin key middleware.
//!
//! Wrap a scope or route with [`AdminKeyMiddlewareFactory`] to require the configured admin key in the
//! `rtl-admin-key` header. Requests without the key, or with the wrong key, are rejected with `401 Unauthorized`. If no
//! admin key is configured, every request is rejected.
use std::{future::Future, pin::Pin, rc::Rc};

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error,
};
use futures::future::{ok, Ready};
use log::warn;
use rtl_common::Secret;

use crate::{errors::ServerError, helpers::ADMIN_KEY_HEADER};

pub struct AdminKeyMiddlewareFactory {
    admin_key: Option<Secret<String>>,
}

impl AdminKeyMiddlewareFactory {
    pub fn new(admin_key: Option<Secret<String>>) -> Self {
        Self { admin_key }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminKeyMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AdminKeyMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminKeyMiddlewareService { admin_key: self.admin_key.clone(), service: Rc::new(service) })
    }
}

pub struct AdminKeyMiddlewareService<S> {
    admin_key: Option<Secret<String>>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for AdminKeyMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let result = check_admin_key(self.admin_key.as_ref(), &req);
        Box::pin(async move {
            result?;
            service.call(req).await
        })
    }
}

fn check_admin_key(admin_key: Option<&Secret<String>>, req: &ServiceRequest) -> Result<(), ServerError> {
    let Some(admin_key) = admin_key else {
        warn!("💻️ Admin request to {} rejected. No admin key has been configured", req.path());
        return Err(ServerError::Unauthorized("Admin access is disabled".into()));
    };
    let presented = req.headers().get(ADMIN_KEY_HEADER).and_then(|v| v.to_str().ok());
    match presented {
        Some(key) if keys_match(key.as_bytes(), admin_key.reveal().as_bytes()) => Ok(()),
        Some(_) => {
            warn!("💻️ Admin request to {} rejected. The admin key is incorrect", req.path());
            Err(ServerError::Unauthorized("Invalid admin key".into()))
        },
        None => {
            warn!("💻️ Admin request to {} rejected. No admin key was provided", req.path());
            Err(ServerError::Unauthorized(format!("The {ADMIN_KEY_HEADER} header is required")))
        },
    }
}

// Runs in time independent of where the keys differ.
fn keys_match(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
