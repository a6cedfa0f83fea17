use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::{debug, trace};

use crate::errors::ServerError;

/// The header an upstream gateway sets to the id of the authenticated shopper.
pub const USER_ID_HEADER: &str = "rtl-user-id";
/// The header admin callers put the admin key in.
pub const ADMIN_KEY_HEADER: &str = "rtl-admin-key";
/// The header the payment gateway signs its webhooks in.
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// The id of the shopper making the request, read from the [`USER_ID_HEADER`] header.
///
/// Handlers that take a `CallerId` reject requests without a valid id with `401 Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub i64);

impl CallerId {
    pub fn id(&self) -> i64 {
        self.0
    }
}

impl FromRequest for CallerId {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(caller_id_from_request(req))
    }
}

fn caller_id_from_request(req: &HttpRequest) -> Result<CallerId, ServerError> {
    let value = req.headers().get(USER_ID_HEADER).ok_or_else(|| {
        debug!("💻️ Request to {} has no {USER_ID_HEADER} header", req.path());
        ServerError::Unauthorized(format!("The {USER_ID_HEADER} header is required"))
    })?;
    let id = value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ServerError::Unauthorized(format!("The {USER_ID_HEADER} header is not a valid user id")))?;
    trace!("💻️ Request from user {id}");
    Ok(CallerId(id))
}

/// Reads a header as a string, or returns an empty string if it is missing or not valid ASCII.
pub fn header_str<'a>(req: &'a HttpRequest, name: &str) -> &'a str {
    req.headers().get(name).and_then(|v| v.to_str().ok()).unwrap_or_default()
}
