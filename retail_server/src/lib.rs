//! # Retail server
//! This crate hosts the HTTP front end of the retail engine. It is responsible for:
//! * Exposing the cart, checkout and order endpoints to shoppers.
//! * Exposing the order-status and payment-intent endpoints to store admins.
//! * Receiving payment-gateway webhooks and handing them to the reconciliation API.
//! * Dispatching customer notifications when orders change.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Shopper routes. The caller is identified by the `rtl-user-id` header, which an upstream gateway sets
//!   after authenticating the user.
//! * `/admin/...`: Admin routes. Require the configured admin key in the `rtl-admin-key` header.
//! * `/webhook/payments`: Payment gateway events, signed in the `Stripe-Signature` header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod notifications;
pub mod routes;
pub mod server;
