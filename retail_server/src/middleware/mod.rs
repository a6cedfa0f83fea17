mod admin;

pub use admin::{AdminKeyMiddlewareFactory, AdminKeyMiddlewareService};
