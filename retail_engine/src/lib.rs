//! Retail Engine
//!
//! The Retail Engine keeps the orders and inventory of an online store consistent. It is the library behind the
//! retail server, and is independent of any HTTP framework.
//!
//! The library is divided into two main sections:
//! 1. Database management ([`mod@traits`] and the Sqlite backend). The traits describe what a storage backend must
//!    provide. Every multi-step operation (checkout, cancellation, payment-driven status changes) is carried out in a
//!    single transaction by the backend, so stock can never be lost or double-counted. The data types stored in the
//!    database live in [`mod@db_types`].
//! 2. The public API ([`InventoryApi`], [`CartApi`], [`OrderFlowApi`] and [`PaymentReconciliationApi`]). Clients should
//!    use these rather than the backend directly.
//!
//! The engine also emits [`mod@events`] when orders are placed, paid, shipped, delivered or cancelled. Hook into them
//! with [`events::EventHooks`] to send notifications or perform other side effects.
pub mod db_types;
pub mod events;
pub mod helpers;
mod retail_api;
#[cfg(feature = "sqlite")]
mod sqlite;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use retail_api::{
    cart_api::CartApi,
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    order_objects,
    payment_objects,
    reconciliation_api::{PaymentReconciliationApi, ReconciliationError},
};
pub use traits::{
    CartError,
    CartManagement,
    CatalogError,
    CatalogManagement,
    ErrorKind,
    InventoryError,
    InventoryLedger,
    OrderChanged,
    OrderFlowError,
    OrderManagement,
};
