//! # Backend contracts
//!
//! This module defines the behaviour a storage backend must expose in order to drive the retail engine. The engine's
//! public APIs are generic over these traits, so the SQLite backend can be swapped for another store (or a mock in
//! tests) without touching the order flow.
//!
//! * [`InventoryLedger`] reserves and releases stock on a product record.
//! * [`CartManagement`] maintains the per-user basket.
//! * [`OrderManagement`] converts carts into orders and drives the order lifecycle, including reconciliation against
//!   payment-gateway events.
//! * [`CatalogManagement`] is the narrow view of the user directory and product catalog that the engine depends on.
//!
//! Each trait has its own error type. All of them can be classified with [`ErrorKind`], which is what the HTTP layer
//! uses to pick a status code.
mod cart_management;
mod catalog_management;
mod data_objects;
mod inventory_ledger;
mod order_management;

pub use cart_management::{CartError, CartManagement};
pub use catalog_management::{CatalogError, CatalogManagement};
pub use data_objects::{ErrorKind, OrderChanged};
pub use inventory_ledger::{InventoryError, InventoryLedger};
pub use order_management::{OrderFlowError, OrderManagement};

/// SQLite reports write contention as `SQLITE_BUSY`/`SQLITE_LOCKED` (and their extended variants). These are the only
/// database errors that are worth retrying.
pub(crate) fn is_write_conflict(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("5" | "6" | "261" | "262" | "517"))
                || db.message().contains("database is locked")
        },
        _ => false,
    }
}
