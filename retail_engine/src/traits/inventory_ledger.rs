use thiserror::Error;

use crate::{
    db_types::Product,
    traits::{is_write_conflict, ErrorKind},
};

/// The stock ledger. Stock is only ever mutated through these two operations, and `stock_quantity` never goes below
/// zero.
#[allow(async_fn_in_trait)]
pub trait InventoryLedger {
    /// Atomically checks that at least `quantity` units are in stock and decrements the stock by `quantity`.
    ///
    /// Fails with [`InventoryError::InsufficientStock`] and leaves the product untouched if there is not enough stock.
    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<Product, InventoryError>;

    /// Returns `quantity` units to stock. This is a compensating action (e.g. on cancellation) and always succeeds for
    /// an existing product.
    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<Product, InventoryError>;
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: i64, requested: i64, available: i64 },
    #[error("Quantity must be positive, but was {0}")]
    InvalidQuantity(i64),
    #[error("Write conflict while updating stock: {0}")]
    Conflict(String),
}

impl InventoryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseError(_) => ErrorKind::Internal,
            Self::ProductNotFound(_) => ErrorKind::NotFound,
            Self::InsufficientStock { .. } | Self::InvalidQuantity(_) => ErrorKind::BadRequest,
            Self::Conflict(_) => ErrorKind::Conflict,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        if is_write_conflict(&e) {
            InventoryError::Conflict(e.to_string())
        } else {
            InventoryError::DatabaseError(e.to_string())
        }
    }
}
