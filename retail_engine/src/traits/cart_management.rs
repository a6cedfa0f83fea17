use thiserror::Error;

use crate::{
    db_types::Cart,
    traits::{is_write_conflict, ErrorKind, InventoryError},
};

/// The per-user shopping basket.
///
/// Carts are created lazily on the first mutation. Every method that mutates a cart returns the updated cart. Stock
/// checks here are informational only: nothing is reserved until the order is placed.
#[allow(async_fn_in_trait)]
pub trait CartManagement {
    /// Returns the user's persisted cart, if one exists.
    async fn fetch_cart(&self, user_id: i64) -> Result<Option<Cart>, CartError>;

    /// Adds `quantity` units of a product. If the product is already in the cart the quantities are merged, and the
    /// combined quantity is checked against current stock.
    async fn add_item_to_cart(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartError>;

    /// Sets the quantity of an existing cart line.
    async fn update_cart_item(&self, user_id: i64, cart_item_id: i64, quantity: i64) -> Result<Cart, CartError>;

    async fn remove_cart_item(&self, user_id: i64, cart_item_id: i64) -> Result<Cart, CartError>;

    /// Removes every line from the user's cart. The cart itself is kept.
    async fn empty_cart(&self, user_id: i64) -> Result<Cart, CartError>;
}

#[derive(Debug, Clone, Error)]
pub enum CartError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for sale")]
    ProductInactive(i64),
    #[error("{0}")]
    InsufficientStock(String),
    #[error("User {0} does not have a cart")]
    CartNotFound(i64),
    #[error("Cart item {0} does not exist")]
    CartItemNotFound(i64),
    #[error("Quantity must be positive, but was {0}")]
    InvalidQuantity(i64),
    #[error("Write conflict while updating the cart: {0}")]
    Conflict(String),
}

impl CartError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseError(_) => ErrorKind::Internal,
            Self::UserNotFound(_) | Self::ProductNotFound(_) | Self::CartNotFound(_) | Self::CartItemNotFound(_) => {
                ErrorKind::NotFound
            },
            Self::ProductInactive(_) | Self::InsufficientStock(_) | Self::InvalidQuantity(_) => ErrorKind::BadRequest,
            Self::Conflict(_) => ErrorKind::Conflict,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<sqlx::Error> for CartError {
    fn from(e: sqlx::Error) -> Self {
        if is_write_conflict(&e) {
            CartError::Conflict(e.to_string())
        } else {
            CartError::DatabaseError(e.to_string())
        }
    }
}

impl From<InventoryError> for CartError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::DatabaseError(s) => CartError::DatabaseError(s),
            InventoryError::ProductNotFound(id) => CartError::ProductNotFound(id),
            InventoryError::InsufficientStock { .. } => CartError::InsufficientStock(e.to_string()),
            InventoryError::InvalidQuantity(q) => CartError::InvalidQuantity(q),
            InventoryError::Conflict(s) => CartError::Conflict(s),
        }
    }
}
