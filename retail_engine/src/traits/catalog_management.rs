use thiserror::Error;

use crate::{
    db_types::{Money, NewProduct, NewUser, Product, UserProfile},
    traits::{is_write_conflict, ErrorKind},
};

/// The parts of the user directory and product catalog the engine relies on. Browsing and searching the catalog live
/// elsewhere.
#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserProfile>, CatalogError>;

    async fn insert_user(&self, user: NewUser) -> Result<UserProfile, CatalogError>;

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError>;

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError>;

    /// Changes the list price of a product. Existing orders are unaffected; their prices were frozen at checkout.
    async fn update_product_price(&self, product_id: i64, price: Money) -> Result<Product, CatalogError>;

    async fn set_product_active(&self, product_id: i64, active: bool) -> Result<Product, CatalogError>;
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("Prices cannot be negative")]
    NegativePrice,
    #[error("Write conflict: {0}")]
    Conflict(String),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseError(_) => ErrorKind::Internal,
            Self::UserNotFound(_) | Self::ProductNotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) | Self::NegativePrice => ErrorKind::BadRequest,
            Self::Conflict(_) => ErrorKind::Conflict,
        }
    }
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        if is_write_conflict(&e) {
            return CatalogError::Conflict(e.to_string());
        }
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => CatalogError::AlreadyExists(db.message().into()),
            _ => CatalogError::DatabaseError(e.to_string()),
        }
    }
}
