//! Product rows and the stock ledger.
use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{Money, NewProduct, Product},
    traits::InventoryError,
};

pub async fn fetch_product(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product =
        sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, sqlx::Error> {
    let now = Utc::now();
    let product: Product = sqlx::query_as(
        r#"
            INSERT INTO products (sku, name, price, stock_quantity, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(product.sku)
    .bind(product.name)
    .bind(product.price.value())
    .bind(product.stock_quantity)
    .bind(product.is_active)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Product {} [{}] inserted with id {}", product.name, product.sku, product.id);
    Ok(product)
}

pub async fn update_price(
    product_id: i64,
    price: Money,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("UPDATE products SET price = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(price.value())
        .bind(Utc::now())
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

pub async fn set_active(
    product_id: i64,
    active: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("UPDATE products SET is_active = $1, updated_at = $2 WHERE id = $3 RETURNING *")
        .bind(active)
        .bind(Utc::now())
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    Ok(product)
}

/// Checks that `quantity` units are available and decrements the stock.
///
/// The decrement only applies if the product row still carries the version that was read and still has enough stock,
/// so a concurrent writer can never drive the stock negative. Losing that race yields [`InventoryError::Conflict`].
pub async fn reserve_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, InventoryError> {
    if quantity <= 0 {
        return Err(InventoryError::InvalidQuantity(quantity));
    }
    let product = fetch_product(product_id, conn).await?.ok_or(InventoryError::ProductNotFound(product_id))?;
    if product.stock_quantity < quantity {
        debug!(
            "🗃️ Cannot reserve {quantity} of product {product_id}. Only {} in stock",
            product.stock_quantity
        );
        return Err(InventoryError::InsufficientStock {
            product_id,
            requested: quantity,
            available: product.stock_quantity,
        });
    }
    let updated: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $1, version = version + 1, updated_at = $2
            WHERE id = $3 AND version = $4 AND stock_quantity >= $5
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .bind(product.version)
    .bind(quantity)
    .fetch_optional(conn)
    .await?;
    let product = updated.ok_or_else(|| {
        InventoryError::Conflict(format!("product {product_id} was modified while its stock was being reserved"))
    })?;
    trace!("🗃️ Reserved {quantity} of product {product_id}. {} left", product.stock_quantity);
    Ok(product)
}

/// Returns `quantity` units to stock.
pub async fn release_stock(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, InventoryError> {
    if quantity <= 0 {
        return Err(InventoryError::InvalidQuantity(quantity));
    }
    let product: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $1, version = version + 1, updated_at = $2
            WHERE id = $3
            RETURNING *;
        "#,
    )
    .bind(quantity)
    .bind(Utc::now())
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    let product = product.ok_or(InventoryError::ProductNotFound(product_id))?;
    trace!("🗃️ Released {quantity} of product {product_id}. {} in stock", product.stock_quantity);
    Ok(product)
}
