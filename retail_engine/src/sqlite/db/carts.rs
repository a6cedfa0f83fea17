//! Carts and cart lines.
//!
//! A cart row is created the first time a user adds something. Lines are unique per (cart, product); adding a product
//! that is already in the cart merges the quantities.
use chrono::Utc;
use log::{debug, trace};
use sqlx::SqliteConnection;

use super::products;
use crate::{
    db_types::{Cart, CartItem, Product},
    traits::CartError,
};

const CART_ITEMS_QUERY: &str = r#"
    SELECT ci.id, ci.cart_id, ci.product_id, p.name AS product_name, ci.quantity, ci.price
    FROM cart_items ci JOIN products p ON p.id = ci.product_id
    WHERE ci.cart_id = $1
    ORDER BY ci.id ASC
"#;

pub async fn fetch_cart_id(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<i64>, sqlx::Error> {
    let id: Option<(i64,)> =
        sqlx::query_as("SELECT id FROM carts WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(id.map(|(id,)| id))
}

/// Returns the id of the user's cart, creating the cart row if it does not exist yet.
pub async fn fetch_or_create_cart_id(user_id: i64, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    if let Some(id) = fetch_cart_id(user_id, conn).await? {
        return Ok(id);
    }
    let now = Utc::now();
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO carts (user_id, created_at, updated_at) VALUES ($1, $2, $3) RETURNING id")
            .bind(user_id)
            .bind(now)
            .bind(now)
            .fetch_one(conn)
            .await?;
    debug!("🗃️ Created cart #{id} for user {user_id}");
    Ok(id)
}

pub async fn fetch_cart_items(cart_id: i64, conn: &mut SqliteConnection) -> Result<Vec<CartItem>, sqlx::Error> {
    let items = sqlx::query_as(CART_ITEMS_QUERY).bind(cart_id).fetch_all(conn).await?;
    Ok(items)
}

/// Fetches the user's cart with all its lines, or `None` if the user has never had a cart.
pub async fn fetch_cart(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<Cart>, sqlx::Error> {
    let Some(cart_id) = fetch_cart_id(user_id, conn).await? else {
        return Ok(None);
    };
    let items = fetch_cart_items(cart_id, conn).await?;
    Ok(Some(Cart { id: Some(cart_id), user_id, items }))
}

async fn fetch_cart_item_for_user(
    user_id: i64,
    cart_item_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<CartItem>, sqlx::Error> {
    let item = sqlx::query_as(
        r#"
        SELECT ci.id, ci.cart_id, ci.product_id, p.name AS product_name, ci.quantity, ci.price
        FROM cart_items ci
            JOIN carts c ON c.id = ci.cart_id
            JOIN products p ON p.id = ci.product_id
        WHERE ci.id = $1 AND c.user_id = $2
        "#,
    )
    .bind(cart_item_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    Ok(item)
}

async fn touch_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE carts SET updated_at = $1 WHERE id = $2").bind(Utc::now()).bind(cart_id).execute(conn).await?;
    Ok(())
}

/// Validates that `quantity` units of the product could currently be bought. Nothing is reserved.
async fn check_availability(
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Product, CartError> {
    if quantity <= 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    let product = products::fetch_product(product_id, conn).await?.ok_or(CartError::ProductNotFound(product_id))?;
    if !product.is_active {
        return Err(CartError::ProductInactive(product_id));
    }
    if product.stock_quantity < quantity {
        return Err(CartError::InsufficientStock(format!(
            "Insufficient stock for product {product_id}: requested {quantity}, available {}",
            product.stock_quantity
        )));
    }
    Ok(product)
}

/// Adds `quantity` units of a product to the user's cart, merging with an existing line for the same product.
pub async fn add_item(
    user_id: i64,
    product_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartItem, CartError> {
    if quantity <= 0 {
        return Err(CartError::InvalidQuantity(quantity));
    }
    let cart_id = fetch_or_create_cart_id(user_id, conn).await?;
    let existing: Option<(i64, i64)> =
        sqlx::query_as("SELECT id, quantity FROM cart_items WHERE cart_id = $1 AND product_id = $2")
            .bind(cart_id)
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?;
    let now = Utc::now();
    let item_id = match existing {
        Some((item_id, current)) => {
            let combined = current.checked_add(quantity).ok_or_else(|| {
                CartError::InsufficientStock(format!(
                    "Insufficient stock for product {product_id}: requested {quantity} on top of {current}"
                ))
            })?;
            check_availability(product_id, combined, conn).await?;
            sqlx::query("UPDATE cart_items SET quantity = $1, updated_at = $2 WHERE id = $3")
                .bind(combined)
                .bind(now)
                .bind(item_id)
                .execute(&mut *conn)
                .await?;
            trace!("🗃️ Cart #{cart_id}: product {product_id} quantity {current} -> {combined}");
            item_id
        },
        None => {
            let product = check_availability(product_id, quantity, conn).await?;
            let (item_id,): (i64,) = sqlx::query_as(
                r#"
                INSERT INTO cart_items (cart_id, product_id, quantity, price, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id
                "#,
            )
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity)
            .bind(product.price.value())
            .bind(now)
            .bind(now)
            .fetch_one(&mut *conn)
            .await?;
            trace!("🗃️ Cart #{cart_id}: added {quantity} of product {product_id} at {}", product.price);
            item_id
        },
    };
    touch_cart(cart_id, conn).await?;
    fetch_cart_item_for_user(user_id, item_id, conn).await?.ok_or(CartError::CartItemNotFound(item_id))
}

/// Sets the quantity of one of the user's cart lines, re-validating against current stock.
pub async fn update_item_quantity(
    user_id: i64,
    cart_item_id: i64,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<CartItem, CartError> {
    let item = fetch_cart_item_for_user(user_id, cart_item_id, conn)
        .await?
        .ok_or(CartError::CartItemNotFound(cart_item_id))?;
    check_availability(item.product_id, quantity, conn).await?;
    sqlx::query("UPDATE cart_items SET quantity = $1, updated_at = $2 WHERE id = $3")
        .bind(quantity)
        .bind(Utc::now())
        .bind(cart_item_id)
        .execute(&mut *conn)
        .await?;
    touch_cart(item.cart_id, conn).await?;
    Ok(CartItem { quantity, ..item })
}

pub async fn remove_item(user_id: i64, cart_item_id: i64, conn: &mut SqliteConnection) -> Result<(), CartError> {
    let item = fetch_cart_item_for_user(user_id, cart_item_id, conn)
        .await?
        .ok_or(CartError::CartItemNotFound(cart_item_id))?;
    sqlx::query("DELETE FROM cart_items WHERE id = $1").bind(cart_item_id).execute(&mut *conn).await?;
    touch_cart(item.cart_id, conn).await?;
    Ok(())
}

/// Deletes every line in the cart. Returns the number of lines removed.
pub async fn clear_cart(cart_id: i64, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(&mut *conn).await?;
    touch_cart(cart_id, conn).await?;
    trace!("🗃️ Cleared {} lines from cart #{cart_id}", result.rows_affected());
    Ok(result.rows_affected())
}
