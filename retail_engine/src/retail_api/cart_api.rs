//! Shopping cart API.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::Cart,
    traits::{CartError, CartManagement},
};

/// `CartApi` maintains each user's basket ahead of checkout.
///
/// Cart mutations check stock so that customers find out early when something is unavailable, but nothing is reserved
/// until the order is placed.
pub struct CartApi<B> {
    db: B,
}

impl<B: Debug> Debug for CartApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CartApi ({:?})", self.db)
    }
}

impl<B> CartApi<B>
where B: CartManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Returns the user's cart. Users without a cart get an empty one, which is not persisted.
    pub async fn get_cart(&self, user_id: i64) -> Result<Cart, CartError> {
        let cart = self.db.fetch_cart(user_id).await?;
        Ok(cart.unwrap_or_else(|| Cart::empty(user_id)))
    }

    /// Adds `quantity` units of a product to the cart. Adding a product that is already in the cart increases the
    /// quantity of the existing line.
    pub async fn add_item(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartError> {
        let cart = self.db.add_item_to_cart(user_id, product_id, quantity).await.map_err(|e| {
            debug!("🛒️ Could not add {quantity} of product {product_id} to cart for user {user_id}: {e}");
            e
        })?;
        debug!("🛒️ User {user_id} added {quantity} of product {product_id}. Cart total {}", cart.total());
        Ok(cart)
    }

    pub async fn update_item(&self, user_id: i64, cart_item_id: i64, quantity: i64) -> Result<Cart, CartError> {
        let cart = self.db.update_cart_item(user_id, cart_item_id, quantity).await?;
        debug!("🛒️ User {user_id} set cart item {cart_item_id} to quantity {quantity}");
        Ok(cart)
    }

    pub async fn remove_item(&self, user_id: i64, cart_item_id: i64) -> Result<Cart, CartError> {
        let cart = self.db.remove_cart_item(user_id, cart_item_id).await?;
        debug!("🛒️ User {user_id} removed cart item {cart_item_id}");
        Ok(cart)
    }

    pub async fn empty_cart(&self, user_id: i64) -> Result<Cart, CartError> {
        let cart = self.db.empty_cart(user_id).await?;
        debug!("🛒️ User {user_id} emptied their cart");
        Ok(cart)
    }
}
