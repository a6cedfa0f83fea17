//! Product and stock management.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Money, NewProduct, Product},
    traits::{CatalogError, CatalogManagement, InventoryError, InventoryLedger},
};

/// `InventoryApi` is the entry point for catalog maintenance and for manual stock movements (e.g. goods received, or
/// a stock correction).
///
/// Orders do not go through this API: order placement and cancellation move stock inside their own transactions.
pub struct InventoryApi<B> {
    db: B,
}

impl<B: Debug> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi ({:?})", self.db)
    }
}

impl<B> InventoryApi<B>
where B: InventoryLedger + CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub async fn product(&self, product_id: i64) -> Result<Option<Product>, CatalogError> {
        self.db.fetch_product(product_id).await
    }

    pub async fn add_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        let product = self.db.insert_product(product).await?;
        info!("📦️ Product {} [{}] added with {} in stock", product.name, product.sku, product.stock_quantity);
        Ok(product)
    }

    pub async fn update_price(&self, product_id: i64, price: Money) -> Result<Product, CatalogError> {
        let product = self.db.update_product_price(product_id, price).await?;
        info!("📦️ Price of product {product_id} is now {price}");
        Ok(product)
    }

    pub async fn set_active(&self, product_id: i64, active: bool) -> Result<Product, CatalogError> {
        let product = self.db.set_product_active(product_id, active).await?;
        info!("📦️ Product {product_id} is {}", if active { "available for sale" } else { "withdrawn from sale" });
        Ok(product)
    }

    /// Takes `quantity` units out of stock. Fails without side effects if there is not enough stock.
    pub async fn reserve(&self, product_id: i64, quantity: i64) -> Result<Product, InventoryError> {
        let product = self.db.reserve_stock(product_id, quantity).await?;
        debug!("📦️ Reserved {quantity} of product {product_id}. {} left", product.stock_quantity);
        Ok(product)
    }

    /// Puts `quantity` units back into stock.
    pub async fn release(&self, product_id: i64, quantity: i64) -> Result<Product, InventoryError> {
        let product = self.db.release_stock(product_id, quantity).await?;
        debug!("📦️ Released {quantity} of product {product_id}. {} in stock", product.stock_quantity);
        Ok(product)
    }
}
