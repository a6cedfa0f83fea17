//! `SqliteDatabase` is a concrete implementation of a retail engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`] module.
//!
//! Every public method is one transaction. SQLite serialises writers, so concurrent transactions that both try to
//! write are resolved by failing one of them with `SQLITE_BUSY`. Those failures (and lost optimistic version checks
//! in the stock ledger) are retried from scratch a bounded number of times. Business-rule failures are never retried.
use std::fmt::Debug;

use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{carts, db_url, new_pool, orders, products, users, with_retries, Retryable};
use crate::{
    db_types::{Cart, Money, NewProduct, NewUser, Order, OrderNumber, OrderStatusType, Product, UserProfile},
    order_objects::{OrderPage, OrderQueryFilter, Pagination},
    traits::{
        CartError,
        CartManagement,
        CatalogError,
        CatalogManagement,
        InventoryError,
        InventoryLedger,
        OrderChanged,
        OrderFlowError,
        OrderManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl Retryable for InventoryError {
    fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

impl Retryable for CartError {
    fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

impl Retryable for OrderFlowError {
    fn is_retryable(&self) -> bool {
        self.is_conflict()
    }
}

impl Retryable for CatalogError {
    fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::Conflict(_))
    }
}

impl SqliteDatabase {
    /// Creates a new database API object using the URL in `RTL_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    /// Creates a new database API object
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date using the migrations embedded in the binary.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    async fn try_create_order(
        &self,
        user_id: i64,
        shipping_address: &str,
        order_number: &OrderNumber,
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        if !users::user_exists(user_id, &mut tx).await? {
            return Err(OrderFlowError::UserNotFound(user_id));
        }
        let cart = carts::fetch_cart(user_id, &mut tx).await?.ok_or(OrderFlowError::CartNotFound(user_id))?;
        let cart_id = cart.id.ok_or(OrderFlowError::CartNotFound(user_id))?;
        if cart.is_empty() {
            return Err(OrderFlowError::EmptyCart);
        }
        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            let product = products::reserve_stock(item.product_id, item.quantity, &mut tx).await?;
            if !product.is_active {
                return Err(OrderFlowError::ProductInactive(product.id));
            }
            // The price is frozen from the product as it is now, not the snapshot taken when the line was added
            lines.push((product.id, item.quantity, product.price));
        }
        let total = lines
            .iter()
            .try_fold(Money::default(), |total, (_, quantity, price)| {
                price.checked_mul(*quantity).and_then(|line| total.checked_add(line))
            })
            .ok_or(OrderFlowError::TotalOutOfRange)?;
        let mut order = orders::insert_order(order_number, user_id, total, shipping_address, &mut tx).await?;
        for (product_id, quantity, price) in lines {
            let item = orders::insert_order_item(order.id, product_id, quantity, price, &mut tx).await?;
            order.items.push(item);
        }
        carts::clear_cart(cart_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} for user {user_id} created. Total: {total}", order.order_number);
        Ok(order)
    }

    async fn try_cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.user_id != user_id {
            return Err(OrderFlowError::NotOrderOwner { order_id, user_id });
        }
        match order.status {
            OrderStatusType::Cancelled => return Err(OrderFlowError::AlreadyCancelled(order.order_number)),
            OrderStatusType::Delivered => return Err(OrderFlowError::CannotCancelDelivered(order.order_number)),
            _ => {},
        }
        for item in &order.items {
            products::release_stock(item.product_id, item.quantity, &mut tx).await?;
        }
        let mut updated = orders::update_order_status(order_id, OrderStatusType::Cancelled, &mut tx)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order_id))?;
        tx.commit().await?;
        debug!("🗃️ Order {} cancelled. {} lines returned to stock", updated.order_number, order.items.len());
        updated.items = order.items;
        Ok(updated)
    }

    async fn try_update_status(&self, order_id: i64, status: OrderStatusType) -> Result<OrderChanged, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let old_status = order.status;
        if old_status == status {
            trace!("🗃️ Order {} is already {status}. Nothing to do", order.order_number);
            return Ok(OrderChanged::new(old_status, order));
        }
        let mut updated = orders::update_order_status(order_id, status, &mut tx)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order_id))?;
        tx.commit().await?;
        debug!("🗃️ Order {} status {old_status} -> {status}", updated.order_number);
        updated.items = order.items;
        Ok(OrderChanged::new(old_status, updated))
    }

    async fn try_update_status_by_intent(
        &self,
        intent_id: &str,
        status: OrderStatusType,
    ) -> Result<OrderChanged, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_payment_intent(intent_id, &mut tx)
            .await?
            .ok_or_else(|| OrderFlowError::PaymentIntentNotFound(intent_id.to_string()))?;
        let old_status = order.status;
        if old_status == status {
            trace!("🗃️ Order {} is already {status}. Nothing to do", order.order_number);
            return Ok(OrderChanged::new(old_status, order));
        }
        if !old_status.can_transition_to(status) {
            let order_number = order.order_number;
            return Err(OrderFlowError::IllegalTransition { order_number, from: old_status, to: status });
        }
        if status == OrderStatusType::Cancelled {
            for item in &order.items {
                products::release_stock(item.product_id, item.quantity, &mut tx).await?;
            }
        }
        let mut updated = orders::update_order_status(order.id, status, &mut tx)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order.id))?;
        tx.commit().await?;
        debug!("🗃️ Order {} status {old_status} -> {status} (payment intent {intent_id})", updated.order_number);
        updated.items = order.items;
        Ok(OrderChanged::new(old_status, updated))
    }

    async fn try_attach_payment_intent(&self, order_id: i64, intent_id: &str) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order(order_id, &mut tx).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.stripe_payment_intent_id.as_deref() == Some(intent_id) {
            return Ok(order);
        }
        if let Some(other) = orders::fetch_order_by_payment_intent(intent_id, &mut tx).await? {
            warn!("🗃️ Payment intent {intent_id} is already linked to order {}", other.order_number);
            return Err(OrderFlowError::PaymentIntentInUse(intent_id.to_string()));
        }
        let mut updated = orders::set_payment_intent(order_id, intent_id, &mut tx)
            .await?
            .ok_or(OrderFlowError::OrderNotFound(order_id))?;
        tx.commit().await?;
        debug!("🗃️ Payment intent {intent_id} linked to order {}", updated.order_number);
        updated.items = order.items;
        Ok(updated)
    }

    async fn fetch_cart_or_empty(&self, user_id: i64) -> Result<Cart, CartError> {
        let mut conn = self.pool.acquire().await?;
        let cart = carts::fetch_cart(user_id, &mut conn).await?;
        Ok(cart.unwrap_or_else(|| Cart::empty(user_id)))
    }

    async fn ensure_user(&self, user_id: i64) -> Result<(), CartError> {
        let mut conn = self.pool.acquire().await?;
        if users::user_exists(user_id, &mut conn).await? {
            Ok(())
        } else {
            Err(CartError::UserNotFound(user_id))
        }
    }
}

impl InventoryLedger for SqliteDatabase {
    async fn reserve_stock(&self, product_id: i64, quantity: i64) -> Result<Product, InventoryError> {
        with_retries("reserve stock", || async move {
            let mut tx = self.pool.begin().await?;
            let product = products::reserve_stock(product_id, quantity, &mut tx).await?;
            tx.commit().await?;
            Ok::<_, InventoryError>(product)
        })
        .await
    }

    async fn release_stock(&self, product_id: i64, quantity: i64) -> Result<Product, InventoryError> {
        with_retries("release stock", || async move {
            let mut tx = self.pool.begin().await?;
            let product = products::release_stock(product_id, quantity, &mut tx).await?;
            tx.commit().await?;
            Ok::<_, InventoryError>(product)
        })
        .await
    }
}

impl CartManagement for SqliteDatabase {
    async fn fetch_cart(&self, user_id: i64) -> Result<Option<Cart>, CartError> {
        let mut conn = self.pool.acquire().await?;
        let cart = carts::fetch_cart(user_id, &mut conn).await?;
        Ok(cart)
    }

    async fn add_item_to_cart(&self, user_id: i64, product_id: i64, quantity: i64) -> Result<Cart, CartError> {
        self.ensure_user(user_id).await?;
        with_retries("add to cart", || async move {
            let mut tx = self.pool.begin().await?;
            carts::add_item(user_id, product_id, quantity, &mut tx).await?;
            tx.commit().await?;
            Ok::<_, CartError>(())
        })
        .await?;
        self.fetch_cart_or_empty(user_id).await
    }

    async fn update_cart_item(&self, user_id: i64, cart_item_id: i64, quantity: i64) -> Result<Cart, CartError> {
        with_retries("update cart item", || async move {
            let mut tx = self.pool.begin().await?;
            carts::update_item_quantity(user_id, cart_item_id, quantity, &mut tx).await?;
            tx.commit().await?;
            Ok::<_, CartError>(())
        })
        .await?;
        self.fetch_cart_or_empty(user_id).await
    }

    async fn remove_cart_item(&self, user_id: i64, cart_item_id: i64) -> Result<Cart, CartError> {
        with_retries("remove cart item", || async move {
            let mut tx = self.pool.begin().await?;
            carts::remove_item(user_id, cart_item_id, &mut tx).await?;
            tx.commit().await?;
            Ok::<_, CartError>(())
        })
        .await?;
        self.fetch_cart_or_empty(user_id).await
    }

    async fn empty_cart(&self, user_id: i64) -> Result<Cart, CartError> {
        self.ensure_user(user_id).await?;
        with_retries("empty cart", || async move {
            let mut tx = self.pool.begin().await?;
            if let Some(cart_id) = carts::fetch_cart_id(user_id, &mut tx).await? {
                carts::clear_cart(cart_id, &mut tx).await?;
            }
            tx.commit().await?;
            Ok::<_, CartError>(())
        })
        .await?;
        self.fetch_cart_or_empty(user_id).await
    }
}

impl OrderManagement for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create_order_from_cart(
        &self,
        user_id: i64,
        shipping_address: &str,
        order_number: &OrderNumber,
    ) -> Result<Order, OrderFlowError> {
        let result =
            with_retries("create order", || self.try_create_order(user_id, shipping_address, order_number)).await;
        match result {
            Err(OrderFlowError::Conflict(e)) => {
                warn!("🗃️ Giving up on order for user {user_id} after repeated write conflicts: {e}");
                Err(OrderFlowError::InsufficientStock(
                    "Insufficient stock: the requested items are in high demand. Please try again".into(),
                ))
            },
            other => other,
        }
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_payment_intent(intent_id, &mut conn).await?;
        Ok(order)
    }

    async fn search_orders(&self, query: OrderQueryFilter, pagination: Pagination) -> Result<OrderPage, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let (orders, total) = orders::search_orders(&query, pagination, &mut conn).await?;
        Ok(OrderPage::new(orders, pagination, total))
    }

    async fn cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order, OrderFlowError> {
        with_retries("cancel order", || self.try_cancel_order(order_id, user_id)).await
    }

    async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<OrderChanged, OrderFlowError> {
        with_retries("update order status", || self.try_update_status(order_id, status)).await
    }

    async fn update_order_status_by_payment_intent(
        &self,
        intent_id: &str,
        status: OrderStatusType,
    ) -> Result<OrderChanged, OrderFlowError> {
        with_retries("update order status by payment intent", || self.try_update_status_by_intent(intent_id, status))
            .await
    }

    async fn attach_payment_intent(&self, order_id: i64, intent_id: &str) -> Result<Order, OrderFlowError> {
        with_retries("attach payment intent", || self.try_attach_payment_intent(order_id, intent_id)).await
    }

    async fn close(&mut self) -> Result<(), OrderFlowError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: i64) -> Result<Option<UserProfile>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn insert_user(&self, user: NewUser) -> Result<UserProfile, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::insert_user(user, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_product(&self, product_id: i64) -> Result<Option<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, CatalogError> {
        if product.price.is_negative() {
            return Err(CatalogError::NegativePrice);
        }
        let mut conn = self.pool.acquire().await?;
        let product = products::insert_product(product, &mut conn).await?;
        Ok(product)
    }

    async fn update_product_price(&self, product_id: i64, price: Money) -> Result<Product, CatalogError> {
        if price.is_negative() {
            return Err(CatalogError::NegativePrice);
        }
        with_retries("update price", || async move {
            let mut conn = self.pool.acquire().await?;
            products::update_price(product_id, price, &mut conn).await?.ok_or(CatalogError::ProductNotFound(product_id))
        })
        .await
    }

    async fn set_product_active(&self, product_id: i64, active: bool) -> Result<Product, CatalogError> {
        with_retries("set product active", || async move {
            let mut conn = self.pool.acquire().await?;
            products::set_active(product_id, active, &mut conn).await?.ok_or(CatalogError::ProductNotFound(product_id))
        })
        .await
    }
}
