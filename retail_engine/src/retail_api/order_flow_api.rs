use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Order, OrderStatusType},
    events::{
        EventProducers,
        OrderCancelledEvent,
        OrderDeliveredEvent,
        OrderPlacedEvent,
        OrderShippedEvent,
        Recipient,
    },
    helpers::{new_order_number, new_tracking_number},
    order_objects::{OrderPage, OrderQueryFilter, Pagination},
    traits::{CatalogManagement, OrderChanged, OrderFlowError, OrderManagement},
};

/// How many fresh order numbers are tried before giving up on a checkout.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// `OrderFlowApi` is the primary API for placing orders and moving them through their lifecycle.
///
/// Notifications are published after the corresponding change has been committed. Publishing never fails the
/// operation.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + CatalogManagement
{
    /// Checks out the user's cart.
    ///
    /// All cart lines are reserved, priced at the products' current prices and written as a `pending` order in one
    /// transaction, after which the cart is empty. If any line cannot be reserved, nothing changes.
    pub async fn create_order(&self, user_id: i64, shipping_address: &str) -> Result<Order, OrderFlowError> {
        let shipping_address = shipping_address.trim();
        if shipping_address.is_empty() {
            return Err(OrderFlowError::MissingShippingAddress);
        }
        let mut attempt = 1;
        let order = loop {
            let order_number = new_order_number();
            match self.db.create_order_from_cart(user_id, shipping_address, &order_number).await {
                Err(OrderFlowError::OrderNumberTaken(n)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                    warn!("🔄️📦️ Order number {n} is already taken. Generating another one");
                    attempt += 1;
                },
                result => break result?,
            }
        };
        info!(
            "🔄️📦️ Order {} placed by user {user_id}: {} line(s), total {}",
            order.order_number,
            order.items.len(),
            order.total_amount
        );
        if let Some(recipient) = self.recipient(user_id).await {
            self.producers.publish_order_placed(OrderPlacedEvent::new(recipient, order.clone())).await;
        }
        Ok(order)
    }

    /// Fetches an order on behalf of a user. Users may only see their own orders.
    pub async fn fetch_order_for_user(&self, order_id: i64, user_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        if order.user_id != user_id {
            warn!("🔄️📦️ User {user_id} tried to access order {order_id}, which belongs to someone else");
            return Err(OrderFlowError::NotOrderOwner { order_id, user_id });
        }
        Ok(order)
    }

    pub async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order(order_id).await
    }

    /// Lists the user's orders, newest first. Any user id in `filter` is overridden.
    pub async fn list_orders(
        &self,
        user_id: i64,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<OrderPage, OrderFlowError> {
        let filter = filter.with_user_id(user_id);
        trace!("🔄️📦️ Listing orders with {filter}");
        self.db.search_orders(filter, pagination).await
    }

    /// Searches all orders. For admin use.
    pub async fn search_orders(
        &self,
        filter: OrderQueryFilter,
        pagination: Pagination,
    ) -> Result<OrderPage, OrderFlowError> {
        self.db.search_orders(filter, pagination).await
    }

    /// Cancels an order on behalf of its owner and returns its items to stock.
    ///
    /// Cancelled and delivered orders cannot be cancelled.
    pub async fn cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order, OrderFlowError> {
        let order = self.db.cancel_order(order_id, user_id).await?;
        info!("🔄️❌️ Order {} cancelled by user {user_id}. Stock released", order.order_number);
        self.producers.publish_order_cancelled(OrderCancelledEvent::new(order.clone())).await;
        Ok(order)
    }

    /// Sets an order's status on behalf of an admin.
    ///
    /// The status is assigned as given, even if the lifecycle does not normally allow the transition, and no stock is
    /// moved. Shipping and delivery notifications are sent when the status actually changes. For shipments, the
    /// supplied tracking number is used, or one is generated.
    pub async fn update_order_status(
        &self,
        order_id: i64,
        status: OrderStatusType,
        tracking_number: Option<String>,
    ) -> Result<OrderChanged, OrderFlowError> {
        let change = self.db.update_order_status(order_id, status).await?;
        if !change.is_changed() {
            debug!("🔄️📦️ Order {} is already {status}", change.order.order_number);
            return Ok(change);
        }
        if !change.old_status.can_transition_to(status) {
            warn!(
                "🔄️📦️ Order {} was moved from {} to {status} by an admin. This skips the normal order lifecycle",
                change.order.order_number, change.old_status
            );
        }
        info!("🔄️📦️ Order {} is now {status}", change.order.order_number);
        match status {
            OrderStatusType::Shipped => {
                if let Some(recipient) = self.recipient(change.order.user_id).await {
                    let tracking = tracking_number.unwrap_or_else(new_tracking_number);
                    let event = OrderShippedEvent::new(recipient, change.order.clone(), tracking);
                    self.producers.publish_order_shipped(event).await;
                }
            },
            OrderStatusType::Delivered => {
                if let Some(recipient) = self.recipient(change.order.user_id).await {
                    let event = OrderDeliveredEvent::new(recipient, change.order.clone());
                    self.producers.publish_order_delivered(event).await;
                }
            },
            _ => {},
        }
        Ok(change)
    }

    async fn recipient(&self, user_id: i64) -> Option<Recipient> {
        match self.db.fetch_user(user_id).await {
            Ok(Some(user)) => Some(Recipient::from(&user)),
            Ok(None) => {
                warn!("🔄️📬️ User {user_id} no longer exists. No notification will be sent");
                None
            },
            Err(e) => {
                warn!("🔄️📬️ Could not look up user {user_id} for a notification: {e}");
                None
            },
        }
    }
}
