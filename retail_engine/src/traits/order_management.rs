use thiserror::Error;

use crate::{
    db_types::{Order, OrderNumber, OrderStatusType},
    order_objects::{OrderPage, OrderQueryFilter, Pagination},
    traits::{is_write_conflict, CartError, ErrorKind, InventoryError, OrderChanged},
};

/// Order creation and lifecycle management.
///
/// Every method is a single atomic unit of work. Stock reservations and releases share the transaction of the order
/// mutation they belong to, so a failure part-way through leaves no trace.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Turns the user's cart into a `pending` order in a single transaction:
    /// * every cart line is reserved against the inventory ledger,
    /// * each line's price is frozen at the product's *current* price,
    /// * the order and its items are stored with `order_number`,
    /// * the cart is emptied.
    ///
    /// If any line cannot be reserved, the whole order fails and no stock is consumed.
    async fn create_order_from_cart(
        &self,
        user_id: i64,
        shipping_address: &str,
        order_number: &OrderNumber,
    ) -> Result<Order, OrderFlowError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, OrderFlowError>;

    async fn fetch_order_by_payment_intent(&self, intent_id: &str) -> Result<Option<Order>, OrderFlowError>;

    /// Returns a page of orders matching the filter, newest first.
    async fn search_orders(&self, query: OrderQueryFilter, pagination: Pagination) -> Result<OrderPage, OrderFlowError>;

    /// Cancels the order on behalf of its owner and returns every item to stock.
    ///
    /// Fails if the caller does not own the order, or if the order is already cancelled or delivered.
    async fn cancel_order(&self, order_id: i64, user_id: i64) -> Result<Order, OrderFlowError>;

    /// Sets the order status directly. No transition rules are applied and no stock is moved. Setting the status the
    /// order already has writes nothing.
    async fn update_order_status(&self, order_id: i64, status: OrderStatusType) -> Result<OrderChanged, OrderFlowError>;

    /// Sets the status of the order linked to a payment-gateway intent. Moving an order into `cancelled` this way
    /// returns its items to stock. Setting the status the order already has writes nothing.
    ///
    /// The order lifecycle is checked against the row read inside the write transaction. A move the lifecycle does not
    /// allow fails with [`OrderFlowError::IllegalTransition`] and changes nothing.
    async fn update_order_status_by_payment_intent(
        &self,
        intent_id: &str,
        status: OrderStatusType,
    ) -> Result<OrderChanged, OrderFlowError>;

    /// Links a payment-gateway intent to an order. An intent may belong to one order only.
    async fn attach_payment_intent(&self, order_id: i64, intent_id: &str) -> Result<Order, OrderFlowError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), OrderFlowError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("User {0} does not exist")]
    UserNotFound(i64),
    #[error("Product {0} does not exist")]
    ProductNotFound(i64),
    #[error("Product {0} is not available for sale")]
    ProductInactive(i64),
    #[error("User {0} does not have a cart")]
    CartNotFound(i64),
    #[error("Cart is empty")]
    EmptyCart,
    #[error("{0}")]
    InsufficientStock(String),
    #[error("The order total is too large to be charged")]
    TotalOutOfRange,
    #[error("A shipping address is required")]
    MissingShippingAddress,
    #[error("Order {0} does not exist")]
    OrderNotFound(i64),
    #[error("No order is linked to payment intent {0}")]
    PaymentIntentNotFound(String),
    #[error("Payment intent {0} is already linked to another order")]
    PaymentIntentInUse(String),
    #[error("User {user_id} is not allowed to access order {order_id}")]
    NotOrderOwner { order_id: i64, user_id: i64 },
    #[error("Order {0} is already cancelled")]
    AlreadyCancelled(OrderNumber),
    #[error("Order {0} has been delivered; cannot cancel a delivered order")]
    CannotCancelDelivered(OrderNumber),
    #[error("Order {order_number} is {from} and cannot become {to}")]
    IllegalTransition { order_number: OrderNumber, from: OrderStatusType, to: OrderStatusType },
    #[error("Order number {0} is already in use")]
    OrderNumberTaken(OrderNumber),
    #[error("Write conflict while updating orders: {0}")]
    Conflict(String),
}

impl OrderFlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DatabaseError(_) => ErrorKind::Internal,
            Self::UserNotFound(_)
            | Self::ProductNotFound(_)
            | Self::CartNotFound(_)
            | Self::OrderNotFound(_)
            | Self::PaymentIntentNotFound(_) => ErrorKind::NotFound,
            Self::ProductInactive(_)
            | Self::EmptyCart
            | Self::InsufficientStock(_)
            | Self::TotalOutOfRange
            | Self::MissingShippingAddress
            | Self::PaymentIntentInUse(_)
            | Self::AlreadyCancelled(_)
            | Self::CannotCancelDelivered(_)
            | Self::IllegalTransition { .. } => ErrorKind::BadRequest,
            Self::NotOrderOwner { .. } => ErrorKind::Unauthorized,
            Self::OrderNumberTaken(_) | Self::Conflict(_) => ErrorKind::Conflict,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        if is_write_conflict(&e) {
            OrderFlowError::Conflict(e.to_string())
        } else {
            OrderFlowError::DatabaseError(e.to_string())
        }
    }
}

impl From<InventoryError> for OrderFlowError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::DatabaseError(s) => OrderFlowError::DatabaseError(s),
            InventoryError::ProductNotFound(id) => OrderFlowError::ProductNotFound(id),
            InventoryError::InsufficientStock { .. } | InventoryError::InvalidQuantity(_) => {
                OrderFlowError::InsufficientStock(e.to_string())
            },
            InventoryError::Conflict(s) => OrderFlowError::Conflict(s),
        }
    }
}

impl From<CartError> for OrderFlowError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::DatabaseError(s) => OrderFlowError::DatabaseError(s),
            CartError::UserNotFound(id) => OrderFlowError::UserNotFound(id),
            CartError::ProductNotFound(id) => OrderFlowError::ProductNotFound(id),
            CartError::ProductInactive(id) => OrderFlowError::ProductInactive(id),
            CartError::InsufficientStock(s) => OrderFlowError::InsufficientStock(s),
            CartError::CartNotFound(id) => OrderFlowError::CartNotFound(id),
            CartError::CartItemNotFound(_) | CartError::InvalidQuantity(_) => {
                OrderFlowError::DatabaseError(e.to_string())
            },
            CartError::Conflict(s) => OrderFlowError::Conflict(s),
        }
    }
}
