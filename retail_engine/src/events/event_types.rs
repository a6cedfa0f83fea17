use serde::{Deserialize, Serialize};

use crate::db_types::{Order, UserProfile};

/// Who an order notification should be addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub user_id: i64,
    pub email: String,
    pub first_name: String,
}

impl From<&UserProfile> for Recipient {
    fn from(user: &UserProfile) -> Self {
        Self { user_id: user.id, email: user.email.clone(), first_name: user.first_name.clone() }
    }
}

/// A new order has been placed and its stock reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlacedEvent {
    pub recipient: Recipient,
    pub order: Order,
}

impl OrderPlacedEvent {
    pub fn new(recipient: Recipient, order: Order) -> Self {
        Self { recipient, order }
    }
}

/// The payment gateway has confirmed payment for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderShippedEvent {
    pub recipient: Recipient,
    pub order: Order,
    pub tracking_number: String,
}

impl OrderShippedEvent {
    pub fn new(recipient: Recipient, order: Order, tracking_number: String) -> Self {
        Self { recipient, order, tracking_number }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDeliveredEvent {
    pub recipient: Recipient,
    pub order: Order,
}

impl OrderDeliveredEvent {
    pub fn new(recipient: Recipient, order: Order) -> Self {
        Self { recipient, order }
    }
}

/// An order was cancelled and its items returned to stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelledEvent {
    pub order: Order,
}

impl OrderCancelledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
