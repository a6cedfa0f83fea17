use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderStatusType},
    traits::OrderChanged,
};

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_CANCELED: &str = "payment_intent.canceled";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// A payment-gateway webhook event. Only the fields the engine acts on are modelled; everything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEventData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntentObject {
    /// The payment intent id, e.g. `pi_3MtwBwLkdIwHu7ix28a3tqPa`
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
    /// Amount in minor currency units
    #[serde(default)]
    pub amount: Option<i64>,
}

impl PaymentEvent {
    pub fn new<S: Into<String>>(id: S, event_type: S, intent_id: S) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            data: PaymentEventData { object: PaymentIntentObject { id: intent_id.into(), status: None, amount: None } },
        }
    }

    pub fn payment_intent_id(&self) -> &str {
        &self.data.object.id
    }

    /// The order status this event asks for, or `None` if the event does not affect orders.
    ///
    /// A failed payment attempt leaves the order pending, since the customer may retry with the same intent.
    pub fn target_status(&self) -> Option<OrderStatusType> {
        match self.event_type.as_str() {
            PAYMENT_SUCCEEDED => Some(OrderStatusType::Paid),
            PAYMENT_CANCELED => Some(OrderStatusType::Cancelled),
            _ => None,
        }
    }
}

/// What the reconciliation of a payment event did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// The order status was changed.
    Applied { event_id: String, change: OrderChanged },
    /// The order already had the requested status. Nothing was written.
    Duplicate { event_id: String, order: Order },
    /// The event was acknowledged without touching any order.
    Ignored { event_id: String, reason: String },
}

impl ReconciliationOutcome {
    pub fn ignored<S: Into<String>>(event_id: &str, reason: S) -> Self {
        Self::Ignored { event_id: event_id.to_string(), reason: reason.into() }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}
