//! Payment-gateway reconciliation.
//!
//! The gateway reports the fate of each payment intent through signed webhooks. This API verifies the signature,
//! decodes the event and moves the linked order accordingly. Gateways deliver at least once, so every step is
//! idempotent: replaying an event that has already been applied changes nothing and publishes nothing.
use std::fmt::Debug;

use log::*;
use rtl_common::Secret;
use thiserror::Error;

use crate::{
    db_types::{Order, OrderStatusType},
    events::{EventProducers, OrderCancelledEvent, OrderPaidEvent},
    helpers::{SignatureError, WebhookSignature, DEFAULT_TOLERANCE_SECS},
    payment_objects::{PaymentEvent, ReconciliationOutcome},
    traits::{ErrorKind, OrderChanged, OrderFlowError, OrderManagement},
};

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Invalid webhook signature. {0}")]
    InvalidSignature(#[from] SignatureError),
    #[error("Malformed payment event: {0}")]
    MalformedEvent(String),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
}

impl ReconciliationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSignature(_) => ErrorKind::Unauthorized,
            Self::MalformedEvent(_) => ErrorKind::BadRequest,
            Self::OrderFlow(e) => e.kind(),
        }
    }
}

pub struct PaymentReconciliationApi<B> {
    db: B,
    producers: EventProducers,
    webhook_secret: Secret<String>,
    tolerance_secs: i64,
}

impl<B> Debug for PaymentReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentReconciliationApi (tolerance: {}s, secret: {})", self.tolerance_secs, self.webhook_secret)
    }
}

impl<B> PaymentReconciliationApi<B> {
    pub fn new(db: B, producers: EventProducers, webhook_secret: Secret<String>) -> Self {
        Self { db, producers, webhook_secret, tolerance_secs: DEFAULT_TOLERANCE_SECS }
    }

    /// Sets how far (in seconds) a webhook timestamp may be from the server clock. Zero disables the check.
    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    /// Checks the gateway signature over the raw request body. Without a signing secret, every signature is refused.
    pub fn verify_signature(&self, payload: &[u8], signature_header: &str) -> Result<WebhookSignature, SignatureError> {
        WebhookSignature::verify_header(signature_header, self.webhook_secret.reveal(), payload, self.tolerance_secs)
    }
}

impl<B> PaymentReconciliationApi<B>
where B: OrderManagement
{
    /// Verifies, decodes and applies a webhook delivery. Nothing is read or written unless the signature is valid.
    pub async fn reconcile_payment_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<ReconciliationOutcome, ReconciliationError> {
        self.verify_signature(payload, signature_header).map_err(|e| {
            warn!("💳️ Rejected payment webhook: {e}");
            e
        })?;
        let event: PaymentEvent =
            serde_json::from_slice(payload).map_err(|e| ReconciliationError::MalformedEvent(e.to_string()))?;
        self.process_payment_event(event).await
    }

    /// Applies an already-verified payment event.
    ///
    /// * Events that do not map to an order status are acknowledged and ignored.
    /// * If the order already has the target status, nothing happens.
    /// * Transitions the order lifecycle does not allow (e.g. a late success for an order that has since shipped) are
    ///   acknowledged and ignored.
    pub async fn process_payment_event(&self, event: PaymentEvent) -> Result<ReconciliationOutcome, ReconciliationError> {
        let intent_id = event.payment_intent_id();
        let Some(target) = event.target_status() else {
            debug!("💳️ Ignoring {} event {} for {intent_id}", event.event_type, event.id);
            return Ok(ReconciliationOutcome::ignored(&event.id, format!("{} events are not handled", event.event_type)));
        };
        let order = self
            .db
            .fetch_order_by_payment_intent(intent_id)
            .await?
            .ok_or_else(|| OrderFlowError::PaymentIntentNotFound(intent_id.to_string()))?;
        if order.status == target {
            debug!("💳️ Event {} is a replay. Order {} is already {target}", event.id, order.order_number);
            return Ok(ReconciliationOutcome::Duplicate { event_id: event.id, order });
        }
        if !order.status.can_transition_to(target) {
            warn!(
                "💳️ Event {} asks for order {} to move from {} to {target}, which is not allowed. Ignoring it",
                event.id, order.order_number, order.status
            );
            let reason = format!("order {} is {} and cannot become {target}", order.order_number, order.status);
            return Ok(ReconciliationOutcome::ignored(&event.id, reason));
        }
        // The order may have moved since it was read above. The backend re-checks the lifecycle in its transaction.
        let change = match self.update_order_status_by_payment_intent(intent_id, target).await {
            Ok(change) => change,
            Err(e @ OrderFlowError::IllegalTransition { .. }) => {
                warn!("💳️ Event {} lost a race with another order update. Ignoring it. {e}", event.id);
                return Ok(ReconciliationOutcome::ignored(&event.id, e.to_string()));
            },
            Err(e) => return Err(e.into()),
        };
        if !change.is_changed() {
            return Ok(ReconciliationOutcome::Duplicate { event_id: event.id, order: change.order });
        }
        Ok(ReconciliationOutcome::Applied { event_id: event.id, change })
    }

    /// Sets the status of the order linked to `intent_id`. Re-applying the current status is a no-op.
    ///
    /// Moving an order into `cancelled` returns its items to stock.
    pub async fn update_order_status_by_payment_intent(
        &self,
        intent_id: &str,
        status: OrderStatusType,
    ) -> Result<OrderChanged, OrderFlowError> {
        let change = self.db.update_order_status_by_payment_intent(intent_id, status).await?;
        if !change.is_changed() {
            return Ok(change);
        }
        info!(
            "💳️ Order {} moved from {} to {status} by payment intent {intent_id}",
            change.order.order_number, change.old_status
        );
        match status {
            OrderStatusType::Paid => {
                self.producers.publish_order_paid(OrderPaidEvent::new(change.order.clone())).await;
            },
            OrderStatusType::Cancelled => {
                self.producers.publish_order_cancelled(OrderCancelledEvent::new(change.order.clone())).await;
            },
            _ => {},
        }
        Ok(change)
    }

    /// Links a gateway payment intent to an order, so that later webhooks can find it.
    pub async fn attach_payment_intent(&self, order_id: i64, intent_id: &str) -> Result<Order, OrderFlowError> {
        let intent_id = intent_id.trim();
        let order = self.db.attach_payment_intent(order_id, intent_id).await?;
        debug!("💳️ Payment intent {intent_id} attached to order {}", order.order_number);
        Ok(order)
    }
}
