//! Customer notifications.
//!
//! The store does not talk to a mail provider directly. Instead, each order event is rendered into the message the
//! customer should receive and handed to the mail log under the `rtl::mail` target, where a relay (or a human, in
//! development) picks it up.
use futures::future::BoxFuture;
use log::*;
use retail_engine::{
    db_types::Order,
    events::{EventHandlers, EventHooks, Recipient},
};

const MAIL_TARGET: &str = "rtl::mail";

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Email {
    fn send(self) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            info!(target: MAIL_TARGET, "📬️ To: {}\nSubject: {}\n\n{}", self.to, self.subject, self.body);
        })
    }
}

pub fn order_placed_email(recipient: &Recipient, order: &Order) -> Email {
    let lines = order
        .items
        .iter()
        .map(|i| format!("  {} x product {} @ {} = {}", i.quantity, i.product_id, i.price, i.line_total()))
        .collect::<Vec<_>>()
        .join("\n");
    Email {
        to: recipient.email.clone(),
        subject: format!("Order {} confirmed", order.order_number),
        body: format!(
            "Hi {},\n\nThanks for your order! We'll let you know when it ships.\n\n{lines}\n\nTotal: {}\nShipping to: \
             {}\n",
            recipient.first_name, order.total_amount, order.shipping_address
        ),
    }
}

pub fn order_shipped_email(recipient: &Recipient, order: &Order, tracking_number: &str) -> Email {
    Email {
        to: recipient.email.clone(),
        subject: format!("Order {} has shipped", order.order_number),
        body: format!(
            "Hi {},\n\nYour order {} is on its way to {}.\nTracking number: {tracking_number}\n",
            recipient.first_name, order.order_number, order.shipping_address
        ),
    }
}

pub fn order_delivered_email(recipient: &Recipient, order: &Order) -> Email {
    Email {
        to: recipient.email.clone(),
        subject: format!("Order {} has been delivered", order.order_number),
        body: format!("Hi {},\n\nYour order {} has been delivered. Enjoy!\n", recipient.first_name, order.order_number),
    }
}

/// Installs the notification hooks.
///
/// * OrderPlaced: order confirmation to the customer.
/// * OrderShipped, OrderDelivered: shipping updates to the customer.
/// * OrderPaid, OrderCancelled: logged for the store's records. The customer has already been told by the payment
///   gateway or by their own cancellation.
pub fn create_notification_handlers(buffer_size: usize) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_placed(|ev| order_placed_email(&ev.recipient, &ev.order).send());
    hooks.on_order_paid(|ev| {
        info!("📬️ Payment received for order {} ({})", ev.order.order_number, ev.order.total_amount);
        no_op()
    });
    hooks.on_order_shipped(|ev| order_shipped_email(&ev.recipient, &ev.order, &ev.tracking_number).send());
    hooks.on_order_delivered(|ev| order_delivered_email(&ev.recipient, &ev.order).send());
    hooks.on_order_cancelled(|ev| {
        info!("📬️ Order {} was cancelled. Its stock has been released", ev.order.order_number);
        no_op()
    });
    EventHandlers::new(buffer_size, hooks)
}

fn no_op() -> BoxFuture<'static, ()> {
    Box::pin(async {})
}
