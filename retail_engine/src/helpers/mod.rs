mod order_number;
mod webhook_signature;

pub use order_number::{new_order_number, new_tracking_number};
pub use webhook_signature::{sign_payload, SignatureError, WebhookSignature, DEFAULT_TOLERANCE_SECS};
