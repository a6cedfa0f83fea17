//! Domain events published by the engine after a mutation has been committed.
//!
//! Delivery is fire-and-forget. A failed or slow subscriber never affects the operation that raised the event.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
