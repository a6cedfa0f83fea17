use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// Coarse classification of engine errors, used by callers to decide how to report a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Unauthorized,
    /// Write contention that outlasted the retry budget.
    Conflict,
    Internal,
}

/// The result of a status update. `old_status == order.status` means nothing was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderChanged {
    pub old_status: OrderStatusType,
    pub order: Order,
}

impl OrderChanged {
    pub fn new(old_status: OrderStatusType, order: Order) -> Self {
        Self { old_status, order }
    }

    pub fn is_changed(&self) -> bool {
        self.old_status != self.order.status
    }

    pub fn new_status(&self) -> OrderStatusType {
        self.order.status
    }
}
