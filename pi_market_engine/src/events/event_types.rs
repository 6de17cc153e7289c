use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderStatusType};

/// Emitted exactly once per order, on the transition into `Paid`. By the time subscribers see this event, the
/// stock decrements have been committed and the order is ready for fulfilment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an order leaves the flow without being paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}
