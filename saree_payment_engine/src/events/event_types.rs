use serde::{Deserialize, Serialize};
use spg_common::Gateway;

use crate::db_types::Order;

/// Fired when an order settles as paid. Carries the order as written, so handlers see the
/// confirmed status and the recorded transaction id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
    pub gateway: Gateway,
}

impl OrderPaidEvent {
    pub fn new(order: Order, gateway: Gateway) -> Self {
        Self { order, gateway }
    }
}

/// Fired when an order settles as failed and is cancelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub gateway: Gateway,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order, gateway: Gateway) -> Self {
        Self { order, gateway }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    OrderAnnulled(OrderAnnulledEvent),
}
