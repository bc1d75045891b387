use thiserror::Error;

use crate::{
    db_types::{LineItem, NewOrder, Order, OrderId},
    normalizer::NormalizeError,
    traits::data_objects::{Settlement, SettlementOutcome},
};

/// The storage contract for the reconciliation engine.
///
/// The single non-negotiable requirement is that [`settle_order`](Self::settle_order) executes
/// its read-plan-write cycle atomically: the status write and the inventory-flag claim either
/// both land or neither does, and two concurrent calls for the same order must serialize such
/// that exactly one of them claims the inventory decrement.
#[allow(async_fn_in_trait)]
pub trait ReconciliationDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Stores a new order with both statuses `Pending`, along with its line items, in a single
    /// atomic transaction. This call is idempotent: returns true if the order was inserted, or
    /// false if a row with the same `order_id` already existed (in which case the existing row
    /// is returned untouched).
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, bool), PaymentGatewayError>;

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, PaymentGatewayError>;

    async fn fetch_line_items(&self, order_id: &OrderId) -> Result<Vec<LineItem>, PaymentGatewayError>;

    /// Applies a normalized gateway report to the order it names, atomically.
    ///
    /// In one transaction: fetch the order, plan the transition against its current
    /// `payment_status`, and if the plan says to apply, write the new status pair, record the
    /// transaction id and raw payload, and claim the inventory flag when the plan demands it.
    /// Terminal states are never overwritten; duplicates and conflicts come back in the
    /// [`SettlementOutcome`] without any write having happened.
    async fn settle_order(&self, settlement: Settlement) -> Result<SettlementOutcome, PaymentGatewayError>;

    /// Records the gateway's transaction id on an order without touching its statuses. Used
    /// when a channel learns the txid before the outcome settles. The id is set once and not
    /// overwritten.
    async fn record_transaction_id(&self, order_id: &OrderId, txid: &str) -> Result<(), PaymentGatewayError>;

    /// Fetches orders still awaiting settlement that were created in the given UTC date range.
    /// Both bounds are inclusive; used by the audit sweep.
    async fn fetch_pending_orders_in_range(
        &self,
        from: chrono::DateTime<chrono::Utc>,
        to: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Order>, PaymentGatewayError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), PaymentGatewayError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentGatewayError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("The payload could not be normalized: {0}")]
    MalformedPayload(#[from] NormalizeError),
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),
}

impl From<sqlx::Error> for PaymentGatewayError {
    fn from(e: sqlx::Error) -> Self {
        PaymentGatewayError::DatabaseError(e.to_string())
    }
}
