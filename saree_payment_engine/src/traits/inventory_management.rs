use crate::{db_types::OrderId, traits::PaymentGatewayError};

/// Stock-ledger contract. The decrement must be applied exactly once per order no matter how
/// many channels report the same paid outcome, and no matter how those reports interleave.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement: Clone {
    /// Applies the stock decrement for the order's line items, exactly once.
    ///
    /// Inserts the order into the adjustment ledger and decrements `stock_quantity` for each
    /// line item in a single transaction. If the ledger already holds a row for this order the
    /// call is a no-op. Returns true if the decrement was applied by this call.
    ///
    /// Stock is clamped at zero; an oversold item is logged, not an error.
    async fn decrement_once(&self, order_id: &OrderId) -> Result<bool, PaymentGatewayError>;

    /// Current stock level for a product, if it exists.
    async fn stock_level(&self, product_id: &str) -> Result<Option<i64>, PaymentGatewayError>;
}
