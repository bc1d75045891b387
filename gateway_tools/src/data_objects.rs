use serde::{Deserialize, Serialize};
use spg_common::{Gateway, Rupees};

/// Everything a gateway needs to open a payment attempt for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateRequest {
    pub order_id: String,
    pub amount: Rupees,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    /// Where the gateway sends the shopper after a successful attempt.
    pub success_url: String,
    /// Where the gateway sends the shopper after a failed attempt.
    pub failure_url: String,
}

impl InitiateRequest {
    pub fn new(order_id: impl Into<String>, amount: Rupees, success_url: impl Into<String>, failure_url: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            amount,
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            success_url: success_url.into(),
            failure_url: failure_url.into(),
        }
    }
}

/// The gateway's answer to an initiation: where to send the shopper and, where the provider
/// assigns one up front, its id for the attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateResponse {
    pub gateway: Gateway,
    pub order_id: String,
    /// The URL (or widget session) the shopper completes the payment at.
    pub payment_url: String,
    pub transaction_id: Option<String>,
}
