use serde_json::Value;
use spg_common::Gateway;

use crate::{data_objects::{InitiateRequest, InitiateResponse}, GatewayClientError};

/// The client-side contract every gateway wrapper implements.
///
/// `query_status` returns the provider's payload untouched. The reconciliation engine's
/// normalizer is the one place gateway vocabularies are interpreted; the clients never
/// pre-digest them.
#[allow(async_fn_in_trait)]
pub trait PaymentGatewayClient {
    fn gateway(&self) -> Gateway;

    /// Opens a payment attempt for the order and returns where to send the shopper.
    async fn initiate_payment(&self, request: &InitiateRequest) -> Result<InitiateResponse, GatewayClientError>;

    /// Fetches the provider's current view of the order's payment, raw.
    async fn query_status(&self, order_id: &str) -> Result<Value, GatewayClientError>;
}
