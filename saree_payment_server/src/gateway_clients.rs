//! One handle over the three gateway clients, dispatching on [`Gateway`].

use gateway_tools::{
    EasebuzzApi,
    GatewayClientError,
    InitiateRequest,
    InitiateResponse,
    PaymentGatewayClient,
    PhonePeApi,
    ZohoPayApi,
};
use serde_json::Value;
use spg_common::{Gateway, Rupees};

use crate::{config::ServerConfig, data_objects::InitiatePaymentRequest, errors::ServerError};

#[derive(Clone)]
pub struct GatewayClients {
    phonepe: PhonePeApi,
    easebuzz: EasebuzzApi,
    zohopay: ZohoPayApi,
}

impl GatewayClients {
    pub fn new(config: &ServerConfig) -> Result<Self, ServerError> {
        let phonepe = PhonePeApi::new(config.gateways.phonepe.clone())
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let easebuzz = EasebuzzApi::new(config.gateways.easebuzz.clone())
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        let zohopay = ZohoPayApi::new(config.gateways.zohopay.clone())
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { phonepe, easebuzz, zohopay })
    }

    /// Builds the gateway initiation request, pointing the redirect URLs at this server's
    /// callback endpoints.
    pub fn initiate_request(&self, request: &InitiatePaymentRequest, config: &ServerConfig) -> InitiateRequest {
        let origin = &config.site_origin;
        let order_id = request.order_id.as_str();
        let mut initiate = InitiateRequest::new(
            order_id,
            Rupees::from(request.amount),
            format!("{origin}/payment-success?orderId={order_id}"),
            format!("{origin}/payment-failure?orderId={order_id}"),
        );
        initiate.customer_name = request.customer_name.clone();
        initiate.customer_email = request.customer_email.clone();
        initiate.customer_phone = request.customer_phone.clone();
        initiate
    }

    pub async fn initiate(
        &self,
        gateway: Gateway,
        request: &InitiateRequest,
    ) -> Result<InitiateResponse, GatewayClientError> {
        match gateway {
            Gateway::PhonePe => self.phonepe.initiate_payment(request).await,
            Gateway::Easebuzz => self.easebuzz.initiate_payment(request).await,
            Gateway::ZohoPay => self.zohopay.initiate_payment(request).await,
        }
    }

    pub async fn query_status(&self, gateway: Gateway, order_id: &str) -> Result<Value, GatewayClientError> {
        match gateway {
            Gateway::PhonePe => self.phonepe.query_status(order_id).await,
            Gateway::Easebuzz => self.easebuzz.query_status(order_id).await,
            Gateway::ZohoPay => self.zohopay.query_status(order_id).await,
        }
    }
}
