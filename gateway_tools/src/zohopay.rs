//! Zoho Payments client.
//!
//! Zoho works through payment sessions: we create a session carrying our order id as
//! `reference_id`, the storefront widget collects the payment against the session, and the
//! status APIs report back with `payment_id` and the same `reference_id`. API calls carry a
//! `Zoho-oauthtoken` authorization header.

use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde_json::{json, Value};
use spg_common::Gateway;

use crate::{
    config::ZohoPayConfig,
    data_objects::{InitiateRequest, InitiateResponse},
    traits::PaymentGatewayClient,
    GatewayClientError,
};

#[derive(Clone)]
pub struct ZohoPayApi {
    config: ZohoPayConfig,
    client: Arc<Client>,
}

impl ZohoPayApi {
    pub fn new(config: ZohoPayConfig) -> Result<Self, GatewayClientError> {
        let mut headers = HeaderMap::with_capacity(2);
        let auth = HeaderValue::from_str(&format!("Zoho-oauthtoken {}", config.access_token.reveal()))
            .map_err(|e| GatewayClientError::Initialization(e.to_string()))?;
        headers.insert("Authorization", auth);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayClientError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    async fn rest_query(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value, GatewayClientError> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let url = format!(
            "{}{path}{separator}account_id={}",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.account_id
        );
        trace!("ZohoPay {method} {url}");
        let mut req = self.client.request(method, &url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayClientError::GatewayUnavailable(e.to_string()))?;
        if response.status().is_success() {
            response.json().await.map_err(|e| GatewayClientError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayClientError::RestResponseError(e.to_string()))?;
            Err(GatewayClientError::QueryError { status, message })
        }
    }
}

impl PaymentGatewayClient for ZohoPayApi {
    fn gateway(&self) -> Gateway {
        Gateway::ZohoPay
    }

    async fn initiate_payment(&self, request: &InitiateRequest) -> Result<InitiateResponse, GatewayClientError> {
        let body = json!({
            "amount": format!("{:.2}", request.amount.as_decimal_rupees()),
            "currency": "INR",
            "reference_id": request.order_id,
            "description": "Saree order",
        });
        let result = self.rest_query(Method::POST, "/paymentsessions", Some(body)).await?;
        let session_id = result
            .pointer("/payments_session/payments_session_id")
            .or_else(|| result.get("payments_session_id"))
            .and_then(Value::as_str)
            .ok_or(GatewayClientError::MissingField("payments_session_id"))?
            .to_string();
        info!("ZohoPay session {session_id} created for order {}", request.order_id);
        Ok(InitiateResponse {
            gateway: Gateway::ZohoPay,
            order_id: request.order_id.clone(),
            // The widget opens the session client-side; there is no hosted URL to redirect to.
            payment_url: session_id.clone(),
            transaction_id: Some(session_id),
        })
    }

    async fn query_status(&self, order_id: &str) -> Result<Value, GatewayClientError> {
        let path = format!("/payments?reference_id={order_id}");
        let result = self.rest_query(Method::GET, &path, None).await?;
        // The list endpoint wraps payments in an array; unwrap the most recent one so the
        // payload carries the status fields at the top level.
        let mut payload = result
            .pointer("/payments/0")
            .cloned()
            .unwrap_or(result);
        if let Some(object) = payload.as_object_mut() {
            object.entry("reference_id").or_insert_with(|| Value::String(order_id.to_string()));
        }
        Ok(payload)
    }
}
