//! PhonePe checkout v2 client.
//!
//! PhonePe authenticates API calls two ways at once: an OAuth bearer token (sent as
//! `Authorization: O-Bearer <token>`) obtained via client credentials, and a per-request
//! `X-VERIFY` checksum over the base64 request body, the API path and the salt key. Tokens
//! are cached until shortly before expiry.

use std::sync::Arc;

use chrono::Utc;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::Deserialize;
use serde_json::{json, Value};
use spg_common::Gateway;
use tokio::sync::Mutex;

use crate::{
    config::PhonePeConfig,
    data_objects::{InitiateRequest, InitiateResponse},
    helpers::sha256_hex,
    traits::PaymentGatewayClient,
    GatewayClientError,
};

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: i64,
}

#[derive(Clone)]
pub struct PhonePeApi {
    config: PhonePeConfig,
    client: Arc<Client>,
    token_cache: Arc<Mutex<Option<CachedToken>>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_at: Option<i64>,
}

impl PhonePeApi {
    pub fn new(config: PhonePeConfig) -> Result<Self, GatewayClientError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayClientError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), token_cache: Arc::new(Mutex::new(None)) })
    }

    /// Returns a valid OAuth token, reusing the cached one if it has more than a minute left.
    async fn oauth_token(&self) -> Result<String, GatewayClientError> {
        let now = Utc::now().timestamp();
        let mut cache = self.token_cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.expires_at - 60 > now {
                trace!("Using cached PhonePe OAuth token");
                return Ok(cached.token.clone());
            }
        }
        let token_url = format!("{}/v1/oauth/token", self.config.oauth_base_url.trim_end_matches('/'));
        debug!("Fetching a fresh PhonePe OAuth token");
        let response = self
            .client
            .post(&token_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.reveal().as_str()),
                ("client_version", "1"),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|e| GatewayClientError::GatewayUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayClientError::RestResponseError(e.to_string()))?;
            return Err(GatewayClientError::QueryError { status, message });
        }
        let body: TokenResponse =
            response.json().await.map_err(|e| GatewayClientError::JsonError(e.to_string()))?;
        let token = body.access_token.ok_or(GatewayClientError::MissingAccessToken)?;
        let expires_at = body.expires_at.unwrap_or(now + 3600);
        *cache = Some(CachedToken { token: token.clone(), expires_at });
        Ok(token)
    }

    /// The `X-VERIFY` checksum: sha256(base64_body + path + salt_key) suffixed with the salt
    /// index.
    fn x_verify(&self, base64_body: &str, path: &str) -> String {
        let checksum = sha256_hex(&format!("{base64_body}{path}{}", self.config.salt_key.reveal()));
        format!("{checksum}###{}", self.config.salt_index)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value, GatewayClientError> {
        let token = self.oauth_token().await?;
        let serialized =
            serde_json::to_string(body).map_err(|e| GatewayClientError::JsonError(e.to_string()))?;
        let b64_body = base64::encode(serialized.as_bytes());
        let url = format!("{}{path}", self.config.pay_base_url.trim_end_matches('/'));
        trace!("PhonePe POST {url}");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("O-Bearer {token}"))
            .header("X-VERIFY", self.x_verify(&b64_body, path))
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayClientError::GatewayUnavailable(e.to_string()))?;
        read_json(response).await
    }

    async fn get_json(&self, path: &str) -> Result<Value, GatewayClientError> {
        let token = self.oauth_token().await?;
        let url = format!("{}{path}", self.config.pay_base_url.trim_end_matches('/'));
        trace!("PhonePe GET {url}");
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("O-Bearer {token}"))
            .header("X-VERIFY", self.x_verify("", path))
            .send()
            .await
            .map_err(|e| GatewayClientError::GatewayUnavailable(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, GatewayClientError> {
    if response.status().is_success() {
        response.json().await.map_err(|e| GatewayClientError::JsonError(e.to_string()))
    } else {
        let status = response.status().as_u16();
        let message = response.text().await.map_err(|e| GatewayClientError::RestResponseError(e.to_string()))?;
        Err(GatewayClientError::QueryError { status, message })
    }
}

impl PaymentGatewayClient for PhonePeApi {
    fn gateway(&self) -> Gateway {
        Gateway::PhonePe
    }

    async fn initiate_payment(&self, request: &InitiateRequest) -> Result<InitiateResponse, GatewayClientError> {
        let body = json!({
            "merchantOrderId": request.order_id,
            "amount": request.amount.value(),
            "paymentFlow": { "type": "PG_CHECKOUT" },
            "merchantUrls": { "redirectUrl": request.success_url },
        });
        let result = self.post_json("/checkout/v2/pay", &body).await?;
        let payment_url = result
            .pointer("/redirectUrl")
            .or_else(|| result.pointer("/data/instrumentResponse/redirectInfo/url"))
            .and_then(Value::as_str)
            .ok_or(GatewayClientError::MissingField("redirectUrl"))?
            .to_string();
        let transaction_id = result.get("orderId").and_then(Value::as_str).map(String::from);
        info!("PhonePe payment initiated for order {}", request.order_id);
        Ok(InitiateResponse {
            gateway: Gateway::PhonePe,
            order_id: request.order_id.clone(),
            payment_url,
            transaction_id,
        })
    }

    async fn query_status(&self, order_id: &str) -> Result<Value, GatewayClientError> {
        let path = format!("/checkout/v2/order/{order_id}/status?details=false");
        let mut payload = self.get_json(&path).await?;
        // Carry the merchant order id in the payload so the normalizer can correlate it.
        if let Some(object) = payload.as_object_mut() {
            object.entry("merchantOrderId").or_insert_with(|| Value::String(order_id.to_string()));
        }
        Ok(payload)
    }
}
