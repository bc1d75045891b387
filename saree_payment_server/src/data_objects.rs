use std::fmt::Display;

use chrono::{DateTime, Utc};
use saree_payment_engine::db_types::{NewLineItem, NewOrder, Order, OrderId, OrderStatusType, PaymentStatusType};
use serde::{Deserialize, Serialize};
use spg_common::Rupees;

/// The envelope every webhook call is answered with, success or not. Gateways retry anything
/// outside the 200 range, so errors ride inside this body instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// What the storefront's status poll gets back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusResult {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub transaction_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderStatusResult {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id.clone(),
            status: order.status,
            payment_status: order.payment_status,
            transaction_id: order.transaction_id.clone(),
            updated_at: order.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiateLineItem {
    pub product_id: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

/// The checkout payload: creates the order record and opens a payment attempt at the chosen
/// gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentRequest {
    pub order_id: OrderId,
    pub customer_id: String,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// The order total, in paise.
    pub amount: i64,
    #[serde(default)]
    pub items: Vec<InitiateLineItem>,
}

impl InitiatePaymentRequest {
    pub fn to_new_order(&self) -> NewOrder {
        let mut order = NewOrder::new(self.order_id.clone(), self.customer_id.clone(), Rupees::from(self.amount));
        order.customer_email = self.customer_email.clone();
        for item in &self.items {
            let mut line = NewLineItem::new(item.product_id.clone(), item.quantity);
            line.color = item.color.clone();
            line.size = item.size.clone();
            order = order.with_item(line);
        }
        order
    }
}

/// What the initiate endpoint answers with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiatePaymentResult {
    pub order_id: OrderId,
    pub gateway: spg_common::Gateway,
    pub payment_url: String,
    pub transaction_id: Option<String>,
}
