use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use spg_common::{Rupees, INR_CURRENCY_CODE};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
/// The customer-facing order lifecycle state. Distinct from [`PaymentStatusType`]: an order is
/// `Pending` business-wise while payment is still in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been created; payment has not settled yet.
    Pending,
    /// Payment settled successfully and the order can be fulfilled.
    Confirmed,
    /// Payment failed or the order was abandoned.
    Cancelled,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid status value: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------  PaymentStatusType  ---------------------------------------------------------
/// The payment-settlement state of an order. `Paid` and `Failed` are terminal: once reached,
/// no later event may move the order out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// No settlement outcome has been recorded yet.
    Pending,
    /// The gateway reported a successful settlement.
    Paid,
    /// The gateway reported a failed or cancelled payment attempt.
    Failed,
}

impl PaymentStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatusType::Paid | PaymentStatusType::Failed)
    }
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Paid => write!(f, "Paid"),
            PaymentStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

impl From<String> for PaymentStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid payment status: {value}. But this conversion cannot fail. Defaulting to Pending");
            PaymentStatusType::Pending
        })
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
/// The externally visible order identifier assigned at checkout. This is the correlation key
/// every status-arrival channel uses to find the order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub customer_id: String,
    pub customer_email: Option<String>,
    pub total_price: Rupees,
    pub currency: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    /// The gateway's identifier for the settled/attempted transaction. Set once known, never
    /// cleared.
    pub transaction_id: Option<String>,
    /// The last raw status payload received from the gateway, kept verbatim for audit and
    /// debugging. Overwritten, not merged, on each reconciliation write.
    pub payment_gateway_response: Option<String>,
    pub inventory_adjusted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn gateway_response_json(&self) -> Option<serde_json::Value> {
        self.payment_gateway_response.as_deref().and_then(|s| serde_json::from_str(s).ok())
    }
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// The order id assigned by the storefront at checkout
    pub order_id: OrderId,
    pub customer_id: String,
    pub customer_email: Option<String>,
    /// The total price of the order. Immutable once the order is created.
    pub total_price: Rupees,
    pub currency: String,
    pub items: Vec<NewLineItem>,
}

impl NewOrder {
    pub fn new(order_id: OrderId, customer_id: String, total_price: Rupees) -> Self {
        Self {
            order_id,
            customer_id,
            customer_email: None,
            total_price,
            currency: INR_CURRENCY_CODE.to_string(),
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: NewLineItem) -> Self {
        self.items.push(item);
        self
    }
}

//--------------------------------------      LineItem       ---------------------------------------------------------
/// A single product selection on an order. Line items are immutable once the order exists and
/// are only read back by the inventory adjuster.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LineItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLineItem {
    pub product_id: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub quantity: i64,
}

impl NewLineItem {
    pub fn new(product_id: impl Into<String>, quantity: i64) -> Self {
        Self { product_id: product_id.into(), color: None, size: None, quantity }
    }
}
