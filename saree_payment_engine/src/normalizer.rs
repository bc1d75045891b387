//! Status normalizer
//!
//! Each gateway reports payment outcomes with its own field names and status vocabulary
//! (`state: "COMPLETED"`, `status: "success"`, `status: "userCancelled"`, ...). This module is
//! the one place where that duck-typing is allowed: it maps a raw gateway payload to a
//! [`NormalizedPayment`] carrying the canonical outcome and, where present, the gateway's
//! transaction id. Everything downstream of here works with canonical values only.
//!
//! Normalization is a pure function. A payload that carries no order-correlating identifier is
//! rejected as unprocessable; the caller is responsible for logging the raw payload so it is
//! not lost.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use spg_common::Gateway;
use thiserror::Error;

use crate::db_types::OrderId;

/// The canonical settlement outcome every channel reduces a gateway report to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Paid,
    Failed,
    Pending,
}

impl PaymentOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentOutcome::Paid | PaymentOutcome::Failed)
    }
}

impl Display for PaymentOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentOutcome::Paid => write!(f, "paid"),
            PaymentOutcome::Failed => write!(f, "failed"),
            PaymentOutcome::Pending => write!(f, "pending"),
        }
    }
}

/// A gateway status report reduced to the fields the reconciliation engine needs.
#[derive(Debug, Clone)]
pub struct NormalizedPayment {
    pub order_id: OrderId,
    pub outcome: PaymentOutcome,
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, Error)]
pub enum NormalizeError {
    #[error("Payload carries no order-correlating identifier")]
    MissingOrderId,
    #[error("Payload is not a JSON object")]
    NotAnObject,
}

const SUCCESS_TERMS: [&str; 5] = ["success", "captured", "completed", "ok", "payment_success"];
// "failure" is listed separately: Easebuzz reports it and it is not a substring of "failed"
const FAILURE_TERMS: [&str; 4] = ["failed", "failure", "declined", "cancelled"];

/// Maps a raw gateway status string onto the canonical outcome. Matching is case-insensitive
/// and accepts substrings ("PAYMENT_SUCCESS", "userCancelled"). Failure terms are checked
/// first so that a compound value never settles as paid by accident. Anything unrecognised,
/// including the empty string, is `Pending`.
pub fn canonical_outcome(raw_status: &str) -> PaymentOutcome {
    let status = raw_status.trim().to_ascii_lowercase();
    if status.is_empty() {
        return PaymentOutcome::Pending;
    }
    if FAILURE_TERMS.iter().any(|term| status.contains(term)) {
        return PaymentOutcome::Failed;
    }
    if SUCCESS_TERMS.iter().any(|term| status.contains(term)) {
        return PaymentOutcome::Paid;
    }
    PaymentOutcome::Pending
}

// Candidate-field tables, in priority order; the first non-empty value wins. These mirror what
// each provider actually sends in webhooks and status responses.

fn order_id_fields(gateway: Gateway) -> &'static [&'static str] {
    match gateway {
        Gateway::PhonePe => &["merchantOrderId", "orderId", "udf2"],
        Gateway::Easebuzz => &["udf2", "udf1"],
        Gateway::ZohoPay => &["reference_id", "order_id", "orderId"],
    }
}

fn status_fields(gateway: Gateway) -> &'static [&'static str] {
    match gateway {
        Gateway::PhonePe => &["state", "status", "code"],
        Gateway::Easebuzz => &["status"],
        Gateway::ZohoPay => &["status", "payment_status"],
    }
}

fn transaction_id_fields(gateway: Gateway) -> &'static [&'static str] {
    match gateway {
        Gateway::PhonePe => &["transactionId", "paymentId"],
        Gateway::Easebuzz => &["mihpayid", "easepayid", "txnid", "bank_ref_num"],
        Gateway::ZohoPay => &["payment_id", "payments_session_id", "session_id"],
    }
}

// Field tables for redirect callbacks, where the posting gateway is not identified by the URL.
const LOOSE_ORDER_ID_FIELDS: [&str; 6] =
    ["orderId", "order_id", "merchantOrderId", "reference_id", "udf2", "udf1"];
const LOOSE_STATUS_FIELDS: [&str; 4] = ["status", "state", "payment_status", "code"];
const LOOSE_TXID_FIELDS: [&str; 6] =
    ["txnid", "transactionId", "payment_id", "mihpayid", "easepayid", "bank_ref_num"];

/// Normalizes a raw status payload from a known gateway.
pub fn normalize(gateway: Gateway, payload: &Value) -> Result<NormalizedPayment, NormalizeError> {
    let Some(object) = payload.as_object() else {
        return Err(NormalizeError::NotAnObject);
    };
    let order_id = first_non_empty(payload, order_id_fields(gateway))
        .or_else(|| (gateway == Gateway::Easebuzz).then(|| easebuzz_order_id_from_txnid(object)).flatten())
        .ok_or(NormalizeError::MissingOrderId)?;
    let outcome =
        first_non_empty(payload, status_fields(gateway)).map(|s| canonical_outcome(&s)).unwrap_or(PaymentOutcome::Pending);
    let transaction_id = first_non_empty(payload, transaction_id_fields(gateway))
        .or_else(|| (gateway == Gateway::PhonePe).then(|| phonepe_nested_transaction_id(payload)).flatten());
    Ok(NormalizedPayment { order_id: OrderId(order_id), outcome, transaction_id })
}

/// Normalizes a redirect-callback payload where the gateway is unknown: the storefront's fixed
/// success/failure URLs receive posts from all three providers.
pub fn normalize_loose(payload: &Value) -> Result<NormalizedPayment, NormalizeError> {
    if !payload.is_object() {
        return Err(NormalizeError::NotAnObject);
    }
    let order_id = first_non_empty(payload, &LOOSE_ORDER_ID_FIELDS).ok_or(NormalizeError::MissingOrderId)?;
    let outcome =
        first_non_empty(payload, &LOOSE_STATUS_FIELDS).map(|s| canonical_outcome(&s)).unwrap_or(PaymentOutcome::Pending);
    let transaction_id = first_non_empty(payload, &LOOSE_TXID_FIELDS);
    Ok(NormalizedPayment { order_id: OrderId(order_id), outcome, transaction_id })
}

fn first_non_empty(payload: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| value_as_string(payload.get(*field)))
}

fn value_as_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// Easebuzz embeds the order id as the prefix of its transaction id ("{order_id}_{timestamp}").
fn easebuzz_order_id_from_txnid(object: &serde_json::Map<String, Value>) -> Option<String> {
    let txnid = object.get("txnid").and_then(|v| v.as_str())?;
    let prefix = txnid.split('_').next().unwrap_or_default();
    (!prefix.is_empty()).then(|| prefix.to_string())
}

// PhonePe's order-status response nests the attempt's transaction id under paymentDetails[0].
fn phonepe_nested_transaction_id(payload: &Value) -> Option<String> {
    value_as_string(payload.pointer("/paymentDetails/0/transactionId"))
}
