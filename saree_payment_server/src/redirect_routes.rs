//! Redirect callback routes
//!
//! After a payment attempt the gateway bounces the shopper back through this server, either as
//! a GET with query parameters (PhonePe, ZohoPay) or a POST with a form or JSON body
//! (Easebuzz). The callback is a reconciliation channel like any other: the payload is
//! normalized loosely (the posting gateway is not identified by the URL) and reconciled before
//! the shopper is forwarded to the storefront's result page.
//!
//! The shopper is ALWAYS redirected, whatever the payload looked like. A callback that cannot
//! be parsed forwards to the failure page without parameters; the poll worker and audit sweep
//! remain the safety nets for the order itself.

use std::collections::HashMap;

use actix_web::{http::header, web, Either, HttpRequest, HttpResponse};
use log::*;
use saree_payment_engine::{
    normalizer::normalize_loose,
    traits::{InventoryManagement, ReconciliationDatabase, Settlement},
    ReconciliationApi,
};
use serde_json::{Map, Value};
use spg_common::Gateway;

use crate::config::ServerConfig;

pub const SUCCESS_PAGE: &str = "/payment-success";
pub const FAILURE_PAGE: &str = "/payment-failure";

/// GET form of the callback. The gateway's report arrives as query parameters.
pub async fn payment_redirect_get<B>(
    req: HttpRequest,
    query: web::Query<HashMap<String, String>>,
    api: web::Data<ReconciliationApi<B>>,
    config: web::Data<ServerConfig>,
) -> HttpResponse
where
    B: ReconciliationDatabase + InventoryManagement,
{
    let payload = Value::Object(query.into_inner().into_iter().map(|(k, v)| (k, Value::String(v))).collect());
    handle_redirect(req.path(), payload, &api, &config).await
}

/// POST form of the callback. Easebuzz posts an urlencoded form; some providers post JSON.
pub async fn payment_redirect_post<B>(
    req: HttpRequest,
    body: Either<web::Json<Value>, web::Form<HashMap<String, String>>>,
    api: web::Data<ReconciliationApi<B>>,
    config: web::Data<ServerConfig>,
) -> HttpResponse
where
    B: ReconciliationDatabase + InventoryManagement,
{
    let payload = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => {
            Value::Object(form.into_inner().into_iter().map(|(k, v)| (k, Value::String(v))).collect())
        },
    };
    handle_redirect(req.path(), payload, &api, &config).await
}

async fn handle_redirect<B>(
    path: &str,
    payload: Value,
    api: &ReconciliationApi<B>,
    config: &ServerConfig,
) -> HttpResponse
where
    B: ReconciliationDatabase + InventoryManagement,
{
    trace!("🔀️ Redirect callback on {path}");
    let normalized = match normalize_loose(&payload) {
        Ok(n) => n,
        Err(e) => {
            warn!("🔀️ Unparseable redirect callback on {path}: {e}. Payload: {payload}");
            return redirect_to(format!("{}{FAILURE_PAGE}", config.site_origin));
        },
    };
    let order_id = normalized.order_id.clone();
    match infer_gateway(&payload) {
        Some(gateway) => {
            let settlement =
                Settlement::new(gateway, normalized.clone()).with_raw_payload(payload.to_string());
            if let Err(e) = api.reconcile(settlement).await {
                warn!("🔀️ Reconciling redirect callback for order [{order_id}] failed: {e}");
            }
        },
        None => {
            // Cannot tell which provider posted this. The poll worker settles the order.
            debug!("🔀️ Redirect callback for order [{order_id}] does not identify its gateway");
        },
    }
    let page = if path.ends_with(FAILURE_PAGE) { FAILURE_PAGE } else { SUCCESS_PAGE };
    let url = match payload.as_object() {
        Some(fields) => result_page_url(&config.site_origin, page, fields),
        None => format!("{}{FAILURE_PAGE}", config.site_origin),
    };
    redirect_to(url)
}

// Every field the gateway posted is forwarded verbatim as a query parameter, so the
// storefront's result pages see exactly what the callback carried.
fn result_page_url(origin: &str, page: &str, fields: &Map<String, Value>) -> String {
    let query = fields
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(&value))
        })
        .collect::<Vec<_>>()
        .join("&");
    format!("{origin}{page}?{query}")
}

fn redirect_to(url: String) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, url))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .finish()
}

// Each provider's callback carries fields no other provider sends.
fn infer_gateway(payload: &Value) -> Option<Gateway> {
    let object: &Map<String, Value> = payload.as_object()?;
    let has = |field: &str| object.contains_key(field);
    if has("mihpayid") || has("easepayid") || has("txnid") {
        return Some(Gateway::Easebuzz);
    }
    if has("merchantOrderId") || has("transactionId") || has("state") {
        return Some(Gateway::PhonePe);
    }
    if has("payments_session_id") || has("payment_id") || has("reference_id") {
        return Some(Gateway::ZohoPay);
    }
    None
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn gateway_is_inferred_from_distinctive_fields() {
        assert_eq!(infer_gateway(&json!({"txnid": "OID_1712", "status": "success"})), Some(Gateway::Easebuzz));
        assert_eq!(infer_gateway(&json!({"merchantOrderId": "OID", "state": "COMPLETED"})), Some(Gateway::PhonePe));
        assert_eq!(infer_gateway(&json!({"reference_id": "OID", "status": "captured"})), Some(Gateway::ZohoPay));
        assert_eq!(infer_gateway(&json!({"orderId": "OID", "status": "ok"})), None);
    }

    #[test]
    fn result_page_url_forwards_every_field_verbatim() {
        let fields = fields(json!({ "udf2": "OID 9", "status": "success", "txnid": "T/1" }));
        let url = result_page_url("https://shop.example", SUCCESS_PAGE, &fields);
        assert_eq!(url, "https://shop.example/payment-success?status=success&txnid=T%2F1&udf2=OID%209");
    }

    #[test]
    fn numeric_fields_are_forwarded_too() {
        let fields = fields(json!({ "amount": 142000, "orderId": "OID" }));
        let url = result_page_url("https://shop.example", FAILURE_PAGE, &fields);
        assert_eq!(url, "https://shop.example/payment-failure?amount=142000&orderId=OID");
    }
}
