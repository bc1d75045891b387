//----------------------------------------------   Webhooks  ----------------------------------------------------
//
// Gateways deliver webhooks at-least-once and retry anything answered outside the 200 range.
// Every handler here therefore answers 200 with a JSON envelope, success or not; a payload we
// cannot process is logged in full so the report is never lost.

use std::collections::HashMap;

use actix_web::{web, Either, HttpRequest, HttpResponse};
use log::*;
use saree_payment_engine::{
    normalizer::{normalize, NormalizeError},
    traits::{InventoryManagement, ReconciliationDatabase, PaymentGatewayError, Settlement, SettlementDisposition},
    ReconciliationApi,
};
use serde_json::Value;
use spg_common::Gateway;

use crate::{config::ServerConfig, data_objects::JsonResponse, helpers::get_remote_ip, route};

route!(gateway_webhook => Post "/{gateway}/webhook" impl ReconciliationDatabase, InventoryManagement);
pub async fn gateway_webhook<B>(
    req: HttpRequest,
    path: web::Path<String>,
    body: Either<web::Json<Value>, web::Form<HashMap<String, String>>>,
    api: web::Data<ReconciliationApi<B>>,
    config: web::Data<ServerConfig>,
) -> HttpResponse
where
    B: ReconciliationDatabase + InventoryManagement,
{
    let peer = get_remote_ip(&req, config.use_x_forwarded_for, config.use_forwarded);
    trace!("🔔️ Received webhook request from {peer:?}: {}", req.uri());
    let gateway: Gateway = match path.into_inner().parse() {
        Ok(g) => g,
        Err(e) => {
            warn!("🔔️ Webhook for an unknown gateway: {e}");
            return HttpResponse::Ok().json(JsonResponse::failure(e));
        },
    };
    // Easebuzz delivers webhooks as urlencoded forms; the others post JSON
    let payload = match body {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => {
            Value::Object(form.into_inner().into_iter().map(|(k, v)| (k, Value::String(v))).collect())
        },
    };
    let result = handle_webhook(gateway, payload, &api).await;
    HttpResponse::Ok().json(result)
}

async fn handle_webhook<B>(gateway: Gateway, payload: Value, api: &ReconciliationApi<B>) -> JsonResponse
where B: ReconciliationDatabase + InventoryManagement {
    let normalized = match normalize(gateway, &payload) {
        Ok(n) => n,
        Err(NormalizeError::MissingOrderId) => {
            warn!("🔔️ {gateway} webhook carries no order id. Payload: {payload}");
            return JsonResponse::failure("No order id in payload");
        },
        Err(e) => {
            warn!("🔔️ Could not normalize {gateway} webhook. {e}. Payload: {payload}");
            return JsonResponse::failure(e);
        },
    };
    let order_id = normalized.order_id.clone();
    let settlement = Settlement::new(gateway, normalized).with_raw_payload(payload.to_string());
    match api.reconcile(settlement).await {
        Ok(outcome) => match outcome.disposition {
            SettlementDisposition::Transitioned { .. } => {
                info!("🔔️ Order [{order_id}] settled as {} via {gateway} webhook", outcome.order.payment_status);
                JsonResponse::success("Order settled.")
            },
            SettlementDisposition::DuplicateTerminal => {
                debug!("🔔️ Duplicate {gateway} webhook for order [{order_id}] acknowledged");
                JsonResponse::success("Order already settled.")
            },
            SettlementDisposition::Ignored => JsonResponse::success("Pending status acknowledged."),
            SettlementDisposition::Conflicting { recorded, reported } => {
                warn!(
                    "🔔️ {gateway} webhook for order [{order_id}] reports {reported}, but the order is {recorded}. \
                     Keeping the recorded state."
                );
                JsonResponse::failure("Conflicting status report.")
            },
        },
        Err(PaymentGatewayError::OrderNotFound(id)) => {
            warn!("🔔️ {gateway} webhook names unknown order {id}. Payload: {payload}");
            JsonResponse::failure("Order not found.")
        },
        Err(e) => {
            warn!("🔔️ Unexpected error while handling {gateway} webhook for [{order_id}]. {e}");
            JsonResponse::failure("Unexpected error handling webhook.")
        },
    }
}
