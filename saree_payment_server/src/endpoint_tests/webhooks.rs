use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use saree_payment_engine::{db_types::PaymentStatusType, traits::InventoryManagement, SqliteDatabase};
use serde_json::json;
use spg_common::Secret;

use super::helpers::new_test_context;
use crate::{
    data_objects::JsonResponse,
    gateway_routes::GatewayWebhookRoute,
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
};

#[actix_web::test]
async fn webhook_settles_the_order_and_decrements_stock() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-1001", "saree-blue", 5).await;
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(web::scope("/wh").service(GatewayWebhookRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::post()
        .uri("/wh/easebuzz/webhook")
        .set_json(json!({ "udf2": "SR-1001", "status": "success", "easepayid": "E-77" }))
        .to_request();
    let res: JsonResponse = test::call_and_read_body_json(&service, req).await;
    assert!(res.success, "{}", res.message);
    let order = ctx.api.fetch_order(&"SR-1001".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Paid);
    assert_eq!(order.transaction_id.as_deref(), Some("E-77"));
    assert_eq!(ctx.db.db.stock_level("saree-blue").await.unwrap(), Some(3));
}

// Easebuzz posts its webhooks as an urlencoded form, not JSON.
#[actix_web::test]
async fn form_encoded_webhook_is_reconciled() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-1005", "saree-plum", 5).await;
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(web::scope("/wh").service(GatewayWebhookRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::post()
        .uri("/wh/easebuzz/webhook")
        .set_form([("udf2", "SR-1005"), ("status", "failure"), ("txnid", "SR-1005_1712000000")])
        .to_request();
    let res: JsonResponse = test::call_and_read_body_json(&service, req).await;
    assert!(res.success, "{}", res.message);
    let order = ctx.api.fetch_order(&"SR-1005".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Failed);
    assert_eq!(ctx.db.db.stock_level("saree-plum").await.unwrap(), Some(5));
}

#[actix_web::test]
async fn duplicate_webhooks_decrement_stock_exactly_once() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-1002", "saree-red", 4).await;
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(web::scope("/wh").service(GatewayWebhookRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;
    for _ in 0..3 {
        let req = TestRequest::post()
            .uri("/wh/zohopay/webhook")
            .set_json(json!({ "reference_id": "SR-1002", "status": "captured", "payment_id": "Z-1" }))
            .to_request();
        let res: JsonResponse = test::call_and_read_body_json(&service, req).await;
        assert!(res.success, "{}", res.message);
    }
    assert_eq!(ctx.db.db.stock_level("saree-red").await.unwrap(), Some(2));
}

#[actix_web::test]
async fn failed_webhook_cancels_without_touching_stock() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-1003", "saree-green", 6).await;
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(web::scope("/wh").service(GatewayWebhookRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::post()
        .uri("/wh/phonepe/webhook")
        .set_json(json!({ "merchantOrderId": "SR-1003", "state": "FAILED" }))
        .to_request();
    let res: JsonResponse = test::call_and_read_body_json(&service, req).await;
    assert!(res.success, "{}", res.message);
    let order = ctx.api.fetch_order(&"SR-1003".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Failed);
    assert_eq!(ctx.db.db.stock_level("saree-green").await.unwrap(), Some(6));
}

// Gateways retry non-2xx responses forever, so even garbage is answered with 200.
#[actix_web::test]
async fn unknown_gateway_is_acknowledged_with_a_failure_envelope() {
    let ctx = new_test_context().await;
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(web::scope("/wh").service(GatewayWebhookRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri("/wh/stripe/webhook").set_json(json!({ "id": "evt_1" })).to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: JsonResponse = test::read_body_json(res).await;
    assert!(!body.success);
}

#[actix_web::test]
async fn payload_without_an_order_id_is_acknowledged_with_a_failure_envelope() {
    let ctx = new_test_context().await;
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(web::scope("/wh").service(GatewayWebhookRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::post()
        .uri("/wh/zohopay/webhook")
        .set_json(json!({ "status": "captured", "amount": 4500 }))
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: JsonResponse = test::read_body_json(res).await;
    assert!(!body.success);
}

#[actix_web::test]
async fn unsigned_webhooks_are_rejected_when_hmac_checks_are_on() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-1004", "saree-gold", 3).await;
    let secret = Secret::new("webhook-secret".to_string());
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(
            web::scope("/wh")
                .wrap(HmacMiddlewareFactory::new("x-webhook-signature", secret, true))
                .service(GatewayWebhookRoute::<SqliteDatabase>::new()),
        );
    let service = test::init_service(app).await;
    let body = json!({ "udf2": "SR-1004", "status": "success" }).to_string();

    let req = TestRequest::post()
        .uri("/wh/easebuzz/webhook")
        .insert_header(("content-type", "application/json"))
        .set_payload(body.clone())
        .to_request();
    let err = test::try_call_service(&service, req).await.expect_err("Expected the signature check to fail");
    assert_eq!(err.as_response_error().status_code(), StatusCode::FORBIDDEN);

    // The same payload with a valid signature goes through.
    let signature = calculate_hmac("webhook-secret", body.as_bytes());
    let req = TestRequest::post()
        .uri("/wh/easebuzz/webhook")
        .insert_header(("content-type", "application/json"))
        .insert_header(("x-webhook-signature", signature))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let order = ctx.api.fetch_order(&"SR-1004".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Paid);
}
