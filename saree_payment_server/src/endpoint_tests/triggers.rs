use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use saree_payment_engine::{
    db_types::PaymentStatusType,
    normalizer::{NormalizedPayment, PaymentOutcome},
    traits::Settlement,
};
use spg_common::Gateway;

use super::helpers::new_test_context;
use crate::{
    data_objects::JsonResponse,
    gateway_clients::GatewayClients,
    routes::{PollOrderNowRoute, RunAuditNowRoute},
};

// The fast path answers straight from the database, so no gateway is contacted.
#[actix_web::test]
async fn manual_poll_on_a_settled_order_answers_without_asking_the_gateways() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-4001", "saree-onyx", 5).await;
    let payment = NormalizedPayment {
        order_id: "SR-4001".parse().unwrap(),
        outcome: PaymentOutcome::Paid,
        transaction_id: Some("P-41".to_string()),
    };
    ctx.api.reconcile(Settlement::new(Gateway::PhonePe, payment)).await.unwrap();
    let clients = GatewayClients::new(&ctx.config).unwrap();
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(clients))
        .service(web::scope("/api").service(PollOrderNowRoute::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri("/api/orders/SR-4001/poll").to_request();
    let res: JsonResponse = test::call_and_read_body_json(&service, req).await;
    assert!(res.success, "{}", res.message);
    let order = ctx.api.fetch_order(&"SR-4001".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Paid);
}

#[actix_web::test]
async fn manual_poll_on_an_unknown_order_is_a_404() {
    let ctx = new_test_context().await;
    let clients = GatewayClients::new(&ctx.config).unwrap();
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(clients))
        .service(web::scope("/api").service(PollOrderNowRoute::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::post().uri("/api/orders/NO-SUCH-ORDER/poll").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn manual_audit_sweep_reports_how_many_orders_settled() {
    let ctx = new_test_context().await;
    let clients = GatewayClients::new(&ctx.config).unwrap();
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(clients))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(web::scope("/api").service(RunAuditNowRoute::new()));
    let service = test::init_service(app).await;
    // nothing is pending, so the sweep has nothing to ask the gateways about
    let req = TestRequest::post().uri("/api/audit").to_request();
    let res: JsonResponse = test::call_and_read_body_json(&service, req).await;
    assert!(res.success, "{}", res.message);
    assert_eq!(res.message, "Audit sweep settled 0 order(s).");
}
