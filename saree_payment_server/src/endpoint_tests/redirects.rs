use actix_web::{
    http::{header, StatusCode},
    test,
    test::TestRequest,
    web,
    App,
};
use saree_payment_engine::{db_types::PaymentStatusType, traits::InventoryManagement, SqliteDatabase};
use serde_json::json;

use super::helpers::new_test_context;
use crate::redirect_routes::{payment_redirect_get, payment_redirect_post, FAILURE_PAGE, SUCCESS_PAGE};

fn redirect_app(
    ctx: &super::helpers::TestContext,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .app_data(web::Data::new(ctx.config.clone()))
        .service(
            web::resource(SUCCESS_PAGE)
                .route(web::get().to(payment_redirect_get::<SqliteDatabase>))
                .route(web::post().to(payment_redirect_post::<SqliteDatabase>)),
        )
        .service(
            web::resource(FAILURE_PAGE)
                .route(web::get().to(payment_redirect_get::<SqliteDatabase>))
                .route(web::post().to(payment_redirect_post::<SqliteDatabase>)),
        )
}

fn location(res: &actix_web::dev::ServiceResponse) -> String {
    res.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or_default().to_string()
}

#[actix_web::test]
async fn get_callback_settles_the_order_and_forwards_the_shopper() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-2001", "saree-ivory", 5).await;
    let service = test::init_service(redirect_app(&ctx)).await;
    let req = TestRequest::get()
        .uri("/payment-success?merchantOrderId=SR-2001&state=COMPLETED&transactionId=P-9")
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        location(&res),
        "http://localhost:5173/payment-success?merchantOrderId=SR-2001&state=COMPLETED&transactionId=P-9"
    );
    assert_eq!(res.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");
    let order = ctx.api.fetch_order(&"SR-2001".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Paid);
    assert_eq!(ctx.db.db.stock_level("saree-ivory").await.unwrap(), Some(3));
}

#[actix_web::test]
async fn posted_form_callback_is_reconciled() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-2002", "saree-rust", 2).await;
    let service = test::init_service(redirect_app(&ctx)).await;
    let req = TestRequest::post()
        .uri("/payment-failure")
        .set_form([("txnid", "SR-2002_1712000000"), ("udf2", "SR-2002"), ("status", "failure")])
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(
        location(&res),
        "http://localhost:5173/payment-failure?status=failure&txnid=SR-2002_1712000000&udf2=SR-2002"
    );
    let order = ctx.api.fetch_order(&"SR-2002".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Failed);
    assert_eq!(ctx.db.db.stock_level("saree-rust").await.unwrap(), Some(2));
}

#[actix_web::test]
async fn posted_json_callback_is_reconciled() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-2003", "saree-teal", 5).await;
    let service = test::init_service(redirect_app(&ctx)).await;
    let req = TestRequest::post()
        .uri("/payment-success")
        .set_json(json!({ "reference_id": "SR-2003", "status": "captured", "payment_id": "Z-3" }))
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let order = ctx.api.fetch_order(&"SR-2003".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Paid);
}

// The gateway's own field names and values ride through to the result page untouched; the
// canonical outcome stays a server-side concern.
#[actix_web::test]
async fn callback_fields_are_forwarded_verbatim() {
    let ctx = new_test_context().await;
    ctx.seed_order("X1", "saree-sand", 4).await;
    let service = test::init_service(redirect_app(&ctx)).await;
    let req = TestRequest::post()
        .uri("/payment-success")
        .set_json(json!({ "orderId": "X1", "status": "success", "txnid": "T1" }))
        .to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "http://localhost:5173/payment-success?orderId=X1&status=success&txnid=T1");
    let order = ctx.api.fetch_order(&"X1".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Paid);
}

// The shopper must land somewhere even when the callback made no sense.
#[actix_web::test]
async fn unparseable_callback_forwards_to_the_failure_page_without_parameters() {
    let ctx = new_test_context().await;
    let service = test::init_service(redirect_app(&ctx)).await;
    let req = TestRequest::get().uri("/payment-success?foo=bar").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(location(&res), "http://localhost:5173/payment-failure");
    assert_eq!(res.headers().get(header::CACHE_CONTROL).unwrap(), "no-cache");
}

// A pending report on the callback never settles anything; the poller does that later.
#[actix_web::test]
async fn pending_callback_leaves_the_order_untouched() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-2004", "saree-plum", 5).await;
    let service = test::init_service(redirect_app(&ctx)).await;
    let req =
        TestRequest::get().uri("/payment-success?merchantOrderId=SR-2004&state=PENDING").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::FOUND);
    let order = ctx.api.fetch_order(&"SR-2004".parse().unwrap()).await.unwrap().unwrap();
    assert_eq!(order.payment_status, PaymentStatusType::Pending);
    assert_eq!(ctx.db.db.stock_level("saree-plum").await.unwrap(), Some(5));
}
