use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use saree_payment_engine::{
    db_types::{OrderStatusType, PaymentStatusType},
    SqliteDatabase,
};

use super::helpers::new_test_context;
use crate::{data_objects::OrderStatusResult, routes::OrderStatusRoute};

#[actix_web::test]
async fn order_status_reports_the_recorded_state() {
    let ctx = new_test_context().await;
    ctx.seed_order("SR-3001", "saree-onyx", 5).await;
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .service(web::scope("/api").service(OrderStatusRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/api/orders/SR-3001/status").to_request();
    let res: OrderStatusResult = test::call_and_read_body_json(&service, req).await;
    assert_eq!(res.order_id.as_str(), "SR-3001");
    assert_eq!(res.status, OrderStatusType::Pending);
    assert_eq!(res.payment_status, PaymentStatusType::Pending);
    assert!(res.transaction_id.is_none());
}

#[actix_web::test]
async fn unknown_order_status_is_a_404() {
    let ctx = new_test_context().await;
    let app = App::new()
        .app_data(web::Data::new(ctx.api.clone()))
        .service(web::scope("/api").service(OrderStatusRoute::<SqliteDatabase>::new()));
    let service = test::init_service(app).await;
    let req = TestRequest::get().uri("/api/orders/NO-SUCH-ORDER/status").to_request();
    let res = test::call_service(&service, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
