//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause
//! the current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don't block
//! execution.

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use saree_payment_engine::{
    db_types::OrderId,
    traits::{InventoryManagement, ReconciliationDatabase},
    ReconciliationApi,
    SqliteDatabase,
};
use spg_common::Gateway;

use crate::{
    audit_worker::{audit_order, run_audit_sweep},
    data_objects::{InitiatePaymentRequest, InitiatePaymentResult, JsonResponse, OrderStatusResult},
    errors::ServerError,
    gateway_clients::GatewayClients,
    poll_worker::spawn_poll_worker,
};

// Actix cannot handle generics in handlers, so routes are implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal) => {
        paste::paste! { pub struct [<$name:camel Route>];}
        paste::paste! {
                impl [<$name:camel Route>] {
                #[allow(clippy::new_without_default)]
                pub fn new() -> Self { Self }
            }
        }
        paste::paste! {
            impl actix_web::dev::HttpServiceFactory for [<$name:camel Route>] {
                fn register(self, config: &mut actix_web::dev::AppService) {
                    let res = actix_web::Resource::new($path)
                        .name(stringify!($name))
                        .guard(actix_web::guard::$method())
                        .to($name);
                    actix_web::dev::HttpServiceFactory::register(res, config);
                }
            }
        }
    };

    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>); }
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//-------------------------------------------   Order status  --------------------------------------------------
route!(order_status => Get "/orders/{order_id}/status" impl ReconciliationDatabase, InventoryManagement);
/// The storefront's own status poll. Read-only; reconciliation never happens here.
pub async fn order_status<B>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: ReconciliationDatabase + InventoryManagement,
{
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ Status request for order [{order_id}]");
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} not found")))?;
    Ok(HttpResponse::Ok().json(OrderStatusResult::from(&order)))
}

//-----------------------------------------   Initiate payment  ------------------------------------------------
route!(initiate_payment => Post "/payments/{gateway}/initiate");
/// Creates the order record (idempotently) and opens a payment attempt at the chosen gateway.
/// A status poll worker is kicked off in the background so that the order settles even if the
/// gateway's webhook and the shopper's redirect both go missing. The spawn pins this handler
/// to the SQLite backend.
pub async fn initiate_payment(
    path: web::Path<String>,
    body: web::Json<InitiatePaymentRequest>,
    api: web::Data<ReconciliationApi<SqliteDatabase>>,
    clients: web::Data<GatewayClients>,
    config: web::Data<crate::config::ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    let gateway: Gateway = path
        .into_inner()
        .parse()
        .map_err(|e: spg_common::UnknownGateway| ServerError::InvalidRequestPath(e.to_string()))?;
    let request = body.into_inner();
    debug!("💻️ Initiating {gateway} payment for order [{}]", request.order_id);
    let order = api.process_new_order(request.to_new_order()).await?;
    let initiate = clients.initiate_request(&request, &config);
    let response = clients.initiate(gateway, &initiate).await?;
    if let Some(txid) = response.transaction_id.as_deref() {
        api.db().record_transaction_id(&order.order_id, txid).await?;
    }
    spawn_poll_worker(
        api.get_ref().clone(),
        clients.get_ref().clone(),
        gateway,
        order.order_id.clone(),
        config.poll_interval,
        config.poll_budget,
    );
    info!("💻️ {gateway} payment initiated for order [{}]", order.order_id);
    Ok(HttpResponse::Ok().json(InitiatePaymentResult {
        order_id: order.order_id,
        gateway,
        payment_url: response.payment_url,
        transaction_id: response.transaction_id,
    }))
}

//---------------------------------------   Manual triggers  ---------------------------------------------------
route!(poll_order_now => Post "/orders/{order_id}/poll");
/// Asks the gateways about the order right now instead of waiting for the poll worker or the
/// next sweep. Useful when support has a shopper on the phone.
pub async fn poll_order_now(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<SqliteDatabase>>,
    clients: web::Data<GatewayClients>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    let order = api
        .fetch_order(&order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} not found")))?;
    if order.payment_status.is_terminal() {
        return Ok(HttpResponse::Ok().json(JsonResponse::success("Order is already settled.")));
    }
    info!("💻️ Manual status poll requested for order [{order_id}]");
    if audit_order(api.get_ref(), clients.get_ref(), &order).await {
        Ok(HttpResponse::Ok().json(JsonResponse::success("Order settled.")))
    } else {
        Ok(HttpResponse::Ok().json(JsonResponse::success("Order is still pending at every gateway.")))
    }
}

route!(run_audit_now => Post "/audit");
/// Runs one audit sweep over the configured lookback window immediately.
pub async fn run_audit_now(
    api: web::Data<ReconciliationApi<SqliteDatabase>>,
    clients: web::Data<GatewayClients>,
    config: web::Data<crate::config::ServerConfig>,
) -> Result<HttpResponse, ServerError> {
    info!("💻️ Manual audit sweep requested");
    let settled = run_audit_sweep(api.get_ref(), clients.get_ref(), config.audit_sweep_lookback).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Audit sweep settled {settled} order(s)."))))
}
