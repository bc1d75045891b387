use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::info;
use saree_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    ReconciliationApi,
    SqliteDatabase,
};

use crate::{
    audit_worker::start_audit_worker,
    config::ServerConfig,
    errors::ServerError,
    gateway_clients::GatewayClients,
    gateway_routes::GatewayWebhookRoute,
    middleware::HmacMiddlewareFactory,
    redirect_routes::{payment_redirect_get, payment_redirect_post, FAILURE_PAGE, SUCCESS_PAGE},
    routes::{health, InitiatePaymentRoute, OrderStatusRoute, PollOrderNowRoute, RunAuditNowRoute},
};

/// The header webhook signatures arrive in.
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-webhook-signature";

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    run_server_with_hooks(config, EventHooks::default()).await
}

pub async fn run_server_with_hooks(config: ServerConfig, hooks: EventHooks) -> Result<(), ServerError> {
    let db = SqliteDatabase::new(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let clients = GatewayClients::new(&config)?;
    let audit_api = ReconciliationApi::new(db.clone(), producers.clone());
    let _audit = start_audit_worker(
        audit_api,
        clients.clone(),
        config.audit_sweep_interval,
        config.audit_sweep_lookback,
    );
    let srv = create_server_instance(config, db, producers, clients)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    clients: GatewayClients,
) -> Result<Server, ServerError> {
    info!("💻️ Listening on {}:{}", config.host, config.port);
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let api = ReconciliationApi::new(db.clone(), producers.clone());
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(clients.clone()))
            .app_data(web::Data::new(config.clone()));
        let api_scope = web::scope("/api")
            .service(OrderStatusRoute::<SqliteDatabase>::new())
            .service(InitiatePaymentRoute::new())
            .service(PollOrderNowRoute::new())
            .service(RunAuditNowRoute::new());
        // Webhook reports must carry a valid signature; everything else is open.
        let webhook_scope = web::scope("/wh")
            .wrap(HmacMiddlewareFactory::new(
                WEBHOOK_SIGNATURE_HEADER,
                config.webhook_auth.hmac_secret.clone(),
                config.webhook_auth.hmac_checks,
            ))
            .service(GatewayWebhookRoute::<SqliteDatabase>::new());
        app.service(api_scope)
            .service(webhook_scope)
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
            .service(health)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
