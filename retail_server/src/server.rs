use std::time::Duration;

use actix_web::{dev::Server, error::InternalError, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::{info, warn};
use retail_engine::{events::EventProducers, CartApi, OrderFlowApi, PaymentReconciliationApi, SqliteDatabase};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::AdminKeyMiddlewareFactory,
    notifications::create_notification_handlers,
    routes::{
        health,
        AddCartItemRoute,
        AttachPaymentIntentRoute,
        CancelOrderRoute,
        CreateOrderRoute,
        EmptyCartRoute,
        GetCartRoute,
        MyOrderByIdRoute,
        MyOrdersRoute,
        PaymentWebhookRoute,
        RemoveCartItemRoute,
        SetOrderStatusRoute,
        UpdateCartItemRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.db_max_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    } else {
        warn!("🪛️ Database migrations are disabled. Make sure the schema is up to date.");
    }
    let handlers = create_notification_handlers(config.event_buffer_size);
    let producers = handlers.producers();
    tokio::spawn(handlers.start_handlers());
    info!("📬️ Notification handlers started");
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let cart_api = CartApi::new(db.clone());
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payments_api = PaymentReconciliationApi::new(db.clone(), producers.clone(), config.webhook_secret.clone())
            .with_tolerance(config.webhook_tolerance_secs);
        let api_scope = web::scope("/api")
            .service(GetCartRoute::<SqliteDatabase>::new())
            .service(AddCartItemRoute::<SqliteDatabase>::new())
            .service(UpdateCartItemRoute::<SqliteDatabase>::new())
            .service(RemoveCartItemRoute::<SqliteDatabase>::new())
            .service(EmptyCartRoute::<SqliteDatabase>::new())
            .service(CreateOrderRoute::<SqliteDatabase>::new())
            .service(MyOrdersRoute::<SqliteDatabase>::new())
            .service(MyOrderByIdRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new());
        let admin_scope = web::scope("/admin")
            .wrap(AdminKeyMiddlewareFactory::new(config.admin_api_key.clone()))
            .service(SetOrderStatusRoute::<SqliteDatabase>::new())
            .service(AttachPaymentIntentRoute::<SqliteDatabase>::new());
        let webhook_scope = web::scope("/webhook").service(PaymentWebhookRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("rtl::access_log"))
            .app_data(json_config())
            .app_data(query_config())
            .app_data(web::Data::new(cart_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payments_api))
            .service(health)
            .service(api_scope)
            .service(admin_scope)
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Reports malformed JSON bodies in the same `{"error": ...}` shape as every other error.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let e = ServerError::InvalidRequestBody(err.to_string());
        InternalError::from_response(err, actix_web::ResponseError::error_response(&e)).into()
    })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let e = ServerError::InvalidQuery(err.to_string());
        InternalError::from_response(err, actix_web::ResponseError::error_response(&e)).into()
    })
}
