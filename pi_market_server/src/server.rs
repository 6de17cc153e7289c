use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer, Scope};
use log::*;
use pi_market_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    traits::{ChainVerifier, LedgerStore, PaymentPlatform},
    CheckoutApi,
    ReconciliationApi,
    SqliteDatabase,
};
use pi_platform_tools::{HorizonClient, PiPlatformClient};

use crate::{
    config::{ProxyConfig, ServerConfig},
    errors::ServerError,
    helpers::WebhookValidator,
    routes::{approve_payment, cancel_payment, checkout, complete_payment, health, incomplete_payment},
};

const EVENT_BUFFER_SIZE: usize = 25;
const DB_POOL_SIZE: u32 = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, DB_POOL_SIZE)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let platform =
        PiPlatformClient::new(config.platform.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let chain = HorizonClient::new(config.chain_timeout).map_err(|e| ServerError::InitializeError(e.to_string()))?;

    let mut hooks = EventHooks::default();
    hooks.on_order_paid(|event| {
        Box::pin(async move {
            info!("📦️ Order {} ({}) is paid and ready for fulfilment", event.order.id, event.order.total_price);
        })
    });
    hooks.on_order_annulled(|event| {
        Box::pin(async move {
            info!("📦️ Order {} left the flow with status {}", event.order.id, event.status);
        })
    });
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let srv = create_server_instance(config, db, platform, chain, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance<B, P, C>(
    config: ServerConfig,
    db: B,
    platform: P,
    chain: C,
    producers: EventProducers,
) -> Result<Server, ServerError>
where
    B: LedgerStore + Send + Sync + 'static,
    P: PaymentPlatform + Send + Sync + 'static,
    C: ChainVerifier + Send + Sync + 'static,
{
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let api = ReconciliationApi::new(db.clone(), platform.clone(), chain.clone(), producers.clone());
        let checkout_api = CheckoutApi::new(db.clone());
        let validator = WebhookValidator::new(config.webhook_secret.clone(), !config.disable_webhook_signature_check);
        let proxy = ProxyConfig::from(&config);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("pmg::access_log"))
            .app_data(web::Data::new(api))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(validator))
            .app_data(web::Data::new(proxy))
            .service(health)
            .service(payment_scope::<B, P, C>())
            .service(web::scope("/cart").route("/checkout", web::post().to(checkout::<B>)))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// The four inbound payment-event routes, grouped so the endpoint tests can mount exactly what production mounts.
pub fn payment_scope<B, P, C>() -> Scope
where
    B: LedgerStore + 'static,
    P: PaymentPlatform + 'static,
    C: ChainVerifier + 'static,
{
    web::scope("/payments")
        .route("/approve", web::post().to(approve_payment::<B, P, C>))
        .route("/complete", web::post().to(complete_payment::<B, P, C>))
        .route("/incomplete", web::post().to(incomplete_payment::<B, P, C>))
        .route("/cancelled_payment", web::post().to(cancel_payment::<B, P, C>))
}
