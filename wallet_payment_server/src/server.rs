use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use wallet_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    PaymentFlowApi,
    SqliteDatabase,
    WalletApi,
    WebhookApi,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::{GatewayClient, StaticRiskPolicy},
    routes::{
        health,
        CreatePaymentRoute,
        GatewayCallbackRoute,
        PaymentStatusRoute,
        WalletBalanceRoute,
        WalletHistoryRoute,
    },
};

pub const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_logging_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    start_expiry_worker(db.clone(), config.pending_timeout, config.sweep_interval);
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let gateway =
        GatewayClient::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let risk = StaticRiskPolicy::from(config.risk);
    let server_key = config.gateway.server_key.clone();
    let flow_config = config.flow.clone();
    let srv = HttpServer::new(move || {
        let flow_api = PaymentFlowApi::new(
            db.clone(),
            db.clone(),
            gateway.clone(),
            risk.clone(),
            flow_config.clone(),
            producers.clone(),
        );
        let webhook_api = WebhookApi::new(db.clone(), server_key.clone(), producers.clone());
        let wallet_api = WalletApi::new(db.clone());
        let api_scope = web::scope("/api")
            .service(CreatePaymentRoute::<SqliteDatabase, SqliteDatabase, GatewayClient, StaticRiskPolicy>::new())
            .service(PaymentStatusRoute::<SqliteDatabase, SqliteDatabase, GatewayClient, StaticRiskPolicy>::new())
            .service(GatewayCallbackRoute::<SqliteDatabase>::new())
            .service(WalletBalanceRoute::<SqliteDatabase>::new())
            .service(WalletHistoryRoute::<SqliteDatabase>::new());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("wps::access_log"))
            .app_data(web::Data::new(flow_api))
            .app_data(web::Data::new(webhook_api))
            .app_data(web::Data::new(wallet_api))
            .service(health)
            .service(api_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// The server's event subscribers just put settlements and risk alerts on the record. Deployments that fan out to
/// notification or review systems register their own hooks here instead.
pub fn create_logging_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_payment_settled(|ev| {
        Box::pin(async move {
            info!(
                "💰️ Payment settled. Order {} credited {} to buyer {}",
                ev.transaction.order_id, ev.credited, ev.transaction.buyer_id
            );
        })
    });
    hooks.on_risk_alert(|ev| {
        Box::pin(async move {
            let outcome = if ev.blocked { "was blocked" } else { "proceeded" };
            warn!(
                "🚨️ Risk alert for order {} (buyer {}, level {}). The payment {outcome}. Alerts: {}",
                ev.order_id,
                ev.buyer_id,
                ev.report.level,
                ev.report.alerts.join("; ")
            );
        })
    });
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}
