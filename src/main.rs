use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::{net::TcpListener, signal, sync::mpsc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use eventpay_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = api::db::establish_connection_from_app_config(&cfg)
        .await
        .context("failed to connect to database")?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool)
            .await
            .context("failed to run migrations")?;
    }
    let db = Arc::new(db_pool);

    // Audit loop: every flow event becomes an audit_entries row.
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx, db.clone()));

    let issuer: Option<Arc<dyn api::services::gateway::CheckoutUrlIssuer>> =
        match &cfg.gateway.issuer_url {
            Some(endpoint) => {
                info!(endpoint = %endpoint, "checkout-URL issuer configured");
                Some(Arc::new(api::services::gateway::HttpCheckoutIssuer::new(
                    endpoint.clone(),
                    Duration::from_secs(cfg.gateway.http_timeout_secs),
                )?))
            }
            None => {
                info!("no checkout-URL issuer configured; gateway URLs are hand-constructed");
                None
            }
        };

    let events_api: Arc<dyn api::services::events_api::EventsApi> =
        Arc::new(api::services::events_api::HttpEventsClient::new(
            cfg.events_api.base_url.clone(),
            cfg.events_api.elevated_token.clone(),
            Duration::from_secs(cfg.events_api.http_timeout_secs),
        )?);

    let checkout = Arc::new(api::services::checkout::CheckoutService::new(
        cfg.gateway.clone(),
        issuer,
        event_sender.clone(),
    ));
    let reconcile = Arc::new(api::services::reconcile::ReconcileService::new(
        db.clone(),
        events_api.clone(),
        event_sender.clone(),
    ));
    let services = api::handlers::AppServices::new(checkout, reconcile, events_api);

    let state = api::AppState {
        db,
        config: cfg.clone(),
        event_sender,
        services,
    };

    let app = Router::new()
        .route("/health", get(api::handlers::health::simple_health_check))
        .nest("/api/v1", api::handlers::api_routes())
        .merge(api::openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = TcpListener::bind(cfg.bind_addr()).await?;
    info!(addr = %cfg.bind_addr(), "eventpay-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("shutdown signal received");
}
