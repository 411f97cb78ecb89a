#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    routing::get,
    Router,
};
use chrono::Utc;
use eventpay_api::{
    config::{AppConfig, EventsApiConfig, GatewayConfig},
    errors::ServiceError,
    events::{self, EventSender},
    handlers::AppServices,
    migrator::Migrator,
    models::{audit_entry, ticket},
    services::{
        checkout::CheckoutService,
        events_api::{
            AvailableTicket, ConfirmedOrders, EventsApi, EventSummary, OrderDetails, OrderUpdate,
            Reservation, ReservationRequest,
        },
        gateway::CheckoutUrlIssuer,
        reconcile::ReconcileService,
    },
    AppState,
};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Events-API double with per-call counters so tests can assert which
/// stages of the landing pipeline actually ran.
#[derive(Default)]
pub struct MockEventsApi {
    pub confirm_calls: AtomicUsize,
    pub confirm_fails: AtomicBool,
    pub get_order_calls: AtomicUsize,
    pub order: Mutex<Option<OrderDetails>>,
}

impl MockEventsApi {
    pub fn set_order(&self, order: OrderDetails) {
        *self.order.lock().unwrap() = Some(order);
    }

    pub fn fail_confirm(&self) {
        self.confirm_fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventsApi for MockEventsApi {
    async fn confirm_order(
        &self,
        _event_id: &str,
        order_number: &str,
    ) -> Result<ConfirmedOrders, ServiceError> {
        self.confirm_calls.fetch_add(1, Ordering::SeqCst);
        if self.confirm_fails.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalApiError(format!(
                "confirm failed for {order_number}"
            )));
        }
        Ok(ConfirmedOrders::default())
    }

    async fn get_order(
        &self,
        _event_id: &str,
        order_number: &str,
    ) -> Result<OrderDetails, ServiceError> {
        self.get_order_calls.fetch_add(1, Ordering::SeqCst);
        self.order
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_number} not found")))
    }

    async fn list_orders(&self, _event_id: &str) -> Result<Vec<OrderDetails>, ServiceError> {
        Ok(self.order.lock().unwrap().clone().into_iter().collect())
    }

    async fn update_order(
        &self,
        _event_id: &str,
        order_number: &str,
        _update: &OrderUpdate,
    ) -> Result<OrderDetails, ServiceError> {
        self.order
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_number} not found")))
    }

    async fn update_checkout(
        &self,
        _event_id: &str,
        order_number: &str,
    ) -> Result<OrderDetails, ServiceError> {
        self.order
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_number} not found")))
    }

    async fn create_reservation(
        &self,
        _event_id: &str,
        _request: &ReservationRequest,
    ) -> Result<Reservation, ServiceError> {
        Ok(Reservation {
            id: Uuid::new_v4().to_string(),
            expires: None,
        })
    }

    async fn list_available_tickets(
        &self,
        _event_id: &str,
    ) -> Result<Vec<AvailableTicket>, ServiceError> {
        Ok(vec![])
    }

    async fn query_events(&self) -> Result<Vec<EventSummary>, ServiceError> {
        Ok(vec![])
    }
}

pub fn test_gateway_config() -> GatewayConfig {
    GatewayConfig {
        base_url: "https://gateway.example.com/".to_string(),
        gateway_key: "ABCD-000001".to_string(),
        accounts: "MB|AAA-111111;CCARD|BBB-222222;MBWAY|CCC-333333".to_string(),
        success_url: "https://shop.example.com/thank-you".to_string(),
        cancel_url: "https://shop.example.com/".to_string(),
        error_url: "https://shop.example.com/".to_string(),
        selected_method: "1".to_string(),
        iframe: true,
        issuer_url: None,
        http_timeout_secs: 5,
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        host: "127.0.0.1".to_string(),
        port: 18_080,
        environment: "test".to_string(),
        log_level: "debug".to_string(),
        log_json: false,
        auto_migrate: true,
        gateway: test_gateway_config(),
        events_api: EventsApiConfig {
            base_url: "https://events.example.com".to_string(),
            elevated_token: Some("test-elevated-token".to_string()),
            http_timeout_secs: 5,
        },
    }
}

/// Test harness over an in-memory SQLite database with mock collaborators.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub events_api: Arc<MockEventsApi>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// App without a checkout-URL issuer: every redirect takes the
    /// hand-constructed fallback path.
    pub async fn new() -> Self {
        Self::with_issuer(None).await
    }

    pub async fn with_issuer(issuer: Option<Arc<dyn CheckoutUrlIssuer>>) -> Self {
        let cfg = test_config();

        // One pooled connection: in-memory SQLite is per-connection state.
        let mut opt = ConnectOptions::new(cfg.database_url.clone());
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let pool = Database::connect(opt)
            .await
            .expect("failed to create test database");
        Migrator::up(&pool, None)
            .await
            .expect("failed to run migrations in tests");
        let db = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx, db.clone()));

        let events_api = Arc::new(MockEventsApi::default());
        let checkout = Arc::new(CheckoutService::new(
            cfg.gateway.clone(),
            issuer,
            event_sender.clone(),
        ));
        let reconcile = Arc::new(ReconcileService::new(
            db.clone(),
            events_api.clone(),
            event_sender.clone(),
        ));
        let services = AppServices::new(checkout, reconcile, events_api.clone());

        let state = AppState {
            db,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .route(
                "/health",
                get(eventpay_api::handlers::health::simple_health_check),
            )
            .nest("/api/v1", eventpay_api::handlers::api_routes())
            .with_state(state.clone());

        Self {
            router,
            state,
            events_api,
            _event_task: event_task,
        }
    }

    /// Send a request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Insert a ticket definition the landing flow can resolve.
    pub async fn seed_ticket(&self, id: Uuid, event_id: Uuid, name: &str) -> ticket::Model {
        ticket::ActiveModel {
            id: Set(id),
            event_id: Set(event_id),
            name: Set(name.to_string()),
            price: Set(Some(dec!(35.00))),
            currency: Set(Some("EUR".to_string())),
            seat_info: Set(None),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed ticket for tests")
    }

    /// Audit phases persisted so far, oldest first. Waits briefly for the
    /// audit loop to drain.
    pub async fn audit_phases(&self) -> Vec<String> {
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        audit_entry::Entity::find()
            .all(&*self.state.db)
            .await
            .expect("query audit entries")
            .into_iter()
            .map(|entry| entry.phase)
            .collect()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Read a response body as JSON.
pub async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    serde_json::from_slice(&bytes).expect("response body is JSON")
}
