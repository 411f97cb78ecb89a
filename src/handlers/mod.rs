use axum::Router;
use std::sync::Arc;

use crate::services::{
    checkout::CheckoutService, events_api::EventsApi, reconcile::ReconcileService,
};
use crate::AppState;

pub mod events;
pub mod health;
pub mod payments;
pub mod thank_you;

/// Services shared by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub checkout: Arc<CheckoutService>,
    pub reconcile: Arc<ReconcileService>,
    pub events_api: Arc<dyn EventsApi>,
}

impl AppServices {
    pub fn new(
        checkout: Arc<CheckoutService>,
        reconcile: Arc<ReconcileService>,
        events_api: Arc<dyn EventsApi>,
    ) -> Self {
        Self {
            checkout,
            reconcile,
            events_api,
        }
    }
}

/// All `/api/v1` routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/payments", payments::payment_routes())
        .nest("/events", events::event_routes())
        .merge(thank_you::thank_you_routes())
}
