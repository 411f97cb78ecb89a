use axum::{
    extract::{RawQuery, State},
    routing::get,
    Json, Router,
};

use crate::errors::ServiceError;
use crate::services::{reconcile::ThankYouView, redirect};
use crate::ApiResponse;
use crate::AppState;

/// Reconcile and render a completed checkout
///
/// The gateway sends the buyer back here with the encoded redirect
/// context (`tid`, `oid`, optional `eid` and `items[i][...]` groups).
/// Tickets are returned only after the order is confirmed and fetched;
/// any failure yields a structured error and no rows.
#[utoipa::path(
    get,
    path = "/api/v1/thank-you",
    params(
        ("tid" = String, Query, description = "Short gateway transaction id"),
        ("oid" = String, Query, description = "Order identifier"),
        ("eid" = Option<String>, Query, description = "Event identifier, when known at checkout time")
    ),
    responses(
        (status = 200, description = "Confirmed tickets", body = crate::ApiResponse<ThankYouView>),
        (status = 422, description = "Flow refused", body = crate::errors::Decline),
        (status = 502, description = "Events subsystem failure", body = crate::errors::ErrorResponse)
    ),
    tag = "ThankYou"
)]
pub async fn thank_you(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Result<Json<ApiResponse<ThankYouView>>, ServiceError> {
    let query = redirect::decode_landing_query(raw_query.as_deref().unwrap_or(""));
    let view = state.services.reconcile.landing(query).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// Thank-you landing route
pub fn thank_you_routes() -> Router<AppState> {
    Router::new().route("/thank-you", get(thank_you))
}
