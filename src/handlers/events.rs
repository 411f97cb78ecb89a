use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};

use crate::errors::ServiceError;
use crate::services::events_api::{
    AvailableTicket, EventSummary, Reservation, ReservationRequest,
};
use crate::ApiResponse;
use crate::AppState;

/// Scheduled events, newest first
#[utoipa::path(
    get,
    path = "/api/v1/events",
    responses(
        (status = 200, description = "Scheduled events", body = crate::ApiResponse<Vec<EventSummary>>)
    ),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<EventSummary>>>, ServiceError> {
    let events = state.services.events_api.query_events().await?;
    Ok(Json(ApiResponse::success(events)))
}

/// Ticket offers currently on sale for an event
#[utoipa::path(
    get,
    path = "/api/v1/events/:event_id/tickets",
    params(
        ("event_id" = String, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Available tickets", body = crate::ApiResponse<Vec<AvailableTicket>>)
    ),
    tag = "Events"
)]
pub async fn list_available_tickets(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<AvailableTicket>>>, ServiceError> {
    let tickets = state
        .services
        .events_api
        .list_available_tickets(&event_id)
        .await?;
    Ok(Json(ApiResponse::success(tickets)))
}

/// Hold tickets for an event
#[utoipa::path(
    post,
    path = "/api/v1/events/:event_id/reservations",
    params(
        ("event_id" = String, Path, description = "Event ID")
    ),
    request_body = ReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = crate::ApiResponse<Reservation>)
    ),
    tag = "Events"
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
    Json(request): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Reservation>>), ServiceError> {
    let reservation = state
        .services
        .events_api
        .create_reservation(&event_id, &request)
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(reservation))))
}

/// Event listing and reservation routes
pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events))
        .route("/:event_id/tickets", get(list_available_tickets))
        .route("/:event_id/reservations", post(create_reservation))
}
