use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::errors::ServiceError;
use crate::services::checkout::{
    CreateTransactionRequest, ProviderConfig, RefundOutcome, TransactionOutcome,
};
use crate::ApiResponse;
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundTransactionRequest {
    pub external_transaction_id: String,
}

/// Create a gateway transaction for an order
///
/// Returns either the redirect the buyer must be sent to, or a structured
/// `{code, message}` decline the plugin shell branches on.
#[utoipa::path(
    post,
    path = "/api/v1/payments/transactions",
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Redirect created", body = TransactionOutcome),
        (status = 422, description = "Transaction declined", body = crate::errors::Decline),
        (status = 400, description = "Bad request", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_transaction(
    State(state): State<AppState>,
    Json(request): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionOutcome>), ServiceError> {
    let outcome = state.services.checkout.create_transaction(request).await?;

    let status = match &outcome {
        TransactionOutcome::Redirect { .. } => StatusCode::CREATED,
        TransactionOutcome::Declined(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    Ok((status, Json(outcome)))
}

/// Acknowledge a refund request
#[utoipa::path(
    post,
    path = "/api/v1/payments/refunds",
    request_body = RefundTransactionRequest,
    responses(
        (status = 200, description = "Refund acknowledged", body = crate::ApiResponse<RefundOutcome>)
    ),
    tag = "Payments"
)]
pub async fn refund_transaction(
    State(state): State<AppState>,
    Json(request): Json<RefundTransactionRequest>,
) -> Result<Json<ApiResponse<RefundOutcome>>, ServiceError> {
    let outcome = state
        .services
        .checkout
        .refund_transaction(request.external_transaction_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Provider display and credential configuration
#[utoipa::path(
    get,
    path = "/api/v1/payments/provider-config",
    responses(
        (status = 200, description = "Provider configuration", body = crate::ApiResponse<ProviderConfig>)
    ),
    tag = "Payments"
)]
pub async fn provider_config(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ProviderConfig>>, ServiceError> {
    Ok(Json(ApiResponse::success(
        state.services.checkout.provider_config(),
    )))
}

/// Payment plugin routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", post(create_transaction))
        .route("/refunds", post(refund_transaction))
        .route("/provider-config", get(provider_config))
}
