use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// ISO 8601 timestamp when the error occurred
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error: &str, message: String, details: Option<String>) -> Self {
        Self {
            error: error.to_string(),
            message,
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// Machine-readable reason a checkout or landing flow was refused.
///
/// These are part of the plugin-shell contract: the caller branches on the
/// code, so the wire form is stable SCREAMING_SNAKE_CASE.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum::AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DeclineCode {
    ValidationError,
    IdInvalid,
    DescriptionInvalid,
    AmountInvalid,
    UrlInvalid,
    NoValidItems,
    NoValidTickets,
    MultipleEvents,
    RedirectUrlInvalid,
}

/// A structured refusal: returned as a value on the create-transaction path
/// and as the terminal error of the landing flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema, thiserror::Error)]
#[error("{}: {message}", .code.as_ref())]
pub struct Decline {
    pub code: DeclineCode,
    pub message: String,
}

impl Decline {
    pub fn new(code: DeclineCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Infrastructure/collaborator error tier.
///
/// Validation refusals travel as [`Decline`] values; everything that can
/// genuinely fail (database, events API, gateway issuer) lands here.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Declined(#[from] Decline),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(errors.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        // Declines keep the {code, message} wire shape the plugin shell
        // branches on; everything else maps to the common error body.
        let (status, error, message) = match self {
            ServiceError::Declined(decline) => {
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(decline)).into_response();
            }
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, "Not Found", msg),
            ServiceError::ValidationError(msg) | ServiceError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, "Bad Request", msg)
            }
            ServiceError::ExternalApiError(msg) => {
                (StatusCode::BAD_GATEWAY, "Bad Gateway", msg)
            }
            ServiceError::DatabaseError(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                err.to_string(),
            ),
            ServiceError::EventError(msg)
            | ServiceError::SerializationError(msg)
            | ServiceError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", msg)
            }
        };

        let body = ErrorResponse::new(error, message, None);
        (status, Json(body)).into_response()
    }
}
