use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "EventPay API",
        version = "0.3.0",
        description = r#"
# EventPay Checkout & Fulfillment API

Checkout glue for an event-ticketing storefront: builds hosted-gateway
redirect URLs, validates and normalizes order fields, and reconciles
paid orders into confirmed, displayable tickets.

## Flows

- **Checkout**: `POST /api/v1/payments/transactions` normalizes the order,
  runs the ordered validation checks and responds with either a redirect
  URL or a structured `{code, message}` decline.
- **Landing**: `GET /api/v1/thank-you` decodes the redirect context,
  re-resolves ticket items, confirms the order with the events subsystem
  and returns the shaped ticket rows.
        "#,
        contact(
            name = "EventPay Support",
            email = "support@eventpay.dev"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Payments", description = "Payment plugin endpoints"),
        (name = "ThankYou", description = "Post-payment landing endpoint"),
        (name = "Events", description = "Event listing and reservations")
    ),
    paths(
        crate::handlers::payments::create_transaction,
        crate::handlers::payments::refund_transaction,
        crate::handlers::payments::provider_config,
        crate::handlers::thank_you::thank_you,
        crate::handlers::events::list_events,
        crate::handlers::events::list_available_tickets,
        crate::handlers::events::create_reservation,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::errors::ErrorResponse,
            crate::errors::Decline,
            crate::errors::DeclineCode,
            crate::handlers::payments::RefundTransactionRequest,
            crate::services::checkout::CreateTransactionRequest,
            crate::services::checkout::OrderPayload,
            crate::services::checkout::OrderDescription,
            crate::services::checkout::BuyerInfo,
            crate::services::checkout::RawLineItem,
            crate::services::checkout::TransactionOutcome,
            crate::services::checkout::RefundOutcome,
            crate::services::checkout::ProviderConfig,
            crate::services::checkout::CredentialsField,
            crate::services::normalize::RawAmount,
            crate::services::reconcile::ThankYouView,
            crate::services::reconcile::DisplayTicket,
            crate::services::events_api::Money,
            crate::services::events_api::EventSummary,
            crate::services::events_api::AvailableTicket,
            crate::services::events_api::Reservation,
            crate::services::events_api::ReservationRequest,
            crate::services::events_api::TicketQuantity,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDocV1::openapi())
}
