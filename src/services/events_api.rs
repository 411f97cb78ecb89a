//! Events/ticketing subsystem port.
//!
//! The storefront does not own orders or tickets; it confirms and reads
//! them through this API. Privileged operations (confirm, get, list,
//! update) run with an elevated bearer token relative to the anonymous
//! storefront caller.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use utoipa::ToSchema;

use crate::errors::ServiceError;

/// Money as the events API reports it; the amount is a display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Money {
    pub currency: Option<String>,
    pub amount: Option<String>,
}

/// One issued ticket inside an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTicket {
    pub ticket_number: Option<String>,
    pub name: Option<String>,
    pub price: Option<Money>,
    pub ticket_pdf_url: Option<String>,
}

/// Order details as returned by the events API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_number: Option<String>,
    pub event_id: Option<String>,
    pub status: Option<String>,
    #[serde(default)]
    pub tickets_quantity: Option<u32>,
    #[serde(default)]
    pub tickets: Vec<OrderTicket>,
}

/// Response of a confirm-order call: the confirmed orders, each with its
/// tickets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ConfirmedOrders {
    #[serde(default)]
    pub orders: Vec<OrderDetails>,
}

/// A scheduled event, as listed on the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// An available (purchasable) ticket offer for an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableTicket {
    pub id: String,
    pub name: Option<String>,
    pub price: Option<Money>,
    #[serde(default)]
    pub limit_per_checkout: Option<u32>,
}

/// A held reservation for tickets of one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    pub id: String,
    #[serde(default)]
    pub expires: Option<chrono::DateTime<chrono::Utc>>,
}

/// Ticket counts requested when creating a reservation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationRequest {
    pub ticket_quantities: Vec<TicketQuantity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TicketQuantity {
    pub ticket_definition_id: String,
    pub quantity: u32,
}

/// Fields to patch on an existing order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived: Option<bool>,
}

/// The events/ticketing subsystem as the storefront sees it.
#[async_trait]
pub trait EventsApi: Send + Sync {
    /// Confirm a paid order. Elevated call.
    async fn confirm_order(
        &self,
        event_id: &str,
        order_number: &str,
    ) -> Result<ConfirmedOrders, ServiceError>;

    /// Fetch one order with its tickets. Elevated call.
    async fn get_order(
        &self,
        event_id: &str,
        order_number: &str,
    ) -> Result<OrderDetails, ServiceError>;

    /// List orders of an event. Elevated call.
    async fn list_orders(&self, event_id: &str) -> Result<Vec<OrderDetails>, ServiceError>;

    /// Patch an order. Elevated call.
    async fn update_order(
        &self,
        event_id: &str,
        order_number: &str,
        update: &OrderUpdate,
    ) -> Result<OrderDetails, ServiceError>;

    /// Re-open a checkout for an order.
    async fn update_checkout(
        &self,
        event_id: &str,
        order_number: &str,
    ) -> Result<OrderDetails, ServiceError>;

    /// Hold tickets for an event.
    async fn create_reservation(
        &self,
        event_id: &str,
        request: &ReservationRequest,
    ) -> Result<Reservation, ServiceError>;

    /// Ticket offers currently on sale for an event.
    async fn list_available_tickets(
        &self,
        event_id: &str,
    ) -> Result<Vec<AvailableTicket>, ServiceError>;

    /// Scheduled events, newest first.
    async fn query_events(&self) -> Result<Vec<EventSummary>, ServiceError>;
}

/// HTTP client for the events API.
pub struct HttpEventsClient {
    client: reqwest::Client,
    base_url: String,
    elevated_token: Option<String>,
}

impl HttpEventsClient {
    pub fn new(
        base_url: String,
        elevated_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            elevated_token,
        })
    }

    fn elevated(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.elevated_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ServiceError> {
        response
            .error_for_status()
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?
            .json::<T>()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))
    }
}

#[async_trait]
impl EventsApi for HttpEventsClient {
    async fn confirm_order(
        &self,
        event_id: &str,
        order_number: &str,
    ) -> Result<ConfirmedOrders, ServiceError> {
        let url = format!("{}/events/{}/orders/confirm", self.base_url, event_id);
        let body = serde_json::json!({ "orderNumber": [order_number] });
        let response = self
            .elevated(self.client.post(&url).json(&body))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn get_order(
        &self,
        event_id: &str,
        order_number: &str,
    ) -> Result<OrderDetails, ServiceError> {
        let url = format!(
            "{}/events/{}/orders/{}",
            self.base_url, event_id, order_number
        );
        let response = self
            .elevated(
                self.client
                    .get(&url)
                    .query(&[("fieldset", "TICKETS"), ("fieldset", "DETAILS")]),
            )
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn list_orders(&self, event_id: &str) -> Result<Vec<OrderDetails>, ServiceError> {
        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            orders: Vec<OrderDetails>,
        }

        let url = format!("{}/events/{}/orders", self.base_url, event_id);
        let response = self
            .elevated(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;
        let listing: Listing = Self::read_json(response).await?;
        Ok(listing.orders)
    }

    async fn update_order(
        &self,
        event_id: &str,
        order_number: &str,
        update: &OrderUpdate,
    ) -> Result<OrderDetails, ServiceError> {
        let url = format!(
            "{}/events/{}/orders/{}",
            self.base_url, event_id, order_number
        );
        let response = self
            .elevated(self.client.patch(&url).json(update))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn update_checkout(
        &self,
        event_id: &str,
        order_number: &str,
    ) -> Result<OrderDetails, ServiceError> {
        let url = format!(
            "{}/events/{}/orders/{}/checkout",
            self.base_url, event_id, order_number
        );
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn create_reservation(
        &self,
        event_id: &str,
        request: &ReservationRequest,
    ) -> Result<Reservation, ServiceError> {
        let url = format!("{}/events/{}/reservations", self.base_url, event_id);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn list_available_tickets(
        &self,
        event_id: &str,
    ) -> Result<Vec<AvailableTicket>, ServiceError> {
        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            tickets: Vec<AvailableTicket>,
        }

        let url = format!("{}/events/{}/tickets", self.base_url, event_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;
        let listing: Listing = Self::read_json(response).await?;
        Ok(listing.tickets)
    }

    async fn query_events(&self) -> Result<Vec<EventSummary>, ServiceError> {
        #[derive(Deserialize)]
        struct Listing {
            #[serde(default)]
            events: Vec<EventSummary>,
        }

        let url = format!("{}/events", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("status", "SCHEDULED"), ("sort", "createdDate:desc")])
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;
        let listing: Listing = Self::read_json(response).await?;
        Ok(listing.events)
    }
}
