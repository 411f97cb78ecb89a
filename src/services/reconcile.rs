//! Thank-you landing flow: recover the checkout context from the redirect
//! query, confirm the order with the events subsystem and shape the
//! confirmed tickets for display.
//!
//! The pipeline is linear and terminal-on-failure:
//! parse → resolve tickets → verify single event → confirm (non-fatal) →
//! fetch order (fatal) → shape rows. Display rows exist only after a full
//! pass; no partial result is ever returned.

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    errors::{Decline, DeclineCode, ServiceError},
    events::{Event, EventSender},
    models::ticket,
    services::{
        events_api::{EventsApi, Money, OrderTicket},
        redirect::LandingQuery,
    },
};

/// One confirmed ticket, shaped for the thank-you page.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DisplayTicket {
    pub id: String,
    pub ticket_name: String,
    pub ticket_price: String,
    pub pdf_url: String,
}

/// Everything the thank-you page renders.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ThankYouView {
    pub transaction_id: String,
    pub order_number: String,
    pub event_id: String,
    pub tickets: Vec<DisplayTicket>,
}

pub struct ReconcileService {
    db: Arc<DatabaseConnection>,
    events_api: Arc<dyn EventsApi>,
    event_sender: EventSender,
}

impl ReconcileService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        events_api: Arc<dyn EventsApi>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            events_api,
            event_sender,
        }
    }

    /// Run the landing pipeline for one decoded redirect query.
    #[instrument(skip(self, query))]
    pub async fn landing(&self, query: LandingQuery) -> Result<ThankYouView, ServiceError> {
        self.event_sender.send(Event::LandingStarted).await;

        match self.landing_inner(query).await {
            Ok(view) => {
                self.event_sender
                    .send(Event::TicketsBound {
                        count: view.tickets.len(),
                    })
                    .await;
                Ok(view)
            }
            Err((phase, error)) => {
                self.event_sender
                    .send(Event::LandingFailed {
                        phase: phase.to_string(),
                        error: error.to_string(),
                    })
                    .await;
                Err(error)
            }
        }
    }

    async fn landing_inner(
        &self,
        query: LandingQuery,
    ) -> Result<ThankYouView, (&'static str, ServiceError)> {
        let transaction_id = query
            .transaction_id
            .clone()
            .ok_or_else(|| parse_failure("missing transaction identifier in query"))?;
        let order_number = query
            .order_id
            .clone()
            .ok_or_else(|| parse_failure("missing order identifier in query"))?;

        self.event_sender
            .send(Event::LandingQueryParsed {
                tid: transaction_id.clone(),
                oid: order_number.clone(),
                eid: query.event_id.clone(),
                item_count: query.items.len(),
            })
            .await;

        let event_id = self.resolve_event_id(&query).await?;

        // Confirmation failure is tolerated: the page may be re-visited
        // after the order was already confirmed, and the subsequent fetch
        // is the authoritative read.
        match self
            .events_api
            .confirm_order(&event_id, &order_number)
            .await
        {
            Ok(_) => {
                self.event_sender
                    .send(Event::OrderConfirmed {
                        event_id: event_id.clone(),
                        order_number: order_number.clone(),
                    })
                    .await;
            }
            Err(e) => {
                warn!(event_id = %event_id, order_number = %order_number, error = %e,
                    "confirm order failed, proceeding to fetch");
                self.event_sender
                    .send(Event::ConfirmOrderFailed {
                        event_id: event_id.clone(),
                        order_number: order_number.clone(),
                        error: e.to_string(),
                    })
                    .await;
            }
        }

        let order = self
            .events_api
            .get_order(&event_id, &order_number)
            .await
            .map_err(|e| ("fetch_order_details", e))?;

        if order.tickets.is_empty() {
            return Err((
                "fetch_order_details",
                Decline::new(DeclineCode::NoValidTickets, "no tickets found in order").into(),
            ));
        }

        self.event_sender
            .send(Event::OrderFetched {
                order_number: order_number.clone(),
                ticket_count: order.tickets.len(),
            })
            .await;

        let tickets = order.tickets.iter().map(display_ticket).collect();
        Ok(ThankYouView {
            transaction_id,
            order_number,
            event_id,
            tickets,
        })
    }

    /// Resolve the event the order belongs to: from embedded items when the
    /// redirect carried them, otherwise the explicit `eid` parameter.
    async fn resolve_event_id(
        &self,
        query: &LandingQuery,
    ) -> Result<String, (&'static str, ServiceError)> {
        if !query.had_item_groups {
            return query.event_id.clone().ok_or_else(|| {
                parse_failure("missing event identifier in query")
            });
        }

        if query.items.is_empty() {
            return Err((
                "parse_query",
                Decline::new(DeclineCode::NoValidItems, "no valid ticket items in query").into(),
            ));
        }

        let requested: Vec<Uuid> = query
            .items
            .iter()
            .filter_map(|item| Uuid::parse_str(&item.item_id).ok())
            .collect();

        let resolved = ticket::Entity::find()
            .filter(ticket::Column::Id.is_in(requested.clone()))
            .all(&*self.db)
            .await
            .map_err(|e| ("resolve_tickets", ServiceError::from(e)))?;

        for id in &requested {
            if !resolved.iter().any(|t| t.id == *id) {
                warn!(ticket_id = %id, "redirect item has no ticket record, skipping");
            }
        }

        self.event_sender
            .send(Event::TicketsResolved {
                requested: requested.len(),
                resolved: resolved.len(),
            })
            .await;

        if resolved.is_empty() {
            return Err((
                "resolve_tickets",
                Decline::new(DeclineCode::NoValidTickets, "no ticket records resolved").into(),
            ));
        }

        let event_ids: BTreeSet<Uuid> = resolved.iter().map(|t| t.event_id).collect();
        if event_ids.len() > 1 {
            return Err((
                "verify_single_event",
                Decline::new(
                    DeclineCode::MultipleEvents,
                    "order references more than one event",
                )
                .into(),
            ));
        }

        // An explicit eid wins when present; the derived one backs it up.
        let derived = event_ids
            .into_iter()
            .next()
            .map(|id| id.to_string())
            .ok_or_else(|| parse_failure("no event derivable from resolved tickets"))?;
        Ok(query.event_id.clone().unwrap_or(derived))
    }
}

fn parse_failure(message: &str) -> (&'static str, ServiceError) {
    (
        "parse_query",
        Decline::new(DeclineCode::ValidationError, message).into(),
    )
}

fn display_ticket(ticket: &OrderTicket) -> DisplayTicket {
    DisplayTicket {
        id: ticket.ticket_number.clone().unwrap_or_default(),
        ticket_name: ticket
            .name
            .clone()
            .unwrap_or_else(|| "Unknown".to_string()),
        ticket_price: format_price(ticket.price.as_ref()),
        pdf_url: ticket.ticket_pdf_url.clone().unwrap_or_default(),
    }
}

/// `"<currency> <amount>"` when both parts are present, `"N/A"` otherwise.
fn format_price(price: Option<&Money>) -> String {
    match price {
        Some(Money {
            currency: Some(currency),
            amount: Some(amount),
        }) if !currency.is_empty() && !amount.is_empty() => format!("{currency} {amount}"),
        _ => "N/A".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn money(currency: Option<&str>, amount: Option<&str>) -> Money {
        Money {
            currency: currency.map(str::to_string),
            amount: amount.map(str::to_string),
        }
    }

    #[test]
    fn price_formats_currency_and_amount() {
        assert_eq!(
            format_price(Some(&money(Some("EUR"), Some("35.00")))),
            "EUR 35.00"
        );
    }

    #[test]
    fn partial_price_renders_not_available() {
        assert_eq!(format_price(None), "N/A");
        assert_eq!(format_price(Some(&money(Some("EUR"), None))), "N/A");
        assert_eq!(format_price(Some(&money(None, Some("35.00")))), "N/A");
        assert_eq!(format_price(Some(&money(Some(""), Some("35.00")))), "N/A");
    }

    #[test]
    fn display_ticket_defaults_missing_fields() {
        let shaped = display_ticket(&OrderTicket {
            ticket_number: None,
            name: None,
            price: None,
            ticket_pdf_url: None,
        });
        assert_eq!(shaped.id, "");
        assert_eq!(shaped.ticket_name, "Unknown");
        assert_eq!(shaped.ticket_price, "N/A");
        assert_eq!(shaped.pdf_url, "");
    }
}
