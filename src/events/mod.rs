use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::audit_entry;

/// Flow events emitted by the checkout and landing pipelines.
///
/// Each variant corresponds to one audit `phase`; the processing loop
/// persists the serialized payload as an `audit_entries` row. Business
/// logic only ever talks to [`EventSender`], never to the table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Checkout (create-transaction) phases
    CheckoutRequested {
        external_transaction_id: Option<String>,
        order_id: Option<String>,
    },
    TransactionDeclined {
        code: String,
        message: String,
    },
    RedirectIssued {
        short_id: String,
        order_id: String,
        via_fallback: bool,
    },
    RefundAcknowledged {
        external_transaction_id: String,
    },

    // Landing (thank-you) phases
    LandingStarted,
    LandingQueryParsed {
        tid: String,
        oid: String,
        eid: Option<String>,
        item_count: usize,
    },
    TicketsResolved {
        requested: usize,
        resolved: usize,
    },
    OrderConfirmed {
        event_id: String,
        order_number: String,
    },
    ConfirmOrderFailed {
        event_id: String,
        order_number: String,
        error: String,
    },
    OrderFetched {
        order_number: String,
        ticket_count: usize,
    },
    TicketsBound {
        count: usize,
    },
    LandingFailed {
        phase: String,
        error: String,
    },
}

impl Event {
    /// Audit-log phase tag for this event.
    pub fn phase(&self) -> &'static str {
        match self {
            Event::CheckoutRequested { .. } => "checkout_requested",
            Event::TransactionDeclined { .. } => "transaction_declined",
            Event::RedirectIssued { .. } => "redirect_issued",
            Event::RefundAcknowledged { .. } => "refund_acknowledged",
            Event::LandingStarted => "landing_started",
            Event::LandingQueryParsed { .. } => "landing_query_parsed",
            Event::TicketsResolved { .. } => "tickets_resolved",
            Event::OrderConfirmed { .. } => "confirm_order_complete",
            Event::ConfirmOrderFailed { .. } => "confirm_order_error",
            Event::OrderFetched { .. } => "get_order_complete",
            Event::TicketsBound { .. } => "tickets_bound",
            Event::LandingFailed { .. } => "landing_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event to the audit loop. Failure to enqueue is logged and
    /// swallowed; the audit trail must never take a flow down with it.
    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!(error = %e, "failed to enqueue audit event");
        }
    }
}

/// Consume events and persist each one as an audit row.
///
/// Insert failures are logged and skipped; the loop runs until every
/// sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, db: Arc<DatabaseConnection>) {
    info!("starting audit event loop");

    while let Some(event) = rx.recv().await {
        let phase = event.phase();
        let data = match serde_json::to_value(&event) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(phase, error = %e, "failed to serialize audit event");
                None
            }
        };

        let entry = audit_entry::ActiveModel {
            id: Set(Uuid::new_v4()),
            phase: Set(phase.to_string()),
            data: Set(data),
            created_at: Set(Utc::now()),
        };

        if let Err(e) = entry.insert(&*db).await {
            error!(phase, error = %e, "failed to persist audit entry");
        }
    }

    info!("audit event loop stopped");
}
