//! Create-transaction pipeline for the payment-plugin shell.
//!
//! Normalizes the inbound order, runs the ordered validation checks,
//! encodes the redirect context onto the success URL and resolves the
//! gateway redirect. Validation refusals are returned as values, never
//! raised; the plugin shell branches on the decline code.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use url::Url;
use utoipa::ToSchema;

use crate::{
    config::GatewayConfig,
    errors::{Decline, DeclineCode, ServiceError},
    events::{Event, EventSender},
    services::{
        gateway::{CheckoutUrlIssuer, GatewayUrlBuilder, PaymentRequest},
        normalize::{self, RawAmount},
        redirect::{RedirectContext, RedirectItem},
    },
};

const SHORT_ID_LEN: usize = 5;

/// Loosely-typed order as the platform's commerce subsystem hands it over.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderPayload {
    pub id: Option<String>,
    pub total_amount: Option<RawAmount>,
    pub lang: Option<String>,
    pub description: Option<OrderDescription>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct OrderDescription {
    pub total_amount: Option<RawAmount>,
    pub text: Option<String>,
    pub title: Option<String>,
    pub items: Vec<RawLineItem>,
    pub buyer_info: Option<BuyerInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BuyerInfo {
    pub buyer_language: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RawLineItem {
    pub id: Option<String>,
    pub name: Option<String>,
    pub price: Option<RawAmount>,
    pub quantity: Option<u32>,
    pub description: Option<String>,
}

/// Inbound create-transaction call from the plugin shell.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[serde(default)]
    pub external_transaction_id: Option<String>,
    pub order: OrderPayload,
    #[serde(default)]
    pub merchant_credentials: Option<serde_json::Value>,
}

/// Result of a create-transaction call: either the redirect the buyer is
/// sent to, or a structured refusal.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(untagged)]
pub enum TransactionOutcome {
    #[serde(rename_all = "camelCase")]
    Redirect {
        plugin_transaction_id: String,
        redirect_url: String,
    },
    Declined(Decline),
}

/// Acknowledge-only refund result; refunds are settled directly with the
/// gateway's back office.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RefundOutcome {
    pub success: bool,
}

/// Provider display/credential configuration for the plugin shell.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub title: String,
    pub payment_methods: Vec<String>,
    pub credentials_fields: Vec<CredentialsField>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsField {
    pub name: String,
    pub label: String,
}

pub struct CheckoutService {
    gateway: GatewayConfig,
    issuer: Option<Arc<dyn CheckoutUrlIssuer>>,
    event_sender: EventSender,
}

impl CheckoutService {
    pub fn new(
        gateway: GatewayConfig,
        issuer: Option<Arc<dyn CheckoutUrlIssuer>>,
        event_sender: EventSender,
    ) -> Self {
        Self {
            gateway,
            issuer,
            event_sender,
        }
    }

    /// Build the gateway redirect for one checkout attempt.
    #[instrument(skip(self, request))]
    pub async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> Result<TransactionOutcome, ServiceError> {
        self.event_sender
            .send(Event::CheckoutRequested {
                external_transaction_id: request.external_transaction_id.clone(),
                order_id: request.order.id.clone(),
            })
            .await;

        match self.build_redirect(&request).await {
            Ok((short_id, redirect_url, via_fallback)) => {
                self.event_sender
                    .send(Event::RedirectIssued {
                        short_id: short_id.clone(),
                        order_id: request.order.id.clone().unwrap_or_default(),
                        via_fallback,
                    })
                    .await;
                Ok(TransactionOutcome::Redirect {
                    plugin_transaction_id: short_id,
                    redirect_url,
                })
            }
            Err(decline) => {
                self.event_sender
                    .send(Event::TransactionDeclined {
                        code: decline.code.as_ref().to_string(),
                        message: decline.message.clone(),
                    })
                    .await;
                Ok(TransactionOutcome::Declined(decline))
            }
        }
    }

    async fn build_redirect(
        &self,
        request: &CreateTransactionRequest,
    ) -> Result<(String, String, bool), Decline> {
        let order = &request.order;

        let raw_total = order
            .total_amount
            .as_ref()
            .or(order.description.as_ref().and_then(|d| d.total_amount.as_ref()));
        let amount = normalize::normalize_amount(raw_total);
        let short_id =
            normalize::short_transaction_id(request.external_transaction_id.as_deref());
        let description = normalize::sanitize_description(&normalize::build_description(order));
        let lang = normalize::buyer_language(order);

        let context = RedirectContext {
            transaction_id: short_id.clone(),
            order_id: order.id.clone().unwrap_or_default(),
            event_id: None,
            items: order
                .description
                .as_ref()
                .map(|d| d.items.iter().map(redirect_item).collect())
                .unwrap_or_default(),
        };
        let success_url = context.append_to(&self.gateway.success_url)?;
        let cancel_url = self.gateway.cancel_url.clone();
        let error_url = self.gateway.error_url.clone();

        validate_transaction(
            request.external_transaction_id.as_deref(),
            &short_id,
            &description,
            amount.as_deref(),
            [&success_url, &cancel_url, &error_url],
        )?;
        let amount = amount
            .ok_or_else(|| Decline::new(DeclineCode::AmountInvalid, "Amount is not valid"))?;

        let payment_request = PaymentRequest {
            order_id: short_id.clone(),
            amount,
            description,
            lang,
            success_url,
            cancel_url,
            error_url,
            selected_method: self.gateway.selected_method.clone(),
            iframe: self.gateway.iframe.to_string(),
            accounts: self.gateway.accounts.clone(),
        };

        let builder = GatewayUrlBuilder::new(&self.gateway);
        let (redirect_url, via_fallback) = builder
            .build(self.issuer.as_deref(), &payment_request)
            .await?;

        info!(short_id = %short_id, via_fallback, "gateway redirect resolved");
        Ok((short_id, redirect_url, via_fallback))
    }

    /// Acknowledge a refund request.
    #[instrument(skip(self))]
    pub async fn refund_transaction(
        &self,
        external_transaction_id: String,
    ) -> Result<RefundOutcome, ServiceError> {
        self.event_sender
            .send(Event::RefundAcknowledged {
                external_transaction_id,
            })
            .await;
        Ok(RefundOutcome { success: true })
    }

    /// Provider configuration shown by the plugin shell; the offered
    /// payment methods mirror the configured account routing tokens.
    pub fn provider_config(&self) -> ProviderConfig {
        let payment_methods = self
            .gateway
            .accounts
            .split(';')
            .filter_map(|pair| pair.split('|').next())
            .filter(|method| !method.is_empty())
            .map(str::to_string)
            .collect();

        ProviderConfig {
            title: "Hosted Gateway Payments".to_string(),
            payment_methods,
            credentials_fields: vec![CredentialsField {
                name: "gatewayKey".to_string(),
                label: "API key for the hosted gateway".to_string(),
            }],
        }
    }
}

fn redirect_item(item: &RawLineItem) -> RedirectItem {
    RedirectItem {
        item_id: item.id.clone().unwrap_or_default(),
        name: item.name.clone().filter(|s| !s.is_empty()),
        price: item.price.as_ref().map(RawAmount::as_text),
        quantity: item.quantity.map(|q| q.to_string()),
        seat_id: item.description.clone(),
    }
}

/// Ordered, short-circuiting validation; the first failing check wins.
fn validate_transaction(
    external_transaction_id: Option<&str>,
    short_id: &str,
    description: &str,
    amount: Option<&str>,
    redirect_urls: [&str; 3],
) -> Result<(), Decline> {
    if external_transaction_id.map_or(true, str::is_empty) {
        return Err(Decline::new(
            DeclineCode::ValidationError,
            "Transaction ID missing",
        ));
    }
    if short_id.len() != SHORT_ID_LEN || !short_id.chars().all(|c| c.is_ascii_digit()) {
        return Err(Decline::new(
            DeclineCode::IdInvalid,
            "Transaction ID must be a 5-digit number",
        ));
    }
    if description.chars().count() > 20 {
        return Err(Decline::new(
            DeclineCode::DescriptionInvalid,
            "Description exceeds 20 characters",
        ));
    }
    if !description
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
    {
        return Err(Decline::new(
            DeclineCode::DescriptionInvalid,
            "Description contains special characters",
        ));
    }
    if amount.is_none() {
        return Err(Decline::new(DeclineCode::AmountInvalid, "Amount is not valid"));
    }
    let all_https = redirect_urls.iter().all(|raw| {
        !raw.is_empty()
            && matches!(Url::parse(raw), Ok(parsed) if parsed.scheme() == "https")
    });
    if !all_https {
        return Err(Decline::new(DeclineCode::UrlInvalid, "Redirect URL invalid"));
    }
    Ok(())
}
