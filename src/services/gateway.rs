//! Hosted-gateway URL construction.
//!
//! The primary path asks an external checkout-URL issuer for the redirect;
//! when that collaborator is unavailable or returns something unusable,
//! the URL is hand-constructed against the gateway's query contract.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};
use url::Url;

use crate::{
    config::GatewayConfig,
    errors::{Decline, DeclineCode, ServiceError},
};

/// Payload handed to the checkout-URL issuer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// The 5-digit gateway transaction id
    pub order_id: String,
    pub amount: String,
    pub description: String,
    pub lang: String,
    pub success_url: String,
    pub cancel_url: String,
    pub error_url: String,
    pub selected_method: String,
    pub iframe: String,
    pub accounts: String,
}

/// External collaborator that can mint a checkout URL.
#[async_trait]
pub trait CheckoutUrlIssuer: Send + Sync {
    async fn create_checkout(&self, request: &PaymentRequest)
        -> Result<serde_json::Value, ServiceError>;
}

/// HTTP-backed issuer.
pub struct HttpCheckoutIssuer {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpCheckoutIssuer {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl CheckoutUrlIssuer for HttpCheckoutIssuer {
    async fn create_checkout(
        &self,
        request: &PaymentRequest,
    ) -> Result<serde_json::Value, ServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?
            .error_for_status()
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))?;

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ServiceError::ExternalApiError(e.to_string()))
    }
}

/// Extract a usable redirect URL from whatever the issuer returned: a bare
/// string starting with `http`, or an object carrying a `url` string.
pub fn usable_issued_url(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if s.starts_with("http") => Some(s.clone()),
        serde_json::Value::Object(map) => match map.get("url") {
            Some(serde_json::Value::String(s)) if s.starts_with("http") => Some(s.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// `YYYYMMDD` of December 31 of next calendar year, UTC.
pub fn gateway_expiry_stamp() -> String {
    format!("{}1231", Utc::now().year() + 1)
}

/// Builds the redirect URL for one transaction.
pub struct GatewayUrlBuilder<'a> {
    config: &'a GatewayConfig,
}

impl<'a> GatewayUrlBuilder<'a> {
    pub fn new(config: &'a GatewayConfig) -> Self {
        Self { config }
    }

    /// Resolve the redirect URL: issuer first, hand-built fallback second.
    ///
    /// Returns the URL together with whether the fallback produced it.
    /// A result that does not start with `http` is never returned; that
    /// case is the `REDIRECT_URL_INVALID` decline.
    #[instrument(skip(self, issuer, request))]
    pub async fn build(
        &self,
        issuer: Option<&dyn CheckoutUrlIssuer>,
        request: &PaymentRequest,
    ) -> Result<(String, bool), Decline> {
        if let Some(issuer) = issuer {
            match issuer.create_checkout(request).await {
                Ok(value) => {
                    if let Some(url) = usable_issued_url(&value) {
                        info!(order_id = %request.order_id, "issuer provided checkout URL");
                        return Ok((url, false));
                    }
                    warn!(order_id = %request.order_id, "issuer returned unusable value, falling back");
                }
                Err(e) => {
                    warn!(order_id = %request.order_id, error = %e, "checkout issuer failed, falling back");
                }
            }
        }

        let url = self.fallback_url(request)?;
        if !url.starts_with("http") {
            return Err(Decline::new(
                DeclineCode::RedirectUrlInvalid,
                "redirect URL must be an http(s) URL",
            ));
        }
        Ok((url, true))
    }

    /// Hand-construct the gateway URL with the full query contract.
    fn fallback_url(&self, request: &PaymentRequest) -> Result<String, Decline> {
        let mut url = Url::parse(&self.config.base_url).map_err(|_| {
            Decline::new(
                DeclineCode::RedirectUrlInvalid,
                "gateway base URL is not a valid URL",
            )
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("token", &self.config.gateway_key)
                .append_pair("id", &request.order_id)
                .append_pair("amount", &request.amount)
                .append_pair("description", &request.description)
                .append_pair("expire", &gateway_expiry_stamp())
                .append_pair("lang", &request.lang)
                .append_pair("success_url", &request.success_url)
                .append_pair("cancel_url", &request.cancel_url)
                .append_pair("error_url", &request.error_url)
                .append_pair("selected_method", &request.selected_method)
                .append_pair("iframe", &request.iframe);
            if !request.accounts.is_empty() {
                pairs.append_pair("accounts", &request.accounts);
            }
        }

        Ok(url.to_string())
    }
}
