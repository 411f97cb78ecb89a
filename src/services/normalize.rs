//! Order field normalization for the gateway contract.
//!
//! The inbound order payload is loosely typed; everything here turns it
//! into the canonical (amount, description, language, short id) tuple the
//! hosted gateway accepts.

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::services::checkout::OrderPayload;

const DESCRIPTION_MAX: usize = 150;
const GATEWAY_DESCRIPTION_MAX: usize = 20;
const SHORT_ID_MODULUS: i64 = 100_000;
pub const DEFAULT_DESCRIPTION: &str = "Order Payment";
pub const DEFAULT_LANGUAGE: &str = "EN";

static ALL_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());
static DECIMAL_FORM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d{1,2}$").unwrap());
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

/// Raw order total as it arrives over the wire: integer minor units,
/// an already-decimal number, or either of those as a string.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum RawAmount {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl RawAmount {
    /// Wire-faithful text form, used both for normalization and when a
    /// raw value is carried through the redirect untouched.
    pub fn as_text(&self) -> String {
        match self {
            RawAmount::Integer(v) => v.to_string(),
            RawAmount::Number(v) => {
                // Render without a spurious trailing ".0" so that whole
                // floats still take the minor-units path.
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    format!("{}", v)
                }
            }
            RawAmount::Text(s) => s.trim().to_string(),
        }
    }
}

/// Derive the canonical two-decimal amount string.
///
/// All-digit input is integer minor units (divided by 100); input with one
/// or two fraction digits is already decimal. Anything else is unusable
/// and the caller must decline with `AMOUNT_INVALID`.
pub fn normalize_amount(raw: Option<&RawAmount>) -> Option<String> {
    let text = raw?.as_text();
    if text.is_empty() {
        return None;
    }

    let decimal = if ALL_DIGITS.is_match(&text) {
        Decimal::from_str(&text).ok()? / Decimal::from(100)
    } else if DECIMAL_FORM.is_match(&text) {
        Decimal::from_str(&text).ok()?
    } else {
        return None;
    };

    let mut rounded = decimal;
    rounded.rescale(2);
    Some(rounded.to_string())
}

/// Derive the human-readable description: explicit text/title first, then
/// joined item names, then the fixed fallback. Truncated to 150 characters.
pub fn build_description(order: &OrderPayload) -> String {
    if let Some(description) = &order.description {
        let explicit = description
            .text
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(description.title.as_deref().filter(|s| !s.is_empty()));
        if let Some(text) = explicit {
            return truncate(text, DESCRIPTION_MAX);
        }

        let joined = description
            .items
            .iter()
            .filter_map(|item| item.name.as_deref())
            .filter(|name| !name.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        let joined = joined.trim();
        if !joined.is_empty() {
            return truncate(joined, DESCRIPTION_MAX);
        }
    }

    DEFAULT_DESCRIPTION.to_string()
}

/// Reduce a description to the form the gateway accepts: no markup, only
/// `[a-zA-Z0-9\s]`, at most 20 characters, trimmed.
pub fn sanitize_description(desc: &str) -> String {
    if desc.is_empty() {
        return DEFAULT_DESCRIPTION.to_string();
    }
    let stripped = HTML_TAG.replace_all(desc, "");
    let clean: String = stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect();
    truncate(&clean, GATEWAY_DESCRIPTION_MAX).trim().to_string()
}

/// Derive the 5-digit transaction identifier the gateway requires.
///
/// Without an external id a random 5-digit number is generated. With one,
/// its digits are parsed (current Unix timestamp when unparseable) and
/// reduced modulo 100000, zero-padded.
pub fn short_transaction_id(external_id: Option<&str>) -> String {
    match external_id.filter(|s| !s.is_empty()) {
        None => {
            let n = rand::thread_rng().gen_range(10_000..100_000);
            n.to_string()
        }
        Some(id) => {
            let digits: String = id.chars().filter(|c| c.is_ascii_digit()).collect();
            let numeric = digits
                .parse::<i64>()
                .unwrap_or_else(|_| Utc::now().timestamp());
            format!("{:05}", numeric.rem_euclid(SHORT_ID_MODULUS))
        }
    }
}

/// Buyer language for the hosted page, defaulting to `EN`, uppercased.
pub fn buyer_language(order: &OrderPayload) -> String {
    order
        .lang
        .as_deref()
        .filter(|s| !s.is_empty())
        .or_else(|| {
            order
                .description
                .as_ref()
                .and_then(|d| d.buyer_info.as_ref())
                .and_then(|b| b.buyer_language.as_deref())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or(DEFAULT_LANGUAGE)
        .to_uppercase()
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
