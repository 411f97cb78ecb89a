//! Success-redirect context: what survives the round trip through the
//! hosted gateway and comes back on the thank-you page.
//!
//! The context is carried entirely in the success URL's query string:
//! `tid` (short transaction id), `oid` (order id), optionally `eid`
//! (event id), and one indexed group per line item.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use url::Url;

use crate::errors::{Decline, DeclineCode};

static ITEM_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^items\[(\d+)\]\[(Eid|Ename|Eprice|Equantity|ESeatId)\]$").unwrap());
static CANONICAL_UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// One line item as carried through the redirect.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RedirectItem {
    pub item_id: String,
    pub name: Option<String>,
    pub price: Option<String>,
    pub quantity: Option<String>,
    pub seat_id: Option<String>,
}

/// Context appended to the success URL at checkout time.
#[derive(Debug, Clone, PartialEq)]
pub struct RedirectContext {
    pub transaction_id: String,
    pub order_id: String,
    pub event_id: Option<String>,
    pub items: Vec<RedirectItem>,
}

impl RedirectContext {
    /// Append this context to the configured success-page base URL.
    ///
    /// Absent item fields are omitted for that index, never zero-filled.
    pub fn append_to(&self, base_url: &str) -> Result<String, Decline> {
        let mut url = Url::parse(base_url).map_err(|_| {
            Decline::new(DeclineCode::UrlInvalid, "success URL base is not a valid URL")
        })?;

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("tid", &self.transaction_id);
            pairs.append_pair("oid", &self.order_id);
            if let Some(eid) = &self.event_id {
                pairs.append_pair("eid", eid);
            }
            for (i, item) in self.items.iter().enumerate() {
                if !item.item_id.is_empty() {
                    pairs.append_pair(&format!("items[{i}][Eid]"), &item.item_id);
                }
                if let Some(name) = &item.name {
                    pairs.append_pair(&format!("items[{i}][Ename]"), name);
                }
                if let Some(price) = &item.price {
                    pairs.append_pair(&format!("items[{i}][Eprice]"), price);
                }
                if let Some(quantity) = &item.quantity {
                    pairs.append_pair(&format!("items[{i}][Equantity]"), quantity);
                }
                if let Some(seat_id) = &item.seat_id {
                    pairs.append_pair(&format!("items[{i}][ESeatId]"), seat_id);
                }
            }
        }

        Ok(url.to_string())
    }
}

/// Query parameters as decoded on the thank-you landing page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandingQuery {
    pub transaction_id: Option<String>,
    pub order_id: Option<String>,
    pub event_id: Option<String>,
    /// Items whose identifier is a canonical UUID; others are discarded.
    pub items: Vec<RedirectItem>,
    /// Whether any item group was present before UUID filtering.
    pub had_item_groups: bool,
}

/// Decode a raw query string back into a [`LandingQuery`].
///
/// Item groups are reassembled by index; every group whose `Eid` does not
/// match the canonical UUID form is dropped here, not by the encoder.
pub fn decode_landing_query(raw_query: &str) -> LandingQuery {
    let mut decoded = LandingQuery::default();
    let mut groups: BTreeMap<usize, RedirectItem> = BTreeMap::new();

    for (key, value) in url::form_urlencoded::parse(raw_query.as_bytes()) {
        let value = value.into_owned();
        match key.as_ref() {
            "tid" if !value.is_empty() => decoded.transaction_id = Some(value),
            "oid" if !value.is_empty() => decoded.order_id = Some(value),
            "eid" if !value.is_empty() => decoded.event_id = Some(value),
            other => {
                if let Some(caps) = ITEM_KEY.captures(other) {
                    decoded.had_item_groups = true;
                    let index: usize = caps[1].parse().unwrap_or(usize::MAX);
                    let entry = groups.entry(index).or_insert_with(|| RedirectItem {
                        item_id: String::new(),
                        name: None,
                        price: None,
                        quantity: None,
                        seat_id: None,
                    });
                    match &caps[2] {
                        "Eid" => entry.item_id = value,
                        "Ename" => entry.name = Some(value),
                        "Eprice" => entry.price = Some(value),
                        "Equantity" => entry.quantity = Some(value),
                        "ESeatId" => entry.seat_id = Some(value),
                        _ => {}
                    }
                }
            }
        }
    }

    decoded.items = groups
        .into_values()
        .filter(|item| is_canonical_uuid(&item.item_id))
        .collect();
    decoded
}

/// Canonical hyphenated UUID textual form.
pub fn is_canonical_uuid(value: &str) -> bool {
    CANONICAL_UUID.is_match(value)
}
