//! Property listings and the featured-listings selection.
//!
//! DESIGN
//! ======
//! Listings are read-only rows fetched from the backend. The homepage shows a
//! small curated set: up to two featured listings followed by up to two
//! regular ones. Selection is pure and recomputed on every call.
//!
//! ERROR HANDLING
//! ==============
//! [`load_featured`] never fails: a missing source, a fetch error, or an
//! empty table all degrade to an empty list so the page renders its empty
//! state instead of an error.

pub mod http;

pub use http::HttpListingSource;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::ErrorCode;

pub const FEATURED_SLOTS: usize = 2;
pub const REGULAR_SLOTS: usize = 2;
pub const MAX_CURATED: usize = 4;

// =============================================================================
// LISTING RECORD
// =============================================================================

/// A property listing as served by the backend `properties` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingRecord {
    /// Row identifier; numeric ids are normalized to strings.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub price: f64,
    /// Billing period label, e.g. `"night"` or `"month"`.
    #[serde(default)]
    pub price_type: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub reviews: Option<i64>,
    #[serde(default)]
    pub bedrooms: Option<i32>,
    #[serde(default)]
    pub bathrooms: Option<i32>,
    #[serde(default)]
    pub area: Option<f64>,
    #[serde(default)]
    pub image: Option<String>,
    /// Property kind, e.g. `"apartment"`.
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub managed_by: Option<String>,
    #[serde(default)]
    pub landlord_name: Option<String>,
    #[serde(default)]
    pub landlord_verified: bool,
    #[serde(default)]
    pub agency_name: Option<String>,
    #[serde(default)]
    pub agency_verified: bool,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) if !id.is_empty() => Ok(id),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        _ => Err(D::Error::custom("expected non-empty string or numeric id")),
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// Build the homepage display set: the first [`FEATURED_SLOTS`] featured
/// listings, then the first [`REGULAR_SLOTS`] regular ones, capped at
/// [`MAX_CURATED`]. Input order is preserved within each group.
#[must_use]
pub fn select_curated(records: &[ListingRecord]) -> Vec<ListingRecord> {
    let featured = records.iter().filter(|r| r.featured).take(FEATURED_SLOTS);
    let regular = records.iter().filter(|r| !r.featured).take(REGULAR_SLOTS);
    featured.chain(regular).take(MAX_CURATED).cloned().collect()
}

// =============================================================================
// SOURCE
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error("listing request failed: {0}")]
    Request(String),

    #[error("listing response error: status {status}")]
    Response { status: u16, body: String },

    #[error("listing response parse failed: {0}")]
    Parse(String),

    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for ListingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_LISTING_REQUEST",
            Self::Response { .. } => "E_LISTING_RESPONSE",
            Self::Parse(_) => "E_LISTING_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

/// Read access to listing rows.
#[async_trait::async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listings(&self) -> Result<Vec<ListingRecord>, ListingError>;
}

/// Fetch listings and return the curated homepage set, or an empty list.
pub async fn load_featured(source: Option<&dyn ListingSource>) -> Vec<ListingRecord> {
    let Some(source) = source else {
        warn!("listings: no listing source configured; showing empty state");
        return Vec::new();
    };

    match source.fetch_listings().await {
        Ok(records) if records.is_empty() => {
            debug!("listings: no listings available");
            Vec::new()
        }
        Ok(records) => {
            let curated = select_curated(&records);
            debug!(total = records.len(), selected = curated.len(), "listings: curated featured set");
            curated
        }
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "listings: fetch failed; showing empty state");
            Vec::new()
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
