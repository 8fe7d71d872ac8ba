//! REST adapter for listing rows.

use super::{ListingError, ListingRecord, ListingSource};
use crate::config::{BackendConfig, build_http_client};

const REST_PREFIX: &str = "/rest/v1";

pub struct HttpListingSource {
    http: reqwest::Client,
    endpoint: String,
    anon_key: String,
}

impl HttpListingSource {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig) -> Result<Self, ListingError> {
        let http = build_http_client(config.timeouts).map_err(|e| ListingError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: listings_endpoint(&config.url, &config.listings_table),
            anon_key: config.anon_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl ListingSource for HttpListingSource {
    async fn fetch_listings(&self) -> Result<Vec<ListingRecord>, ListingError> {
        let response = self
            .http
            .get(&self.endpoint)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ListingError::Request(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ListingError::Request(e.to_string()))?;

        parse_listings(&check_status(status, text)?)
    }
}

/// PostgREST answers 206 for ranged reads, so any 2xx carries rows.
fn check_status(status: reqwest::StatusCode, body: String) -> Result<String, ListingError> {
    if status.is_success() {
        Ok(body)
    } else {
        Err(ListingError::Response { status: status.as_u16(), body })
    }
}

fn listings_endpoint(base_url: &str, table: &str) -> String {
    format!("{base_url}{REST_PREFIX}/{table}?select=*")
}

fn parse_listings(json: &str) -> Result<Vec<ListingRecord>, ListingError> {
    serde_json::from_str(json).map_err(|e| ListingError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
