//! Tequila fare-search API client
//!
//! This module provides the `FareProvider` trait used by the fetch coordinator
//! and its production implementation backed by the Tequila search API. Raw
//! responses are decoded record by record so one malformed fare never discards
//! a whole batch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{FareRecord, FareSegment, TripWindow};

/// Base URL for the Tequila search API
const TEQUILA_BASE_URL: &str = "https://tequila-api.kiwi.com";

/// One fare search request for an airport pair and travel window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FareQuery {
    /// Departure airport IATA code
    pub origin: String,
    /// Arrival airport IATA code
    pub destination: String,
    /// Travel dates to search
    pub window: TripWindow,
}

/// Errors that can occur when talking to an upstream fare API
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Upstream answered with a non-success status code
    #[error("Upstream returned HTTP {code}")]
    Status {
        /// The HTTP status code received
        code: u16,
    },

    /// Failed to decode the response body
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A source of point-to-point fare quotes
///
/// The fetch coordinator holds providers behind this trait, so orchestration
/// stays independent of any particular upstream. Tests substitute in-memory
/// implementations.
#[async_trait]
pub trait FareProvider: Send + Sync {
    /// Short provider name recorded on observations and in logs
    fn name(&self) -> &'static str;

    /// Searches fares for one airport pair and travel window
    ///
    /// # Returns
    /// * `Ok(fares)` - Usable fare offers sorted by price ascending; may be empty
    /// * `Err(ProviderError)` - If the request, status, or body decode fails
    async fn search_fares(&self, query: &FareQuery) -> Result<Vec<FareRecord>, ProviderError>;
}

/// Client for the Tequila flight search API
#[derive(Debug, Clone)]
pub struct FareSearchApi {
    client: Client,
    base_url: String,
    api_key: String,
    currency: String,
}

impl FareSearchApi {
    /// Create a new client with default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: TEQUILA_BASE_URL.to_string(),
            api_key: api_key.into(),
            currency: "USD".to_string(),
        }
    }

    /// Create a client that reuses a pre-configured HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Override the base URL, for tests and self-hosted proxies
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the quote currency
    #[allow(dead_code)]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// Builds the search URL for a query
    fn build_search_url(&self, query: &FareQuery) -> String {
        match &query.window {
            TripWindow::OneWay { date } => format!(
                "{}/v2/search?fly_from={}&fly_to={}&date_from={}&date_to={}&flight_type=oneway&partner=picky&curr={}",
                self.base_url, query.origin, query.destination, date, date, self.currency
            ),
            TripWindow::Return {
                departure,
                return_date,
            } => format!(
                "{}/v2/search?fly_from={}&fly_to={}&date_from={}&date_to={}&flight_type=round&partner=picky&curr={}",
                self.base_url, query.origin, query.destination, departure, return_date, self.currency
            ),
        }
    }
}

#[async_trait]
impl FareProvider for FareSearchApi {
    fn name(&self) -> &'static str {
        "tequila"
    }

    /// Fetch fares for the given query from the Tequila search endpoint
    ///
    /// # Arguments
    /// * `query` - Airport pair and travel window to search
    ///
    /// # Returns
    /// * `Ok(fares)` - Usable fares sorted by price ascending
    /// * `Err(ProviderError)` - If the request or parsing fails
    async fn search_fares(&self, query: &FareQuery) -> Result<Vec<FareRecord>, ProviderError> {
        let url = self.build_search_url(query);
        debug!(
            origin = %query.origin,
            destination = %query.destination,
            round_trip = query.window.is_round_trip(),
            "searching fares"
        );

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                code: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let api_response: SearchResponse = serde_json::from_str(&text)?;

        Ok(parse_fares(api_response))
    }
}

/// Decodes raw fare entries, dropping unusable records with a warning
///
/// A record is dropped when it fails to deserialize, carries a negative
/// price, or has an empty route. Kept fares are sorted by price ascending.
fn parse_fares(response: SearchResponse) -> Vec<FareRecord> {
    let mut fares: Vec<FareRecord> = response
        .data
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<WireFare>(value) {
            Ok(wire) => wire.into_record(),
            Err(err) => {
                warn!(error = %err, "dropping malformed fare record");
                None
            }
        })
        .collect();

    fares.sort_by(|a, b| a.price.total_cmp(&b.price));
    fares
}

/// Tequila search response envelope
///
/// Individual entries are decoded lazily so one bad record does not fail
/// the batch.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    data: Vec<serde_json::Value>,
}

/// One fare entry as Tequila returns it
#[derive(Debug, Deserialize)]
struct WireFare {
    price: f64,
    route: Vec<WireSegment>,
    utc_departure: DateTime<Utc>,
    utc_arrival: DateTime<Utc>,
    #[serde(default)]
    airlines: Vec<String>,
}

/// One flight leg as Tequila returns it
#[derive(Debug, Deserialize)]
struct WireSegment {
    #[serde(rename = "flyFrom")]
    fly_from: String,
    #[serde(rename = "flyTo")]
    fly_to: String,
}

impl WireFare {
    /// Validates the wire record and converts it, or drops it with a warning
    fn into_record(self) -> Option<FareRecord> {
        if self.price < 0.0 {
            warn!(price = self.price, "dropping fare with negative price");
            return None;
        }
        if self.route.is_empty() {
            warn!("dropping fare with empty route");
            return None;
        }

        Some(FareRecord {
            price: self.price,
            route: self
                .route
                .into_iter()
                .map(|seg| FareSegment {
                    fly_from: seg.fly_from,
                    fly_to: seg.fly_to,
                })
                .collect(),
            departure: self.utc_departure,
            arrival: self.utc_arrival,
            airlines: self.airlines,
        })
    }
}
