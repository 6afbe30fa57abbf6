//! Amadeus flight-dates API client
//!
//! This module provides the `CalendarProvider` trait and its production
//! implementation backed by the Amadeus flight-dates API, which returns the
//! cheapest known fare per departure date for an airport pair. Amadeus uses
//! OAuth2 client-credentials; a bearer token is fetched per search.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use super::fares::ProviderError;

/// Base URL for the Amadeus self-service APIs
const AMADEUS_BASE_URL: &str = "https://test.api.amadeus.com";

/// One fare-calendar request for an airport pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CalendarQuery {
    /// Departure airport IATA code
    pub origin: String,
    /// Arrival airport IATA code
    pub destination: String,
    /// Whether to search one-way fares instead of round trips
    pub one_way: bool,
}

/// One row of a provider's fare calendar, before it is stamped with
/// observation metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarFare {
    /// Departure date the fare applies to
    pub departure_date: NaiveDate,
    /// Return date for round-trip fares
    pub return_date: Option<NaiveDate>,
    /// Cheapest price in USD for the date
    pub price: f64,
}

/// A source of cheapest-fare-per-date calendars
///
/// Like `FareProvider`, this seam lets the fetch coordinator and tests work
/// against in-memory implementations.
#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Short provider name recorded on observations and in logs
    fn name(&self) -> &'static str;

    /// Fetches the cheapest fare per departure date for a pair
    ///
    /// # Returns
    /// * `Ok(fares)` - One row per date the upstream knows about; may be empty
    /// * `Err(ProviderError)` - If auth, the request, or body decode fails
    async fn cheapest_dates(&self, query: &CalendarQuery)
        -> Result<Vec<CalendarFare>, ProviderError>;
}

/// Client for the Amadeus flight-dates API
#[derive(Debug, Clone)]
pub struct FareCalendarApi {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
}

impl FareCalendarApi {
    /// Create a new client with default settings
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: AMADEUS_BASE_URL.to_string(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Create a client that reuses a pre-configured HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Override the base URL, for tests or the production Amadeus host
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Builds the flight-dates URL for a query
    fn flight_dates_url(&self, query: &CalendarQuery) -> String {
        format!(
            "{}/v1/shopping/flight-dates?origin={}&destination={}&oneWay={}",
            self.base_url, query.origin, query.destination, query.one_way
        )
    }

    /// Obtains a bearer token via the client-credentials grant
    async fn fetch_token(&self) -> Result<String, ProviderError> {
        let url = format!("{}/v1/security/oauth2/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.api_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                code: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let token: TokenResponse = serde_json::from_str(&text)?;
        Ok(token.access_token)
    }
}

#[async_trait]
impl CalendarProvider for FareCalendarApi {
    fn name(&self) -> &'static str {
        "amadeus"
    }

    /// Fetch the cheapest fare per departure date from Amadeus
    ///
    /// # Arguments
    /// * `query` - Airport pair and trip type to search
    ///
    /// # Returns
    /// * `Ok(fares)` - Usable calendar rows; may be empty
    /// * `Err(ProviderError)` - If auth, the request, or parsing fails
    async fn cheapest_dates(
        &self,
        query: &CalendarQuery,
    ) -> Result<Vec<CalendarFare>, ProviderError> {
        let token = self.fetch_token().await?;
        let url = self.flight_dates_url(query);
        debug!(
            origin = %query.origin,
            destination = %query.destination,
            one_way = query.one_way,
            "fetching fare calendar"
        );

        let response = self.client.get(&url).bearer_auth(&token).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                code: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let api_response: FlightDatesResponse = serde_json::from_str(&text)?;

        Ok(parse_flight_dates(api_response))
    }
}

/// Decodes raw calendar rows, dropping unusable ones with a warning
fn parse_flight_dates(response: FlightDatesResponse) -> Vec<CalendarFare> {
    response
        .data
        .into_iter()
        .filter_map(
            |value| match serde_json::from_value::<WireFlightDate>(value) {
                Ok(wire) => wire.into_fare(),
                Err(err) => {
                    warn!(error = %err, "dropping malformed flight-date row");
                    None
                }
            },
        )
        .collect()
}

/// OAuth2 token response envelope
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Amadeus flight-dates response envelope
///
/// Rows are decoded lazily so one bad row does not fail the batch.
#[derive(Debug, Deserialize)]
struct FlightDatesResponse {
    data: Vec<serde_json::Value>,
}

/// One calendar row as Amadeus returns it
///
/// Prices come back as decimal strings under `price.total`.
#[derive(Debug, Deserialize)]
struct WireFlightDate {
    #[serde(rename = "departureDate")]
    departure_date: String,
    #[serde(rename = "returnDate")]
    return_date: Option<String>,
    price: WirePrice,
}

/// Price object of a flight-date row
#[derive(Debug, Deserialize)]
struct WirePrice {
    total: String,
}

impl WireFlightDate {
    /// Validates the wire row and converts it, or drops it with a warning
    fn into_fare(self) -> Option<CalendarFare> {
        let departure_date: NaiveDate = match self.departure_date.parse() {
            Ok(date) => date,
            Err(_) => {
                warn!(date = %self.departure_date, "dropping row with invalid departure date");
                return None;
            }
        };

        let return_date = match self.return_date {
            Some(raw) => match raw.parse::<NaiveDate>() {
                Ok(date) => Some(date),
                Err(_) => {
                    warn!(date = %raw, "dropping row with invalid return date");
                    return None;
                }
            },
            None => None,
        };

        let price: f64 = match self.price.total.parse() {
            Ok(price) if price >= 0.0 => price,
            Ok(price) => {
                warn!(price, "dropping row with negative price");
                return None;
            }
            Err(_) => {
                warn!(total = %self.price.total, "dropping row with unparseable price");
                return None;
            }
        };

        Some(CalendarFare {
            departure_date,
            return_date,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Sample valid Amadeus flight-dates response
    const VALID_FLIGHT_DATES: &str = r#"{
        "data": [
            {
                "type": "flight-date",
                "origin": "YVR",
                "destination": "KEF",
                "departureDate": "2026-06-01",
                "returnDate": "2026-06-08",
                "price": {"total": "412.53"}
            },
            {
                "type": "flight-date",
                "origin": "YVR",
                "destination": "KEF",
                "departureDate": "2026-06-02",
                "price": {"total": "388.00"}
            }
        ],
        "meta": {"currency": "USD"}
    }"#;

    #[test]
    fn test_parse_valid_flight_dates() {
        let response: FlightDatesResponse =
            serde_json::from_str(VALID_FLIGHT_DATES).expect("Failed to parse valid response");
        let fares = parse_flight_dates(response);

        assert_eq!(fares.len(), 2);
        assert_eq!(
            fares[0].departure_date,
            NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
        );
        assert_eq!(
            fares[0].return_date,
            Some(NaiveDate::from_ymd_opt(2026, 6, 8).unwrap())
        );
        assert!((fares[0].price - 412.53).abs() < 0.01);
        assert_eq!(fares[1].return_date, None);
        assert!((fares[1].price - 388.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_drops_malformed_row_and_keeps_rest() {
        let mixed = r#"{
            "data": [
                {"departureDate": "2026-06-01"},
                {
                    "departureDate": "2026-06-02",
                    "price": {"total": "199.99"}
                }
            ]
        }"#;

        let response: FlightDatesResponse = serde_json::from_str(mixed).expect("Failed to parse");
        let fares = parse_flight_dates(response);

        assert_eq!(fares.len(), 1, "The row without a price should be dropped");
        assert!((fares[0].price - 199.99).abs() < 0.01);
    }

    #[test]
    fn test_parse_drops_unparseable_price() {
        let bad_price = r#"{
            "data": [
                {"departureDate": "2026-06-01", "price": {"total": "free"}}
            ]
        }"#;

        let response: FlightDatesResponse =
            serde_json::from_str(bad_price).expect("Failed to parse");
        assert!(parse_flight_dates(response).is_empty());
    }

    #[test]
    fn test_parse_drops_invalid_departure_date() {
        let bad_date = r#"{
            "data": [
                {"departureDate": "June 1st", "price": {"total": "100.00"}}
            ]
        }"#;

        let response: FlightDatesResponse =
            serde_json::from_str(bad_date).expect("Failed to parse");
        assert!(parse_flight_dates(response).is_empty());
    }

    #[test]
    fn test_parse_drops_negative_price() {
        let negative = r#"{
            "data": [
                {"departureDate": "2026-06-01", "price": {"total": "-10.00"}}
            ]
        }"#;

        let response: FlightDatesResponse =
            serde_json::from_str(negative).expect("Failed to parse");
        assert!(parse_flight_dates(response).is_empty());
    }

    #[test]
    fn test_parse_empty_data_yields_no_fares() {
        let response: FlightDatesResponse =
            serde_json::from_str(r#"{"data": []}"#).expect("Failed to parse");
        assert!(parse_flight_dates(response).is_empty());
    }

    #[test]
    fn test_token_response_parses_access_token() {
        let token: TokenResponse = serde_json::from_str(
            r#"{"type": "amadeusOAuth2Token", "access_token": "abc123", "expires_in": 1799}"#,
        )
        .expect("Failed to parse token response");
        assert_eq!(token.access_token, "abc123");
    }

    #[test]
    fn test_flight_dates_url() {
        let api = FareCalendarApi::new("key", "secret");
        let url = api.flight_dates_url(&CalendarQuery {
            origin: "YVR".to_string(),
            destination: "KEF".to_string(),
            one_way: true,
        });

        assert_eq!(
            url,
            "https://test.api.amadeus.com/v1/shopping/flight-dates?origin=YVR&destination=KEF&oneWay=true"
        );
    }

    #[test]
    fn test_provider_name() {
        let api = FareCalendarApi::new("key", "secret");
        assert_eq!(api.name(), "amadeus");
    }
}
