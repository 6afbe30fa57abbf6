//! Core data models for Farehop
//!
//! This module contains the data types used throughout the application for
//! representing airports, priced route edges, fare-calendar entries, and
//! route-search results.

pub mod airports;
pub mod calendar;
pub mod fares;

pub use airports::{all_airports, get_airport_by_iata};
pub use calendar::{CalendarFare, CalendarProvider, CalendarQuery, FareCalendarApi};
pub use fares::{FareProvider, FareQuery, FareSearchApi, ProviderError};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A known airport from the reference dataset
///
/// Uses `&'static str` for string fields to allow static initialization
/// of the AIRPORTS table. Lookups go through `get_airport_by_iata`; the
/// core treats IATA codes as plain strings and does not require every code
/// to appear in the table.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AirportRef {
    /// Three-letter IATA code, the unique key
    pub iata: &'static str,
    /// Human-readable airport name
    pub name: &'static str,
    /// City served by the airport
    pub city: &'static str,
    /// Country the airport is in
    pub country: &'static str,
    /// Latitude coordinate
    pub latitude: f64,
    /// Longitude coordinate
    pub longitude: f64,
    /// Display-priority tier (1 = major hub)
    pub weight: u8,
}

/// Date window of a price query
///
/// Part of the cache key, so the same airport pair queried for different
/// windows caches independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TripWindow {
    /// Single outbound date, no return leg
    OneWay { date: NaiveDate },
    /// Outbound and return dates for a round trip
    Return {
        departure: NaiveDate,
        return_date: NaiveDate,
    },
}

impl TripWindow {
    /// The outbound departure date of the window
    pub fn departure(&self) -> NaiveDate {
        match self {
            TripWindow::OneWay { date } => *date,
            TripWindow::Return { departure, .. } => *departure,
        }
    }

    /// Whether the window covers a round trip
    pub fn is_round_trip(&self) -> bool {
        matches!(self, TripWindow::Return { .. })
    }
}

/// A directed, priced edge between two airports
///
/// Multiple observations may exist for one (origin, destination) pair; the
/// cache keeps the most recent non-stale one as authoritative per window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteEdge {
    /// Origin IATA code
    pub origin: String,
    /// Destination IATA code
    pub destination: String,
    /// Price in USD; `None` means the route is known but unpriced
    pub price: Option<f64>,
    /// When this price was observed upstream
    pub observed_at: DateTime<Utc>,
    /// Which upstream produced the observation
    pub source: String,
}

/// Cheapest known fare for one departure date
///
/// The persisted unit of the fare calendar, keyed by
/// (origin, destination, departure_date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayFare {
    /// Origin IATA code
    pub origin: String,
    /// Destination IATA code
    pub destination: String,
    /// Departure date this fare applies to
    pub departure_date: NaiveDate,
    /// Return date for round-trip fares
    pub return_date: Option<NaiveDate>,
    /// Cheapest observed price in USD for the date
    pub price: f64,
    /// Fetch time of the scan that produced this row
    pub observed_at: DateTime<Utc>,
    /// Which upstream produced the observation
    pub source: String,
}

impl DayFare {
    /// Converts the fare into a priced route edge for graph building
    pub fn to_edge(&self) -> RouteEdge {
        RouteEdge {
            origin: self.origin.clone(),
            destination: self.destination.clone(),
            price: Some(self.price),
            observed_at: self.observed_at,
            source: self.source.clone(),
        }
    }
}

/// One leg of an upstream fare offer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FareSegment {
    /// Departure airport of the leg
    pub fly_from: String,
    /// Arrival airport of the leg
    pub fly_to: String,
}

/// One fare offer returned by an upstream search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FareRecord {
    /// Total price in USD
    pub price: f64,
    /// Flight legs, outbound order
    pub route: Vec<FareSegment>,
    /// Departure time of the first leg
    pub departure: DateTime<Utc>,
    /// Arrival time of the last leg
    pub arrival: DateTime<Utc>,
    /// Operating airline codes
    pub airlines: Vec<String>,
}

/// Per-segment cost of a found route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentCost {
    /// Segment origin IATA code
    pub from: String,
    /// Segment destination IATA code
    pub to: String,
    /// Cached price of the segment in USD
    pub price: f64,
}

/// A ranked multi-hop itinerary produced by route search
///
/// Transient, produced per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathCandidate {
    /// Airport sequence from origin to destination
    pub route: Vec<String>,
    /// Sum of segment prices along the path
    pub total_cost: f64,
    /// Per-segment breakdown of the total
    pub segments: Vec<SegmentCost>,
}

impl PathCandidate {
    /// Number of flight legs in the path
    pub fn hops(&self) -> usize {
        self.route.len().saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trip_window_departure() {
        let oneway = TripWindow::OneWay {
            date: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
        };
        assert_eq!(
            oneway.departure(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
        assert!(!oneway.is_round_trip());

        let round = TripWindow::Return {
            departure: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            return_date: NaiveDate::from_ymd_opt(2026, 3, 21).unwrap(),
        };
        assert_eq!(
            round.departure(),
            NaiveDate::from_ymd_opt(2026, 3, 14).unwrap()
        );
        assert!(round.is_round_trip());
    }

    #[test]
    fn test_route_edge_serialization_preserves_unpriced_edges() {
        let edge = RouteEdge {
            origin: "YVR".to_string(),
            destination: "KEF".to_string(),
            price: None,
            observed_at: Utc::now(),
            source: "tequila".to_string(),
        };

        let json = serde_json::to_string(&edge).expect("Failed to serialize RouteEdge");
        let back: RouteEdge = serde_json::from_str(&json).expect("Failed to deserialize RouteEdge");

        assert_eq!(back.origin, "YVR");
        assert_eq!(back.destination, "KEF");
        assert!(back.price.is_none());
    }

    #[test]
    fn test_day_fare_to_edge_carries_price_and_source() {
        let fare = DayFare {
            origin: "SEA".to_string(),
            destination: "LHR".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            return_date: None,
            price: 412.0,
            observed_at: Utc::now(),
            source: "amadeus".to_string(),
        };

        let edge = fare.to_edge();
        assert_eq!(edge.origin, "SEA");
        assert_eq!(edge.destination, "LHR");
        assert_eq!(edge.price, Some(412.0));
        assert_eq!(edge.source, "amadeus");
    }

    #[test]
    fn test_path_candidate_hops() {
        let path = PathCandidate {
            route: vec!["YVR".to_string(), "SEA".to_string(), "LHR".to_string()],
            total_cost: 540.0,
            segments: vec![
                SegmentCost {
                    from: "YVR".to_string(),
                    to: "SEA".to_string(),
                    price: 120.0,
                },
                SegmentCost {
                    from: "SEA".to_string(),
                    to: "LHR".to_string(),
                    price: 420.0,
                },
            ],
        };

        assert_eq!(path.hops(), 2);
        assert_eq!(path.segments.len(), path.hops());
    }

    #[test]
    fn test_path_candidate_with_single_airport_has_zero_hops() {
        let path = PathCandidate {
            route: vec!["YVR".to_string()],
            total_cost: 0.0,
            segments: vec![],
        };
        assert_eq!(path.hops(), 0);
    }
}
