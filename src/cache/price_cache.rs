//! Staleness-aware price cache
//!
//! `PriceCache` layers the pricing policies over `CacheStore`: a configurable
//! staleness threshold applied at read time, most-recent-wins replacement for
//! point-to-point entries, and lowest-price-wins merging for fare-calendar
//! rows. Read failures are logged and treated as misses so the caller falls
//! through to upstream; write failures always surface.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::cache::store::{CacheStore, StoreError};
use crate::data::{DayFare, RouteEdge, TripWindow};

/// Result of a cache probe
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup<T> {
    /// A fresh entry was found
    Hit(T),
    /// No entry, a stale entry, or an unreadable entry
    Miss,
}

impl<T> Lookup<T> {
    /// Whether the probe found a fresh entry
    pub fn is_hit(&self) -> bool {
        matches!(self, Lookup::Hit(_))
    }

    /// Converts the probe result into an `Option`
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Miss => None,
        }
    }
}

/// Outcome of a calendar batch upsert
///
/// Fetched data is returned to the caller even when persistence fails, so
/// the outcome carries both the authoritative rows and any write error.
#[derive(Debug)]
pub struct BulkUpsertOutcome {
    /// Per-date records now authoritative for the batch's keys
    pub fares: Vec<DayFare>,
    /// Number of entries actually written to the store
    pub written: usize,
    /// First write failure, when persistence was incomplete
    pub write_error: Option<StoreError>,
}

/// Staleness policy and merge rules over the persistent store
#[derive(Debug, Clone)]
pub struct PriceCache {
    store: CacheStore,
    staleness: Duration,
}

impl PriceCache {
    /// Creates a price cache over a store with the given staleness threshold
    pub fn new(store: CacheStore, staleness_hours: u64) -> Self {
        Self {
            store,
            staleness: Duration::hours(staleness_hours as i64),
        }
    }

    /// Whether a fetch time is within the staleness threshold
    fn is_fresh(&self, fetched_at: DateTime<Utc>) -> bool {
        Utc::now().signed_duration_since(fetched_at) < self.staleness
    }

    /// Oldest fetch time still considered fresh
    fn freshness_cutoff(&self) -> DateTime<Utc> {
        Utc::now() - self.staleness
    }

    /// Storage key for a point-to-point entry
    fn edge_key(origin: &str, destination: &str, window: &TripWindow) -> String {
        match window {
            TripWindow::OneWay { date } => format!("edge_{}-{}_{}", origin, destination, date),
            TripWindow::Return {
                departure,
                return_date,
            } => format!("edge_{}-{}_{}_{}", origin, destination, departure, return_date),
        }
    }

    /// Storage key for one fare-calendar row
    fn fare_key(origin: &str, destination: &str, date: NaiveDate) -> String {
        format!("fare_{}-{}_{}", origin, destination, date)
    }

    /// Key prefix covering every calendar row of one airport pair
    fn fare_prefix(origin: &str, destination: &str) -> String {
        format!("fare_{}-{}_", origin, destination)
    }

    /// Looks up the cached edge for a pair and window
    ///
    /// Returns `Miss` for absent entries, entries older than the staleness
    /// threshold, and unreadable entries (logged, fail open to upstream).
    pub fn get_edge(
        &self,
        origin: &str,
        destination: &str,
        window: &TripWindow,
    ) -> Lookup<RouteEdge> {
        let key = Self::edge_key(origin, destination, window);
        match self.store.get::<RouteEdge>(&key) {
            Ok(Some(stored)) if self.is_fresh(stored.fetched_at) => Lookup::Hit(stored.data),
            Ok(Some(_)) => {
                debug!(key, "cached edge is stale");
                Lookup::Miss
            }
            Ok(None) => Lookup::Miss,
            Err(err) => {
                warn!(key, error = %err, "cache read failed, treating as miss");
                Lookup::Miss
            }
        }
    }

    /// Replaces the cached edge for a pair and window
    ///
    /// Point-to-point entries are most-recent-wins: the new observation
    /// replaces whatever was stored. Write failures surface to the caller.
    pub fn upsert_edge(&self, edge: &RouteEdge, window: &TripWindow) -> Result<(), StoreError> {
        let key = Self::edge_key(&edge.origin, &edge.destination, window);
        self.store.upsert(&key, edge, edge.observed_at)
    }

    /// Returns all fresh calendar rows for a pair, sorted by departure date
    ///
    /// A `Hit` requires at least one row fetched within the staleness
    /// threshold; freshness is measured against each row's scan time.
    pub fn get_calendar(&self, origin: &str, destination: &str) -> Lookup<Vec<DayFare>> {
        let prefix = Self::fare_prefix(origin, destination);
        match self
            .store
            .scan_newer_than::<DayFare>(&prefix, self.freshness_cutoff())
        {
            Ok(stored) if !stored.is_empty() => {
                let mut fares: Vec<DayFare> = stored.into_iter().map(|s| s.data).collect();
                fares.sort_by_key(|fare| fare.departure_date);
                Lookup::Hit(fares)
            }
            Ok(_) => Lookup::Miss,
            Err(err) => {
                warn!(prefix, error = %err, "calendar scan failed, treating as miss");
                Lookup::Miss
            }
        }
    }

    /// Merges a batch of calendar observations under lowest-price-wins
    ///
    /// The batch is first reduced to the cheapest observation per
    /// (origin, destination, departure_date). Each winner is then merged
    /// against the stored row: a fresh stored row at a lower or equal price
    /// is kept, anything else is overwritten. Stale rows are replaced
    /// regardless of price, since they no longer represent purchasable
    /// fares. Applying the same batch twice changes nothing.
    pub fn bulk_upsert_cheapest_per_day(&self, batch: Vec<DayFare>) -> BulkUpsertOutcome {
        let reduced = reduce_cheapest_per_day(batch);
        let mut fares = Vec::with_capacity(reduced.len());
        let mut written = 0;
        let mut write_error = None;

        for fare in reduced {
            let key = Self::fare_key(&fare.origin, &fare.destination, fare.departure_date);

            let existing = match self.store.get::<DayFare>(&key) {
                Ok(existing) => existing,
                Err(err) => {
                    warn!(key, error = %err, "cache read failed during bulk upsert, overwriting");
                    None
                }
            };

            if let Some(stored) = existing {
                if self.is_fresh(stored.fetched_at) && stored.data.price <= fare.price {
                    fares.push(stored.data);
                    continue;
                }
            }

            match self.store.upsert(&key, &fare, fare.observed_at) {
                Ok(()) => {
                    written += 1;
                    fares.push(fare);
                }
                Err(err) => {
                    warn!(key, error = %err, "failed to persist calendar fare");
                    if write_error.is_none() {
                        write_error = Some(err);
                    }
                    // The observation still flows back to the caller.
                    fares.push(fare);
                }
            }
        }

        fares.sort_by(|a, b| {
            (&a.origin, &a.destination, a.departure_date).cmp(&(
                &b.origin,
                &b.destination,
                b.departure_date,
            ))
        });

        BulkUpsertOutcome {
            fares,
            written,
            write_error,
        }
    }

    /// Returns every non-stale cached edge for graph building
    ///
    /// Combines point-to-point entries with calendar rows converted to
    /// edges. Scan failures degrade to an empty contribution with a logged
    /// warning rather than failing the query.
    pub fn all_fresh_edges(&self) -> Vec<RouteEdge> {
        let cutoff = self.freshness_cutoff();
        let mut edges = Vec::new();

        match self.store.scan_newer_than::<RouteEdge>("edge_", cutoff) {
            Ok(stored) => edges.extend(stored.into_iter().map(|s| s.data)),
            Err(err) => warn!(error = %err, "edge scan failed, continuing without point entries"),
        }

        match self.store.scan_newer_than::<DayFare>("fare_", cutoff) {
            Ok(stored) => edges.extend(stored.into_iter().map(|s| s.data.to_edge())),
            Err(err) => warn!(error = %err, "calendar scan failed, continuing without fare rows"),
        }

        edges
    }
}

/// Reduces a batch of observations to the cheapest per
/// (origin, destination, departure_date)
///
/// Order-independent: for equal prices, the first observation in the batch
/// wins, which does not affect the stored minimum.
pub fn reduce_cheapest_per_day(batch: Vec<DayFare>) -> Vec<DayFare> {
    let mut cheapest: HashMap<(String, String, NaiveDate), DayFare> = HashMap::new();

    for fare in batch {
        let key = (
            fare.origin.clone(),
            fare.destination.clone(),
            fare.departure_date,
        );
        match cheapest.entry(key) {
            Entry::Occupied(mut slot) => {
                if fare.price < slot.get().price {
                    slot.insert(fare);
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(fare);
            }
        }
    }

    let mut reduced: Vec<DayFare> = cheapest.into_values().collect();
    reduced.sort_by(|a, b| {
        (&a.origin, &a.destination, a.departure_date).cmp(&(
            &b.origin,
            &b.destination,
            b.departure_date,
        ))
    });
    reduced
}
