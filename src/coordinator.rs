//! Fetch coordination with request coalescing
//!
//! The `RefreshCoordinator` is the single entry point for price, calendar,
//! and route queries. Cache hits return without touching any lock; misses go
//! through an in-flight table so N concurrent callers for one key produce
//! exactly one upstream call. Fetches run as detached tasks: callers that
//! abandon a query do not cancel the fetch, and its result still lands in
//! the cache for later queries.

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::{BulkUpsertOutcome, Lookup, PriceCache};
use crate::data::{
    CalendarProvider, CalendarQuery, DayFare, FareProvider, FareQuery, PathCandidate, RouteEdge,
    TripWindow,
};
use crate::graph::AirportGraph;
use crate::routes::k_cheapest_paths;

/// Errors a coordinated fetch can surface to callers
///
/// Results are shared between coalesced callers, so every variant is
/// cloneable and carries owned data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Upstream could not be reached, answered non-2xx, or timed out
    #[error("{provider} unavailable for {origin}-{destination}: {reason}")]
    UpstreamUnavailable {
        /// Origin airport of the failed query
        origin: String,
        /// Destination airport of the failed query
        destination: String,
        /// Provider that failed
        provider: String,
        /// Human-readable failure cause
        reason: String,
        /// When the failure was observed
        at: DateTime<Utc>,
    },

    /// Upstream answered but returned zero usable records
    #[error("no usable fares from {provider} for {origin}-{destination}")]
    NoUsableFares {
        /// Origin airport of the query
        origin: String,
        /// Destination airport of the query
        destination: String,
        /// Provider that returned nothing usable
        provider: String,
    },

    /// The fetch task stopped before producing a result
    #[error("fetch task failed: {reason}")]
    TaskFailed {
        /// Description of the task failure
        reason: String,
    },
}

/// Result of a price query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceReport {
    /// The authoritative price observation
    pub edge: RouteEdge,
    /// Set when the observation could not be persisted
    pub persist_error: Option<String>,
}

/// Result of a fare-calendar query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarReport {
    /// Cheapest fare per departure date, sorted by date
    pub fares: Vec<DayFare>,
    /// Set when some rows could not be persisted
    pub persist_error: Option<String>,
}

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T, FetchError>>>;

/// In-flight fetches keyed by query
struct FlightTable<K, T> {
    slots: Arc<Mutex<HashMap<K, SharedFetch<T>>>>,
}

impl<K, T> FlightTable<K, T>
where
    K: Eq + Hash + Clone + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Joins the in-flight fetch for a key, spawning it if absent
    ///
    /// The fetch runs detached, so it completes even when every caller goes
    /// away. The spawned task removes its own slot once the fetch resolves,
    /// success or failure, so later callers re-probe the cache instead of
    /// receiving a replayed result. The lock is held only for slot
    /// bookkeeping, never across the fetch itself.
    async fn join_or_spawn<F>(&self, key: K, fetch: F) -> Result<T, FetchError>
    where
        F: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let shared = {
            let mut slots = self.slots.lock().await;
            match slots.get(&key) {
                Some(existing) => {
                    debug!("joining in-flight fetch");
                    existing.clone()
                }
                None => {
                    let table = Arc::clone(&self.slots);
                    let slot_key = key.clone();
                    let task = tokio::spawn(async move {
                        let result = fetch.await;
                        table.lock().await.remove(&slot_key);
                        result
                    });
                    let shared = task
                        .map(|joined| match joined {
                            Ok(result) => result,
                            Err(err) => Err(FetchError::TaskFailed {
                                reason: err.to_string(),
                            }),
                        })
                        .boxed()
                        .shared();
                    slots.insert(key, shared.clone());
                    shared
                }
            }
        };

        shared.await
    }
}

/// Coordinates cache probes, deduplicated upstream fetches, and route search
///
/// Constructed explicitly from its collaborators; holds no global state.
pub struct RefreshCoordinator {
    cache: Arc<PriceCache>,
    fares: Arc<dyn FareProvider>,
    calendar: Arc<dyn CalendarProvider>,
    timeout: Duration,
    price_flights: FlightTable<FareQuery, PriceReport>,
    calendar_flights: FlightTable<CalendarQuery, CalendarReport>,
}

impl RefreshCoordinator {
    /// Creates a coordinator over a cache and the two upstream providers
    ///
    /// # Arguments
    /// * `cache` - Persistent price cache shared with other consumers
    /// * `fares` - Point-to-point fare source
    /// * `calendar` - Cheapest-date calendar source
    /// * `timeout` - Upper bound on each upstream call
    pub fn new(
        cache: Arc<PriceCache>,
        fares: Arc<dyn FareProvider>,
        calendar: Arc<dyn CalendarProvider>,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            fares,
            calendar,
            timeout,
            price_flights: FlightTable::new(),
            calendar_flights: FlightTable::new(),
        }
    }

    /// Returns the cheapest price for a pair and travel window
    ///
    /// Serves fresh cache entries directly. On a miss, joins or spawns the
    /// single in-flight fetch for the key and awaits its shared result.
    pub async fn get_price(
        &self,
        origin: &str,
        destination: &str,
        window: TripWindow,
    ) -> Result<PriceReport, FetchError> {
        if let Lookup::Hit(edge) = self.cache.get_edge(origin, destination, &window) {
            debug!(origin, destination, "price served from cache");
            return Ok(PriceReport {
                edge,
                persist_error: None,
            });
        }

        let query = FareQuery {
            origin: origin.to_string(),
            destination: destination.to_string(),
            window,
        };
        let fetch = price_fetch(
            Arc::clone(&self.cache),
            Arc::clone(&self.fares),
            self.timeout,
            query.clone(),
        );
        self.price_flights.join_or_spawn(query, fetch).await
    }

    /// Returns the cheapest fare per departure date for a pair
    ///
    /// Serves fresh calendar rows directly. On a miss, single-flights the
    /// calendar fetch and merges the batch under lowest-price-wins.
    pub async fn get_fare_calendar(
        &self,
        origin: &str,
        destination: &str,
        round_trip: bool,
    ) -> Result<CalendarReport, FetchError> {
        if let Lookup::Hit(fares) = self.cache.get_calendar(origin, destination) {
            debug!(origin, destination, "calendar served from cache");
            return Ok(CalendarReport {
                fares,
                persist_error: None,
            });
        }

        let query = CalendarQuery {
            origin: origin.to_string(),
            destination: destination.to_string(),
            one_way: !round_trip,
        };
        let fetch = calendar_fetch(
            Arc::clone(&self.cache),
            Arc::clone(&self.calendar),
            self.timeout,
            query.clone(),
        );
        self.calendar_flights.join_or_spawn(query, fetch).await
    }

    /// Finds up to `k` cheapest multi-hop routes from cached prices
    ///
    /// Pure cache consumer: rebuilds the graph from whatever is currently
    /// fresh and never calls upstream. No route is an empty vector, not an
    /// error.
    pub fn find_cheapest_routes(
        &self,
        origin: &str,
        destination: &str,
        k: usize,
    ) -> Vec<PathCandidate> {
        let graph = AirportGraph::build(self.cache.all_fresh_edges());
        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "rebuilt route graph from cache"
        );
        k_cheapest_paths(&graph, origin, destination, k)
    }
}

/// The detached fetch body for one price key
async fn price_fetch(
    cache: Arc<PriceCache>,
    provider: Arc<dyn FareProvider>,
    timeout: Duration,
    query: FareQuery,
) -> Result<PriceReport, FetchError> {
    // A fetch that completed between this caller's probe and its slot
    // registration may already have written the answer.
    if let Lookup::Hit(edge) = cache.get_edge(&query.origin, &query.destination, &query.window) {
        return Ok(PriceReport {
            edge,
            persist_error: None,
        });
    }

    let fares = match tokio::time::timeout(timeout, provider.search_fares(&query)).await {
        Ok(Ok(fares)) => fares,
        Ok(Err(err)) => {
            warn!(
                origin = %query.origin,
                destination = %query.destination,
                error = %err,
                "fare search failed"
            );
            return Err(FetchError::UpstreamUnavailable {
                origin: query.origin,
                destination: query.destination,
                provider: provider.name().to_string(),
                reason: err.to_string(),
                at: Utc::now(),
            });
        }
        Err(_) => {
            warn!(
                origin = %query.origin,
                destination = %query.destination,
                "fare search timed out"
            );
            return Err(FetchError::UpstreamUnavailable {
                origin: query.origin,
                destination: query.destination,
                provider: provider.name().to_string(),
                reason: format!("timed out after {}s", timeout.as_secs_f64()),
                at: Utc::now(),
            });
        }
    };

    // Providers return fares sorted ascending, so the first is the quote.
    let cheapest = match fares.first() {
        Some(fare) => fare.price,
        None => {
            return Err(FetchError::NoUsableFares {
                origin: query.origin,
                destination: query.destination,
                provider: provider.name().to_string(),
            });
        }
    };

    let edge = RouteEdge {
        origin: query.origin.clone(),
        destination: query.destination.clone(),
        price: Some(cheapest),
        observed_at: Utc::now(),
        source: provider.name().to_string(),
    };

    info!(
        origin = %edge.origin,
        destination = %edge.destination,
        price = cheapest,
        offers = fares.len(),
        "fetched fare quote"
    );

    let persist_error = match cache.upsert_edge(&edge, &query.window) {
        Ok(()) => None,
        Err(err) => {
            warn!(error = %err, "failed to persist fetched price");
            Some(err.to_string())
        }
    };

    Ok(PriceReport {
        edge,
        persist_error,
    })
}

/// The detached fetch body for one calendar key
async fn calendar_fetch(
    cache: Arc<PriceCache>,
    provider: Arc<dyn CalendarProvider>,
    timeout: Duration,
    query: CalendarQuery,
) -> Result<CalendarReport, FetchError> {
    if let Lookup::Hit(fares) = cache.get_calendar(&query.origin, &query.destination) {
        return Ok(CalendarReport {
            fares,
            persist_error: None,
        });
    }

    let rows = match tokio::time::timeout(timeout, provider.cheapest_dates(&query)).await {
        Ok(Ok(rows)) => rows,
        Ok(Err(err)) => {
            warn!(
                origin = %query.origin,
                destination = %query.destination,
                error = %err,
                "calendar fetch failed"
            );
            return Err(FetchError::UpstreamUnavailable {
                origin: query.origin,
                destination: query.destination,
                provider: provider.name().to_string(),
                reason: err.to_string(),
                at: Utc::now(),
            });
        }
        Err(_) => {
            warn!(
                origin = %query.origin,
                destination = %query.destination,
                "calendar fetch timed out"
            );
            return Err(FetchError::UpstreamUnavailable {
                origin: query.origin,
                destination: query.destination,
                provider: provider.name().to_string(),
                reason: format!("timed out after {}s", timeout.as_secs_f64()),
                at: Utc::now(),
            });
        }
    };

    if rows.is_empty() {
        return Err(FetchError::NoUsableFares {
            origin: query.origin,
            destination: query.destination,
            provider: provider.name().to_string(),
        });
    }

    let observed_at = Utc::now();
    let batch: Vec<DayFare> = rows
        .into_iter()
        .map(|row| DayFare {
            origin: query.origin.clone(),
            destination: query.destination.clone(),
            departure_date: row.departure_date,
            return_date: row.return_date,
            price: row.price,
            observed_at,
            source: provider.name().to_string(),
        })
        .collect();

    info!(
        origin = %query.origin,
        destination = %query.destination,
        dates = batch.len(),
        "fetched fare calendar"
    );

    let BulkUpsertOutcome {
        fares,
        written,
        write_error,
    } = cache.bulk_upsert_cheapest_per_day(batch);
    debug!(written, "persisted calendar rows");

    Ok(CalendarReport {
        fares,
        persist_error: write_error.map(|err| err.to_string()),
    })
}
