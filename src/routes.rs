//! Cheapest-route search over the airport graph
//!
//! This module finds cheapest multi-hop itineraries in an `AirportGraph`.
//! `cheapest_path` runs label-correcting relaxation to a fixed point;
//! `k_cheapest_paths` enumerates loopless paths in best-first order, so ranked
//! alternatives come out already sorted. All prices in the graph are
//! non-negative, which both algorithms rely on.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

use crate::data::{PathCandidate, SegmentCost};
use crate::graph::AirportGraph;

/// Finds the single cheapest path between two airports.
///
/// Returns `None` when either airport is unknown to the graph, when no
/// connecting path exists, or when origin and destination are the same.
///
/// # Arguments
///
/// * `graph` - Graph built from the current cache contents
/// * `origin` - Departure airport IATA code
/// * `destination` - Arrival airport IATA code
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use farehop::data::RouteEdge;
/// use farehop::graph::AirportGraph;
/// use farehop::routes::cheapest_path;
///
/// let edge = |origin: &str, destination: &str, price: f64| RouteEdge {
///     origin: origin.to_string(),
///     destination: destination.to_string(),
///     price: Some(price),
///     observed_at: Utc::now(),
///     source: "example".to_string(),
/// };
///
/// let graph = AirportGraph::build(vec![
///     edge("YVR", "SEA", 100.0),
///     edge("SEA", "LHR", 50.0),
///     edge("YVR", "LHR", 200.0),
/// ]);
///
/// let path = cheapest_path(&graph, "YVR", "LHR").unwrap();
/// assert_eq!(path.route, vec!["YVR", "SEA", "LHR"]);
/// assert_eq!(path.total_cost, 150.0);
/// ```
pub fn cheapest_path(
    graph: &AirportGraph,
    origin: &str,
    destination: &str,
) -> Option<PathCandidate> {
    if origin == destination || !graph.contains(origin) || !graph.contains(destination) {
        return None;
    }

    let mut costs: HashMap<&str, f64> = HashMap::new();
    let mut previous: HashMap<&str, &str> = HashMap::new();
    costs.insert(origin, 0.0);

    // Relax every edge until a full pass improves nothing. Prices are
    // non-negative, so node_count passes always reach the fixed point.
    for _ in 0..graph.node_count() {
        let mut improved = false;

        for (from, edges) in graph.iter() {
            let cost_here = match costs.get(from) {
                Some(&cost) => cost,
                None => continue,
            };

            for edge in edges {
                let candidate = cost_here + edge.price;
                let better = match costs.get(edge.to.as_str()) {
                    Some(&known) => candidate < known,
                    None => true,
                };
                if better {
                    costs.insert(edge.to.as_str(), candidate);
                    previous.insert(edge.to.as_str(), from);
                    improved = true;
                }
            }
        }

        if !improved {
            break;
        }
    }

    let total_cost = *costs.get(destination)?;

    let mut route = vec![destination.to_string()];
    let mut cursor = destination;
    while cursor != origin {
        cursor = previous.get(cursor).copied()?;
        route.push(cursor.to_string());
    }
    route.reverse();

    Some(materialize(graph, route, total_cost))
}

/// Finds up to `k` cheapest loopless paths between two airports.
///
/// Results are ordered by total cost ascending; ties rank paths with fewer
/// hops first, then by route lexicographically. Returns an empty vector for
/// unknown airports, identical origin and destination, disconnected pairs,
/// or `k == 0`.
///
/// # Arguments
///
/// * `graph` - Graph built from the current cache contents
/// * `origin` - Departure airport IATA code
/// * `destination` - Arrival airport IATA code
/// * `k` - Maximum number of alternatives to return
pub fn k_cheapest_paths(
    graph: &AirportGraph,
    origin: &str,
    destination: &str,
    k: usize,
) -> Vec<PathCandidate> {
    if k == 0 || origin == destination || !graph.contains(origin) || !graph.contains(destination) {
        return Vec::new();
    }

    let mut found = Vec::with_capacity(k);
    let mut heap = BinaryHeap::new();
    heap.push(Reverse(HeapPath {
        cost: 0.0,
        route: vec![origin.to_string()],
    }));

    // Best-first expansion pops paths in ranking order, so destination pops
    // are final results. Paths never revisit an airport, which bounds the
    // search space.
    while let Some(Reverse(path)) = heap.pop() {
        let last = match path.route.last() {
            Some(last) => last.clone(),
            None => continue,
        };

        if last == destination {
            found.push(materialize(graph, path.route, path.cost));
            if found.len() == k {
                break;
            }
            continue;
        }

        for edge in graph.neighbors(&last) {
            if path.route.iter().any(|stop| stop == &edge.to) {
                continue;
            }
            let mut route = path.route.clone();
            route.push(edge.to.clone());
            heap.push(Reverse(HeapPath {
                cost: path.cost + edge.price,
                route,
            }));
        }
    }

    found
}

/// Builds the reportable path with per-segment prices from the graph
fn materialize(graph: &AirportGraph, route: Vec<String>, total_cost: f64) -> PathCandidate {
    let segments = route
        .windows(2)
        .filter_map(|pair| {
            graph
                .edge_price(&pair[0], &pair[1])
                .map(|price| SegmentCost {
                    from: pair[0].clone(),
                    to: pair[1].clone(),
                    price,
                })
        })
        .collect();

    PathCandidate {
        route,
        total_cost,
        segments,
    }
}

/// A partial path in the best-first queue
///
/// Ordering is the ranking contract: total cost first, then fewer hops,
/// then route lexicographically.
#[derive(Debug, Clone)]
struct HeapPath {
    cost: f64,
    route: Vec<String>,
}

impl Ord for HeapPath {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cost
            .total_cmp(&other.cost)
            .then_with(|| self.route.len().cmp(&other.route.len()))
            .then_with(|| self.route.cmp(&other.route))
    }
}

impl PartialOrd for HeapPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapPath {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapPath {}
