//! In-memory airport route graph
//!
//! This module builds a directed adjacency structure from cached price
//! observations. Graphs are rebuilt per query from whatever is currently
//! fresh in the cache; there is no mutation API. Parallel observations of
//! the same segment collapse to a single edge during the build.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::data::RouteEdge;

/// A directed edge kept in the adjacency list
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// Destination airport IATA code
    pub to: String,
    /// Price of the segment in USD
    pub price: f64,
    /// Observation time of the winning price
    pub observed_at: DateTime<Utc>,
}

/// Directed graph of airports connected by priced segments
///
/// Adjacency uses ordered maps so iteration order, and therefore route
/// search, is deterministic for a given cache state.
#[derive(Debug, Clone, Default)]
pub struct AirportGraph {
    adjacency: BTreeMap<String, Vec<GraphEdge>>,
    nodes: BTreeSet<String>,
}

impl AirportGraph {
    /// Builds a graph from price observations
    ///
    /// Unpriced edges and self-loops are skipped. When several observations
    /// cover the same (origin, destination) segment, the lowest price wins;
    /// at equal prices the most recent observation wins.
    pub fn build(edges: Vec<RouteEdge>) -> Self {
        let mut adjacency: BTreeMap<String, Vec<GraphEdge>> = BTreeMap::new();
        let mut nodes = BTreeSet::new();

        for edge in edges {
            let price = match edge.price {
                Some(price) => price,
                None => {
                    debug!(
                        origin = %edge.origin,
                        destination = %edge.destination,
                        "skipping unpriced edge"
                    );
                    continue;
                }
            };
            if edge.origin == edge.destination {
                debug!(airport = %edge.origin, "skipping self-loop edge");
                continue;
            }

            nodes.insert(edge.origin.clone());
            nodes.insert(edge.destination.clone());

            let slots = adjacency.entry(edge.origin).or_default();
            match slots.iter_mut().find(|slot| slot.to == edge.destination) {
                Some(slot) => {
                    let cheaper = price < slot.price;
                    let same_price_newer =
                        price == slot.price && edge.observed_at > slot.observed_at;
                    if cheaper || same_price_newer {
                        slot.price = price;
                        slot.observed_at = edge.observed_at;
                    }
                }
                None => slots.push(GraphEdge {
                    to: edge.destination,
                    price,
                    observed_at: edge.observed_at,
                }),
            }
        }

        for slots in adjacency.values_mut() {
            slots.sort_by(|a, b| a.to.cmp(&b.to));
        }

        Self { adjacency, nodes }
    }

    /// Outgoing edges of an airport, sorted by destination
    ///
    /// Unknown airports yield an empty slice.
    pub fn neighbors(&self, airport: &str) -> &[GraphEdge] {
        self.adjacency
            .get(airport)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Price of the direct segment between two airports, when one exists
    pub fn edge_price(&self, from: &str, to: &str) -> Option<f64> {
        self.neighbors(from)
            .iter()
            .find(|edge| edge.to == to)
            .map(|edge| edge.price)
    }

    /// Whether an airport appears in the graph as either endpoint
    pub fn contains(&self, airport: &str) -> bool {
        self.nodes.contains(airport)
    }

    /// Number of distinct airports in the graph
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges after collapsing
    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }

    /// Iterates adjacency entries in deterministic order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[GraphEdge])> {
        self.adjacency
            .iter()
            .map(|(origin, edges)| (origin.as_str(), edges.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn edge(origin: &str, destination: &str, price: Option<f64>, hours_ago: i64) -> RouteEdge {
        RouteEdge {
            origin: origin.to_string(),
            destination: destination.to_string(),
            price,
            observed_at: Utc::now() - Duration::hours(hours_ago),
            source: "test".to_string(),
        }
    }

    #[test]
    fn test_build_collapses_parallel_edges_to_lowest_price() {
        let graph = AirportGraph::build(vec![
            edge("YVR", "SEA", Some(140.0), 1),
            edge("YVR", "SEA", Some(110.0), 2),
            edge("YVR", "SEA", Some(130.0), 0),
        ]);

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_price("YVR", "SEA"), Some(110.0));
    }

    #[test]
    fn test_build_price_tie_keeps_most_recent_observation() {
        let older = edge("YVR", "SEA", Some(110.0), 5);
        let newer = edge("YVR", "SEA", Some(110.0), 1);
        let newer_time = newer.observed_at;

        let graph = AirportGraph::build(vec![older, newer]);

        assert_eq!(graph.neighbors("YVR").len(), 1);
        assert_eq!(graph.neighbors("YVR")[0].observed_at, newer_time);
    }

    #[test]
    fn test_build_skips_unpriced_edges() {
        let graph = AirportGraph::build(vec![
            edge("YVR", "SEA", None, 0),
            edge("SEA", "LAX", Some(90.0), 0),
        ]);

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_price("YVR", "SEA"), None);
        assert!(
            !graph.contains("YVR"),
            "An airport seen only on unpriced edges should not enter the graph"
        );
    }

    #[test]
    fn test_build_skips_self_loops() {
        let graph = AirportGraph::build(vec![
            edge("YVR", "YVR", Some(10.0), 0),
            edge("YVR", "SEA", Some(120.0), 0),
        ]);

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edge_price("YVR", "YVR"), None);
    }

    #[test]
    fn test_neighbors_sorted_by_destination() {
        let graph = AirportGraph::build(vec![
            edge("YVR", "SEA", Some(120.0), 0),
            edge("YVR", "LAX", Some(180.0), 0),
            edge("YVR", "DEN", Some(210.0), 0),
        ]);

        let destinations: Vec<&str> = graph
            .neighbors("YVR")
            .iter()
            .map(|e| e.to.as_str())
            .collect();
        assert_eq!(destinations, vec!["DEN", "LAX", "SEA"]);
    }

    #[test]
    fn test_unknown_airport_has_no_neighbors() {
        let graph = AirportGraph::build(vec![edge("YVR", "SEA", Some(120.0), 0)]);

        assert!(graph.neighbors("JFK").is_empty());
        assert!(!graph.contains("JFK"));
    }

    #[test]
    fn test_node_count_includes_destination_only_airports() {
        let graph = AirportGraph::build(vec![
            edge("YVR", "SEA", Some(120.0), 0),
            edge("SEA", "LHR", Some(420.0), 0),
        ]);

        assert_eq!(graph.node_count(), 3);
        assert!(graph.contains("LHR"), "LHR has no outgoing edges but is a node");
    }

    #[test]
    fn test_empty_graph() {
        let graph = AirportGraph::build(vec![]);

        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.neighbors("YVR").is_empty());
    }

    #[test]
    fn test_iter_is_deterministic_and_ordered() {
        let graph = AirportGraph::build(vec![
            edge("SEA", "LAX", Some(90.0), 0),
            edge("YVR", "SEA", Some(120.0), 0),
            edge("DEN", "ORD", Some(150.0), 0),
        ]);

        let origins: Vec<&str> = graph.iter().map(|(origin, _)| origin).collect();
        assert_eq!(origins, vec!["DEN", "SEA", "YVR"]);
    }
}
