//! Cache module for storing fare observations to disk
//!
//! This module provides a persistent key-value store plus the price cache built
//! on top of it. The store handles JSON serialization, atomic writes, and prefix
//! scans; the price cache owns the staleness policy and the merge rules for
//! point-to-point entries (most-recent-wins) and fare-calendar rows
//! (lowest-price-wins). Reads fail open as cache misses, writes surface errors.

mod price_cache;
mod store;

pub use price_cache::{reduce_cheapest_per_day, BulkUpsertOutcome, Lookup, PriceCache};
pub use store::{CacheStore, StoreError, Stored};
