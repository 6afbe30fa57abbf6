//! Farehop Library
//!
//! This module exposes the cache, coordination, and route-search modules for
//! use in integration tests and non-CLI front ends.

pub mod cache;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod data;
pub mod graph;
pub mod routes;
