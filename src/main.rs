//! Farehop - flight prices, fare calendars, and cheapest multi-hop routes
//!
//! A CLI that fronts third-party flight-pricing APIs with a staleness-aware
//! persistent cache, coalesces concurrent upstream fetches per query key, and
//! searches the cached price graph for cheapest multi-hop itineraries.
//! Results print as JSON on stdout; logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use farehop::cache::{CacheStore, PriceCache};
use farehop::cli::{Cli, Request};
use farehop::config::Config;
use farehop::coordinator::RefreshCoordinator;
use farehop::data::{get_airport_by_iata, FareCalendarApi, FareSearchApi};

#[tokio::main]
async fn main() {
    // Logs stay on stderr so stdout remains valid JSON for pipelines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "farehop=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

/// Parses arguments, wires the components, and dispatches one query
async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let request = Request::from_cli(&cli)?;
    let config = Config::from_env().apply_overrides(
        cli.staleness_hours,
        cli.timeout_secs,
        cli.cache_dir.clone(),
    );

    let store = match &config.cache_dir {
        Some(dir) => CacheStore::with_dir(dir.clone()),
        None => CacheStore::new()
            .ok_or("could not determine a cache directory; set --cache-dir or FAREHOP_CACHE_DIR")?,
    };
    let cache = Arc::new(PriceCache::new(store, config.staleness_hours));

    // Providers are constructed with whatever credentials exist; commands
    // that reach upstream check their own credentials before fetching.
    let fares = Arc::new(FareSearchApi::new(
        config.tequila_api_key.clone().unwrap_or_default(),
    ));
    let calendar = Arc::new(FareCalendarApi::new(
        config.amadeus_api_key.clone().unwrap_or_default(),
        config.amadeus_api_secret.clone().unwrap_or_default(),
    ));
    let coordinator = RefreshCoordinator::new(
        cache,
        fares,
        calendar,
        Duration::from_secs(config.timeout_secs),
    );

    match request {
        Request::Price {
            origin,
            destination,
            window,
        } => {
            config.require_tequila_key()?;
            info!(
                origin = %describe(&origin),
                destination = %describe(&destination),
                round_trip = window.is_round_trip(),
                "price query"
            );
            let report = coordinator.get_price(&origin, &destination, window).await?;
            print_json(&report)
        }
        Request::Routes {
            origin,
            destination,
            k,
        } => {
            let k = k.unwrap_or(config.max_routes);
            info!(
                origin = %describe(&origin),
                destination = %describe(&destination),
                k,
                "route search"
            );
            let paths = coordinator.find_cheapest_routes(&origin, &destination, k);
            print_json(&paths)
        }
        Request::Calendar {
            origin,
            destination,
            round_trip,
        } => {
            config.require_amadeus_credentials()?;
            info!(
                origin = %describe(&origin),
                destination = %describe(&destination),
                round_trip,
                "calendar query"
            );
            let report = coordinator
                .get_fare_calendar(&origin, &destination, round_trip)
                .await?;
            print_json(&report)
        }
    }
}

/// Renders an IATA code with its city when the reference table knows it
fn describe(iata: &str) -> String {
    match get_airport_by_iata(iata) {
        Some(airport) => format!("{} ({})", airport.iata, airport.city),
        None => iata.to_string(),
    }
}

/// Pretty-prints a query result as JSON on stdout
fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
