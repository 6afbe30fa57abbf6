//! Command-line interface parsing for Farehop
//!
//! This module defines the clap command tree, one subcommand per query
//! operation plus the global cache flags, and the validation step that turns
//! raw arguments into a checked request. IATA arguments are accepted in any
//! case and normalized to uppercase before dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use thiserror::Error;

use crate::data::airports::is_iata_shaped;
use crate::data::TripWindow;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The argument does not look like an IATA airport code
    #[error("Invalid IATA code: '{0}'. Expected three letters, e.g. YVR")]
    InvalidIata(String),

    /// Fetching commands need two distinct airports
    #[error("Origin and destination are both '{0}'; pick two different airports")]
    SameAirport(String),

    /// The return date precedes the departure date
    #[error("Return date {return_date} is before departure date {departure}")]
    ReturnBeforeDeparture {
        departure: NaiveDate,
        return_date: NaiveDate,
    },
}

/// Farehop - flight prices, fare calendars, and cheapest multi-hop routes
#[derive(Parser, Debug)]
#[command(name = "farehop")]
#[command(about = "Discover flight prices, fare calendars, and cheapest multi-hop routes")]
#[command(version)]
pub struct Cli {
    /// Directory for the price cache (defaults to the platform cache dir)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Hours before a cached price stops being served
    #[arg(long, global = true, value_name = "HOURS")]
    pub staleness_hours: Option<u64>,

    /// Upper bound on one upstream call, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

/// One subcommand per query operation
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up the cheapest fare for an airport pair and travel dates
    Price {
        /// Departure airport IATA code
        #[arg(value_name = "ORIGIN")]
        origin: String,

        /// Arrival airport IATA code
        #[arg(value_name = "DEST")]
        destination: String,

        /// Departure date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        date: NaiveDate,

        /// Return date for a round trip (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        return_date: Option<NaiveDate>,
    },

    /// Find cheapest multi-hop routes from cached prices (works offline)
    Routes {
        /// Departure airport IATA code
        #[arg(value_name = "ORIGIN")]
        origin: String,

        /// Arrival airport IATA code
        #[arg(value_name = "DEST")]
        destination: String,

        /// Number of route alternatives to return
        #[arg(short, long, value_name = "N")]
        k: Option<usize>,
    },

    /// Fetch the cheapest fare per departure date for an airport pair
    Calendar {
        /// Departure airport IATA code
        #[arg(value_name = "ORIGIN")]
        origin: String,

        /// Arrival airport IATA code
        #[arg(value_name = "DEST")]
        destination: String,

        /// Search round-trip fares instead of one-way
        #[arg(long)]
        round_trip: bool,
    },
}

/// A validated query, ready for dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Price lookup for one pair and travel window
    Price {
        origin: String,
        destination: String,
        window: TripWindow,
    },
    /// Route search over the cached price graph
    Routes {
        origin: String,
        destination: String,
        k: Option<usize>,
    },
    /// Fare-calendar scan for one pair
    Calendar {
        origin: String,
        destination: String,
        round_trip: bool,
    },
}

impl Request {
    /// Validates parsed arguments into a dispatchable request.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(Request)` with normalized uppercase IATA codes
    /// * `Err(CliError)` if a code is malformed or the dates are inconsistent
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        match &cli.command {
            Command::Price {
                origin,
                destination,
                date,
                return_date,
            } => {
                let origin = normalize_iata(origin)?;
                let destination = normalize_iata(destination)?;
                if origin == destination {
                    return Err(CliError::SameAirport(origin));
                }
                let window = match return_date {
                    Some(return_date) => {
                        if return_date < date {
                            return Err(CliError::ReturnBeforeDeparture {
                                departure: *date,
                                return_date: *return_date,
                            });
                        }
                        TripWindow::Return {
                            departure: *date,
                            return_date: *return_date,
                        }
                    }
                    None => TripWindow::OneWay { date: *date },
                };
                Ok(Request::Price {
                    origin,
                    destination,
                    window,
                })
            }
            Command::Routes {
                origin,
                destination,
                k,
            } => {
                // Identical endpoints are allowed here; the finder answers
                // with an empty result rather than an error.
                Ok(Request::Routes {
                    origin: normalize_iata(origin)?,
                    destination: normalize_iata(destination)?,
                    k: *k,
                })
            }
            Command::Calendar {
                origin,
                destination,
                round_trip,
            } => {
                let origin = normalize_iata(origin)?;
                let destination = normalize_iata(destination)?;
                if origin == destination {
                    return Err(CliError::SameAirport(origin));
                }
                Ok(Request::Calendar {
                    origin,
                    destination,
                    round_trip: *round_trip,
                })
            }
        }
    }
}

/// Uppercases an IATA argument and checks its shape.
///
/// # Arguments
/// * `raw` - The airport code as typed on the command line
///
/// # Returns
/// * `Ok(String)` with the uppercase three-letter code
/// * `Err(CliError::InvalidIata)` if the argument is not IATA-shaped
pub fn normalize_iata(raw: &str) -> Result<String, CliError> {
    let code = raw.trim().to_ascii_uppercase();
    if is_iata_shaped(&code) {
        Ok(code)
    } else {
        Err(CliError::InvalidIata(raw.to_string()))
    }
}
