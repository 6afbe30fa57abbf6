//! Runtime configuration
//!
//! Settings are read from environment variables once at startup, then CLI
//! flags are applied on top. Credentials are held as optional values and
//! validated lazily, so commands that work purely from cache never demand
//! API keys.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Default staleness threshold for cached prices, in hours
pub const DEFAULT_STALENESS_HOURS: u64 = 24;

/// Default upper bound on one upstream call, in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Default number of route alternatives returned
pub const DEFAULT_MAX_ROUTES: usize = 3;

/// Errors for missing or unusable configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A credential required by the requested command is not set
    #[error("Missing credential: set the {0} environment variable")]
    MissingCredential(&'static str),
}

/// Runtime settings resolved from environment and CLI
#[derive(Debug, Clone)]
pub struct Config {
    /// Hours before a cached price stops being served
    pub staleness_hours: u64,
    /// Per-call upstream timeout in seconds
    pub timeout_secs: u64,
    /// Route alternatives to return when the query does not say
    pub max_routes: usize,
    /// Cache directory override; `None` uses the platform data dir
    pub cache_dir: Option<PathBuf>,
    /// Tequila API key, when set
    pub tequila_api_key: Option<String>,
    /// Amadeus client id, when set
    pub amadeus_api_key: Option<String>,
    /// Amadeus client secret, when set
    pub amadeus_api_secret: Option<String>,
}

impl Config {
    /// Reads configuration from the environment
    pub fn from_env() -> Self {
        Self {
            staleness_hours: parse_env("FAREHOP_STALENESS_HOURS", DEFAULT_STALENESS_HOURS),
            timeout_secs: parse_env("FAREHOP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            max_routes: parse_env("FAREHOP_MAX_ROUTES", DEFAULT_MAX_ROUTES),
            cache_dir: std::env::var_os("FAREHOP_CACHE_DIR").map(PathBuf::from),
            tequila_api_key: read_env("TEQUILA_API_KEY"),
            amadeus_api_key: read_env("AMADEUS_API_KEY"),
            amadeus_api_secret: read_env("AMADEUS_API_SECRET"),
        }
    }

    /// Applies CLI flag overrides on top of environment values
    pub fn apply_overrides(
        mut self,
        staleness_hours: Option<u64>,
        timeout_secs: Option<u64>,
        cache_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(hours) = staleness_hours {
            self.staleness_hours = hours;
        }
        if let Some(secs) = timeout_secs {
            self.timeout_secs = secs;
        }
        if let Some(dir) = cache_dir {
            self.cache_dir = Some(dir);
        }
        self
    }

    /// The Tequila credential, required for live price queries
    pub fn require_tequila_key(&self) -> Result<&str, ConfigError> {
        self.tequila_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("TEQUILA_API_KEY"))
    }

    /// The Amadeus credential pair, required for live calendar queries
    pub fn require_amadeus_credentials(&self) -> Result<(&str, &str), ConfigError> {
        let key = self
            .amadeus_api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential("AMADEUS_API_KEY"))?;
        let secret = self
            .amadeus_api_secret
            .as_deref()
            .ok_or(ConfigError::MissingCredential("AMADEUS_API_SECRET"))?;
        Ok((key, secret))
    }
}

/// Reads and parses an environment variable, defaulting when unset and
/// warning-and-defaulting when unparseable
fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(name, value = %raw, "ignoring unparseable environment variable");
                default
            }
        },
        Err(_) => default,
    }
}

/// Reads an environment variable, treating empty values as unset
fn read_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
