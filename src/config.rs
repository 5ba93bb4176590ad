use std::env;

use serde::{Deserialize, Serialize};

use crate::{KvLinkError, Result};

const ENV_URL: &str = "KVLINK_URL";
const ENV_MAX_ATTEMPTS: &str = "KVLINK_RECONNECT_MAX_ATTEMPTS";
const ENV_MAX_RETRY_TIME: &str = "KVLINK_RECONNECT_MAX_RETRY_TIME";
const ENV_BACKOFF_FACTOR: &str = "KVLINK_RECONNECT_BACKOFF_FACTOR";
const ENV_BACKOFF_MINIMUM: &str = "KVLINK_RECONNECT_BACKOFF_MINIMUM";
const ENV_DEBUG: &str = "KVLINK_DEBUG";

/// Configures the server address and reconnection behavior.
///
/// Created once at process configuration time and never mutated afterwards;
/// the builder and the retry policy copy what they need. All times are
/// milliseconds.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Server address, `host:port` with an optional `scheme://` prefix.
    pub url: String,
    /// Maximum number of reconnect attempts within one episode.
    pub max_retry_attempts: u32,
    /// Ceiling on cumulative retry time within one episode.
    pub max_retry_time_ms: u64,
    /// Per-attempt backoff increment (linear strategy).
    pub backoff_factor_ms: u64,
    /// Floor for the computed backoff delay.
    pub backoff_minimum_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:6379".to_owned(),
            max_retry_attempts: 10,
            max_retry_time_ms: 60_000,
            backoff_factor_ms: 250,
            backoff_minimum_ms: 500,
        }
    }
}

impl ConnectionConfig {
    /// Creates a configuration for the given server address with default
    /// reconnection behavior.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Reads the configuration from `KVLINK_*` environment variables.
    ///
    /// Reads:
    /// - `KVLINK_URL` — server address (required)
    /// - `KVLINK_RECONNECT_MAX_ATTEMPTS` — attempt ceiling per episode
    /// - `KVLINK_RECONNECT_MAX_RETRY_TIME` — retry-time ceiling in ms
    /// - `KVLINK_RECONNECT_BACKOFF_FACTOR` — per-attempt increment in ms
    /// - `KVLINK_RECONNECT_BACKOFF_MINIMUM` — delay floor in ms
    ///
    /// Unset reconnection variables fall back to the defaults. Returns an
    /// error when the URL is missing or a variable does not parse.
    pub fn from_env() -> Result<Self> {
        let url = env::var(ENV_URL).map_err(|_| {
            KvLinkError::Config(format!("missing {ENV_URL} environment variable"))
        })?;
        if url.trim().is_empty() {
            return Err(KvLinkError::Config(format!("{ENV_URL} is set but empty")));
        }

        let defaults = Self::default();
        let config = Self {
            url,
            max_retry_attempts: env_number(ENV_MAX_ATTEMPTS, defaults.max_retry_attempts)?,
            max_retry_time_ms: env_number(ENV_MAX_RETRY_TIME, defaults.max_retry_time_ms)?,
            backoff_factor_ms: env_number(ENV_BACKOFF_FACTOR, defaults.backoff_factor_ms)?,
            backoff_minimum_ms: env_number(ENV_BACKOFF_MINIMUM, defaults.backoff_minimum_ms)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks for values the connection driver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(KvLinkError::Config("url must not be empty".to_owned()));
        }
        if self.backoff_factor_ms == 0 {
            return Err(KvLinkError::Config(
                "backoff factor must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

fn env_number<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| KvLinkError::Config(format!("{name} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

/// Whether verbose lifecycle diagnostics were requested via `KVLINK_DEBUG`.
///
/// Recognizes `1`, `true`, `yes` and `on`, case-insensitive. Applications
/// check this once at startup and pass the result explicitly to
/// [`ConnectionBuilder::diagnostics`](crate::ConnectionBuilder::diagnostics);
/// nothing in the crate consults the environment at runtime.
pub fn diagnostics_from_env() -> bool {
    match env::var(ENV_DEBUG) {
        Ok(value) => {
            let value = value.trim();
            value.eq_ignore_ascii_case("1")
                || value.eq_ignore_ascii_case("true")
                || value.eq_ignore_ascii_case("yes")
                || value.eq_ignore_ascii_case("on")
        }
        Err(_) => false,
    }
}
