//! Hub configuration module.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `DONATION_HUB_API_KEY` | Yes* | - | Key subscribers must present |
//! | `DONATION_HUB_PORT` | No | 3337 | Port bound on 127.0.0.1 |
//! | `DONATION_HUB_GOAL` | No | 100 | Donation goal, must be > 0 |
//! | `DONATION_HUB_INITIAL_VALUE` | No | 0 | Starting value, must be >= 0 |
//! | `DONATION_HUB_UNSAFE_NO_AUTH` | No | false | Accept any api key (dev only) |
//!
//! *Not required if `DONATION_HUB_UNSAFE_NO_AUTH=true`

use std::env;

use thiserror::Error;
use tracing::warn;

/// Default port, matching the overlay's default endpoint.
pub const DEFAULT_PORT: u16 = 3337;

pub const DEFAULT_GOAL: f64 = 100.0;

/// Errors that can occur during configuration parsing.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Hub configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Key subscribers must send. `None` only in unsafe mode.
    pub api_key: Option<String>,

    pub port: u16,

    /// Initial donation goal.
    pub goal: f64,

    /// Initial accumulated value.
    pub initial_value: f64,

    /// Accept any api key.
    pub unsafe_no_auth: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            port: DEFAULT_PORT,
            goal: DEFAULT_GOAL,
            initial_value: 0.0,
            unsafe_no_auth: false,
        }
    }
}

impl Config {
    /// Parses configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `DONATION_HUB_API_KEY` is missing and auth is enabled
    /// - `DONATION_HUB_PORT` is not a valid port
    /// - `DONATION_HUB_GOAL` is not a number greater than 0
    /// - `DONATION_HUB_INITIAL_VALUE` is not a non-negative number
    pub fn from_env() -> Result<Self, ConfigError> {
        let unsafe_no_auth = parse_bool_env("DONATION_HUB_UNSAFE_NO_AUTH");
        let api_key = env::var("DONATION_HUB_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());

        let port = match env::var("DONATION_HUB_PORT") {
            Ok(val) => val.parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                key: "DONATION_HUB_PORT".to_string(),
                message: format!("expected port number, got '{val}'"),
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let goal = parse_f64_env("DONATION_HUB_GOAL")?.unwrap_or(DEFAULT_GOAL);
        let initial_value = parse_f64_env("DONATION_HUB_INITIAL_VALUE")?.unwrap_or(0.0);

        let config = Self {
            api_key,
            port,
            goal,
            initial_value,
            unsafe_no_auth,
        };
        config.validate()?;

        if config.unsafe_no_auth {
            warn!("DONATION_HUB_UNSAFE_NO_AUTH is enabled - any api key is accepted");
        }

        Ok(config)
    }

    /// The key to check subscribers against, or `None` in unsafe mode.
    #[must_use]
    pub fn expected_api_key(&self) -> Option<&str> {
        if self.unsafe_no_auth {
            None
        } else {
            self.api_key.as_deref()
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.unsafe_no_auth && self.api_key.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "DONATION_HUB_API_KEY".to_string(),
            ));
        }

        if !(self.goal.is_finite() && self.goal > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "DONATION_HUB_GOAL".to_string(),
                message: "goal must be greater than 0".to_string(),
            });
        }

        if !(self.initial_value.is_finite() && self.initial_value >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "DONATION_HUB_INITIAL_VALUE".to_string(),
                message: "initial value must not be negative".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_bool_env(name: &str) -> bool {
    env::var(name)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn parse_f64_env(name: &str) -> Result<Option<f64>, ConfigError> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: name.to_string(),
                message: format!("expected a number, got '{val}'"),
            }),
        Err(_) => Ok(None),
    }
}
