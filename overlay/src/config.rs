//! Configuration module for the donation overlay.
//!
//! This module handles parsing configuration from environment variables.
//!
//! # Environment Variables
//!
//! | Variable | Required | Default | Description |
//! |----------|----------|---------|-------------|
//! | `DONATION_API_KEY` | No* | - | Credential sent in the auth payload |
//! | `DONATION_API_KEY_FILE` | No* | - | Path to an `API_Key.js` file |
//! | `DONATION_SERVER_URL` | No | `ws://127.0.0.1:3337/streamlabs` | Event source endpoint |
//! | `DONATION_SETTINGS_PATH` | No | - | `settings.json` or `settings.js` with display settings |
//! | `DONATION_RECONNECT_DELAY_MS` | No | 5000 | Delay between connection attempts |
//!
//! *A missing credential is not a configuration error. The client reports it
//! on the overlay when it starts.
//!
//! # Example
//!
//! ```no_run
//! use donation_overlay::config::Config;
//!
//! let config = Config::from_env().expect("Failed to load configuration");
//! println!("Server URL: {}", config.server_url);
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default event source endpoint.
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:3337/streamlabs";

/// Default delay between connection attempts.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5000;

/// Variable name used inside `API_Key.js`.
const API_KEY_JS_VARIABLE: &str = "API_Key";

/// Errors that can occur during configuration parsing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment variable has an invalid value.
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// The API key file could not be read.
    #[error("failed to read API key file {path}: {source}")]
    KeyFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration for the donation overlay.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the event source, if one was provided.
    pub api_key: Option<String>,

    /// WebSocket endpoint of the event source.
    pub server_url: String,

    /// Optional path to the display settings file.
    pub settings_path: Option<PathBuf>,

    /// Fixed delay between a close and the next connection attempt.
    pub reconnect_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            server_url: DEFAULT_SERVER_URL.to_string(),
            settings_path: None,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }
}

impl Config {
    /// Creates a new `Config` by parsing environment variables.
    ///
    /// `DONATION_API_KEY` takes precedence over `DONATION_API_KEY_FILE`. Empty
    /// values count as unset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if:
    /// - `DONATION_API_KEY_FILE` is set but cannot be read
    /// - `DONATION_RECONNECT_DELAY_MS` is not a positive integer
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_key = match non_empty_var("DONATION_API_KEY") {
            Some(key) => Some(key),
            None => match non_empty_var("DONATION_API_KEY_FILE") {
                Some(path) => {
                    let path = PathBuf::from(path);
                    let contents = fs::read_to_string(&path)
                        .map_err(|source| ConfigError::KeyFile { path, source })?;
                    parse_api_key_file(&contents)
                }
                None => None,
            },
        };

        let server_url =
            non_empty_var("DONATION_SERVER_URL").unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        if !server_url.starts_with("ws://") && !server_url.starts_with("wss://") {
            return Err(ConfigError::InvalidValue {
                key: "DONATION_SERVER_URL".to_string(),
                message: format!("expected ws:// or wss:// URL, got '{server_url}'"),
            });
        }

        let settings_path = non_empty_var("DONATION_SETTINGS_PATH").map(PathBuf::from);

        let reconnect_delay = match env::var("DONATION_RECONNECT_DELAY_MS") {
            Ok(val) => {
                let millis = val.parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    key: "DONATION_RECONNECT_DELAY_MS".to_string(),
                    message: format!("expected positive integer, got '{val}'"),
                })?;
                if millis == 0 {
                    return Err(ConfigError::InvalidValue {
                        key: "DONATION_RECONNECT_DELAY_MS".to_string(),
                        message: "reconnect delay must be greater than 0".to_string(),
                    });
                }
                Duration::from_millis(millis)
            }
            Err(_) => Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        };

        Ok(Self {
            api_key,
            server_url,
            settings_path,
            reconnect_delay,
        })
    }
}

/// Reads an environment variable, treating empty or whitespace values as unset.
fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Extracts the key from an `API_Key.js` file (`var API_Key = "...";`).
///
/// Returns `None` when the assignment is missing or the value is empty.
pub fn parse_api_key_file(contents: &str) -> Option<String> {
    let after_name = contents
        .split_once(API_KEY_JS_VARIABLE)
        .map(|(_, rest)| rest)?;
    let after_eq = after_name.trim_start().strip_prefix('=')?.trim_start();

    let quote = after_eq.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after_eq[quote.len_utf8()..];
    let end = value.find(quote)?;
    let key = value[..end].trim();

    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}
