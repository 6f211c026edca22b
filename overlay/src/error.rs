//! Error types for the donation overlay.
//!
//! Connection failures have no variant here. The client logs them and
//! reconnects; only startup problems and terminal failures become errors.

use thiserror::Error;

use crate::config::ConfigError;
use crate::settings::SettingsError;

/// Errors that can occur during overlay operations.
#[derive(Error, Debug)]
pub enum OverlayError {
    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Display settings could not be loaded.
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),

    /// No API key was configured, so the client refused to connect.
    #[error("no API key configured")]
    MissingApiKey,

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TUI-related error.
    #[error("TUI error: {0}")]
    Tui(#[from] TuiError),
}

/// Errors that can occur during TUI operation.
#[derive(Error, Debug)]
pub enum TuiError {
    /// Terminal initialization failed.
    #[error("failed to initialize terminal: {0}")]
    TerminalInit(#[source] std::io::Error),

    /// Terminal rendering failed.
    #[error("render error: {0}")]
    Render(#[source] std::io::Error),
}

/// A specialized `Result` type for overlay operations.
pub type Result<T> = std::result::Result<T, OverlayError>;
