//! Overlay display settings.
//!
//! The chatbot script that drives the overlay saves its settings twice: once
//! as `settings.json` and once as `settings.js` (`var settings = {...};`) so a
//! browser page can include them. Both forms are accepted here. Only the keys
//! the overlay renders are read; everything else in the file is ignored.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default text shown before the goal numbers.
const DEFAULT_GOAL_TEXT: &str = "Goal";

/// Default currency label.
const DEFAULT_CURRENCY_NAME: &str = "USD";

/// Prefix of the generated JavaScript settings file.
const JS_ASSIGNMENT_PREFIX: &str = "var settings";

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read.
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings document is not valid JSON.
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Values the overlay needs to render a donation update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OverlaySettings {
    /// Label shown before `value/goal`.
    pub goal_text: String,

    /// Currency label shown after `value/goal`.
    pub currency_name: String,

    /// Sound resource referenced by the cue element. Empty means none.
    pub donate_sound: String,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            goal_text: DEFAULT_GOAL_TEXT.to_string(),
            currency_name: DEFAULT_CURRENCY_NAME.to_string(),
            donate_sound: String::new(),
        }
    }
}

impl OverlaySettings {
    /// Loads settings from a `settings.json` or `settings.js` file.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Self::parse(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses settings from file contents in either supported form.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the document is malformed.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_body(contents))
    }
}

/// Strips the UTF-8 BOM and the `var settings = ...;` wrapper if present.
fn json_body(contents: &str) -> &str {
    let trimmed = contents.trim_start_matches('\u{feff}').trim();

    match trimmed.strip_prefix(JS_ASSIGNMENT_PREFIX) {
        Some(rest) => rest
            .trim_start()
            .trim_start_matches('=')
            .trim()
            .trim_end_matches(';')
            .trim_end(),
        None => trimmed,
    }
}
