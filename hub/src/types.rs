//! Wire types shared by the hub's WebSocket and HTTP endpoints.

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Event name carried by goal progress updates.
pub const EVENT_DONATION: &str = "EVENT_DONATION";

/// First frame a subscriber sends after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub website: String,

    pub api_key: String,

    /// Event names the subscriber wants forwarded.
    #[serde(default)]
    pub events: Vec<String>,
}

/// Message pushed to subscribers: an event name and a JSON document encoded
/// as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,
    pub data: String,
}

impl Envelope {
    /// Wraps a donation payload in an [`EVENT_DONATION`] envelope.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if the payload cannot be serialized.
    pub fn donation(payload: &DonationPayload) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event: EVENT_DONATION.to_string(),
            data: serde_json::to_string(payload)?,
        })
    }
}

/// Body of an [`EVENT_DONATION`] envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationPayload {
    pub value: Number,
    pub goal: Number,
    pub progress: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
}

/// Renders whole amounts as JSON integers (`50`, not `50.0`).
#[must_use]
pub fn amount_number(amount: f64) -> Number {
    if amount.fract() == 0.0 && amount >= 0.0 && amount < u64::MAX as f64 {
        Number::from(amount as u64)
    } else {
        Number::from_f64(amount).unwrap_or_else(|| Number::from(0u64))
    }
}
