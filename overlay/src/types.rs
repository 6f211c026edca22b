//! Wire types for the donation event protocol.
//!
//! The event source speaks text-framed JSON. The client sends one
//! [`AuthPayload`] when the socket opens and then receives [`Envelope`]s whose
//! `data` field is itself a JSON document. Only [`EVENT_DONATION`] envelopes
//! carry a payload the overlay understands ([`DonationEvent`]).

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// Event name for donation goal updates.
pub const EVENT_DONATION: &str = "EVENT_DONATION";

/// Author identity announced to the event source.
pub const AUTH_AUTHOR: &str = "CzlowiekImadlo";

/// Website announced to the event source.
pub const AUTH_WEBSITE: &str = "czlowiekimadlo.pl";

/// Event names the overlay subscribes to.
pub const SUBSCRIBED_EVENTS: &[&str] = &[EVENT_DONATION];

/// Authentication message sent once per connection, right after open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub author: String,
    pub website: String,
    pub api_key: String,
    pub events: Vec<String>,
}

impl AuthPayload {
    /// Builds the payload for the given credential with the fixed identity and
    /// subscription list.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            author: AUTH_AUTHOR.to_string(),
            website: AUTH_WEBSITE.to_string(),
            api_key: api_key.into(),
            events: SUBSCRIBED_EVENTS.iter().map(|e| (*e).to_string()).collect(),
        }
    }
}

/// Outer message shape pushed by the event source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub event: String,

    /// Nested JSON document, still encoded as a string.
    #[serde(default)]
    pub data: String,
}

impl Envelope {
    /// Returns true if this envelope carries a donation update.
    #[must_use]
    pub fn is_donation(&self) -> bool {
        self.event == EVENT_DONATION
    }

    /// Decodes the nested donation payload.
    ///
    /// # Errors
    ///
    /// Returns a JSON error if `data` is not a valid [`DonationEvent`].
    pub fn donation(&self) -> Result<DonationEvent, serde_json::Error> {
        serde_json::from_str(&self.data)
    }
}

/// Goal progress carried by an [`EVENT_DONATION`] envelope.
///
/// `value` and `goal` are kept as JSON numbers so they render exactly as the
/// event source sent them (`50`, not `50.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonationEvent {
    pub value: Number,
    pub goal: Number,

    /// Percentage of the goal reached, used as the progress bar width.
    pub progress: f64,

    /// Audio cue suppression. Absent means the event source did not say.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
}

impl DonationEvent {
    /// Returns true only when the event explicitly asks for the sound cue.
    #[must_use]
    pub fn plays_sound(&self) -> bool {
        self.quiet == Some(false)
    }
}
