//! Subscriber authentication.
//!
//! A subscriber authenticates with the first text frame on its socket: an
//! [`AuthPayload`] whose `api_key` must match the hub's key. The comparison
//! is constant-time. The payload's `events` list becomes the subscriber's
//! [`Subscription`].

use std::collections::HashSet;

use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::types::AuthPayload;

/// Reasons a subscriber is turned away.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// The first frame was not an auth payload.
    #[error("malformed auth payload")]
    Malformed,

    /// The api key did not match.
    #[error("invalid api key")]
    InvalidApiKey,

    /// No auth frame arrived in time.
    #[error("auth timed out")]
    Timeout,
}

/// Event names one subscriber asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscription {
    events: HashSet<String>,
}

impl Subscription {
    pub fn new<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns true if envelopes named `event` should be forwarded.
    #[must_use]
    pub fn wants(&self, event: &str) -> bool {
        self.events.contains(event)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

/// Compares two keys in constant time.
///
/// # Errors
///
/// Returns [`AuthError::InvalidApiKey`] if the keys differ.
pub fn validate_api_key(provided: &str, expected: &str) -> Result<(), AuthError> {
    if provided.as_bytes().ct_eq(expected.as_bytes()).into() {
        Ok(())
    } else {
        Err(AuthError::InvalidApiKey)
    }
}

/// Checks a subscriber's first frame.
///
/// With `expected_key` set to `None` (unsafe mode) any well-formed payload is
/// accepted.
///
/// # Errors
///
/// Returns [`AuthError::Malformed`] if `frame` is not an [`AuthPayload`] and
/// [`AuthError::InvalidApiKey`] if the key does not match.
pub fn authenticate(frame: &str, expected_key: Option<&str>) -> Result<Subscription, AuthError> {
    let payload: AuthPayload = serde_json::from_str(frame).map_err(|_| AuthError::Malformed)?;

    if let Some(expected) = expected_key {
        validate_api_key(&payload.api_key, expected)?;
    }

    Ok(Subscription::new(payload.events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EVENT_DONATION;

    fn frame(api_key: &str, events: &[&str]) -> String {
        serde_json::json!({
            "author": "CzlowiekImadlo",
            "website": "czlowiekimadlo.pl",
            "api_key": api_key,
            "events": events,
        })
        .to_string()
    }

    #[test]
    fn matching_key_yields_subscription() {
        let sub = authenticate(&frame("secret", &[EVENT_DONATION]), Some("secret")).unwrap();
        assert!(sub.wants(EVENT_DONATION));
        assert!(!sub.wants("EVENT_FOLLOW"));
        assert_eq!(sub.len(), 1);
    }

    #[test]
    fn wrong_key_is_rejected() {
        assert_eq!(
            authenticate(&frame("guess", &[EVENT_DONATION]), Some("secret")),
            Err(AuthError::InvalidApiKey)
        );
    }

    #[test]
    fn prefix_of_key_is_rejected() {
        assert!(validate_api_key("secre", "secret").is_err());
        assert!(validate_api_key("", "secret").is_err());
        assert!(validate_api_key("secret", "secret").is_ok());
    }

    #[test]
    fn non_json_frame_is_malformed() {
        assert_eq!(
            authenticate("hello", Some("secret")),
            Err(AuthError::Malformed)
        );
        assert_eq!(
            authenticate(r#"{"event":"EVENT_DONATION"}"#, None),
            Err(AuthError::Malformed)
        );
    }

    #[test]
    fn unsafe_mode_skips_key_check() {
        let sub = authenticate(&frame("anything", &[]), None).unwrap();
        assert!(sub.is_empty());
    }
}
