//! Envelope fan-out to WebSocket subscribers.
//!
//! [`EventBroadcaster`] wraps a tokio broadcast channel. Every subscriber
//! receives every envelope; per-subscriber event filtering happens in the
//! socket handler against the subscriber's auth payload.

use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::{debug, trace};

use crate::types::Envelope;

/// Default channel capacity.
///
/// Subscribers that fall further behind get `RecvError::Lagged` and skip
/// ahead.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Cloneable handle for broadcasting envelopes.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: Sender<Envelope>,
}

impl EventBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        debug!(capacity, "Created event broadcaster");
        Self { sender }
    }

    /// Receives envelopes broadcast from now on.
    #[must_use]
    pub fn subscribe(&self) -> Receiver<Envelope> {
        let rx = self.sender.subscribe();
        debug!(
            subscriber_count = self.subscriber_count(),
            "New subscriber added"
        );
        rx
    }

    /// Sends to all current subscribers. Returns how many received it.
    pub fn broadcast(&self, envelope: Envelope) -> usize {
        trace!(event = %envelope.event, "Broadcasting envelope");

        match self.sender.send(envelope) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No active subscribers to receive envelope");
                0
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EVENT_DONATION;

    fn envelope(event: &str) -> Envelope {
        Envelope {
            event: event.to_string(),
            data: "{}".to_string(),
        }
    }

    #[test]
    fn broadcast_without_subscribers_returns_zero() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.broadcast(envelope(EVENT_DONATION)), 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_envelope() {
        let broadcaster = EventBroadcaster::new();
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        assert_eq!(broadcaster.broadcast(envelope(EVENT_DONATION)), 2);

        assert_eq!(rx1.recv().await.unwrap().event, EVENT_DONATION);
        assert_eq!(rx2.recv().await.unwrap().event, EVENT_DONATION);
    }

    #[test]
    fn subscriber_count_tracks_drops() {
        let broadcaster = EventBroadcaster::new();
        let rx = broadcaster.subscribe();
        let clone = broadcaster.clone();
        assert_eq!(clone.subscriber_count(), 1);

        drop(rx);
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let broadcaster = EventBroadcaster::with_capacity(2);
        let mut rx = broadcaster.subscribe();

        for _ in 0..4 {
            broadcaster.broadcast(envelope(EVENT_DONATION));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
    }
}
