//! Overlay client: one connection, one message handler, one reconnect timer.
//!
//! The client owns a single [`Connection`] at a time. Its lifecycle is
//! `Disconnected → Connecting → Connected → Disconnected → …` and never ends:
//! every close, whether the server dropped us, the network failed, or the
//! handshake never completed, discards the handle and schedules a new attempt
//! after a fixed delay. There is no backoff and no retry cap.
//!
//! # Example
//!
//! ```no_run
//! use donation_overlay::client::{ClientOptions, OverlayClient};
//! use donation_overlay::settings::OverlaySettings;
//! use donation_overlay::surface::LogSurface;
//! use donation_overlay::transport::WsTransport;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut client = OverlayClient::new(
//!         WsTransport::new(),
//!         LogSurface::new(),
//!         OverlaySettings::default(),
//!         ClientOptions::default(),
//!     );
//!
//!     // Only returns if no API key is configured.
//!     if let Err(err) = client.run(Some("api-key".to_string())).await {
//!         eprintln!("{err}");
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::config::{Config, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SERVER_URL};
use crate::error::{OverlayError, Result};
use crate::settings::OverlaySettings;
use crate::surface::{apply_donation, Surface, MISSING_API_KEY_MESSAGE};
use crate::transport::{Connection, SocketEvent, Transport};
use crate::types::{AuthPayload, Envelope};

/// Connection lifecycle of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// No connection handle is held.
    Disconnected,

    /// A connection attempt is in flight.
    Connecting,

    /// The socket is open and authenticated.
    Connected,
}

/// Connection parameters for the client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Event source endpoint.
    pub server_url: String,

    /// Fixed delay between a close and the next attempt.
    pub reconnect_delay: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        }
    }
}

impl From<&Config> for ClientOptions {
    fn from(config: &Config) -> Self {
        Self {
            server_url: config.server_url.clone(),
            reconnect_delay: config.reconnect_delay,
        }
    }
}

/// Donation overlay client.
pub struct OverlayClient<T, S> {
    transport: T,
    surface: S,
    settings: OverlaySettings,
    options: ClientOptions,
    api_key: Option<String>,
    connection: Option<Connection>,
    state: ClientState,
    attempts: u64,
}

impl<T: Transport, S: Surface> OverlayClient<T, S> {
    /// Creates a client that has not started yet.
    #[must_use]
    pub fn new(transport: T, surface: S, settings: OverlaySettings, options: ClientOptions) -> Self {
        Self {
            transport,
            surface,
            settings,
            options,
            api_key: None,
            connection: None,
            state: ClientState::Disconnected,
            attempts: 0,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Number of connection attempts made so far.
    #[must_use]
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Returns true while a connection handle is held.
    #[must_use]
    pub fn has_connection(&self) -> bool {
        self.connection.is_some()
    }

    /// The surface this client drives.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Validates the credential and opens the first connection.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError::MissingApiKey`] when `api_key` is `None` or
    /// blank. The overlay shows [`MISSING_API_KEY_MESSAGE`] and no connection
    /// is attempted.
    pub fn start(&mut self, api_key: Option<String>) -> Result<()> {
        match api_key.filter(|key| !key.trim().is_empty()) {
            Some(key) => {
                self.api_key = Some(key);
                self.connect();
                Ok(())
            }
            None => {
                warn!("No API key configured, not connecting");
                self.surface.show_error(MISSING_API_KEY_MESSAGE);
                Err(OverlayError::MissingApiKey)
            }
        }
    }

    /// Opens a connection to the configured endpoint, replacing any handle
    /// still held.
    pub fn connect(&mut self) {
        self.attempts += 1;
        debug!(
            url = %self.options.server_url,
            attempt = self.attempts,
            "Opening connection"
        );

        // Dropping the previous handle tears its socket down.
        self.connection = Some(self.transport.open(&self.options.server_url));
        self.state = ClientState::Connecting;
    }

    /// Starts the client and keeps it connected forever.
    ///
    /// # Errors
    ///
    /// Only returns, with [`OverlayError::MissingApiKey`], when no credential
    /// is available. Otherwise the future never completes; drop it to stop.
    pub async fn run(&mut self, api_key: Option<String>) -> Result<()> {
        self.start(api_key)?;

        loop {
            self.step().await;
        }
    }

    /// Waits for the next connection event and handles it. A close is
    /// followed by the reconnect delay and a fresh attempt.
    pub async fn step(&mut self) {
        let event = match self.connection.as_mut() {
            Some(connection) => connection.next_event().await,
            None => SocketEvent::Close,
        };

        if self.handle_event(event) {
            info!(
                delay_ms = self.options.reconnect_delay.as_millis() as u64,
                "Connection closed, reconnecting"
            );
            sleep(self.options.reconnect_delay).await;
            self.connect();
        }
    }

    /// Handles one connection event. Returns true if the connection closed.
    pub fn handle_event(&mut self, event: SocketEvent) -> bool {
        match event {
            SocketEvent::Open => {
                self.state = ClientState::Connected;
                info!(url = %self.options.server_url, "Connection open, authenticating");
                self.send_auth();
                false
            }
            SocketEvent::Message(text) => {
                self.handle_message(&text);
                false
            }
            SocketEvent::Error(err) => {
                warn!(error = %err, "Connection error");
                false
            }
            SocketEvent::Close => {
                self.connection = None;
                self.state = ClientState::Disconnected;
                true
            }
        }
    }

    /// Interprets one inbound text frame.
    ///
    /// Malformed frames are logged and dropped; the connection stays up.
    pub fn handle_message(&mut self, text: &str) {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!(error = %err, "Ignoring malformed message");
                return;
            }
        };

        debug!(event = %envelope.event, "Message received");

        if !envelope.is_donation() {
            trace!(event = %envelope.event, "Ignoring event");
            return;
        }

        match envelope.donation() {
            Ok(donation) => {
                info!(
                    value = %donation.value,
                    goal = %donation.goal,
                    progress = donation.progress,
                    quiet = ?donation.quiet,
                    "Donation update"
                );
                apply_donation(&self.settings, &donation, &mut self.surface);
            }
            Err(err) => {
                warn!(error = %err, "Ignoring malformed donation payload");
            }
        }
    }

    /// Sends the auth payload on the current connection.
    fn send_auth(&mut self) {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!("Connection opened without an API key");
            return;
        };

        let payload = match auth_message(api_key) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "Failed to encode auth payload");
                return;
            }
        };

        if let Some(connection) = self.connection.as_ref() {
            if !connection.send(payload) {
                debug!("Connection gone before auth could be sent");
            }
        }
    }
}

/// Serializes the auth payload for `api_key`.
///
/// # Errors
///
/// Returns [`OverlayError::Json`] if serialization fails.
pub fn auth_message(api_key: &str) -> Result<String> {
    Ok(serde_json::to_string(&AuthPayload::new(api_key))?)
}
