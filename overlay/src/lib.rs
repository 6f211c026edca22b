//! Donation Overlay - goal progress display for a local donation event source.
//!
//! The overlay keeps one WebSocket connection to the event source (by default
//! `ws://127.0.0.1:3337/streamlabs`), authenticates once per connection, and
//! turns `EVENT_DONATION` messages into a goal line, a progress bar and an
//! optional sound cue. Every other event is ignored.
//!
//! The connection never gives up: after any close it waits a fixed five
//! seconds and tries again.
//!
//! # Modules
//!
//! - [`client`]: Connection lifecycle, auth, message dispatch and reconnect
//! - [`transport`]: WebSocket transport behind a channel-based seam
//! - [`surface`]: Display targets the client drives
//! - [`types`]: Wire types (auth payload, envelope, donation payload)
//! - [`settings`]: Display settings (goal label, currency, sound)
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error types
//! - [`tui`]: Terminal renderer

pub mod client;
pub mod config;
pub mod error;
pub mod settings;
pub mod surface;
pub mod transport;
pub mod tui;
pub mod types;

pub use client::{ClientOptions, ClientState, OverlayClient};
pub use config::Config;
pub use error::{OverlayError, Result, TuiError};
pub use settings::OverlaySettings;
pub use surface::{LogSurface, OverlayState, Surface, WatchSurface, MISSING_API_KEY_MESSAGE};
pub use transport::{Connection, SocketEvent, Transport, WsTransport};
pub use types::{AuthPayload, DonationEvent, Envelope, EVENT_DONATION};
