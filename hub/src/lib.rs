//! Donation Hub - local donation event source.
//!
//! Speaks the overlay's protocol on `ws://127.0.0.1:3337/streamlabs`: each
//! subscriber authenticates with its first frame, and the hub pushes
//! `EVENT_DONATION` envelopes whenever the goal ledger changes. Donations and
//! goal changes come in over a small HTTP API.
//!
//! # Modules
//!
//! - [`config`]: Configuration from environment variables
//! - [`ledger`]: Goal and accumulated value, progress calculation
//! - [`broadcast`]: Envelope fan-out to subscribers
//! - [`auth`]: Subscriber auth payload check
//! - [`routes`]: HTTP and WebSocket handlers
//! - [`types`]: Wire types
//! - [`error`]: Error types

pub mod auth;
pub mod broadcast;
pub mod config;
pub mod error;
pub mod ledger;
pub mod routes;
pub mod types;

pub use config::Config;
pub use error::{HubError, Result};
pub use ledger::{Ledger, LedgerSnapshot};
pub use routes::{create_router, AppState};
