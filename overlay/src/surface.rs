//! Presentation surface for the overlay.
//!
//! The client never draws anything itself. It drives a [`Surface`], which
//! owns three display targets (goal text, progress bar width, sound cue) plus
//! the fatal error message shown when no credential is configured.
//!
//! Implementations:
//!
//! - [`OverlayState`]: plain in-memory state, also the snapshot type renderers draw
//! - [`WatchSurface`]: publishes snapshots over a [`tokio::sync::watch`] channel
//! - [`LogSurface`]: headless output through `tracing`

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::settings::OverlaySettings;
use crate::types::DonationEvent;

/// Message shown on the overlay when no API key is available.
pub const MISSING_API_KEY_MESSAGE: &str = "No API Key found or load!\n\
     Rightclick on the script in ChatBot and select \"Insert API Key\"";

/// Display targets the client updates.
pub trait Surface {
    /// Replaces the whole overlay with an error message.
    fn show_error(&mut self, message: &str);

    /// Sets the goal text display.
    fn set_goal_text(&mut self, text: String);

    /// Sets the progress bar width, in percent.
    fn set_progress(&mut self, percent: f64);

    /// Points the sound cue at a resource, or clears it with `None`.
    fn set_sound(&mut self, source: Option<String>);
}

/// Snapshot of everything the overlay shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayState {
    /// Goal text, `None` until the first donation update.
    pub goal_text: Option<String>,

    /// Progress bar width in percent, `None` until the first donation update.
    pub progress: Option<f64>,

    /// Sound resource the cue element references.
    pub sound: Option<String>,

    /// Fatal error replacing the overlay content.
    pub error: Option<String>,
}

impl OverlayState {
    /// Creates an empty overlay.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress clamped to the drawable 0..=100 range.
    #[must_use]
    pub fn gauge_percent(&self) -> u16 {
        let percent = self.progress.unwrap_or(0.0);
        percent.clamp(0.0, 100.0).floor() as u16
    }
}

impl Surface for OverlayState {
    fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    fn set_goal_text(&mut self, text: String) {
        self.goal_text = Some(text);
    }

    fn set_progress(&mut self, percent: f64) {
        self.progress = Some(percent);
    }

    fn set_sound(&mut self, source: Option<String>) {
        self.sound = source;
    }
}

/// Surface that publishes every change to a renderer.
#[derive(Debug)]
pub struct WatchSurface {
    tx: watch::Sender<OverlayState>,
}

impl WatchSurface {
    /// Creates the surface and the receiver a renderer should watch.
    #[must_use]
    pub fn new() -> (Self, watch::Receiver<OverlayState>) {
        let (tx, rx) = watch::channel(OverlayState::new());
        (Self { tx }, rx)
    }

    /// Returns the latest published state.
    #[must_use]
    pub fn snapshot(&self) -> OverlayState {
        self.tx.borrow().clone()
    }
}

impl Surface for WatchSurface {
    fn show_error(&mut self, message: &str) {
        self.tx.send_modify(|state| state.show_error(message));
    }

    fn set_goal_text(&mut self, text: String) {
        self.tx.send_modify(|state| state.set_goal_text(text));
    }

    fn set_progress(&mut self, percent: f64) {
        self.tx.send_modify(|state| state.set_progress(percent));
    }

    fn set_sound(&mut self, source: Option<String>) {
        self.tx.send_modify(|state| state.set_sound(source));
    }
}

/// Headless surface that reports updates as log lines.
#[derive(Debug, Default)]
pub struct LogSurface {
    state: OverlayState,
}

impl LogSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the state accumulated so far.
    #[must_use]
    pub fn state(&self) -> &OverlayState {
        &self.state
    }
}

impl Surface for LogSurface {
    fn show_error(&mut self, message: &str) {
        error!(message = %message, "Overlay error");
        self.state.show_error(message);
    }

    fn set_goal_text(&mut self, text: String) {
        info!(goal = %text, "Goal updated");
        self.state.set_goal_text(text);
    }

    fn set_progress(&mut self, percent: f64) {
        info!(progress = percent, "Progress updated");
        self.state.set_progress(percent);
    }

    fn set_sound(&mut self, source: Option<String>) {
        match &source {
            Some(sound) => info!(sound = %sound, "Sound cue"),
            None => debug!("Sound cue cleared"),
        }
        self.state.set_sound(source);
    }
}

/// Formats the goal line: `"{GoalText} {value}/{goal} {CurrencyName}"`.
#[must_use]
pub fn goal_text(settings: &OverlaySettings, event: &DonationEvent) -> String {
    format!(
        "{} {}/{} {}",
        settings.goal_text, event.value, event.goal, settings.currency_name
    )
}

/// Applies a donation update to the surface.
///
/// The sound cue points at the configured sound only when the event explicitly
/// says it is not quiet and a sound is configured; otherwise it is cleared.
pub fn apply_donation<S: Surface + ?Sized>(
    settings: &OverlaySettings,
    event: &DonationEvent,
    surface: &mut S,
) {
    surface.set_goal_text(goal_text(settings, event));
    surface.set_progress(event.progress);

    let sound = if event.plays_sound() && !settings.donate_sound.is_empty() {
        Some(settings.donate_sound.clone())
    } else {
        None
    };
    surface.set_sound(sound);
}
