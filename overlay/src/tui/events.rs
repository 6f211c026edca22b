//! Terminal input for the overlay renderer.
//!
//! [`EventHandler`] multiplexes a redraw tick and crossterm input with
//! `tokio::select!`, forwarding [`TuiEvent`]s over an mpsc channel. Terminal
//! polling is blocking, so it runs on `spawn_blocking`.

use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::sync::{mpsc, oneshot};

/// Redraw interval.
pub const DEFAULT_TICK_RATE_MS: u64 = 100;

const POLL_TIMEOUT_MS: u64 = 10;

/// Events consumed by the render loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    /// Periodic redraw.
    Tick,

    /// Key press.
    Key(KeyEvent),

    /// Terminal resized to (columns, rows).
    Resize(u16, u16),
}

/// What the render loop should do with a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    None,
}

/// Maps a key to an [`Action`]. `q`, `Esc` and `Ctrl+C` quit.
#[must_use]
pub fn key_action(key: &KeyEvent) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        _ => Action::None,
    }
}

/// Produces ticks and terminal input until shut down.
#[derive(Debug)]
pub struct EventHandler {
    event_tx: mpsc::Sender<TuiEvent>,
    shutdown_rx: oneshot::Receiver<()>,
    tick_rate: Duration,
}

impl EventHandler {
    #[must_use]
    pub fn new(event_tx: mpsc::Sender<TuiEvent>, shutdown_rx: oneshot::Receiver<()>) -> Self {
        Self::with_tick_rate(
            event_tx,
            shutdown_rx,
            Duration::from_millis(DEFAULT_TICK_RATE_MS),
        )
    }

    #[must_use]
    pub fn with_tick_rate(
        event_tx: mpsc::Sender<TuiEvent>,
        shutdown_rx: oneshot::Receiver<()>,
        tick_rate: Duration,
    ) -> Self {
        Self {
            event_tx,
            shutdown_rx,
            tick_rate,
        }
    }

    #[must_use]
    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }

    /// Runs until the shutdown signal fires or the receiver goes away.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the polling task panics.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut tick_interval = tokio::time::interval(self.tick_rate);
        tick_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = &mut self.shutdown_rx => {
                    tracing::debug!("EventHandler received shutdown signal");
                    break;
                }

                _ = tick_interval.tick() => {
                    if self.event_tx.send(TuiEvent::Tick).await.is_err() {
                        break;
                    }
                }

                result = async {
                    tokio::time::sleep(Duration::from_millis(POLL_TIMEOUT_MS)).await;
                    tokio::task::spawn_blocking(|| {
                        poll_terminal_event(Duration::from_millis(POLL_TIMEOUT_MS))
                    }).await
                } => {
                    match result {
                        Ok(Some(event)) => {
                            if self.event_tx.send(event).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(join_error) => {
                            tracing::error!("spawn_blocking task panicked: {}", join_error);
                            return Err(std::io::Error::other("Terminal polling task panicked"));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Polls crossterm once. Failures (no terminal) read as "no event".
fn poll_terminal_event(timeout: Duration) -> Option<TuiEvent> {
    match event::poll(timeout) {
        Ok(true) => match event::read() {
            Ok(ev) => convert_crossterm_event(ev),
            Err(e) => {
                tracing::trace!("Failed to read terminal event: {}", e);
                None
            }
        },
        Ok(false) => None,
        Err(e) => {
            tracing::trace!("Failed to poll terminal: {}", e);
            None
        }
    }
}

fn convert_crossterm_event(event: CrosstermEvent) -> Option<TuiEvent> {
    match event {
        CrosstermEvent::Key(key) => Some(TuiEvent::Key(key)),
        CrosstermEvent::Resize(cols, rows) => Some(TuiEvent::Resize(cols, rows)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn quit_keys() {
        assert_eq!(key_action(&press(KeyCode::Char('q'), KeyModifiers::NONE)), Action::Quit);
        assert_eq!(key_action(&press(KeyCode::Esc, KeyModifiers::NONE)), Action::Quit);
        assert_eq!(
            key_action(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Quit
        );
    }

    #[test]
    fn other_keys_do_nothing() {
        assert_eq!(key_action(&press(KeyCode::Char('c'), KeyModifiers::NONE)), Action::None);
        assert_eq!(key_action(&press(KeyCode::Enter, KeyModifiers::NONE)), Action::None);
    }

    #[test]
    fn key_release_is_ignored() {
        let mut key = press(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(key_action(&key), Action::None);
    }

    #[test]
    fn convert_key_and_resize_events() {
        let key = press(KeyCode::Char('a'), KeyModifiers::NONE);
        assert_eq!(
            convert_crossterm_event(CrosstermEvent::Key(key)),
            Some(TuiEvent::Key(key))
        );
        assert_eq!(
            convert_crossterm_event(CrosstermEvent::Resize(80, 24)),
            Some(TuiEvent::Resize(80, 24))
        );
        assert_eq!(convert_crossterm_event(CrosstermEvent::FocusGained), None);
    }

    #[test]
    fn handler_default_tick_rate() {
        let (event_tx, _event_rx) = mpsc::channel(10);
        let (_shutdown_tx, shutdown_rx) = oneshot::channel();

        let handler = EventHandler::new(event_tx, shutdown_rx);
        assert_eq!(handler.tick_rate(), Duration::from_millis(DEFAULT_TICK_RATE_MS));
    }

    #[tokio::test]
    async fn handler_emits_ticks_and_stops_on_shutdown() {
        let (event_tx, mut event_rx) = mpsc::channel(10);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handler =
            EventHandler::with_tick_rate(event_tx, shutdown_rx, Duration::from_millis(5));
        let task = tokio::spawn(handler.run());

        let first = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if let Some(TuiEvent::Tick) = event_rx.recv().await {
                    break;
                }
            }
        })
        .await;
        assert!(first.is_ok(), "no tick received");

        shutdown_tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), task).await;
        assert!(matches!(result, Ok(Ok(Ok(())))));
    }
}
