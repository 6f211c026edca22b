//! Render loop: draws the latest [`OverlayState`] until the user quits.

use tokio::sync::{mpsc, oneshot, watch};

use crate::error::TuiError;
use crate::surface::OverlayState;
use crate::tui::events::{key_action, Action, EventHandler, TuiEvent};
use crate::tui::terminal::Tui;
use crate::tui::ui;

/// Capacity of the input event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Renderer state.
#[derive(Debug)]
pub struct App {
    state_rx: watch::Receiver<OverlayState>,
    should_quit: bool,
}

impl App {
    #[must_use]
    pub fn new(state_rx: watch::Receiver<OverlayState>) -> Self {
        Self {
            state_rx,
            should_quit: false,
        }
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Latest overlay snapshot.
    #[must_use]
    pub fn state(&self) -> OverlayState {
        self.state_rx.borrow().clone()
    }

    /// Applies one input event. Returns true if a redraw is needed.
    pub fn handle_event(&mut self, event: &TuiEvent) -> bool {
        match event {
            TuiEvent::Key(key) => {
                if key_action(key) == Action::Quit {
                    self.should_quit = true;
                }
                false
            }
            TuiEvent::Resize(..) => true,
            TuiEvent::Tick => self.state_rx.has_changed().unwrap_or(false),
        }
    }

    /// Takes over the terminal and draws until the user quits or `shutdown`
    /// resolves.
    ///
    /// # Errors
    ///
    /// Returns a [`TuiError`] if the terminal cannot be set up or drawn to.
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), TuiError>
    where
        F: std::future::Future<Output = ()>,
    {
        let mut tui = Tui::new()?;

        let (event_tx, mut event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = oneshot::channel();
        let input = tokio::spawn(EventHandler::new(event_tx, stop_rx).run());

        tokio::pin!(shutdown);
        self.draw(&mut tui)?;

        while !self.should_quit {
            tokio::select! {
                _ = &mut shutdown => break,
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    if self.handle_event(&event) {
                        self.draw(&mut tui)?;
                    }
                }
            }
        }

        let _ = stop_tx.send(());
        let _ = input.await;
        tui.restore()
    }

    fn draw(&mut self, tui: &mut Tui) -> Result<(), TuiError> {
        let state = self.state_rx.borrow_and_update().clone();
        tui.draw(|frame| ui::render(frame, &state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Surface, WatchSurface};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    #[test]
    fn quit_key_sets_should_quit() {
        let (_surface, rx) = WatchSurface::new();
        let mut app = App::new(rx);

        app.handle_event(&TuiEvent::Key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE)));
        assert!(!app.should_quit());

        app.handle_event(&TuiEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(app.should_quit());
    }

    #[test]
    fn tick_redraws_only_after_state_change() {
        let (mut surface, rx) = WatchSurface::new();
        let mut app = App::new(rx);

        assert!(!app.handle_event(&TuiEvent::Tick));

        surface.set_progress(10.0);
        assert!(app.handle_event(&TuiEvent::Tick));
        assert_eq!(app.state().progress, Some(10.0));
    }

    #[test]
    fn resize_always_redraws() {
        let (_surface, rx) = WatchSurface::new();
        let mut app = App::new(rx);
        assert!(app.handle_event(&TuiEvent::Resize(100, 30)));
    }
}
