//! Terminal setup and RAII restoration for the overlay renderer.
//!
//! [`Tui`] enters raw mode and the alternate screen on creation and restores
//! the terminal on drop. [`install_panic_hook`] covers panics that happen
//! before the drop handler can run.

use std::io::{self, Stdout};
use std::panic;

use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};

use crate::error::TuiError;

/// Installs a panic hook that restores the terminal before the panic message
/// is printed.
///
/// Call once at startup, before creating a [`Tui`].
pub fn install_panic_hook() {
    let previous_hook = panic::take_hook();

    panic::set_hook(Box::new(move |panic_info| {
        // Best effort: the terminal may already be half torn down.
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();

        previous_hook(panic_info);
    }));
}

/// Ratatui terminal that restores the shell when dropped.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    restored: bool,
}

impl Tui {
    /// Enables raw mode, enters the alternate screen and hides the cursor.
    ///
    /// # Errors
    ///
    /// Returns [`TuiError::TerminalInit`] if any step fails. Steps already
    /// taken are rolled back.
    pub fn new() -> Result<Self, TuiError> {
        enable_raw_mode().map_err(TuiError::TerminalInit)?;

        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(TuiError::TerminalInit(e));
        }

        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(t) => t,
            Err(e) => {
                let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
                let _ = disable_raw_mode();
                return Err(TuiError::TerminalInit(e));
            }
        };

        Ok(Self {
            terminal,
            restored: false,
        })
    }

    /// Draws one frame.
    ///
    /// # Errors
    ///
    /// Returns [`TuiError::Render`] if the frame cannot be written.
    pub fn draw<F>(&mut self, f: F) -> Result<(), TuiError>
    where
        F: FnOnce(&mut ratatui::Frame),
    {
        self.terminal.draw(f).map_err(TuiError::Render)?;
        Ok(())
    }

    /// Restores the terminal explicitly, reporting failures.
    ///
    /// Dropping the [`Tui`] afterwards is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`TuiError::Render`] if the terminal cannot be restored.
    pub fn restore(&mut self) -> Result<(), TuiError> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;

        execute!(io::stdout(), Show, LeaveAlternateScreen).map_err(TuiError::Render)?;
        disable_raw_mode().map_err(TuiError::Render)?;
        Ok(())
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        if self.restored {
            return;
        }

        // Errors ignored: we may be unwinding.
        let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Creating a Tui needs a real terminal, so only the API surface is checked.

    #[test]
    fn tui_struct_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Tui>();
    }

    #[test]
    fn install_panic_hook_can_be_called_twice() {
        install_panic_hook();
        install_panic_hook();
    }
}
