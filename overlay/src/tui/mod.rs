//! Terminal renderer for the overlay.
//!
//! - [`app`]: render loop driven by overlay state changes and key input
//! - [`events`]: crossterm input and redraw ticks
//! - [`terminal`]: terminal setup and teardown with panic handling
//! - [`ui`]: frame layout

pub mod app;
pub mod events;
pub mod terminal;
pub mod ui;

pub use app::App;
pub use events::{Action, EventHandler, TuiEvent};
pub use terminal::{install_panic_hook, Tui};
