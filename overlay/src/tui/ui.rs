//! Frame rendering for the overlay.
//!
//! ```text
//! render() --> match state.error {
//!     Some(message) --> render_error_screen()
//!     None          --> render_overlay_screen()
//! }
//! ```

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Text},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::surface::OverlayState;

/// Error text colour, `#ff8080`.
pub const ERROR_COLOR: Color = Color::Rgb(255, 128, 128);

const GAUGE_COLOR: Color = Color::Rgb(80, 200, 120);

/// Renders the overlay for `state`.
pub fn render(frame: &mut Frame, state: &OverlayState) {
    match state.error.as_deref() {
        Some(message) => render_error_screen(frame, message),
        None => render_overlay_screen(frame, state),
    }
}

/// Replaces the whole overlay with a centered error message.
pub fn render_error_screen(frame: &mut Frame, message: &str) {
    let area = frame.area();
    let lines = message.lines().count() as u16;

    let [_, middle, _] = Layout::vertical([
        Constraint::Fill(1),
        Constraint::Length(lines.max(1)),
        Constraint::Fill(1),
    ])
    .areas(area);

    let paragraph = Paragraph::new(Text::from(message.to_string()))
        .style(Style::default().fg(ERROR_COLOR).bold())
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, middle);
}

fn render_overlay_screen(frame: &mut Frame, state: &OverlayState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Donation Goal ");
    let inner = block.inner(frame.area());
    frame.render_widget(block, frame.area());

    let [goal_area, gauge_area, sound_area, help_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .spacing(1)
    .areas(inner);

    let goal = state
        .goal_text
        .clone()
        .unwrap_or_else(|| "Waiting for donations...".to_string());
    frame.render_widget(
        Paragraph::new(goal).alignment(Alignment::Center),
        goal_area,
    );

    render_gauge(frame, gauge_area, state);

    if let Some(sound) = state.sound.as_deref() {
        frame.render_widget(
            Paragraph::new(Line::from(format!("♪ {sound}")).italic())
                .alignment(Alignment::Center),
            sound_area,
        );
    }

    frame.render_widget(
        Paragraph::new(Line::from("q: quit").dim()).alignment(Alignment::Right),
        bottom_line(help_area),
    );
}

fn render_gauge(frame: &mut Frame, area: Rect, state: &OverlayState) {
    let percent = state.gauge_percent();
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(GAUGE_COLOR))
        .percent(percent)
        .label(format!("{percent}%"));
    frame.render_widget(gauge, area);
}

fn bottom_line(area: Rect) -> Rect {
    Rect {
        y: area.y + area.height.saturating_sub(1),
        height: area.height.min(1),
        ..area
    }
}
