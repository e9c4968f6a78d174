//! TUI rendering for fontsynth

mod presets;
mod status;

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Status bar
            Constraint::Min(6),    // Preset list
            Constraint::Length(1), // Help bar
        ])
        .split(frame.area());

    status::render_status(frame, chunks[0], app);
    presets::render_presets(frame, chunks[1], app);

    let help = Paragraph::new(
        " [a-;] Play  [0-8] Octave  [Space] Release  [↑/↓] Preset  [Tab] Pause  [Q] Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[2]);
}
