//! Status bar - current note, octave, voices and output state

use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;

pub fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title(" fontsynth ").borders(Borders::ALL);

    let (play_symbol, play_color) = if app.paused {
        ("⏸ Paused", Color::Yellow)
    } else {
        ("▶ Live", Color::Green)
    };
    let note = app.current_note().unwrap_or_else(|| "--".to_string());

    let line = Line::from(vec![
        Span::styled(format!(" {play_symbol}  "), Style::default().fg(play_color)),
        Span::styled(format!("Note: {note:<4} "), Style::default().fg(Color::Cyan)),
        Span::styled(
            format!("Octave: {}  ", app.octave),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Voices: {}/{}  ", app.active_voices(), app.polyphony()),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            format!("{:.1}kHz  ", app.sample_rate() / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(app.status.as_str(), Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
