//! Active voice list

use ratatui::{
    layout::{Constraint, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Row, Table},
    Frame,
};

use super::VoiceRow;

const LEVEL_WIDTH: usize = 12;

pub fn render_voices(frame: &mut Frame, area: Rect, voices: &[VoiceRow]) {
    let block = Block::default()
        .title(format!(" Voices ({}) ", voices.len()))
        .borders(Borders::ALL);

    let header = Row::new(["id", "Hz", "osc", "phase", "level"])
        .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let rows = voices.iter().map(|v| {
        let color = match v.phase {
            "attack" => Color::LightGreen,
            "sustain" => Color::LightCyan,
            _ => Color::LightRed,
        };
        Row::new([
            v.id.clone(),
            format!("{:.2}", v.frequency),
            v.sources.to_string(),
            v.phase.to_string(),
            level_bar(v.level),
        ])
        .style(Style::default().fg(color))
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Length(9),
            Constraint::Length(4),
            Constraint::Length(8),
            Constraint::Min(LEVEL_WIDTH as u16),
        ],
    )
    .header(header)
    .block(block);

    frame.render_widget(table, area);
}

fn level_bar(level: f32) -> String {
    let filled = (level.clamp(0.0, 1.0) * LEVEL_WIDTH as f32).round() as usize;
    format!("{}{}", "█".repeat(filled), "·".repeat(LEVEL_WIDTH - filled))
}
