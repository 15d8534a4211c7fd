//! TUI for n333
//!
//! Stateless rendering: the app builds a [`View`] every frame and these
//! functions draw it.

mod params;
mod status;
mod voices;
mod waveform;

use n333_synth::params::{Parameters, PlaybackMode};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::Paragraph,
    Frame,
};

pub use params::ParamField;

use params::render_params;
use status::render_status;
use voices::render_voices;
use waveform::render_waveform;

/// One sounding voice, as displayed.
pub struct VoiceRow {
    pub id: String,
    pub frequency: f32,
    pub phase: &'static str,
    pub sources: usize,
    pub level: f32,
}

/// Everything a frame shows.
pub struct View<'a> {
    pub params: Parameters,
    pub mode: PlaybackMode,
    pub voices: Vec<VoiceRow>,
    pub scope: &'a [f32],
    pub selected: usize,
    pub sample_rate: f32,
    pub midi_port: Option<&'a str>,
    pub midi_held: usize,
    pub key_release: bool,
}

pub fn render(frame: &mut Frame, view: &View) {
    let area = frame.area();

    // Main layout: status, params + voices, scope, help
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Status bar
            Constraint::Min(15),    // Params | voices
            Constraint::Length(10), // Oscilloscope
            Constraint::Length(1),  // Help bar
        ])
        .split(area);

    render_status(frame, chunks[0], view);

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(chunks[1]);
    render_params(frame, middle[0], &view.params, view.selected);
    render_voices(frame, middle[1], &view.voices);

    render_waveform(frame, chunks[2], view.scope);

    let help = Paragraph::new(
        " [z..m q..p] Play  [↑↓] Select  [←→] Adjust  [PgUp/PgDn] Octave  [Tab] Mode  [Space] Panic  [Esc] Quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[3]);
}
