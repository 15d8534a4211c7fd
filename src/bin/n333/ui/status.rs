//! Status bar widget - mode, audio device, MIDI port and output level

use n333_synth::params::PlaybackMode;
use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::View;

/// Output level for display
pub struct AudioStats {
    pub peak: f32,
    pub rms: f32,
}

impl AudioStats {
    pub fn from_buffer(buffer: &[f32]) -> Self {
        if buffer.is_empty() {
            return Self { peak: 0.0, rms: 0.0 };
        }
        let peak = buffer.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        let rms = (buffer.iter().map(|&x| x * x).sum::<f32>() / buffer.len() as f32).sqrt();
        Self { peak, rms }
    }
}

pub fn render_status(frame: &mut Frame, area: Rect, view: &View) {
    let block = Block::default().title(" n333 ").borders(Borders::ALL);
    let stats = AudioStats::from_buffer(view.scope);

    let (mode, mode_color) = match view.mode {
        PlaybackMode::Polyphonic => ("POLY", Color::Green),
        PlaybackMode::Monophonic => ("MONO", Color::Yellow),
    };
    let midi = match view.midi_port {
        Some(name) => format!("MIDI: {name} ({} held)  ", view.midi_held),
        None => "MIDI: off  ".to_string(),
    };
    let keys = if view.key_release {
        "keys: press/release  "
    } else {
        "keys: gated  "
    };

    let line = Line::from(vec![
        Span::styled(format!(" {mode}  "), Style::default().fg(mode_color)),
        Span::styled(
            format!("Voices: {}  ", view.voices.len()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("Octave: {:+}  ", view.params.octave),
            Style::default().fg(Color::Cyan),
        ),
        Span::styled(midi, Style::default().fg(Color::DarkGray)),
        Span::styled(keys, Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}kHz  ", view.sample_rate / 1000.0),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("Peak: {:.2}  RMS: {:.2}", stats.peak, stats.rms),
            Style::default().fg(Color::Magenta),
        ),
    ]);

    frame.render_widget(Paragraph::new(line).block(block), area);
}
