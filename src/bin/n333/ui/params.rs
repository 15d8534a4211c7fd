//! Parameter panel - the knobs

use n333_synth::params::{Parameters, Waveform};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const MAX_TIME: f32 = 5.0;
const MAX_DETUNE: f32 = 1200.0;
const MAX_FINE_TUNE: f32 = 50.0;

/// One editable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamField {
    Attack,
    Decay,
    Sustain,
    Release,
    MasterGain,
    Octave,
    FineTune,
    OscEnabled(usize),
    OscWaveform(usize),
    OscDetune(usize),
}

impl ParamField {
    pub const ALL: [ParamField; 13] = [
        ParamField::Attack,
        ParamField::Decay,
        ParamField::Sustain,
        ParamField::Release,
        ParamField::MasterGain,
        ParamField::Octave,
        ParamField::FineTune,
        ParamField::OscEnabled(0),
        ParamField::OscWaveform(0),
        ParamField::OscDetune(0),
        ParamField::OscEnabled(1),
        ParamField::OscWaveform(1),
        ParamField::OscDetune(1),
    ];

    pub fn label(self) -> String {
        match self {
            ParamField::Attack => "Attack".into(),
            ParamField::Decay => "Decay".into(),
            ParamField::Sustain => "Sustain".into(),
            ParamField::Release => "Release".into(),
            ParamField::MasterGain => "Gain".into(),
            ParamField::Octave => "Octave".into(),
            ParamField::FineTune => "Fine tune".into(),
            ParamField::OscEnabled(i) => format!("Osc {} on", i + 1),
            ParamField::OscWaveform(i) => format!("Osc {} wave", i + 1),
            ParamField::OscDetune(i) => format!("Osc {} detune", i + 1),
        }
    }

    pub fn value_text(self, p: &Parameters) -> String {
        match self {
            ParamField::Attack => format!("{:.3} s", p.envelope.attack),
            ParamField::Decay => format!("{:.3} s", p.envelope.decay),
            ParamField::Sustain => format!("{:.2}", p.envelope.sustain),
            ParamField::Release => format!("{:.3} s", p.envelope.release),
            ParamField::MasterGain => format!("{:.2}", p.master_gain),
            ParamField::Octave => format!("{:+}", p.octave),
            ParamField::FineTune => format!("{:+.1} Hz", p.fine_tune_hz),
            ParamField::OscEnabled(i) => {
                let on = if p.oscillators[i].enabled { "on" } else { "off" };
                on.to_string()
            }
            ParamField::OscWaveform(i) => p.oscillators[i].waveform.label().into(),
            ParamField::OscDetune(i) => format!("{:+.0} ct", p.oscillators[i].detune_cents),
        }
    }

    /// Step the value up (`direction > 0`) or down.
    pub fn adjust(self, p: &mut Parameters, direction: f32) {
        let dir = direction.signum();
        match self {
            ParamField::Attack => step_time(&mut p.envelope.attack, dir),
            ParamField::Decay => step_time(&mut p.envelope.decay, dir),
            ParamField::Release => step_time(&mut p.envelope.release, dir),
            ParamField::Sustain => {
                p.envelope.sustain = (p.envelope.sustain + 0.05 * dir).clamp(0.0, 1.0);
            }
            ParamField::MasterGain => {
                p.master_gain = (p.master_gain + 0.01 * dir).clamp(0.0, 1.0);
            }
            ParamField::Octave => {
                p.octave = (p.octave as i32 + dir as i32).clamp(-1, 7) as i8;
            }
            ParamField::FineTune => {
                p.fine_tune_hz = (p.fine_tune_hz + 0.5 * dir).clamp(-MAX_FINE_TUNE, MAX_FINE_TUNE);
            }
            ParamField::OscEnabled(i) => p.oscillators[i].enabled = !p.oscillators[i].enabled,
            ParamField::OscWaveform(i) => {
                let osc = &mut p.oscillators[i];
                osc.waveform = if dir >= 0.0 {
                    osc.waveform.next()
                } else {
                    previous(osc.waveform)
                };
            }
            ParamField::OscDetune(i) => {
                let osc = &mut p.oscillators[i];
                osc.detune_cents = (osc.detune_cents + dir).clamp(-MAX_DETUNE, MAX_DETUNE);
            }
        }
    }
}

/// Fine steps for short times, coarse for long ones.
fn step_time(value: &mut f32, dir: f32) {
    let step = if *value < 0.1 || (*value <= 0.1 && dir < 0.0) {
        0.005
    } else if *value < 1.0 {
        0.05
    } else {
        0.25
    };
    *value = (*value + step * dir).clamp(0.0, MAX_TIME);
}

fn previous(waveform: Waveform) -> Waveform {
    let all = Waveform::ALL;
    let idx = all.iter().position(|w| *w == waveform).unwrap_or(0);
    all[(idx + all.len() - 1) % all.len()]
}

pub fn render_params(frame: &mut Frame, area: Rect, params: &Parameters, selected: usize) {
    let block = Block::default().title(" Parameters ").borders(Borders::ALL);

    let lines: Vec<Line> = ParamField::ALL
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let style = if i == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::from(vec![
                Span::styled(format!(" {:<14}", field.label()), style),
                Span::styled(
                    format!(" {}", field.value_text(params)),
                    Style::default().fg(Color::Cyan),
                ),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_stay_in_range() {
        let mut p = Parameters::default();
        for _ in 0..100 {
            ParamField::Sustain.adjust(&mut p, 1.0);
            ParamField::Octave.adjust(&mut p, -1.0);
            ParamField::Attack.adjust(&mut p, -1.0);
        }
        assert_eq!(p.envelope.sustain, 1.0);
        assert_eq!(p.octave, -1);
        assert_eq!(p.envelope.attack, 0.0);
    }

    #[test]
    fn waveform_cycles_both_ways() {
        let mut p = Parameters::default();
        let start = p.oscillators[1].waveform;
        ParamField::OscWaveform(1).adjust(&mut p, 1.0);
        assert_ne!(p.oscillators[1].waveform, start);
        ParamField::OscWaveform(1).adjust(&mut p, -1.0);
        assert_eq!(p.oscillators[1].waveform, start);
    }

    #[test]
    fn enable_toggles() {
        let mut p = Parameters::default();
        ParamField::OscEnabled(0).adjust(&mut p, 1.0);
        assert!(!p.oscillators[0].enabled);
        assert_eq!(ParamField::OscEnabled(0).value_text(&p), "off");
    }
}
