//! Live synth parameters.
//!
//! The UI edits these at any time. Everything that needs a value (voice
//! construction, each envelope ramp, MIDI pitch resolution) reads it through
//! [`SharedParams::snapshot`] at the moment the decision is made, so a knob
//! turned mid-note affects the note from that point on.

use std::sync::{Arc, PoisonError, RwLock};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of oscillator slots per voice.
pub const OSCILLATOR_COUNT: usize = 2;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    #[default]
    Square,
    Sawtooth,
    Triangle,
}

impl Waveform {
    pub const ALL: [Waveform; 4] = [
        Waveform::Sine,
        Waveform::Square,
        Waveform::Sawtooth,
        Waveform::Triangle,
    ];

    /// Next waveform in display order, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|w| *w == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
        }
    }
}

/// Monophonic mode clears every sounding voice on each note-on.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    Monophonic,
    #[default]
    Polyphonic,
}

impl PlaybackMode {
    pub fn toggled(self) -> Self {
        match self {
            PlaybackMode::Monophonic => PlaybackMode::Polyphonic,
            PlaybackMode::Polyphonic => PlaybackMode::Monophonic,
        }
    }
}

/// Per-oscillator timbre settings.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OscillatorSettings {
    pub enabled: bool,
    pub waveform: Waveform,
    /// Detune in cents (100 cents = 1 semitone).
    pub detune_cents: f32,
}

impl Default for OscillatorSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            waveform: Waveform::Square,
            detune_cents: 0.0,
        }
    }
}

/// ADSR times in seconds, sustain as a level in [0, 1].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSettings {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
}

impl Default for EnvelopeSettings {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.7,
            release: 0.3,
        }
    }
}

impl EnvelopeSettings {
    /// Negative times collapse to zero, sustain is clamped into [0, 1].
    pub fn sanitized(self) -> Self {
        Self {
            attack: self.attack.max(0.0),
            decay: self.decay.max(0.0),
            sustain: self.sustain.clamp(0.0, 1.0),
            release: self.release.max(0.0),
        }
    }
}

/// Everything the UI exposes as a knob.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameters {
    pub envelope: EnvelopeSettings,
    /// Output gain in [0, 1].
    pub master_gain: f32,
    /// Keyboard octave shift.
    pub octave: i8,
    /// Offset in Hz added to every equal-tempered pitch.
    pub fine_tune_hz: f32,
    pub oscillators: [OscillatorSettings; OSCILLATOR_COUNT],
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            envelope: EnvelopeSettings::default(),
            master_gain: 0.1,
            octave: 0,
            fine_tune_hz: 0.0,
            oscillators: [
                OscillatorSettings {
                    detune_cents: -15.0,
                    ..OscillatorSettings::default()
                },
                OscillatorSettings {
                    detune_cents: 25.0,
                    ..OscillatorSettings::default()
                },
            ],
        }
    }
}

impl Parameters {
    /// Enabled oscillator settings in slot order (zero, one or two entries).
    pub fn enabled_oscillators(&self) -> impl Iterator<Item = &OscillatorSettings> + '_ {
        self.oscillators.iter().filter(|osc| osc.enabled)
    }
}

/// Shared, externally mutable parameter store.
///
/// Cheap to clone; all clones see the same values.
#[derive(Debug, Clone, Default)]
pub struct SharedParams {
    inner: Arc<RwLock<Parameters>>,
}

impl SharedParams {
    pub fn new(params: Parameters) -> Self {
        Self {
            inner: Arc::new(RwLock::new(params)),
        }
    }

    /// Current values.
    pub fn snapshot(&self) -> Parameters {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mutate in place; readers see the change on their next snapshot.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Parameters),
    {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard);
    }

    pub fn replace(&self, params: Parameters) {
        self.update(|p| *p = params);
    }
}
