use std::f32::consts::TAU;

use crate::params::Waveform;

/*
Audio Oscillator
================

A phase accumulator: `phase` walks from 0.0 to 1.0 once per cycle and each
waveform is a function of that phase.

  increment = frequency / sample_rate      (cycles per sample)

Sine:      sin(2π·phase)                   fundamental only
Square:    +1 for phase < 0.5, else -1     odd harmonics, 1/n
Sawtooth:  2·phase - 1                     all harmonics, 1/n
Triangle:  1 - 4·|phase - 0.5|             odd harmonics, 1/n²

Detune is applied multiplicatively in cents:

  frequency = base · 2^(cents / 1200)      100 cents = one semitone

No band-limiting: square and sawtooth alias at high pitches, which matches
the raw oscillator nodes this engine stands in for.
*/

/// Cents → frequency ratio.
#[inline]
pub fn cents_to_ratio(cents: f32) -> f32 {
    2.0_f32.powf(cents / 1200.0)
}

#[derive(Debug, Clone)]
pub struct OscillatorBlock {
    waveform: Waveform,
    frequency: f32,
    phase: f32,
}

impl OscillatorBlock {
    pub fn new(waveform: Waveform, frequency: f32) -> Self {
        Self {
            waveform,
            frequency: frequency.max(0.0),
            phase: 0.0,
        }
    }

    /// Oscillator at `base` Hz shifted by `detune_cents`.
    pub fn detuned(waveform: Waveform, base: f32, detune_cents: f32) -> Self {
        Self::new(waveform, base * cents_to_ratio(detune_cents))
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    #[inline]
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let out = shape(self.waveform, self.phase);
        self.phase += self.frequency / sample_rate;
        self.phase -= self.phase.floor();
        out
    }

    /// Fill `out` with the next `out.len()` samples.
    pub fn render(&mut self, out: &mut [f32], sample_rate: f32) {
        for sample in out.iter_mut() {
            *sample = self.next_sample(sample_rate);
        }
    }
}

#[inline]
fn shape(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => 1.0 - 4.0 * (phase - 0.5).abs(),
    }
}
