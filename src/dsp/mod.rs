//! Low-level DSP primitives used by the render engine.
//!
//! These components are realtime-safe once constructed and stay focused on
//! the signal math; voice bookkeeping happens in [`crate::synth`].

/// Time-stamped scalar schedules (set, linear ramp, cancel).
pub mod automation;
/// Oscillator waveforms.
pub mod oscillator;

pub use automation::Automation;
pub use oscillator::{cents_to_ratio, OscillatorBlock};
