pub mod dsp; // Oscillators and parameter automation
pub mod engine; // Audio backend seam and the in-process renderer
pub mod error;
pub mod io; // MIDI and computer-keyboard input adapters
pub mod notes;
pub mod params;
pub mod runtime; // Single-threaded control domain
pub mod synth; // Voice lifecycle and envelopes

#[cfg(feature = "serde")]
pub mod config;

pub const MAX_BLOCK_SIZE: usize = 2048;
