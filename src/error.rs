//! Error types for the synth core.

use thiserror::Error;

use crate::engine::{ControlId, SourceId};

/// Errors reported by an [`AudioBackend`](crate::engine::AudioBackend).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// The backend has no running clock yet (no output stream).
    #[error("audio backend is not initialized")]
    NotReady,

    /// The sound source handle does not refer to a live source.
    #[error("unknown sound source {0:?}")]
    UnknownSource(SourceId),

    /// The amplitude control handle does not refer to a live control.
    #[error("unknown amplitude control {0:?}")]
    UnknownControl(ControlId),

    /// `start` was called on a source that is already running or finished.
    #[error("sound source {0:?} was already started")]
    AlreadyStarted(SourceId),

    /// `stop` was called on a source that is not running.
    #[error("sound source {0:?} is already stopped")]
    AlreadyStopped(SourceId),
}

/// Errors produced while decoding raw MIDI bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MidiError {
    /// Zero-length payload.
    #[error("empty MIDI message")]
    Empty,

    /// The status byte needs more data bytes than were delivered.
    #[error("truncated MIDI message: status {status:#04x} needs {expected} bytes, got {got}")]
    Truncated {
        /// Status byte of the message.
        status: u8,
        /// Total length required by the status byte.
        expected: usize,
        /// Length actually received.
        got: usize,
    },

    /// Status byte this decoder does not handle (sysex, song position, running status, ...).
    #[error("unsupported MIDI status byte {0:#04x}")]
    Unsupported(u8),
}

/// Umbrella error for synth operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthError {
    /// Failure inside the audio backend.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Failure decoding a MIDI message.
    #[error(transparent)]
    Midi(#[from] MidiError),
}

/// Errors opening a hardware MIDI port.
#[cfg(feature = "midi-io")]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("failed to initialize MIDI input: {0}")]
    Init(String),

    #[error("MIDI input port {0} not found")]
    NotFound(usize),

    #[error("failed to connect to MIDI input: {0}")]
    Connect(String),
}

/// Errors loading a configuration file.
#[cfg(feature = "serde")]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("expected 1 or 2 oscillators, found {0}")]
    OscillatorCount(usize),
}
