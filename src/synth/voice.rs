use std::fmt;

use crate::engine::{ControlId, SourceDescriptor, SourceId, TaskHandle};

/// Key of a voice slot: a note name such as `"C4"`, or a formatted
/// frequency when no name is known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoiceId(String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fallback id for a pitch with no note name.
    pub fn from_frequency(frequency: f32) -> Self {
        Self(format!("{frequency:.2}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VoiceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for VoiceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopePhase {
    /// Attack and decay ramps are in flight; the plateau is reached at `sustain_at`.
    Attacking { sustain_at: f64 },
    Sustaining,
    Releasing,
}

/// A backend oscillator owned by a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundSource {
    pub descriptor: SourceDescriptor,
    pub handle: SourceId,
}

/// One sounding note.
///
/// Holds handles into the audio backend but never touches it itself; the
/// voice manager and envelope scheduler do that.
#[derive(Debug)]
pub struct Voice {
    id: VoiceId,
    serial: u64,
    sources: Vec<SoundSource>,
    amplitude: ControlId,
    frequency: f32,
    phase: EnvelopePhase,
    created_at: f64,
    pending_cleanup: Option<TaskHandle>,
}

impl Voice {
    pub(crate) fn new(
        id: VoiceId,
        serial: u64,
        sources: Vec<SoundSource>,
        amplitude: ControlId,
        frequency: f32,
        created_at: f64,
    ) -> Self {
        Self {
            id,
            serial,
            sources,
            amplitude,
            frequency,
            phase: EnvelopePhase::Attacking {
                sustain_at: created_at,
            },
            created_at,
            pending_cleanup: None,
        }
    }

    pub fn id(&self) -> &VoiceId {
        &self.id
    }

    /// Creation order; never repeats within one manager.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Empty when every oscillator was disabled at creation.
    pub fn sources(&self) -> &[SoundSource] {
        &self.sources
    }

    pub fn amplitude(&self) -> ControlId {
        self.amplitude
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn phase(&self) -> EnvelopePhase {
        self.phase
    }

    pub fn is_releasing(&self) -> bool {
        self.phase == EnvelopePhase::Releasing
    }

    pub fn created_at(&self) -> f64 {
        self.created_at
    }

    pub fn has_pending_cleanup(&self) -> bool {
        self.pending_cleanup.is_some()
    }

    pub(crate) fn set_phase(&mut self, phase: EnvelopePhase) {
        self.phase = phase;
    }

    /// Store the cleanup for the current release, cancelling any older one.
    pub(crate) fn set_pending_cleanup(&mut self, handle: TaskHandle) {
        self.cancel_cleanup();
        self.pending_cleanup = Some(handle);
    }

    pub(crate) fn cancel_cleanup(&mut self) {
        if let Some(handle) = self.pending_cleanup.take() {
            handle.cancel();
        }
    }

    /// Attacking becomes Sustaining once the decay ramp has landed.
    pub(crate) fn advance_phase(&mut self, now: f64) {
        if let EnvelopePhase::Attacking { sustain_at } = self.phase {
            if now >= sustain_at {
                self.phase = EnvelopePhase::Sustaining;
            }
        }
    }
}
