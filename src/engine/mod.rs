// Purpose: the audio backend seam - what the voice manager needs from a sound engine
//
// The control core never renders samples itself. It creates nodes, wires them,
// and schedules amplitude values on the backend's clock. `RenderEngine` is the
// in-process implementation; anything else (a plugin host, a test double) can
// implement `AudioBackend` instead.

pub mod render;
pub mod scheduler;
pub mod shared;

use crate::{error::BackendError, params::Waveform};

pub use render::RenderEngine;
pub use scheduler::{Scheduler, TaskHandle};
pub use shared::SharedEngine;

/// Opaque handle to a sound source (oscillator). Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(pub(crate) u64);

/// Opaque handle to an amplitude control (gain node). Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub(crate) u64);

/// What to build when creating a sound source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceDescriptor {
    pub waveform: Waveform,
    /// Base frequency in Hz, before detune.
    pub frequency: f32,
    pub detune_cents: f32,
}

/// One step of an amplitude schedule change, see [`AudioBackend::automate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Automate {
    /// Drop every scheduled value at or after `from`.
    Cancel { from: f64 },
    /// Pin the value the control has at `at`, dropping everything after it.
    Hold { at: f64 },
    Set { value: f32, at: f64 },
    Ramp { value: f32, end: f64 },
}

/// Primitives the synth core depends on.
///
/// Times are absolute seconds on the backend's own clock (see [`now`](Self::now)).
pub trait AudioBackend: Send {
    /// False until the backend has a running clock.
    fn is_ready(&self) -> bool;

    /// Current audio-clock time in seconds.
    fn now(&self) -> f64;

    fn create_source(&mut self, desc: &SourceDescriptor) -> Result<SourceId, BackendError>;

    /// New amplitude control, initial value 0.
    fn create_amplitude(&mut self) -> Result<ControlId, BackendError>;

    /// Route a source into an amplitude control.
    fn connect(&mut self, source: SourceId, control: ControlId) -> Result<(), BackendError>;

    /// Route an amplitude control to the output.
    fn connect_output(&mut self, control: ControlId) -> Result<(), BackendError>;

    fn set_value_at(&mut self, control: ControlId, value: f32, time: f64)
        -> Result<(), BackendError>;

    fn linear_ramp_to(
        &mut self,
        control: ControlId,
        value: f32,
        end_time: f64,
    ) -> Result<(), BackendError>;

    /// Drop every scheduled value at or after `from_time`.
    fn cancel_scheduled(&mut self, control: ControlId, from_time: f64)
        -> Result<(), BackendError>;

    /// Value the control has (or will have) at `time`, given its current schedule.
    fn value_at(&self, control: ControlId, time: f64) -> Result<f32, BackendError>;

    fn start(&mut self, source: SourceId, at: f64) -> Result<(), BackendError>;

    /// Fails with [`BackendError::AlreadyStopped`] when called twice.
    fn stop(&mut self, source: SourceId) -> Result<(), BackendError>;

    /// Unroute and free a source.
    fn disconnect(&mut self, source: SourceId) -> Result<(), BackendError>;

    /// Unroute and free an amplitude control.
    fn release_control(&mut self, control: ControlId) -> Result<(), BackendError>;

    /// Apply `steps` to `control` in order, as one update.
    ///
    /// Nothing may be rendered between two steps: a half-applied schedule
    /// (cancelled but not yet re-set) falls back to stale points. The default
    /// is only atomic for backends that render on the calling thread; shared
    /// backends override it to hold their lock across the whole sequence.
    fn automate(&mut self, control: ControlId, steps: &[Automate]) -> Result<(), BackendError> {
        for step in steps {
            match *step {
                Automate::Cancel { from } => self.cancel_scheduled(control, from)?,
                Automate::Hold { at } => {
                    let level = self.value_at(control, at)?;
                    self.cancel_scheduled(control, at)?;
                    self.set_value_at(control, level, at)?;
                }
                Automate::Set { value, at } => self.set_value_at(control, value, at)?,
                Automate::Ramp { value, end } => self.linear_ramp_to(control, value, end)?,
            }
        }
        Ok(())
    }
}
