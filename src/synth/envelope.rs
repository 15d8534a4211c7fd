use tracing::debug;

use crate::{
    engine::{AudioBackend, Automate, Scheduler},
    error::BackendError,
    params::SharedParams,
    synth::voice::{EnvelopePhase, Voice, VoiceId},
};

/// Extra time after a release ramp before the voice is torn down.
pub const DEFAULT_CLEANUP_MARGIN: f64 = 0.1;

/*
ADSR on the Backend Clock
=========================

    1.0 ┤   /\
        │  /  \______ sustain
        │ /          \
    0.0 ┼/            \______
        now  +A  +D   off  +R   +ε → cleanup
        └ attack ┘└ decay ┘     └ release ┘

Every segment is handed to the backend as time-stamped points; nothing here
runs per sample. Before any new segment the control's pending schedule is
cancelled from "now", so a release issued mid-attack starts from wherever
the level actually is instead of fighting the old ramps.

Each change goes out as one `automate` batch. The audio thread may render
between any two backend calls, and a schedule caught between its cancel and
its new points falls back to the note's opening `set 0`.

Times and levels are read from the shared parameters at the moment each
segment is issued, so a slider moved during a held note shapes its release
but not its (already scheduled) attack.
*/

/// A voice removal due once its release has run out.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanupTask {
    pub id: VoiceId,
    /// Only the voice with this serial may be retired by the task.
    pub serial: u64,
}

pub struct EnvelopeScheduler {
    params: SharedParams,
    cleanup_margin: f64,
    cleanups: Scheduler<CleanupTask>,
}

impl EnvelopeScheduler {
    pub fn new(params: SharedParams) -> Self {
        Self {
            params,
            cleanup_margin: DEFAULT_CLEANUP_MARGIN,
            cleanups: Scheduler::new(),
        }
    }

    pub fn cleanup_margin(&self) -> f64 {
        self.cleanup_margin
    }

    pub fn set_cleanup_margin(&mut self, margin: f64) {
        self.cleanup_margin = margin.max(0.0);
    }

    /// Ramp 0 → 1 over attack, then 1 → sustain over decay.
    pub fn start<B: AudioBackend + ?Sized>(
        &self,
        backend: &mut B,
        voice: &mut Voice,
    ) -> Result<(), BackendError> {
        let env = self.params.snapshot().envelope.sanitized();
        let control = voice.amplitude();
        let now = backend.now();
        let peak_at = now + env.attack as f64;
        let sustain_at = peak_at + env.decay as f64;

        backend.automate(
            control,
            &[
                Automate::Cancel { from: now },
                Automate::Set { value: 0.0, at: now },
                Automate::Ramp { value: 1.0, end: peak_at },
                Automate::Ramp {
                    value: env.sustain,
                    end: sustain_at,
                },
            ],
        )?;

        voice.set_phase(EnvelopePhase::Attacking { sustain_at });
        Ok(())
    }

    /// Ramp from the current level to 0 over release and schedule removal.
    pub fn release<B: AudioBackend + ?Sized>(
        &mut self,
        backend: &mut B,
        voice: &mut Voice,
    ) -> Result<(), BackendError> {
        let env = self.params.snapshot().envelope.sanitized();
        let control = voice.amplitude();
        let now = backend.now();
        let silent_at = now + env.release as f64;

        backend.automate(
            control,
            &[
                Automate::Hold { at: now },
                Automate::Ramp {
                    value: 0.0,
                    end: silent_at,
                },
            ],
        )?;
        let level = backend.value_at(control, now)?;

        let due = silent_at + self.cleanup_margin;
        let handle = self.cleanups.schedule(
            due,
            CleanupTask {
                id: voice.id().clone(),
                serial: voice.serial(),
            },
        );
        voice.set_pending_cleanup(handle);
        voice.set_phase(EnvelopePhase::Releasing);

        debug!(id = %voice.id(), level, due, "release scheduled");
        Ok(())
    }

    /// Drop the level to 0 immediately, discarding any scheduled ramps.
    pub fn silence<B: AudioBackend + ?Sized>(
        &self,
        backend: &mut B,
        voice: &Voice,
    ) -> Result<(), BackendError> {
        let control = voice.amplitude();
        let now = backend.now();
        backend.automate(
            control,
            &[
                Automate::Cancel { from: now },
                Automate::Set { value: 0.0, at: now },
            ],
        )
    }

    /// Cleanups due at `now` that were not cancelled.
    pub fn take_due(&mut self, now: f64) -> Vec<CleanupTask> {
        self.cleanups.take_due(now)
    }

    pub fn pending_cleanups(&self) -> usize {
        self.cleanups.pending()
    }

    pub fn next_cleanup(&self) -> Option<f64> {
        self.cleanups.next_due()
    }

    /// Cancel every outstanding cleanup.
    pub fn clear(&mut self) {
        self.cleanups.clear();
    }
}
