use std::collections::HashMap;

use tracing::{debug, trace, warn};

use crate::{
    engine::AudioBackend,
    error::SynthError,
    params::{PlaybackMode, SharedParams},
    synth::{
        envelope::{CleanupTask, EnvelopeScheduler},
        factory::{assemble, dismantle, OscillatorBank, VoiceFactory},
        voice::{Voice, VoiceId},
    },
};

/// The one entry point every input adapter talks to.
pub trait NoteSink {
    fn note_on(&mut self, id: VoiceId, frequency: f32);
    fn note_off(&mut self, id: &VoiceId);
}

/*
Voice Lifecycle
===============

                 note_on                note_off               cleanup due
    (none) ───────────────> Attacking ───────────> Releasing ───────────────> (none)
                              │  ▲                    │
                run_pending   │  │ note_on (same id)  │ note_off again,
                              ▼  │ = hard cut + new   │ note_on (same id),
                           Sustaining                 │ stop_all, mono note_on
                              │                       ▼
                              └──── note_off ───>  force-destroy ──> (none)

Two guards keep a late cleanup from killing the wrong voice: the voice's
cleanup handle is cancelled whenever it is destroyed early, and a cleanup
only retires the voice whose serial it was scheduled for.
*/

pub struct VoiceManager<B: AudioBackend, F: VoiceFactory = OscillatorBank> {
    backend: B,
    factory: F,
    params: SharedParams,
    envelope: EnvelopeScheduler,
    voices: HashMap<VoiceId, Voice>,
    mode: PlaybackMode,
    next_serial: u64,
}

impl<B: AudioBackend> VoiceManager<B> {
    pub fn new(backend: B, params: SharedParams) -> Self {
        Self::with_factory(backend, params, OscillatorBank)
    }
}

impl<B: AudioBackend, F: VoiceFactory> VoiceManager<B, F> {
    pub fn with_factory(backend: B, params: SharedParams, factory: F) -> Self {
        Self {
            backend,
            factory,
            envelope: EnvelopeScheduler::new(params.clone()),
            params,
            voices: HashMap::new(),
            mode: PlaybackMode::default(),
            next_serial: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn params(&self) -> &SharedParams {
        &self.params
    }

    pub fn playback_mode(&self) -> PlaybackMode {
        self.mode
    }

    /// Takes effect from the next note-on; sounding voices are left alone.
    pub fn set_playback_mode(&mut self, mode: PlaybackMode) {
        if mode != self.mode {
            debug!(?mode, "playback mode changed");
        }
        self.mode = mode;
    }

    pub fn cleanup_margin(&self) -> f64 {
        self.envelope.cleanup_margin()
    }

    pub fn set_cleanup_margin(&mut self, margin: f64) {
        self.envelope.set_cleanup_margin(margin);
    }

    pub fn voice(&self, id: &VoiceId) -> Option<&Voice> {
        self.voices.get(id)
    }

    pub fn voices(&self) -> impl Iterator<Item = &Voice> + '_ {
        self.voices.values()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Outstanding release cleanups (cancelled ones excluded).
    pub fn pending_cleanups(&self) -> usize {
        self.envelope.pending_cleanups()
    }

    /// Backend time at which the earliest outstanding cleanup falls due.
    pub fn next_cleanup(&self) -> Option<f64> {
        self.envelope.next_cleanup()
    }

    /// Start a voice for `id`, replacing any voice already using it.
    ///
    /// Dropped with a warning if the backend is not ready or any node fails
    /// to build; nothing is left registered in that case.
    pub fn note_on(&mut self, id: VoiceId, frequency: f32) {
        if !self.backend.is_ready() {
            warn!(id = %id, "audio backend not ready, note dropped");
            return;
        }

        if self.mode == PlaybackMode::Monophonic {
            self.destroy_all();
        }

        if let Some(previous) = self.voices.remove(&id) {
            debug!(id = %id, serial = previous.serial(), "retrigger cuts previous voice");
            self.destroy(previous);
        }

        match self.spawn(id.clone(), frequency) {
            Ok(voice) => {
                debug!(
                    id = %id,
                    frequency,
                    serial = voice.serial(),
                    sources = voice.sources().len(),
                    "voice started"
                );
                self.voices.insert(id, voice);
            }
            Err(err) => warn!(id = %id, %err, "voice creation failed, note dropped"),
        }
    }

    /// Begin the release of `id`; a second release collapses it at once.
    pub fn note_off(&mut self, id: &VoiceId) {
        let Some(voice) = self.voices.get_mut(id) else {
            trace!(id = %id, "note off for silent id");
            return;
        };

        if voice.is_releasing() {
            debug!(id = %id, "repeated note off, forcing teardown");
            if let Some(voice) = self.voices.remove(id) {
                self.destroy(voice);
            }
            return;
        }

        if let Err(err) = self.envelope.release(&mut self.backend, voice) {
            warn!(id = %id, %err, "release failed, forcing teardown");
            if let Some(voice) = self.voices.remove(id) {
                self.destroy(voice);
            }
        }
    }

    /// Force-destroy every voice.
    pub fn stop_all(&mut self) {
        let count = self.voices.len();
        self.destroy_all();
        self.envelope.clear();
        debug!(count, "all voices stopped");
    }

    /// Fire due cleanups and move finished attacks to sustain.
    ///
    /// Returns how many voices were retired.
    pub fn run_pending(&mut self) -> usize {
        let now = self.backend.now();
        let mut retired = 0;

        for CleanupTask { id, serial } in self.envelope.take_due(now) {
            let current = self
                .voices
                .get(&id)
                .is_some_and(|v| v.serial() == serial && v.is_releasing());
            if !current {
                trace!(id = %id, serial, "stale cleanup skipped");
                continue;
            }
            if let Some(voice) = self.voices.remove(&id) {
                debug!(id = %id, serial, "release finished, voice retired");
                self.destroy(voice);
                retired += 1;
            }
        }

        for voice in self.voices.values_mut() {
            voice.advance_phase(now);
        }

        retired
    }

    fn spawn(&mut self, id: VoiceId, frequency: f32) -> Result<Voice, SynthError> {
        let params = self.params.snapshot();
        let descriptors = self.factory.sources(frequency, &params);
        self.next_serial += 1;

        let mut voice = assemble(
            &mut self.backend,
            id,
            self.next_serial,
            frequency,
            descriptors,
        )?;
        if let Err(err) = self.envelope.start(&mut self.backend, &mut voice) {
            self.destroy(voice);
            return Err(err.into());
        }
        Ok(voice)
    }

    fn destroy_all(&mut self) {
        let voices: Vec<Voice> = self.voices.drain().map(|(_, v)| v).collect();
        for voice in voices {
            self.destroy(voice);
        }
    }

    /// Immediate teardown: cancel the cleanup, silence, free every node.
    fn destroy(&mut self, mut voice: Voice) {
        voice.cancel_cleanup();
        if let Err(err) = self.envelope.silence(&mut self.backend, &voice) {
            trace!(id = %voice.id(), %err, "silence ignored");
        }
        let sources: Vec<_> = voice.sources().iter().map(|s| s.handle).collect();
        dismantle(&mut self.backend, &sources, voice.amplitude());
    }
}

impl<B: AudioBackend, F: VoiceFactory> NoteSink for VoiceManager<B, F> {
    fn note_on(&mut self, id: VoiceId, frequency: f32) {
        VoiceManager::note_on(self, id, frequency);
    }

    fn note_off(&mut self, id: &VoiceId) {
        VoiceManager::note_off(self, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::RenderEngine,
        params::{EnvelopeSettings, Parameters},
        synth::{voice::EnvelopePhase, DEFAULT_CLEANUP_MARGIN},
    };

    fn manager() -> VoiceManager<RenderEngine> {
        let params = SharedParams::new(Parameters {
            envelope: EnvelopeSettings {
                attack: 0.125,
                decay: 0.125,
                sustain: 0.5,
                release: 0.25,
            },
            ..Parameters::default()
        });
        VoiceManager::new(RenderEngine::with_sample_rate(1_000.0), params)
    }

    fn id(name: &str) -> VoiceId {
        VoiceId::from(name)
    }

    #[test]
    fn drops_notes_until_backend_is_ready() {
        let mut synth = VoiceManager::new(RenderEngine::new(), SharedParams::default());
        synth.note_on(id("C4"), 261.63);
        assert!(synth.is_empty());
        assert_eq!(synth.backend().control_count(), 0);

        synth.backend_mut().activate(1_000.0);
        synth.note_on(id("C4"), 261.63);
        assert_eq!(synth.len(), 1);
    }

    #[test]
    fn attack_settles_into_sustain() {
        let mut synth = manager();
        synth.note_on(id("A4"), 440.0);
        assert!(matches!(
            synth.voice(&id("A4")).unwrap().phase(),
            EnvelopePhase::Attacking { .. }
        ));

        synth.backend_mut().advance(0.25);
        synth.run_pending();
        assert_eq!(
            synth.voice(&id("A4")).unwrap().phase(),
            EnvelopePhase::Sustaining
        );
    }

    #[test]
    fn retired_voice_frees_backend_nodes() {
        let mut synth = manager();
        synth.note_on(id("A4"), 440.0);
        assert_eq!(synth.backend().source_count(), 2);

        synth.note_off(&id("A4"));
        synth.backend_mut().advance(0.5);
        assert_eq!(synth.run_pending(), 1);
        assert!(synth.is_empty());
        assert_eq!(synth.backend().source_count(), 0);
        assert_eq!(synth.backend().control_count(), 0);
    }

    #[test]
    fn stale_cleanup_spares_retriggered_voice() {
        let mut synth = manager();
        synth.note_on(id("A4"), 440.0);
        synth.note_off(&id("A4"));
        synth.note_on(id("A4"), 440.0);
        let serial = synth.voice(&id("A4")).unwrap().serial();

        synth.backend_mut().advance(1.0);
        assert_eq!(synth.run_pending(), 0);
        let voice = synth.voice(&id("A4")).unwrap();
        assert_eq!(voice.serial(), serial);
        assert!(!voice.is_releasing());
    }

    #[test]
    fn mode_change_leaves_voices_sounding() {
        let mut synth = manager();
        synth.note_on(id("C4"), 261.63);
        synth.note_on(id("E4"), 329.63);
        synth.set_playback_mode(PlaybackMode::Monophonic);
        assert_eq!(synth.len(), 2);

        synth.note_on(id("G4"), 392.0);
        assert_eq!(synth.len(), 1);
        assert!(synth.voice(&id("G4")).is_some());
    }

    #[test]
    fn stop_all_cancels_pending_cleanups() {
        let mut synth = manager();
        synth.note_on(id("C4"), 261.63);
        synth.note_on(id("E4"), 329.63);
        synth.note_off(&id("C4"));
        assert_eq!(synth.pending_cleanups(), 1);

        synth.stop_all();
        assert!(synth.is_empty());
        assert_eq!(synth.pending_cleanups(), 0);
        assert_eq!(synth.backend().source_count(), 0);
    }

    #[test]
    fn next_cleanup_follows_live_releases() {
        let mut synth = manager();
        assert_eq!(synth.next_cleanup(), None);

        synth.note_on(id("C4"), 261.63);
        synth.note_on(id("E4"), 329.63);
        synth.note_off(&id("C4"));
        let due = synth.next_cleanup().unwrap();
        assert!((due - (0.25 + DEFAULT_CLEANUP_MARGIN)).abs() < 1e-6);

        // force-destroyed: its cleanup no longer counts
        synth.note_off(&id("C4"));
        assert_eq!(synth.next_cleanup(), None);
    }

    #[test]
    fn silent_voice_still_runs_its_lifecycle() {
        let mut synth = manager();
        synth.params().update(|p| {
            for osc in &mut p.oscillators {
                osc.enabled = false;
            }
        });
        synth.note_on(id("C4"), 261.63);
        let voice = synth.voice(&id("C4")).unwrap();
        assert!(voice.sources().is_empty());

        synth.note_off(&id("C4"));
        synth.backend_mut().advance(0.5);
        assert_eq!(synth.run_pending(), 1);
        assert!(synth.is_empty());
    }
}
