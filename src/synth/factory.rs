use tracing::trace;

use crate::{
    engine::{AudioBackend, ControlId, SourceDescriptor, SourceId},
    error::{BackendError, SynthError},
    params::Parameters,
    synth::voice::{SoundSource, Voice, VoiceId},
};

/// Decides which oscillators a new voice gets.
///
/// This is the "instrument design" layer: the voice manager asks it for
/// source descriptors at every note-on, with the parameters current at that
/// instant. An empty list is a valid (silent) voice.
pub trait VoiceFactory: Send {
    fn sources(&self, frequency: f32, params: &Parameters) -> Vec<SourceDescriptor>;
}

impl<F> VoiceFactory for F
where
    F: Fn(f32, &Parameters) -> Vec<SourceDescriptor> + Send,
{
    fn sources(&self, frequency: f32, params: &Parameters) -> Vec<SourceDescriptor> {
        self(frequency, params)
    }
}

/// One source per enabled oscillator slot, in slot order.
#[derive(Debug, Clone, Copy, Default)]
pub struct OscillatorBank;

impl VoiceFactory for OscillatorBank {
    fn sources(&self, frequency: f32, params: &Parameters) -> Vec<SourceDescriptor> {
        params
            .enabled_oscillators()
            .map(|osc| SourceDescriptor {
                waveform: osc.waveform,
                frequency,
                detune_cents: osc.detune_cents,
            })
            .collect()
    }
}

/*
Assembly
========

    source 0 ──┐
               ├──> amplitude ──> output
    source 1 ──┘

Creation order is amplitude first, then each source (create, connect,
start). If any step fails, every node created so far is freed before the
error is returned, so a failed note-on leaves nothing behind in the backend.
*/

/// Create the backend nodes for a voice and start its sources at `now`.
pub(crate) fn assemble<B: AudioBackend + ?Sized>(
    backend: &mut B,
    id: VoiceId,
    serial: u64,
    frequency: f32,
    descriptors: Vec<SourceDescriptor>,
) -> Result<Voice, SynthError> {
    let now = backend.now();
    let amplitude = backend.create_amplitude()?;

    let mut sources = Vec::with_capacity(descriptors.len());
    let wired = (|| -> Result<(), BackendError> {
        backend.connect_output(amplitude)?;
        for descriptor in descriptors {
            let handle = backend.create_source(&descriptor)?;
            sources.push(SoundSource { descriptor, handle });
            backend.connect(handle, amplitude)?;
            backend.start(handle, now)?;
        }
        Ok(())
    })();

    if let Err(err) = wired {
        let handles: Vec<SourceId> = sources.iter().map(|s| s.handle).collect();
        dismantle(backend, &handles, amplitude);
        return Err(err.into());
    }

    Ok(Voice::new(id, serial, sources, amplitude, frequency, now))
}

/// Stop and free every node of a voice, ignoring nodes that are already
/// stopped or gone. Safe to call more than once for the same handles.
pub(crate) fn dismantle<B: AudioBackend + ?Sized>(
    backend: &mut B,
    sources: &[SourceId],
    amplitude: ControlId,
) {
    for &source in sources {
        if let Err(err) = backend.stop(source) {
            trace!(?source, %err, "stop ignored");
        }
        if let Err(err) = backend.disconnect(source) {
            trace!(?source, %err, "disconnect ignored");
        }
    }
    if let Err(err) = backend.release_control(amplitude) {
        trace!(?amplitude, %err, "release ignored");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        engine::RenderEngine,
        params::{OscillatorSettings, Waveform},
    };

    fn params(first: bool, second: bool) -> Parameters {
        let mut params = Parameters::default();
        params.oscillators[0].enabled = first;
        params.oscillators[1].enabled = second;
        params
    }

    #[test]
    fn one_source_per_enabled_slot() {
        for (first, second, expected) in [
            (true, true, 2),
            (true, false, 1),
            (false, true, 1),
            (false, false, 0),
        ] {
            let sources = OscillatorBank.sources(220.0, &params(first, second));
            assert_eq!(sources.len(), expected);
        }
    }

    #[test]
    fn descriptors_follow_slot_settings() {
        let mut p = params(false, true);
        p.oscillators[1] = OscillatorSettings {
            enabled: true,
            waveform: Waveform::Triangle,
            detune_cents: 7.0,
        };
        let sources = OscillatorBank.sources(110.0, &p);
        assert_eq!(
            sources,
            vec![SourceDescriptor {
                waveform: Waveform::Triangle,
                frequency: 110.0,
                detune_cents: 7.0,
            }]
        );
    }

    #[test]
    fn closures_are_factories() {
        let sine_only = |frequency: f32, _: &Parameters| {
            vec![SourceDescriptor {
                waveform: Waveform::Sine,
                frequency,
                detune_cents: 0.0,
            }]
        };
        assert_eq!(sine_only.sources(55.0, &Parameters::default()).len(), 1);
    }

    #[test]
    fn assembled_voice_is_started_and_routed() {
        let mut engine = RenderEngine::with_sample_rate(1_000.0);
        let descriptors = OscillatorBank.sources(440.0, &Parameters::default());
        let voice = assemble(&mut engine, VoiceId::from("A4"), 1, 440.0, descriptors).unwrap();

        assert_eq!(voice.sources().len(), 2);
        assert!(voice.sources().iter().all(|s| engine.is_playing(s.handle)));
        assert_eq!(engine.control_count(), 1);
    }

    #[test]
    fn failed_assembly_leaves_nothing_behind() {
        let mut engine = RenderEngine::new();
        let result = assemble(&mut engine, VoiceId::from("A4"), 1, 440.0, Vec::new());
        assert_eq!(result.unwrap_err(), SynthError::Backend(BackendError::NotReady));
        assert_eq!(engine.source_count(), 0);
        assert_eq!(engine.control_count(), 0);
    }

    #[test]
    fn dismantle_twice_is_harmless() {
        let mut engine = RenderEngine::with_sample_rate(1_000.0);
        let descriptors = OscillatorBank.sources(440.0, &Parameters::default());
        let voice = assemble(&mut engine, VoiceId::from("A4"), 1, 440.0, descriptors).unwrap();
        let handles: Vec<_> = voice.sources().iter().map(|s| s.handle).collect();

        dismantle(&mut engine, &handles, voice.amplitude());
        dismantle(&mut engine, &handles, voice.amplitude());
        assert_eq!(engine.source_count(), 0);
        assert_eq!(engine.control_count(), 0);
    }
}
