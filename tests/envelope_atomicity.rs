//! The audio thread may render between any two backend calls. These tests
//! use a backend that does exactly that and check the amplitude the output
//! would hear at every such point.

use n333_synth::{
    engine::{AudioBackend, Automate, ControlId, RenderEngine, SourceDescriptor, SourceId},
    error::BackendError,
    params::{EnvelopeSettings, Parameters, SharedParams},
    synth::{VoiceId, VoiceManager},
};

const SAMPLE_RATE: f32 = 1_000.0;
const BLOCK: f64 = 64.0 / SAMPLE_RATE as f64;

/// Renders one block after every schedule change, recording the level the
/// watched control had when the block started.
struct Interleaved {
    engine: RenderEngine,
    watched: Option<ControlId>,
    heard: Vec<f32>,
}

impl Interleaved {
    fn new() -> Self {
        Self {
            engine: RenderEngine::with_sample_rate(SAMPLE_RATE),
            watched: None,
            heard: Vec::new(),
        }
    }

    fn render_block(&mut self, control: ControlId) {
        if self.watched == Some(control) {
            let now = self.engine.now();
            if let Ok(level) = self.engine.value_at(control, now) {
                self.heard.push(level);
            }
        }
        self.engine.advance(BLOCK);
    }
}

impl AudioBackend for Interleaved {
    fn is_ready(&self) -> bool {
        self.engine.is_ready()
    }

    fn now(&self) -> f64 {
        self.engine.now()
    }

    fn create_source(&mut self, desc: &SourceDescriptor) -> Result<SourceId, BackendError> {
        self.engine.create_source(desc)
    }

    fn create_amplitude(&mut self) -> Result<ControlId, BackendError> {
        self.engine.create_amplitude()
    }

    fn connect(&mut self, source: SourceId, control: ControlId) -> Result<(), BackendError> {
        self.engine.connect(source, control)
    }

    fn connect_output(&mut self, control: ControlId) -> Result<(), BackendError> {
        self.engine.connect_output(control)
    }

    fn set_value_at(
        &mut self,
        control: ControlId,
        value: f32,
        time: f64,
    ) -> Result<(), BackendError> {
        self.engine.set_value_at(control, value, time)?;
        self.render_block(control);
        Ok(())
    }

    fn linear_ramp_to(
        &mut self,
        control: ControlId,
        value: f32,
        end_time: f64,
    ) -> Result<(), BackendError> {
        self.engine.linear_ramp_to(control, value, end_time)?;
        self.render_block(control);
        Ok(())
    }

    fn cancel_scheduled(
        &mut self,
        control: ControlId,
        from_time: f64,
    ) -> Result<(), BackendError> {
        self.engine.cancel_scheduled(control, from_time)?;
        self.render_block(control);
        Ok(())
    }

    fn value_at(&self, control: ControlId, time: f64) -> Result<f32, BackendError> {
        self.engine.value_at(control, time)
    }

    fn start(&mut self, source: SourceId, at: f64) -> Result<(), BackendError> {
        self.engine.start(source, at)
    }

    fn stop(&mut self, source: SourceId) -> Result<(), BackendError> {
        self.engine.stop(source)
    }

    fn disconnect(&mut self, source: SourceId) -> Result<(), BackendError> {
        self.engine.disconnect(source)
    }

    fn release_control(&mut self, control: ControlId) -> Result<(), BackendError> {
        self.engine.release_control(control)
    }

    // one lock around the whole batch, like SharedEngine
    fn automate(&mut self, control: ControlId, steps: &[Automate]) -> Result<(), BackendError> {
        self.engine.automate(control, steps)?;
        self.render_block(control);
        Ok(())
    }
}

fn slow_attack() -> SharedParams {
    SharedParams::new(Parameters {
        envelope: EnvelopeSettings {
            attack: 1.0,
            decay: 0.5,
            sustain: 0.5,
            release: 1.0,
        },
        ..Parameters::default()
    })
}

#[test]
fn release_mid_attack_never_drops_to_silence() {
    let mut voices = VoiceManager::new(Interleaved::new(), slow_attack());
    let id = VoiceId::from("A4");
    voices.note_on(id.clone(), 440.0);

    let control = voices.voice(&id).unwrap().amplitude();
    voices.backend_mut().engine.advance(0.5);
    let before = voices.backend().engine.value_at(control, 0.5).unwrap();
    assert!(before > 0.4, "level before release {before}");

    voices.backend_mut().watched = Some(control);
    voices.note_off(&id);

    let heard = &voices.backend().heard;
    assert!(!heard.is_empty());
    for level in heard {
        assert!(
            (level - before).abs() < 0.1,
            "level jumped from {before} to {level} while the release was issued"
        );
    }
}

#[test]
fn forced_teardown_silences_in_one_step() {
    let mut voices = VoiceManager::new(Interleaved::new(), slow_attack());
    let id = VoiceId::from("A4");
    voices.note_on(id.clone(), 440.0);
    let control = voices.voice(&id).unwrap().amplitude();

    voices.backend_mut().watched = Some(control);
    voices.backend_mut().engine.advance(0.25);
    voices.note_off(&id);
    voices.note_off(&id);

    // never back up the abandoned attack ramp
    assert!(voices.voice(&id).is_none());
    let heard = &voices.backend().heard;
    assert!(heard.iter().all(|level| *level <= 0.3), "{heard:?}");
}
