use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    engine::{AudioBackend, Automate, ControlId, RenderEngine, SourceDescriptor, SourceId},
    error::BackendError,
};

/// Render engine shared between the control thread and the audio callback.
///
/// The control side uses it as an [`AudioBackend`]; the output stream calls
/// [`render`](Self::render). Both lock the same engine, so scheduling and
/// rendering never interleave within a block.
#[derive(Clone, Default)]
pub struct SharedEngine {
    inner: Arc<Mutex<RenderEngine>>,
}

impl SharedEngine {
    pub fn new(engine: RenderEngine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RenderEngine> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the clock once the output stream knows its sample rate.
    pub fn activate(&self, sample_rate: f32) {
        self.lock().activate(sample_rate);
    }

    /// Audio callback entry point.
    pub fn render(&self, out: &mut [f32]) {
        self.lock().render_block(out);
    }

    pub fn set_master_gain(&self, gain: f32) {
        self.lock().set_master_gain(gain);
    }

    pub fn sample_rate(&self) -> f32 {
        self.lock().sample_rate()
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut RenderEngine) -> R) -> R {
        f(&mut self.lock())
    }
}

impl AudioBackend for SharedEngine {
    fn is_ready(&self) -> bool {
        self.lock().is_ready()
    }

    fn now(&self) -> f64 {
        self.lock().now()
    }

    fn create_source(&mut self, desc: &SourceDescriptor) -> Result<SourceId, BackendError> {
        self.lock().create_source(desc)
    }

    fn create_amplitude(&mut self) -> Result<ControlId, BackendError> {
        self.lock().create_amplitude()
    }

    fn connect(&mut self, source: SourceId, control: ControlId) -> Result<(), BackendError> {
        self.lock().connect(source, control)
    }

    fn connect_output(&mut self, control: ControlId) -> Result<(), BackendError> {
        self.lock().connect_output(control)
    }

    fn set_value_at(
        &mut self,
        control: ControlId,
        value: f32,
        time: f64,
    ) -> Result<(), BackendError> {
        self.lock().set_value_at(control, value, time)
    }

    fn linear_ramp_to(
        &mut self,
        control: ControlId,
        value: f32,
        end_time: f64,
    ) -> Result<(), BackendError> {
        self.lock().linear_ramp_to(control, value, end_time)
    }

    fn cancel_scheduled(
        &mut self,
        control: ControlId,
        from_time: f64,
    ) -> Result<(), BackendError> {
        self.lock().cancel_scheduled(control, from_time)
    }

    fn value_at(&self, control: ControlId, time: f64) -> Result<f32, BackendError> {
        self.lock().value_at(control, time)
    }

    fn start(&mut self, source: SourceId, at: f64) -> Result<(), BackendError> {
        self.lock().start(source, at)
    }

    fn stop(&mut self, source: SourceId) -> Result<(), BackendError> {
        self.lock().stop(source)
    }

    fn disconnect(&mut self, source: SourceId) -> Result<(), BackendError> {
        self.lock().disconnect(source)
    }

    fn release_control(&mut self, control: ControlId) -> Result<(), BackendError> {
        self.lock().release_control(control)
    }

    /// The whole sequence runs under one lock, so the audio callback never
    /// renders a half-rewritten schedule.
    fn automate(&mut self, control: ControlId, steps: &[Automate]) -> Result<(), BackendError> {
        self.lock().automate(control, steps)
    }
}
