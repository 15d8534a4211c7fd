use std::collections::BTreeMap;

use crate::{
    dsp::{Automation, OscillatorBlock},
    engine::{AudioBackend, ControlId, SourceDescriptor, SourceId},
    error::BackendError,
    MAX_BLOCK_SIZE,
};

/*
Render Engine
=============

A minimal node graph: oscillators feed amplitude controls, amplitude
controls feed the output.

    osc ──┐
          ├──> amplitude (automation) ──┐
    osc ──┘                             ├──> Σ ──> × master gain ──> out
    osc ────> amplitude (automation) ───┘

The clock is the number of frames rendered so far divided by the sample
rate, so it only moves while audio is being pulled (by the output stream or
by `advance` in offline use). Every scheduled time the control side writes
is compared against this clock.
*/

#[derive(Debug, Clone, Copy, PartialEq)]
enum SourceState {
    Idle,
    Started { at: f64 },
    Stopped,
}

#[derive(Debug)]
struct SourceSlot {
    osc: OscillatorBlock,
    state: SourceState,
    control: Option<ControlId>,
}

#[derive(Debug)]
struct ControlSlot {
    automation: Automation,
    to_output: bool,
}

pub struct RenderEngine {
    sample_rate: f32,
    active: bool,
    frames: u64,
    next_id: u64,
    master_gain: f32,
    sources: BTreeMap<SourceId, SourceSlot>,
    controls: BTreeMap<ControlId, ControlSlot>,
    gain_buffer: Vec<f32>,
}

impl RenderEngine {
    /// Engine without a clock; not ready until [`activate`](Self::activate).
    pub fn new() -> Self {
        Self {
            sample_rate: 0.0,
            active: false,
            frames: 0,
            next_id: 0,
            master_gain: 1.0,
            sources: BTreeMap::new(),
            controls: BTreeMap::new(),
            gain_buffer: vec![0.0; MAX_BLOCK_SIZE],
        }
    }

    /// Engine that is ready immediately (offline rendering, tests).
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        let mut engine = Self::new();
        engine.activate(sample_rate);
        engine
    }

    /// Start the clock at `sample_rate`. Called once the output stream exists.
    pub fn activate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.active = true;
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
    }

    /// Live sources (started or not).
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Live amplitude controls.
    pub fn control_count(&self) -> usize {
        self.controls.len()
    }

    /// True if the source was started and not stopped.
    pub fn is_playing(&self, source: SourceId) -> bool {
        self.sources
            .get(&source)
            .is_some_and(|slot| matches!(slot.state, SourceState::Started { .. }))
    }

    /// Render `out.len()` frames and advance the clock.
    ///
    /// Renders silence without moving the clock while inactive.
    pub fn render_block(&mut self, out: &mut [f32]) {
        out.fill(0.0);
        if !self.active {
            return;
        }

        let sample_rate = self.sample_rate;
        let dt = 1.0 / sample_rate as f64;
        let block_start = self.now();

        let Self {
            sources,
            controls,
            gain_buffer,
            ..
        } = self;

        if gain_buffer.len() < out.len() {
            gain_buffer.resize(out.len(), 0.0);
        }
        let gains = &mut gain_buffer[..out.len()];

        for (control_id, control) in controls.iter() {
            if !control.to_output {
                continue;
            }

            for (i, gain) in gains.iter_mut().enumerate() {
                *gain = control.automation.value_at(block_start + i as f64 * dt);
            }

            for slot in sources.values_mut() {
                if slot.control != Some(*control_id) {
                    continue;
                }
                let SourceState::Started { at } = slot.state else {
                    continue;
                };
                for (i, (sample, gain)) in out.iter_mut().zip(gains.iter()).enumerate() {
                    if block_start + i as f64 * dt >= at {
                        *sample += slot.osc.next_sample(sample_rate) * gain;
                    }
                }
            }
        }

        for sample in out.iter_mut() {
            *sample *= self.master_gain;
        }

        self.frames += out.len() as u64;

        let now = self.now();
        for control in self.controls.values_mut() {
            control.automation.prune_before(now);
        }
    }

    /// Render and discard `seconds` of audio, moving the clock forward.
    pub fn advance(&mut self, seconds: f64) {
        if !self.active {
            return;
        }
        let mut remaining = (seconds * self.sample_rate as f64).round().max(0.0) as usize;
        let mut scratch = vec![0.0f32; MAX_BLOCK_SIZE];
        while remaining > 0 {
            let frames = remaining.min(MAX_BLOCK_SIZE);
            self.render_block(&mut scratch[..frames]);
            remaining -= frames;
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn control_mut(&mut self, control: ControlId) -> Result<&mut ControlSlot, BackendError> {
        self.controls
            .get_mut(&control)
            .ok_or(BackendError::UnknownControl(control))
    }

    fn source_mut(&mut self, source: SourceId) -> Result<&mut SourceSlot, BackendError> {
        self.sources
            .get_mut(&source)
            .ok_or(BackendError::UnknownSource(source))
    }
}

impl Default for RenderEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for RenderEngine {
    fn is_ready(&self) -> bool {
        self.active
    }

    fn now(&self) -> f64 {
        if self.sample_rate > 0.0 {
            self.frames as f64 / self.sample_rate as f64
        } else {
            0.0
        }
    }

    fn create_source(&mut self, desc: &SourceDescriptor) -> Result<SourceId, BackendError> {
        if !self.active {
            return Err(BackendError::NotReady);
        }
        let id = SourceId(self.next_id());
        let osc = OscillatorBlock::detuned(desc.waveform, desc.frequency, desc.detune_cents);
        self.sources.insert(
            id,
            SourceSlot {
                osc,
                state: SourceState::Idle,
                control: None,
            },
        );
        Ok(id)
    }

    fn create_amplitude(&mut self) -> Result<ControlId, BackendError> {
        if !self.active {
            return Err(BackendError::NotReady);
        }
        let id = ControlId(self.next_id());
        self.controls.insert(
            id,
            ControlSlot {
                automation: Automation::new(0.0),
                to_output: false,
            },
        );
        Ok(id)
    }

    fn connect(&mut self, source: SourceId, control: ControlId) -> Result<(), BackendError> {
        if !self.controls.contains_key(&control) {
            return Err(BackendError::UnknownControl(control));
        }
        self.source_mut(source)?.control = Some(control);
        Ok(())
    }

    fn connect_output(&mut self, control: ControlId) -> Result<(), BackendError> {
        self.control_mut(control)?.to_output = true;
        Ok(())
    }

    fn set_value_at(
        &mut self,
        control: ControlId,
        value: f32,
        time: f64,
    ) -> Result<(), BackendError> {
        self.control_mut(control)?.automation.set_value_at(value, time);
        Ok(())
    }

    fn linear_ramp_to(
        &mut self,
        control: ControlId,
        value: f32,
        end_time: f64,
    ) -> Result<(), BackendError> {
        self.control_mut(control)?
            .automation
            .linear_ramp_to(value, end_time);
        Ok(())
    }

    fn cancel_scheduled(
        &mut self,
        control: ControlId,
        from_time: f64,
    ) -> Result<(), BackendError> {
        self.control_mut(control)?.automation.cancel_from(from_time);
        Ok(())
    }

    fn value_at(&self, control: ControlId, time: f64) -> Result<f32, BackendError> {
        self.controls
            .get(&control)
            .map(|slot| slot.automation.value_at(time))
            .ok_or(BackendError::UnknownControl(control))
    }

    fn start(&mut self, source: SourceId, at: f64) -> Result<(), BackendError> {
        let slot = self.source_mut(source)?;
        if slot.state != SourceState::Idle {
            return Err(BackendError::AlreadyStarted(source));
        }
        slot.state = SourceState::Started { at };
        Ok(())
    }

    fn stop(&mut self, source: SourceId) -> Result<(), BackendError> {
        let slot = self.source_mut(source)?;
        match slot.state {
            SourceState::Started { .. } => {
                slot.state = SourceState::Stopped;
                Ok(())
            }
            SourceState::Idle | SourceState::Stopped => Err(BackendError::AlreadyStopped(source)),
        }
    }

    fn disconnect(&mut self, source: SourceId) -> Result<(), BackendError> {
        self.sources
            .remove(&source)
            .map(|_| ())
            .ok_or(BackendError::UnknownSource(source))
    }

    fn release_control(&mut self, control: ControlId) -> Result<(), BackendError> {
        self.controls
            .remove(&control)
            .ok_or(BackendError::UnknownControl(control))?;
        for slot in self.sources.values_mut() {
            if slot.control == Some(control) {
                slot.control = None;
            }
        }
        Ok(())
    }
}
