//! The control domain.
//!
//! [`Synth`] owns the voice manager and the MIDI adapter and is driven from
//! exactly one thread. Other threads (the MIDI driver callback, the UI) only
//! push [`SynthMessage`]s onto a queue that this thread drains, so voice
//! operations never overlap.
//!
//! ```ignore
//! use n333_synth::{engine::SharedEngine, params::SharedParams, runtime::Synth};
//!
//! let engine = SharedEngine::default();
//! let mut synth = Synth::new(engine.clone(), SharedParams::default());
//! loop {
//!     synth.drain(&mut rx);
//!     synth.tick();
//! }
//! ```

use tracing::debug;

use crate::{
    engine::AudioBackend,
    io::MidiInput,
    params::{PlaybackMode, SharedParams},
    synth::{MessageReceiver, NoteSink, SynthMessage, VoiceId, VoiceManager},
};

#[cfg(feature = "serde")]
use crate::config::SynthConfig;

pub struct Synth<B: AudioBackend> {
    voices: VoiceManager<B>,
    midi: MidiInput,
    params: SharedParams,
}

impl<B: AudioBackend> Synth<B> {
    pub fn new(backend: B, params: SharedParams) -> Self {
        Self {
            voices: VoiceManager::new(backend, params.clone()),
            midi: MidiInput::new(params.clone()),
            params,
        }
    }

    /// Build from a loaded configuration; the parameters start at the configured values.
    #[cfg(feature = "serde")]
    pub fn from_config(backend: B, config: &SynthConfig) -> Self {
        let mut synth = Self::new(backend, SharedParams::new(config.params));
        synth.voices.set_playback_mode(config.mode);
        synth.voices.set_cleanup_margin(config.cleanup_margin);
        synth
    }

    pub fn params(&self) -> &SharedParams {
        &self.params
    }

    pub fn voices(&self) -> &VoiceManager<B> {
        &self.voices
    }

    pub fn voices_mut(&mut self) -> &mut VoiceManager<B> {
        &mut self.voices
    }

    pub fn midi(&self) -> &MidiInput {
        &self.midi
    }

    pub fn midi_mut(&mut self) -> &mut MidiInput {
        &mut self.midi
    }

    pub fn backend(&self) -> &B {
        self.voices.backend()
    }

    pub fn playback_mode(&self) -> PlaybackMode {
        self.voices.playback_mode()
    }

    pub fn set_playback_mode(&mut self, mode: PlaybackMode) {
        self.voices.set_playback_mode(mode);
    }

    /// Raw MIDI bytes from a port. Returns true if a note event resulted.
    pub fn midi_message(&mut self, bytes: &[u8]) -> bool {
        self.midi.handle(bytes, &mut self.voices)
    }

    /// Panic: every voice gone, every MIDI key forgotten.
    pub fn stop_all(&mut self) {
        self.voices.stop_all();
        self.midi.reset();
        debug!("stop all");
    }

    /// Fire due cleanups. Call regularly from the control loop.
    pub fn tick(&mut self) -> usize {
        self.voices.run_pending()
    }

    /// Seconds until the next release cleanup is due, if one is pending.
    ///
    /// Lets the control loop sleep no longer than the next [`tick`](Self::tick)
    /// has work for.
    pub fn until_next_cleanup(&self) -> Option<f64> {
        let due = self.voices.next_cleanup()?;
        Some((due - self.voices.backend().now()).max(0.0))
    }

    /// Apply one command. The only place queued messages reach the voices.
    pub fn handle(&mut self, message: SynthMessage) {
        match message {
            SynthMessage::Midi(packet) => {
                self.midi_message(packet.as_bytes());
            }
            SynthMessage::NoteOn { id, frequency } => self.voices.note_on(id, frequency),
            SynthMessage::NoteOff { id } => self.voices.note_off(&id),
            SynthMessage::AllNotesOff => self.stop_all(),
            SynthMessage::SetMode(mode) => self.set_playback_mode(mode),
        }
    }

    /// Apply every queued message. Returns how many were handled.
    pub fn drain<R: MessageReceiver + ?Sized>(&mut self, rx: &mut R) -> usize {
        let mut handled = 0;
        while let Some(message) = rx.pop() {
            self.handle(message);
            handled += 1;
        }
        handled
    }
}

impl<B: AudioBackend> NoteSink for Synth<B> {
    fn note_on(&mut self, id: VoiceId, frequency: f32) {
        self.voices.note_on(id, frequency);
    }

    fn note_off(&mut self, id: &VoiceId) {
        self.voices.note_off(id);
    }
}
