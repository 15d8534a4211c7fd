use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::{
    io::midi::MidiEvent,
    notes::FrequencyMap,
    params::SharedParams,
    synth::{NoteSink, VoiceId},
};

/*
MIDI Input Adapter
==================

Turns raw channel-voice bytes into note_on / note_off calls on a NoteSink.

    bytes ──> MidiEvent ──> channel filter ──> pressed-key check ──> sink

The pressed set only answers "is this physical key already down?". A second
note-on for a held key, or a note-off for a key that is not held, is dropped
here; the sink never sees it. Which voices are actually sounding is the
sink's business, not ours.

Voice ids are note names ("C4", "F#5"), the same ids the computer keyboard
uses, so a MIDI key and a typed key for the same pitch share one voice slot.
*/

pub struct MidiInput {
    map: FrequencyMap,
    params: SharedParams,
    pressed: BTreeSet<u8>,
    /// `None` = omni.
    channel: Option<u8>,
}

impl MidiInput {
    pub fn new(params: SharedParams) -> Self {
        Self {
            map: FrequencyMap::new(),
            params,
            pressed: BTreeSet::new(),
            channel: None,
        }
    }

    /// Only accept messages on `channel` (0-based); `None` accepts all.
    pub fn with_channel(mut self, channel: Option<u8>) -> Self {
        self.set_channel(channel);
        self
    }

    pub fn set_channel(&mut self, channel: Option<u8>) {
        self.channel = channel.map(|c| c & 0x0F);
    }

    pub fn channel(&self) -> Option<u8> {
        self.channel
    }

    /// Note numbers currently held, lowest first.
    pub fn pressed(&self) -> &BTreeSet<u8> {
        &self.pressed
    }

    pub fn is_pressed(&self, key: u8) -> bool {
        self.pressed.contains(&key)
    }

    /// Forget every held key. The next message resynchronizes.
    pub fn reset(&mut self) {
        self.pressed.clear();
    }

    /// Voice id used for a MIDI note number.
    pub fn voice_id(&self, key: u8) -> VoiceId {
        match self.map.name(key) {
            Some(name) => VoiceId::from(name),
            None => VoiceId::from(format!("midi-{key}")),
        }
    }

    /// Decode `bytes` and forward the result. Returns true if the sink was called.
    pub fn handle<S: NoteSink + ?Sized>(&mut self, bytes: &[u8], sink: &mut S) -> bool {
        match MidiEvent::from_bytes(bytes) {
            Ok(event) => self.handle_event(event, sink),
            Err(err) => {
                trace!(%err, "MIDI message ignored");
                false
            }
        }
    }

    pub fn handle_event<S: NoteSink + ?Sized>(&mut self, event: MidiEvent, sink: &mut S) -> bool {
        if let (Some(wanted), Some(channel)) = (self.channel, event.channel()) {
            if wanted != channel {
                return false;
            }
        }

        match event {
            MidiEvent::NoteOn { key, velocity, .. } => {
                if !self.pressed.insert(key) {
                    debug!(key, "duplicate note on suppressed");
                    return false;
                }
                let Some(base) = self.map.frequency(key) else {
                    self.pressed.remove(&key);
                    return false;
                };
                let frequency = base + self.params.snapshot().fine_tune_hz;
                trace!(key, velocity, frequency, "MIDI note on");
                sink.note_on(self.voice_id(key), frequency);
                true
            }
            MidiEvent::NoteOff { key, .. } => {
                if !self.pressed.remove(&key) {
                    debug!(key, "note off for key not held, suppressed");
                    return false;
                }
                trace!(key, "MIDI note off");
                sink.note_off(&self.voice_id(key));
                true
            }
            other => {
                trace!(?other, "MIDI message discarded");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<(String, Option<f32>)>,
    }

    impl NoteSink for Recorder {
        fn note_on(&mut self, id: VoiceId, frequency: f32) {
            self.calls.push((id.to_string(), Some(frequency)));
        }

        fn note_off(&mut self, id: &VoiceId) {
            self.calls.push((id.to_string(), None));
        }
    }

    #[test]
    fn note_on_uses_note_name_and_fine_tune() {
        let params = SharedParams::default();
        params.update(|p| p.fine_tune_hz = 2.5);
        let mut input = MidiInput::new(params);
        let mut sink = Recorder::default();

        assert!(input.handle(&[0x90, 69, 100], &mut sink));
        assert_eq!(sink.calls, vec![("A4".to_string(), Some(442.5))]);
        assert!(input.is_pressed(69));
    }

    #[test]
    fn channel_filter() {
        let mut input = MidiInput::new(SharedParams::default()).with_channel(Some(1));
        let mut sink = Recorder::default();

        assert!(!input.handle(&[0x90, 60, 100], &mut sink));
        assert!(input.handle(&[0x91, 60, 100], &mut sink));
        assert_eq!(sink.calls.len(), 1);
    }

    #[test]
    fn reset_forgets_held_keys() {
        let mut input = MidiInput::new(SharedParams::default());
        let mut sink = Recorder::default();
        input.handle(&[0x90, 60, 100], &mut sink);
        input.handle(&[0x90, 64, 100], &mut sink);
        assert_eq!(input.pressed().iter().copied().collect::<Vec<_>>(), vec![60, 64]);

        input.reset();
        assert!(input.pressed().is_empty());
        // held again after a reset, so this is a fresh press
        assert!(input.handle(&[0x90, 60, 100], &mut sink));
    }

    #[test]
    fn realtime_and_controller_bytes_are_discarded() {
        let mut input = MidiInput::new(SharedParams::default());
        let mut sink = Recorder::default();
        let messages: [&[u8]; 5] = [&[0xF8], &[0xFA], &[0xFE], &[0xB0, 64, 127], &[0xE0, 0, 64]];
        for bytes in messages {
            assert!(!input.handle(bytes, &mut sink));
        }
        assert!(sink.calls.is_empty());
    }
}
