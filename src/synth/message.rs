#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::{io::midi::MidiPacket, params::PlaybackMode, synth::voice::VoiceId};

/// Commands for the control thread.
///
/// Every input source (keyboard, MIDI callback, UI) turns its events into
/// these and pushes them onto a queue; one thread drains the queue and owns
/// the voices.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { id: VoiceId, frequency: f32 },
    NoteOff { id: VoiceId },
    /// Raw bytes for the MIDI adapter.
    Midi(MidiPacket),
    /// Panic: force-destroy everything.
    AllNotesOff,
    SetMode(PlaybackMode),
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<SynthMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        Consumer::pop(self).ok()
    }
}

impl MessageReceiver for std::collections::VecDeque<SynthMessage> {
    fn pop(&mut self) -> Option<SynthMessage> {
        self.pop_front()
    }
}
