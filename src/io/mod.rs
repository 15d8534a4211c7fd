// Purpose - input adapters: raw MIDI, MIDI ports, computer keyboard

pub mod keyboard;
pub mod midi;
pub mod midi_input;
#[cfg(all(feature = "midi-io", feature = "rtrb"))]
pub mod port;

pub use keyboard::KeyboardLayout;
pub use midi::{MidiEvent, MidiPacket};
pub use midi_input::MidiInput;
