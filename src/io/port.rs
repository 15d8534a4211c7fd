//! Hardware MIDI input through `midir`.
//!
//! The port callback runs on a thread owned by the platform MIDI driver, so
//! it does nothing but copy the bytes into a [`MidiPacket`] and push them
//! onto the control thread's queue.

use midir::{Ignore, MidiInputConnection};
use rtrb::Producer;
use tracing::{debug, info};

use crate::{error::PortError, io::midi::MidiPacket, synth::SynthMessage};

const CLIENT_NAME: &str = "n333";

/// An available input port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidiPortInfo {
    pub index: usize,
    pub name: String,
}

/// Open connection; the port closes when this is dropped.
pub struct MidiConnection {
    name: String,
    _connection: MidiInputConnection<()>,
}

impl MidiConnection {
    pub fn name(&self) -> &str {
        &self.name
    }
}

pub fn list_ports() -> Result<Vec<MidiPortInfo>, PortError> {
    let input = midir::MidiInput::new(CLIENT_NAME).map_err(|e| PortError::Init(e.to_string()))?;
    Ok(input
        .ports()
        .iter()
        .enumerate()
        .map(|(index, port)| MidiPortInfo {
            index,
            name: input
                .port_name(port)
                .unwrap_or_else(|_| format!("Unknown Device {index}")),
        })
        .collect())
}

/// Connect to port `index` and forward every message to `tx`.
pub fn connect(index: usize, mut tx: Producer<SynthMessage>) -> Result<MidiConnection, PortError> {
    let mut input =
        midir::MidiInput::new(CLIENT_NAME).map_err(|e| PortError::Init(e.to_string()))?;
    // sysex and clock are not needed; active sensing still passes
    input.ignore(Ignore::SysexAndTime);

    let ports = input.ports();
    let port = ports.get(index).ok_or(PortError::NotFound(index))?;
    let name = input
        .port_name(port)
        .unwrap_or_else(|_| format!("Device {index}"));

    let connection = input
        .connect(
            port,
            "n333-input",
            move |_timestamp, message, _| {
                let Ok(packet) = MidiPacket::from_slice(message) else {
                    return;
                };
                if tx.push(SynthMessage::Midi(packet)).is_err() {
                    debug!("control queue full, dropping MIDI message");
                }
            },
            (),
        )
        .map_err(|e| PortError::Connect(e.to_string()))?;

    info!(port = %name, "MIDI input connected");
    Ok(MidiConnection {
        name,
        _connection: connection,
    })
}
