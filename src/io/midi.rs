use crate::error::MidiError;

/// Decoded MIDI message.
///
/// Channels are 0-based (0..=15). Data bytes are masked to 7 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    /// Also produced for note-on with velocity 0.
    NoteOff { channel: u8, key: u8, velocity: u8 },
    PolyPressure { channel: u8, key: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// Centered on 0, range -8192..=8191.
    PitchBend { channel: u8, value: i16 },
    Clock,
    Start,
    Continue,
    Stop,
    ActiveSensing,
    Reset,
}

impl MidiEvent {
    /// Decode one complete message. Trailing bytes are ignored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, MidiError> {
        let Some(&status) = bytes.first() else {
            return Err(MidiError::Empty);
        };

        match status {
            0xF8 => return Ok(Self::Clock),
            0xFA => return Ok(Self::Start),
            0xFB => return Ok(Self::Continue),
            0xFC => return Ok(Self::Stop),
            0xFE => return Ok(Self::ActiveSensing),
            0xFF => return Ok(Self::Reset),
            // data byte without status (running status) or other system messages
            0x00..=0x7F | 0xF0..=0xFF => return Err(MidiError::Unsupported(status)),
            _ => {}
        }

        let kind = status & 0xF0;
        let channel = status & 0x0F;
        let expected = match kind {
            0xC0 | 0xD0 => 2,
            _ => 3,
        };
        if bytes.len() < expected {
            return Err(MidiError::Truncated {
                status,
                expected,
                got: bytes.len(),
            });
        }
        let data1 = bytes[1] & 0x7F;
        let data2 = bytes.get(2).map_or(0, |b| b & 0x7F);

        let event = match kind {
            0x80 => Self::NoteOff {
                channel,
                key: data1,
                velocity: data2,
            },
            0x90 if data2 == 0 => Self::NoteOff {
                channel,
                key: data1,
                velocity: 0,
            },
            0x90 => Self::NoteOn {
                channel,
                key: data1,
                velocity: data2,
            },
            0xA0 => Self::PolyPressure {
                channel,
                key: data1,
                pressure: data2,
            },
            0xB0 => Self::ControlChange {
                channel,
                controller: data1,
                value: data2,
            },
            0xC0 => Self::ProgramChange {
                channel,
                program: data1,
            },
            0xD0 => Self::ChannelPressure {
                channel,
                pressure: data1,
            },
            _ => Self::PitchBend {
                channel,
                value: (((data2 as i16) << 7) | data1 as i16) - 8192,
            },
        };
        Ok(event)
    }

    /// Channel of a channel-voice message; `None` for system real-time.
    pub fn channel(&self) -> Option<u8> {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::PolyPressure { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelPressure { channel, .. }
            | Self::PitchBend { channel, .. } => Some(channel),
            _ => None,
        }
    }

    /// Clock, transport, active-sensing and reset bytes.
    pub fn is_realtime(&self) -> bool {
        self.channel().is_none()
    }
}

/// Up to three raw bytes, small enough to cross threads by copy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MidiPacket {
    data: [u8; 3],
    /// Valid bytes in `data` (1-3).
    len: u8,
}

impl MidiPacket {
    /// Copy the first three bytes of `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MidiError> {
        if bytes.is_empty() {
            return Err(MidiError::Empty);
        }
        let len = bytes.len().min(3);
        let mut data = [0u8; 3];
        data[..len].copy_from_slice(&bytes[..len]);
        Ok(Self {
            data,
            len: len as u8,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    pub fn decode(&self) -> Result<MidiEvent, MidiError> {
        MidiEvent::from_bytes(self.as_bytes())
    }
}
