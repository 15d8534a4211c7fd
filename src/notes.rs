/*
MIDI Note Table
===============

Every MIDI note number (0-127) gets a name and a frequency. Middle C (C4)
is MIDI note 60 and A4 (note 69) is the tuning reference.

Naming Convention:
- Sharps only in the table: C4, C#4, D4, ... B4
- `lookup` also accepts flats: "Db4" resolves to the same note as "C#4"
- Octave -1 covers notes 0-11, so the lowest name is "C-1"

The MIDI formula: note_number = 12 * (octave + 1) + semitone
Where semitone: C=0, C#=1, D=2, D#=3, E=4, F=5, F#=6, G=7, G#=8, A=9, A#=10, B=11

Twelve-tone equal temperament:

    frequency = reference * 2^((note - 69) / 12)

  note 69 (A4) -> 440 Hz
  note 81 (A5) -> 880 Hz   one octave = twelve semitones = double frequency
  note 60 (C4) -> 261.63 Hz
*/

/// A4 reference frequency in Hz.
pub const A4_REFERENCE: f32 = 440.0;

/// MIDI note number of A4.
pub const A4_NOTE: u8 = 69;

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One entry of the note table.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteInfo {
    pub number: u8,
    pub name: String,
    pub frequency: f32,
}

/// Lookup table from MIDI note number to name and equal-tempered frequency.
///
/// Built once; read-only afterwards.
#[derive(Debug, Clone)]
pub struct FrequencyMap {
    reference: f32,
    notes: Vec<NoteInfo>,
}

impl FrequencyMap {
    /// Standard table with A4 = 440 Hz.
    pub fn new() -> Self {
        Self::with_reference(A4_REFERENCE)
    }

    /// Table tuned to a different A4.
    pub fn with_reference(reference: f32) -> Self {
        let notes = (0..=127u8)
            .map(|number| NoteInfo {
                number,
                name: note_name(number),
                frequency: equal_tempered(number, reference),
            })
            .collect();

        Self { reference, notes }
    }

    pub fn reference(&self) -> f32 {
        self.reference
    }

    /// Entry for `note`, or `None` for numbers above 127.
    pub fn get(&self, note: u8) -> Option<&NoteInfo> {
        self.notes.get(note as usize)
    }

    pub fn frequency(&self, note: u8) -> Option<f32> {
        self.get(note).map(|info| info.frequency)
    }

    pub fn name(&self, note: u8) -> Option<&str> {
        self.get(note).map(|info| info.name.as_str())
    }

    /// Parse a note name such as `"C#4"`, `"Db4"` or `"C-1"` back into its number.
    pub fn lookup(&self, name: &str) -> Option<u8> {
        let name = name.trim();
        let mut chars = name.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        let mut semitone: i32 = match letter {
            'C' => 0,
            'D' => 2,
            'E' => 4,
            'F' => 5,
            'G' => 7,
            'A' => 9,
            'B' => 11,
            _ => return None,
        };

        let rest = &name[letter.len_utf8()..];
        let octave_str = if let Some(stripped) = rest.strip_prefix('#') {
            semitone += 1;
            stripped
        } else if let Some(stripped) = rest.strip_prefix('b') {
            semitone -= 1;
            stripped
        } else {
            rest
        };

        let octave: i32 = octave_str.parse().ok()?;
        let number = 12 * (octave + 1) + semitone;
        u8::try_from(number).ok().filter(|n| *n <= 127)
    }
}

impl Default for FrequencyMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Equal-tempered frequency of `note` relative to the given A4.
#[inline]
pub fn equal_tempered(note: u8, reference: f32) -> f32 {
    reference * 2.0_f32.powf((note as f32 - A4_NOTE as f32) / 12.0)
}

/// Scientific pitch name of a MIDI note, e.g. 60 -> "C4".
pub fn note_name(note: u8) -> String {
    let octave = note as i32 / 12 - 1;
    format!("{}{}", NOTE_NAMES[note as usize % 12], octave)
}
