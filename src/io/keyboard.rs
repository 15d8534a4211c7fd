use std::collections::HashMap;

use crate::{notes::FrequencyMap, params::SharedParams, synth::VoiceId};

/*
Computer Keyboard as Piano
==========================

Two tracker-style rows, each starting on a C:

     2 3   5 6 7   9 0            s d   g h j
    q w e r t y u i o p          z x c v b n m ,
    └ C(base+1) ... E(base+2) ┘  └ C(base) ... C(base+1) ┘

The lower row starts at C of octave `params.octave + 3`, the upper row one
octave above. Frequencies come from the note table plus the fine-tune offset
at the moment the key goes down.
*/

const LOWER_ROW: &str = "zsxdcvgbhnjm,";
const UPPER_ROW: &str = "q2w3er5t6y7ui9o0p";

/// Octave the lower row starts on when `params.octave` is 0.
const BASE_OCTAVE: i32 = 3;

pub struct KeyboardLayout {
    map: FrequencyMap,
    params: SharedParams,
    /// Keys currently down and the voice each one started.
    held: HashMap<char, VoiceId>,
}

impl KeyboardLayout {
    pub fn new(params: SharedParams) -> Self {
        Self {
            map: FrequencyMap::new(),
            params,
            held: HashMap::new(),
        }
    }

    /// Semitone offset of `key` from the lower row's C.
    pub fn offset(key: char) -> Option<u8> {
        let key = key.to_ascii_lowercase();
        if let Some(pos) = LOWER_ROW.find(key) {
            return Some(pos as u8);
        }
        UPPER_ROW.find(key).map(|pos| pos as u8 + 12)
    }

    /// MIDI note for `key` at the current octave.
    pub fn note_for(&self, key: char) -> Option<u8> {
        let offset = Self::offset(key)? as i32;
        let octave = self.params.snapshot().octave as i32 + BASE_OCTAVE;
        let note = 12 * (octave + 1) + offset;
        u8::try_from(note).ok().filter(|n| *n <= 127)
    }

    /// Key down. `None` for unmapped keys and for keys already held
    /// (terminal key-repeat).
    pub fn press(&mut self, key: char) -> Option<(VoiceId, f32)> {
        let key = key.to_ascii_lowercase();
        if self.held.contains_key(&key) {
            return None;
        }
        let note = self.note_for(key)?;
        let info = self.map.get(note)?;
        let id = VoiceId::from(info.name.as_str());
        let frequency = info.frequency + self.params.snapshot().fine_tune_hz;
        self.held.insert(key, id.clone());
        Some((id, frequency))
    }

    /// Key up. Returns the id the key started, even if the octave changed
    /// while it was held.
    pub fn release(&mut self, key: char) -> Option<VoiceId> {
        self.held.remove(&key.to_ascii_lowercase())
    }

    /// Release every held key.
    pub fn release_all(&mut self) -> Vec<VoiceId> {
        self.held.drain().map(|(_, id)| id).collect()
    }

    pub fn is_held(&self, key: char) -> bool {
        self.held.contains_key(&key.to_ascii_lowercase())
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_start_on_c() {
        assert_eq!(KeyboardLayout::offset('z'), Some(0));
        assert_eq!(KeyboardLayout::offset(','), Some(12));
        assert_eq!(KeyboardLayout::offset('q'), Some(12));
        assert_eq!(KeyboardLayout::offset('P'), Some(28));
        assert_eq!(KeyboardLayout::offset('a'), None);
    }

    #[test]
    fn octave_parameter_moves_the_layout() {
        let params = SharedParams::default();
        let keys = KeyboardLayout::new(params.clone());
        assert_eq!(keys.note_for('z'), Some(48));

        params.update(|p| p.octave = 1);
        assert_eq!(keys.note_for('z'), Some(60));
        assert_eq!(keys.note_for('q'), Some(72));
    }

    #[test]
    fn press_yields_note_name_and_tuned_frequency() {
        let params = SharedParams::default();
        params.update(|p| {
            p.octave = 1;
            p.fine_tune_hz = -1.0;
        });
        let mut keys = KeyboardLayout::new(params);

        // 'n' is A on the lower row
        let (id, frequency) = keys.press('n').unwrap();
        assert_eq!(id.as_str(), "A4");
        assert!((frequency - 439.0).abs() < 1e-3);
    }

    #[test]
    fn repeat_is_ignored_and_release_returns_original_id() {
        let params = SharedParams::default();
        let mut keys = KeyboardLayout::new(params.clone());

        let (id, _) = keys.press('z').unwrap();
        assert!(keys.press('z').is_none());

        params.update(|p| p.octave = 2);
        assert_eq!(keys.release('z'), Some(id));
        assert_eq!(keys.release('z'), None);
    }

    #[test]
    fn out_of_range_notes_are_unmapped() {
        let params = SharedParams::default();
        params.update(|p| p.octave = 7);
        let mut keys = KeyboardLayout::new(params);
        assert!(keys.press('p').is_none());
        assert_eq!(keys.held_count(), 0);
    }
}
