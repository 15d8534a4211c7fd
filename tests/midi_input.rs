use n333_synth::{
    engine::RenderEngine,
    notes::FrequencyMap,
    params::{PlaybackMode, SharedParams},
    runtime::Synth,
    synth::VoiceId,
};

fn synth() -> Synth<RenderEngine> {
    Synth::new(RenderEngine::with_sample_rate(8_000.0), SharedParams::default())
}

#[test]
fn reference_pitches() {
    let map = FrequencyMap::new();
    assert_eq!(map.frequency(69), Some(440.0));
    assert_eq!(map.frequency(81), Some(880.0));
    assert_eq!(map.name(60), Some("C4"));
    assert!((map.frequency(60).unwrap() - 261.63).abs() < 0.01);
    assert_eq!(map.frequency(128), None);
}

#[test]
fn duplicate_note_on_starts_one_voice() {
    let mut synth = synth();
    assert!(synth.midi_message(&[0x90, 60, 100]));
    let serial = synth.voices().voice(&VoiceId::from("C4")).unwrap().serial();

    assert!(!synth.midi_message(&[0x90, 60, 100]));
    assert_eq!(synth.voices().len(), 1);
    // not retriggered either
    let voice = synth.voices().voice(&VoiceId::from("C4")).unwrap();
    assert_eq!(voice.serial(), serial);
}

#[test]
fn velocity_zero_is_a_release() {
    let mut synth = synth();
    synth.midi_message(&[0x90, 64, 90]);
    assert!(synth.midi_message(&[0x90, 64, 0]));

    let voice = synth.voices().voice(&VoiceId::from("E4")).unwrap();
    assert!(voice.is_releasing());
    assert!(!synth.midi().is_pressed(64));
}

#[test]
fn stray_note_off_changes_nothing() {
    let mut synth = synth();
    synth.midi_message(&[0x90, 60, 100]);
    assert!(!synth.midi_message(&[0x80, 62, 0]));
    assert!(!synth.voices().voice(&VoiceId::from("C4")).unwrap().is_releasing());
}

#[test]
fn realtime_and_malformed_messages_are_ignored() {
    let mut synth = synth();
    synth.midi_message(&[0x90, 60, 100]);

    let noise: [&[u8]; 9] = [
        &[],
        &[0xF8],
        &[0xFA],
        &[0xFB],
        &[0xFC],
        &[0xFE],
        &[0xFF],
        &[0x90, 61],
        &[0xF0, 0x7E, 0xF7],
    ];
    for bytes in noise {
        assert!(!synth.midi_message(bytes), "{bytes:02X?}");
    }
    assert_eq!(synth.voices().len(), 1);
    assert_eq!(synth.midi().pressed().len(), 1);
}

#[test]
fn controller_messages_do_not_touch_voices() {
    let mut synth = synth();
    synth.midi_message(&[0x90, 60, 100]);
    assert!(!synth.midi_message(&[0xB0, 64, 127]));
    assert!(!synth.midi_message(&[0xE0, 0x00, 0x40]));
    assert!(!synth.midi_message(&[0xC0, 5]));
    assert_eq!(synth.voices().len(), 1);
}

#[test]
fn monophonic_midi_line() {
    let mut synth = synth();
    synth.set_playback_mode(PlaybackMode::Monophonic);
    synth.midi_message(&[0x90, 60, 100]);
    synth.midi_message(&[0x90, 64, 100]);
    synth.midi_message(&[0x90, 67, 100]);

    assert_eq!(synth.voices().len(), 1);
    assert!(synth.voices().voice(&VoiceId::from("G4")).is_some());
    // keys are still held even though their voices were cut
    assert_eq!(synth.midi().pressed().len(), 3);
}

#[test]
fn fine_tune_shifts_midi_notes() {
    let params = SharedParams::default();
    params.update(|p| p.fine_tune_hz = -4.0);
    let mut synth = Synth::new(RenderEngine::with_sample_rate(8_000.0), params);

    synth.midi_message(&[0x90, 69, 100]);
    let voice = synth.voices().voice(&VoiceId::from("A4")).unwrap();
    assert_eq!(voice.frequency(), 436.0);
}
