//! Integration tests for sinefield-synth crate.
//!
//! Tests cover voice allocation and stealing, sustain pedal handling,
//! end-to-end rendering bounds, tuning updates, and shared table swaps.

use sinefield_synth::{
    EnvelopeParams, MorphTable, ModSource, ModTarget, PitchQuantizeMode, Synth, TuningError,
    TuningMode,
};

const SR: f32 = 48000.0;
const BLOCK: usize = 64;

fn render_seconds<const N: usize>(synth: &mut Synth<N>, seconds: f32) -> (Vec<f32>, Vec<f32>) {
    let blocks = (seconds * SR) as usize / BLOCK;
    let mut out_l = Vec::with_capacity(blocks * BLOCK);
    let mut out_r = Vec::with_capacity(blocks * BLOCK);
    let mut l = [0.0; BLOCK];
    let mut r = [0.0; BLOCK];
    for _ in 0..blocks {
        synth.process_block(&mut l, &mut r);
        out_l.extend_from_slice(&l);
        out_r.extend_from_slice(&r);
    }
    (out_l, out_r)
}

fn peak(buf: &[f32]) -> f32 {
    buf.iter().fold(0.0_f32, |m, s| m.max(s.abs()))
}

// ---------------------------------------------------------------------------
// 1. End-to-end rendering
// ---------------------------------------------------------------------------

#[test]
fn one_second_of_middle_c_is_finite_and_bounded() {
    let mut synth: Synth<8> = Synth::new();
    synth.prepare(SR, BLOCK);
    synth.handle_note_on(0, 0, 60, -1, 1.0);

    let (l, r) = render_seconds(&mut synth, 1.0);
    assert!(l.iter().chain(r.iter()).all(|s| s.is_finite()));
    assert!(peak(&l) <= 1.0 && peak(&r) <= 1.0);
    assert!(peak(&l) > 0.01, "note should be audible, peak = {}", peak(&l));
}

#[test]
fn dense_chord_with_full_modulation_stays_bounded() {
    let mut synth: Synth<16> = Synth::new();
    synth.prepare(44100.0, 128);
    for source in ModSource::ALL {
        for target in ModTarget::ALL {
            synth.set_modulation_depth(source, target, 1.0);
        }
    }
    synth.handle_cc(0, 0, 41, 127);
    synth.handle_cc(0, 0, 44, 127);
    for key in (36..96).step_by(4) {
        synth.handle_note_on(0, 0, key, -1, 1.0);
    }
    synth.handle_poly_aftertouch(0, 0, 48, 1.0);
    synth.handle_pitch_bend(0, 0, -1.0);

    let (l, r) = render_seconds(&mut synth, 0.5);
    assert!(l.iter().chain(r.iter()).all(|s| s.is_finite() && s.abs() <= 1.0));
}

#[test]
fn every_quantize_mode_renders() {
    for mode in [
        PitchQuantizeMode::Unquantized,
        PitchQuantizeMode::Continuous,
        PitchQuantizeMode::NearestKey,
    ] {
        let mut synth: Synth<2> = Synth::new();
        synth.prepare(SR, BLOCK);
        synth.set_pitch_quantize(mode);
        synth.set_modulation_depth(ModSource::Lfo0, ModTarget::Pitch, 0.1);
        synth.handle_note_on(0, 0, 67, -1, 0.7);
        let (l, _) = render_seconds(&mut synth, 0.2);
        assert!(peak(&l) > 0.0, "{mode:?} produced silence");
    }
}

#[test]
fn burst_only_mix_is_audible() {
    let mut synth: Synth<2> = Synth::new();
    synth.prepare(SR, BLOCK);
    synth.set_burst_mix(1.0);
    synth.handle_note_on(0, 0, 60, -1, 1.0);
    let (l, _) = render_seconds(&mut synth, 1.0);
    assert!(peak(&l) > 0.01);
}

// ---------------------------------------------------------------------------
// 2. Voice allocation and stealing
// ---------------------------------------------------------------------------

#[test]
fn single_voice_pool_steals_for_same_key() {
    let mut synth: Synth<1> = Synth::new();
    synth.prepare(SR, BLOCK);
    synth.handle_note_on(0, 0, 60, 1, 1.0);
    render_seconds(&mut synth, 0.01);
    synth.handle_note_on(0, 0, 60, 2, 1.0);

    let voice = synth.voice(0).unwrap();
    assert_eq!(voice.note_id().note_id, 2);
    assert!(voice.is_gate_on());
    assert_eq!(synth.sounding_voice_count(), 1);
}

#[test]
fn overflow_steals_oldest_voice() {
    let mut synth: Synth<4> = Synth::new();
    synth.prepare(SR, BLOCK);
    for key in [60, 64, 67, 72] {
        synth.handle_note_on(0, 0, key, -1, 1.0);
        render_seconds(&mut synth, 0.01);
    }
    synth.handle_note_on(0, 0, 76, -1, 1.0);

    assert_eq!(synth.sounding_voice_count(), 4, "count stays at polyphony limit");
    let keys: Vec<i32> = synth.voices().iter().map(|v| v.note_id().key).collect();
    assert!(!keys.contains(&60), "oldest note (60) should have been stolen");
    assert_eq!(keys[0], 76);
}

#[test]
fn simultaneous_notes_steal_by_arrival_order() {
    let mut synth: Synth<3> = Synth::new();
    for key in [60, 62, 64] {
        synth.handle_note_on(0, 0, key, -1, 1.0);
    }
    // no time has passed, so the serial decides
    synth.handle_note_on(0, 0, 66, -1, 1.0);
    synth.handle_note_on(0, 0, 68, -1, 1.0);
    let keys: Vec<i32> = synth.voices().iter().map(|v| v.note_id().key).collect();
    assert_eq!(keys, vec![66, 68, 64]);
}

#[test]
fn released_voice_is_reused_before_stealing() {
    let mut synth: Synth<2> = Synth::new();
    synth.prepare(SR, BLOCK);
    synth.handle_note_on(0, 0, 60, -1, 1.0);
    synth.handle_note_on(0, 0, 64, -1, 1.0);
    synth.handle_note_off(0, 0, 64, -1);
    render_seconds(&mut synth, 0.3);
    assert_eq!(synth.sounding_voice_count(), 1);

    synth.handle_note_on(0, 0, 67, -1, 1.0);
    assert_eq!(synth.voice(0).unwrap().note_id().key, 60);
    assert_eq!(synth.voice(1).unwrap().note_id().key, 67);
}

// ---------------------------------------------------------------------------
// 3. Note release and sustain pedal
// ---------------------------------------------------------------------------

#[test]
fn release_returns_to_silence() {
    let mut synth: Synth<4> = Synth::new();
    synth.prepare(SR, BLOCK);
    synth.set_envelope_params(0, EnvelopeParams::new(0.1, 0.1, 0.8, 0.2));
    synth.handle_note_on(0, 0, 60, -1, 1.0);
    render_seconds(&mut synth, 0.1);
    synth.handle_note_off(0, 0, 60, -1);

    render_seconds(&mut synth, 0.5);
    assert_eq!(synth.sounding_voice_count(), 0);
    let (l, r) = render_seconds(&mut synth, 0.05);
    assert_eq!(peak(&l), 0.0);
    assert_eq!(peak(&r), 0.0);
    assert_eq!(synth.active_voice_count(), 0);
}

#[test]
fn sustain_pedal_defers_note_off() {
    let mut synth: Synth<4> = Synth::new();
    synth.prepare(SR, BLOCK);
    synth.handle_note_on(0, 0, 60, -1, 1.0);
    synth.handle_cc(0, 0, 64, 127);
    synth.handle_note_off(0, 0, 60, -1);
    render_seconds(&mut synth, 0.5);

    assert!(synth.voice(0).unwrap().is_gate_on(), "pedal holds the note");
    assert_eq!(synth.sounding_voice_count(), 1);

    synth.handle_cc(0, 0, 64, 0);
    assert!(!synth.voice(0).unwrap().is_gate_on(), "pedal up releases");
    render_seconds(&mut synth, 0.5);
    assert_eq!(synth.sounding_voice_count(), 0);
}

#[test]
fn pedal_up_without_pedal_down_is_harmless() {
    let mut synth: Synth<2> = Synth::new();
    synth.handle_note_on(0, 0, 60, -1, 1.0);
    synth.handle_cc(0, 0, 64, 0);
    assert!(synth.voice(0).unwrap().is_gate_on());
}

// ---------------------------------------------------------------------------
// 4. Tuning
// ---------------------------------------------------------------------------

#[test]
fn invalid_edo_keeps_previous_tuning() {
    let mut synth: Synth<2> = Synth::new();
    synth.set_edo_parameters(1200.0, 19).unwrap();
    let before = synth.handle().lock().tuning().frequency_for_midi_note(70);

    let err = synth.set_edo_parameters(1200.0, 0).unwrap_err();
    assert_eq!(err, TuningError::InvalidDivision(0));
    assert!(synth.has_tuning_error());
    assert!(synth.tuning_error_message().unwrap().contains("1 to 1024 steps"));
    let after = synth.handle().lock().tuning().frequency_for_midi_note(70);
    assert_eq!(before, after);

    synth.set_edo_parameters(1200.0, 12).unwrap();
    assert!(!synth.has_tuning_error());
}

#[test]
fn oversized_tuning_text_is_rejected_without_allocating() {
    let mut synth: Synth<2> = Synth::new();
    synth.set_edo_parameters(1200.0, 19).unwrap();
    let before = synth.handle().lock().tuning().frequency_for_midi_note(70);

    let err = synth
        .import_kbm_text("100000000000000\n0\n127\n60\n60\n440\n0\n")
        .unwrap_err();
    assert!(matches!(err, TuningError::KeyboardMapping { .. }));
    let err = synth.import_scala_text("d\n100000000000000\n100.0\n").unwrap_err();
    assert!(matches!(err, TuningError::Scala { .. }));
    let err = synth.set_edo_parameters(1200.0, u32::MAX).unwrap_err();
    assert_eq!(err, TuningError::InvalidDivision(u32::MAX));

    assert!(synth.has_tuning_error());
    let after = synth.handle().lock().tuning().frequency_for_midi_note(70);
    assert_eq!(before, after);
}

#[test]
fn scala_import_retunes_keyboard() {
    let scl = "! pentatonic.scl\n!\nJust pentatonic\n 5\n!\n 9/8\n 5/4\n 3/2\n 5/3\n 2/1\n";
    let mut synth: Synth<2> = Synth::new();
    synth.import_scala_text(scl).unwrap();

    let handle = synth.handle();
    let shared = handle.lock();
    let root = shared.tuning().frequency_for_midi_note(60);
    let second = shared.tuning().frequency_for_midi_note(61);
    let octave = shared.tuning().frequency_for_midi_note(65);
    assert!((second / root - 1.125).abs() < 1e-9);
    assert!((octave / root - 2.0).abs() < 1e-9);
}

#[test]
fn broken_scala_text_is_rejected() {
    let mut synth: Synth<2> = Synth::new();
    let err = synth.import_scala_text("just a title\n").unwrap_err();
    assert!(matches!(err, TuningError::Scala { .. }));
    assert!(synth.has_tuning_error());
    let shared = synth.handle();
    let hz = shared.lock().tuning().frequency_for_midi_note(69);
    assert!((hz - 440.0).abs() < 1e-6);
}

#[test]
fn kbm_import_moves_reference_pitch() {
    let kbm = "! a432.kbm\n12\n0\n127\n60\n69\n432.0\n12\n0\n1\n2\n3\n4\n5\n6\n7\n8\n9\n10\n11\n";
    let mut synth: Synth<2> = Synth::new();
    synth.import_kbm_text(kbm).unwrap();
    let hz = synth.handle().lock().tuning().frequency_for_midi_note(69);
    assert!((hz - 432.0).abs() < 1e-6);
}

#[test]
fn coarse_quantized_spacing_truncates_partials() {
    let mut synth: Synth<1> = Synth::new();
    synth.prepare(SR, BLOCK);
    synth.set_tuning_mode(TuningMode::Quantized);
    synth.set_edo_parameters(1200.0, 1).unwrap();
    synth.handle_note_on(0, 0, 60, -1, 1.0);

    let voice = synth.voice(0).unwrap();
    assert_eq!(voice.num_partials(), 64);
    assert!(voice.active_partials() < voice.num_partials());
    render_seconds(&mut synth, 0.05);
}

// ---------------------------------------------------------------------------
// 5. Shared tables
// ---------------------------------------------------------------------------

#[test]
fn silent_custom_table_renders_silence() {
    let mut synth: Synth<2> = Synth::new();
    synth.prepare(SR, BLOCK);
    let handle = synth.handle();
    handle.set_custom_morph_table(MorphTable::filled(0.0));
    assert!(handle.set_volume_morph_preset(9));

    synth.handle_note_on(0, 0, 60, -1, 1.0);
    let (l, r) = render_seconds(&mut synth, 0.1);
    assert_eq!(peak(&l), 0.0);
    assert_eq!(peak(&r), 0.0);
}

#[test]
fn handle_swaps_presets_from_another_thread() {
    let mut synth: Synth<2> = Synth::new();
    synth.prepare(SR, BLOCK);
    synth.handle_note_on(0, 0, 60, -1, 1.0);

    let handle = synth.handle();
    let worker = std::thread::spawn(move || {
        assert!(handle.set_pan_morph_preset(2));
        assert!(handle.set_volume_morph_preset(4));
        handle.set_modulation_depth(ModSource::Lfo1, ModTarget::PartialPansMorph, 0.5);
    });
    render_seconds(&mut synth, 0.05);
    worker.join().unwrap();

    let shared = synth.handle();
    assert_eq!(shared.lock().pan_morph_preset(), 2);
    assert_eq!(shared.lock().volume_morph_preset(), 4);
    let (l, _) = render_seconds(&mut synth, 0.05);
    assert!(l.iter().all(|s| s.is_finite()));
}
