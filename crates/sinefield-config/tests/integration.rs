//! Integration tests for sinefield-config.
//!
//! These tests load patches from disk and TOML text, apply them to a synth,
//! and render audio to check the result end to end.

use sinefield_config::{ConfigError, SynthConfig, factory_presets, get_factory_preset};
use sinefield_synth::{ModSource, ModTarget, Synth, TuningMode};
use tempfile::TempDir;

const SR: f32 = 48000.0;

fn render<const N: usize>(synth: &mut Synth<N>, blocks: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(blocks * 128);
    let mut l = [0.0; 128];
    let mut r = [0.0; 128];
    for _ in 0..blocks {
        synth.process_block(&mut l, &mut r);
        out.extend_from_slice(&l);
    }
    out
}

/// Every factory patch applies cleanly and renders bounded audio.
#[test]
fn test_factory_presets_render() {
    for patch in factory_presets() {
        let mut synth: Synth<4> = Synth::new();
        synth.prepare(SR, 128);
        patch
            .apply(&mut synth)
            .unwrap_or_else(|e| panic!("{} failed to apply: {e}", patch.name));
        synth.handle_note_on(0, 0, 60, -1, 0.9);
        synth.handle_note_on(0, 0, 67, -1, 0.9);

        let out = render(&mut synth, 200);
        assert!(
            out.iter().all(|s| s.is_finite() && s.abs() <= 1.0),
            "{} produced out-of-range samples",
            patch.name
        );
    }
}

/// Applying a patch sets voice, tuning, and routing state.
#[test]
fn test_apply_reaches_voices_and_tables() {
    let mut synth: Synth<2> = Synth::new();
    synth.prepare(SR, 128);
    get_factory_preset("nineteen_drift")
        .unwrap()
        .apply(&mut synth)
        .unwrap();

    assert_eq!(synth.voices()[0].num_partials(), 32);
    let handle = synth.handle();
    {
        let shared = handle.lock();
        assert_eq!(shared.pan_morph_preset(), 2);
        assert_eq!(shared.mod_matrix.depth(ModSource::Lfo0, ModTarget::PartialPansMorph), 0.7);
        // 19 keys per octave above middle C
        let ratio = shared.tuning().frequency_for_midi_note(79) / shared.tuning().frequency_for_midi_note(60);
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    // A later patch replaces the tuning and routes entirely
    SynthConfig::new("Reset").apply(&mut synth).unwrap();
    let shared = handle.lock();
    assert_eq!(shared.mod_matrix.active_routes().count(), 0);
    let ratio = shared.tuning().frequency_for_midi_note(72) / shared.tuning().frequency_for_midi_note(60);
    assert!((ratio - 2.0).abs() < 1e-9);
}

/// Scala text embedded in a patch retunes the keyboard.
#[test]
fn test_scala_patch_retunes() {
    let mut synth: Synth<2> = Synth::new();
    get_factory_preset("just_pentatonic")
        .unwrap()
        .apply(&mut synth)
        .unwrap();
    let handle = synth.handle();
    let shared = handle.lock();
    let fifth = shared.tuning().frequency_for_midi_note(63) / shared.tuning().frequency_for_midi_note(60);
    assert!((fifth - 1.5).abs() < 1e-9);
}

/// Save to disk, load back, and compare.
#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("patch.toml");

    let mut patch = SynthConfig::new("Disk")
        .with_description("saved and loaded")
        .with_route(ModSource::CcB, ModTarget::Volume, -0.25);
    patch.tuning.mode = TuningMode::Quantized;
    patch.tuning.edo = 31;
    patch.save(&path).unwrap();

    let loaded = SynthConfig::load(&path).unwrap();
    assert_eq!(loaded, patch);
}

/// Missing files surface as read errors carrying the path.
#[test]
fn test_load_missing_file() {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("nope.toml");
    let err = SynthConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert!(err.to_string().contains("nope.toml"));
}

/// A patch that fails validation leaves the synth's tuning untouched.
#[test]
fn test_invalid_patch_keeps_synth_state() {
    let mut synth: Synth<2> = Synth::new();
    synth.set_edo_parameters(1200.0, 17).unwrap();

    let mut patch = SynthConfig::new("Broken");
    patch.tuning.kbm = Some("not a mapping".to_string());
    let err = patch.apply(&mut synth).unwrap_err();
    assert!(matches!(err, ConfigError::Validation(_)));

    let handle = synth.handle();
    let shared = handle.lock();
    let ratio = shared.tuning().frequency_for_midi_note(77) / shared.tuning().frequency_for_midi_note(60);
    assert!((ratio - 2.0).abs() < 1e-9);
}

/// Tuning text declaring an absurd entry count is a validation error.
#[test]
fn test_oversized_tuning_text_is_a_validation_error() {
    let mut synth: Synth<2> = Synth::new();
    let mut patch = SynthConfig::new("Huge");
    patch.tuning.kbm = Some("100000000000000\n0\n127\n60\n60\n440\n0\n".to_string());
    assert!(matches!(patch.apply(&mut synth), Err(ConfigError::Validation(_))));

    patch.tuning.kbm = None;
    patch.tuning.scala = Some("d\n100000000000000\n100.0\n".to_string());
    assert!(matches!(patch.apply(&mut synth), Err(ConfigError::Validation(_))));
}
