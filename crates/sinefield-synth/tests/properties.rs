//! Property-based tests for sinefield-synth.
//!
//! Uses proptest to check invariants of the partial series, morph
//! interpolation, level compensation, and the voice pool across random inputs.

use proptest::prelude::*;
use sinefield_synth::morph::amplitude_presets;
use sinefield_synth::{
    MAX_PARTIALS, MIN_PARTIALS, MORPH_FRAMES, MorphPosition, MorphTable, Synth, Tuning,
    KeyboardMapping, partial_gain_compensation, quantized_partial_series,
};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn compensation_never_increases(n in MIN_PARTIALS..MAX_PARTIALS) {
        prop_assert!(partial_gain_compensation(n + 1) <= partial_gain_compensation(n));
    }

    #[test]
    fn quantized_series_strictly_increasing(
        edo in 1u32..=96,
        f0 in 20.0f32..2000.0,
        pseudo_octave in 600.0f32..2400.0,
        count in 2usize..=MAX_PARTIALS,
    ) {
        let mut out = [0.0; MAX_PARTIALS];
        let n = quantized_partial_series(f0, pseudo_octave, edo, &mut out[..count]);
        prop_assert!(n >= 1 && n <= count);
        prop_assert_eq!(out[0], f0);
        for pair in out[..n].windows(2) {
            prop_assert!(pair[1] > pair[0], "{} !> {}", pair[1], pair[0]);
        }
    }

    #[test]
    fn morph_exact_on_frames(frame in 0usize..16, partial in 0usize..MAX_PARTIALS) {
        let table = MorphTable::from_fn(|i, j| ((i * 7 + j * 3) % 11) as f32 / 10.0);
        let pos = MorphPosition { frame, frac: 0.0 };
        prop_assert_eq!(table.interpolate(pos, partial), table.get(frame, partial));
    }

    #[test]
    fn morph_linear_between_frames(
        frame in 0usize..15,
        frac in 0.0f32..1.0,
        partial in 0usize..MAX_PARTIALS,
    ) {
        let table = MorphTable::from_fn(|i, j| ((i * 5 + j) % 9) as f32 / 8.0);
        let a = table.get(frame, partial);
        let b = table.get(frame + 1, partial);
        let v = table.interpolate(MorphPosition { frame, frac }, partial);
        prop_assert!((v - (a + (b - a) * frac)).abs() < 1e-6);
        prop_assert!(v >= a.min(b) - 1e-6 && v <= a.max(b) + 1e-6);
    }

    #[test]
    fn morph_mix_sweep_is_continuous(
        preset in 0usize..9,
        start in 0.0f32..1.0,
        step in 0.0001f32..0.01,
        partial in 0usize..MAX_PARTIALS,
    ) {
        let table = &amplitude_presets()[preset];
        let next = (start + step).min(1.0);
        let a = table.interpolate(MorphPosition::new(start), partial);
        let b = table.interpolate(MorphPosition::new(next), partial);
        // frame values sit in [0, 1] and mix spans 15 frame gaps
        let bound = (MORPH_FRAMES - 1) as f32 * (next - start) + 1e-5;
        prop_assert!((b - a).abs() <= bound, "{} -> {}: {} vs {}", start, next, a, b);
    }

    #[test]
    fn morph_mix_at_or_past_one_reads_last_frame(
        preset in 0usize..9,
        mix in 1.0f32..4.0,
        partial in 0usize..MAX_PARTIALS,
    ) {
        let table = &amplitude_presets()[preset];
        let pos = MorphPosition::new(mix);
        prop_assert_eq!(pos, MorphPosition { frame: MORPH_FRAMES - 1, frac: 0.0 });
        prop_assert_eq!(table.interpolate(pos, partial), table.get(MORPH_FRAMES - 1, partial));
        prop_assert!(table.guard_frame_is_valid());
    }

    #[test]
    fn morph_mix_below_zero_reads_first_frame(
        mix in -4.0f32..=0.0,
        partial in 0usize..MAX_PARTIALS,
    ) {
        let table = &amplitude_presets()[0];
        let pos = MorphPosition::new(mix);
        prop_assert_eq!(pos, MorphPosition { frame: 0, frac: 0.0 });
        prop_assert_eq!(table.interpolate(pos, partial), table.get(0, partial));
    }

    #[test]
    fn edo_tuning_is_monotonic(edo in 1u32..=96, cents in 100.0f64..2400.0) {
        let tuning = Tuning::equal_division(cents, edo, KeyboardMapping::default()).unwrap();
        for note in -20..140 {
            prop_assert!(
                tuning.frequency_for_midi_note(note + 1) > tuning.frequency_for_midi_note(note)
            );
        }
    }

    #[test]
    fn pool_never_exceeds_capacity(keys in prop::collection::vec(0i32..128, 1..40)) {
        let mut synth: Synth<4> = Synth::new();
        synth.prepare(48000.0, 32);
        let mut l = [0.0; 32];
        let mut r = [0.0; 32];
        for key in keys {
            synth.handle_note_on(0, 0, key, -1, 1.0);
            prop_assert!(synth.sounding_voice_count() <= 4);
            synth.process_block(&mut l, &mut r);
            prop_assert!(l.iter().chain(r.iter()).all(|s| s.is_finite() && s.abs() <= 1.0));
        }
    }
}
