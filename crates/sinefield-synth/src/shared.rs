//! Process-wide synthesis tables shared by every voice.
//!
//! [`SharedSynthesisData`] holds the active amplitude and pan morph tables
//! together with their presets, the modulation matrix, the keyboard tuning,
//! and the fixed lookup curves (safety filter, pan law, random filter gains).
//! Voices only ever read it; the synth swaps tables through
//! [`SynthHandle`](crate::SynthHandle), which locks it once per audio block.

use core::f32::consts::FRAC_PI_2;

use libm::{floorf, log2f, sinf};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sinefield_core::{MIDI_0_FREQ, RateTable, db_to_linear, map_range};

use crate::mod_matrix::ModMatrix;
use crate::morph::{
    AMPLITUDE_PRESET_COUNT, CUSTOM_AMPLITUDE_PRESET, MAX_PARTIALS, MorphTable, PAN_PRESET_COUNT,
    amplitude_presets, fundamental_only_table, pan_presets,
};
use crate::params::PitchQuantizeMode;
use crate::tuning::Tuning;

/// Lowest frequency a partial may sound at (MIDI note 0).
pub const MIN_PARTIAL_HZ: f32 = MIDI_0_FREQ;
/// Highest frequency a partial may sound at.
pub const MAX_PARTIAL_HZ: f32 = 20_000.0;
/// Entries in the safety filter curve.
pub const SAFETY_FILTER_LEN: usize = 2048;
/// Entries per channel in the pan law table.
pub const PAN_TABLE_LEN: usize = 512;
/// Entries in the random shaping-filter gain table.
pub const RANDOM_FILTER_LEN: usize = MAX_PARTIALS;

const SAFETY_LOW_CUTOFF: f32 = 20.0;
const SAFETY_HIGH_CUTOFF: f32 = 15_000.0;
const RANDOM_FILTER_SEED: u64 = 99217;

/// Octaves above MIDI note 0.
#[inline]
pub fn frequency_as_octave(hz: f32) -> f32 {
    log2f(hz / MIDI_0_FREQ)
}

/// Read-mostly tables consulted by every voice.
#[derive(Debug, Clone)]
pub struct SharedSynthesisData {
    /// Sources × destinations modulation depths.
    pub mod_matrix: ModMatrix,
    /// How modulated pitch passes through the tuning.
    pub pitch_quantize: PitchQuantizeMode,
    amp_morph_table: MorphTable,
    pan_morph_table: MorphTable,
    amplitude_presets: Vec<MorphTable>,
    pan_presets: Vec<MorphTable>,
    custom_table: MorphTable,
    amplitude_preset: usize,
    pan_preset: usize,
    tuning: Tuning,
    safety_filter: Box<[f32; SAFETY_FILTER_LEN]>,
    pan_coefficients: Box<[[f32; PAN_TABLE_LEN]; 2]>,
    random_filter_gains: [f32; RANDOM_FILTER_LEN],
    rates: RateTable,
}

impl Default for SharedSynthesisData {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedSynthesisData {
    /// Build every table. Amplitude preset 0 and pan preset 0 start active,
    /// with twelve-tone equal temperament and a 48 kHz rate table.
    pub fn new() -> Self {
        let amplitude_presets = amplitude_presets();
        let pan_presets = pan_presets();
        Self {
            mod_matrix: ModMatrix::new(),
            pitch_quantize: PitchQuantizeMode::default(),
            amp_morph_table: amplitude_presets[0].clone(),
            pan_morph_table: pan_presets[0].clone(),
            amplitude_presets,
            pan_presets,
            custom_table: fundamental_only_table(),
            amplitude_preset: 0,
            pan_preset: 0,
            tuning: Tuning::default(),
            safety_filter: build_safety_filter(),
            pan_coefficients: build_pan_law(),
            random_filter_gains: build_random_filter_gains(),
            rates: RateTable::default(),
        }
    }

    /// Rebuild sample-rate dependent tables.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.rates.set_sample_rate(sample_rate);
    }

    /// Envelope-rate table for the current sample rate.
    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// Select amplitude preset `index` (0..=8) or the custom table (9).
    ///
    /// Returns `false` and leaves the table alone for any other index.
    pub fn set_volume_morph_preset(&mut self, index: usize) -> bool {
        let source = if index == CUSTOM_AMPLITUDE_PRESET {
            &self.custom_table
        } else if let Some(preset) = self.amplitude_presets.get(index) {
            preset
        } else {
            return false;
        };
        self.amp_morph_table.clone_from(source);
        self.amp_morph_table.update_guard_frame();
        self.amplitude_preset = index;
        true
    }

    /// Select pan preset `index` (0..=3).
    ///
    /// Returns `false` and leaves the table alone for any other index.
    pub fn set_pan_morph_preset(&mut self, index: usize) -> bool {
        let Some(preset) = self.pan_presets.get(index) else {
            return false;
        };
        self.pan_morph_table.clone_from(preset);
        self.pan_morph_table.update_guard_frame();
        self.pan_preset = index;
        true
    }

    /// Index of the active amplitude preset.
    pub fn volume_morph_preset(&self) -> usize {
        self.amplitude_preset
    }

    /// Index of the active pan preset.
    pub fn pan_morph_preset(&self) -> usize {
        self.pan_preset
    }

    /// Active amplitude morph table.
    pub fn amp_morph_table(&self) -> &MorphTable {
        &self.amp_morph_table
    }

    /// Active pan morph table.
    pub fn pan_morph_table(&self) -> &MorphTable {
        &self.pan_morph_table
    }

    /// Factory amplitude preset, if `index` is in range.
    pub fn amplitude_preset_table(&self, index: usize) -> Option<&MorphTable> {
        self.amplitude_presets.get(index)
    }

    /// The user-editable amplitude table.
    pub fn custom_morph_table(&self) -> &MorphTable {
        &self.custom_table
    }

    /// Edit one value of the custom table. Applied immediately when the
    /// custom table is active.
    pub fn set_custom_morph_value(&mut self, frame: usize, partial: usize, value: f32) {
        self.custom_table.set(frame, partial, value);
        if self.amplitude_preset == CUSTOM_AMPLITUDE_PRESET {
            self.amp_morph_table.clone_from(&self.custom_table);
        }
    }

    /// Replace the whole custom table.
    pub fn set_custom_morph_table(&mut self, mut table: MorphTable) {
        table.update_guard_frame();
        self.custom_table = table;
        if self.amplitude_preset == CUSTOM_AMPLITUDE_PRESET {
            self.amp_morph_table.clone_from(&self.custom_table);
        }
    }

    /// Gain of the fixed band-limiting curve at `hz`.
    ///
    /// Zero at or beyond the partial frequency limits, otherwise a table
    /// lookup. `hz` must not be NaN.
    #[inline]
    pub fn safety_filter_coefficient(&self, hz: f32) -> f32 {
        debug_assert!(!hz.is_nan());
        if hz <= MIN_PARTIAL_HZ || hz >= MAX_PARTIAL_HZ {
            return 0.0;
        }
        let index = map_range(
            hz,
            MIN_PARTIAL_HZ,
            MAX_PARTIAL_HZ,
            0.0,
            (SAFETY_FILTER_LEN - 1) as f32,
        ) as usize;
        debug_assert!(index < SAFETY_FILTER_LEN);
        self.safety_filter[index.min(SAFETY_FILTER_LEN - 1)]
    }

    /// Left and right gains for a pan position in `[0, 1]`.
    #[inline]
    pub fn pan_gains(&self, pan: f32) -> (f32, f32) {
        debug_assert!((0.0..=1.0).contains(&pan), "pan out of range: {pan}");
        let index = ((PAN_TABLE_LEN - 1) as f32 * pan) as usize;
        (self.pan_coefficients[0][index], self.pan_coefficients[1][index])
    }

    /// Random shaping gain at a fractional table position in `[0, 62)`.
    #[inline]
    pub fn random_filter_gain(&self, position: f32) -> f32 {
        let i0 = position as usize;
        debug_assert!(i0 + 1 < RANDOM_FILTER_LEN);
        let frac = position - floorf(position);
        let a = self.random_filter_gains[i0];
        let b = self.random_filter_gains[i0 + 1];
        a + (b - a) * frac
    }

    /// Per-position random filter gains.
    pub fn random_filter_gains(&self) -> &[f32; RANDOM_FILTER_LEN] {
        &self.random_filter_gains
    }

    /// Active keyboard tuning.
    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Replace the keyboard tuning.
    pub fn set_tuning(&mut self, tuning: Tuning) {
        self.tuning = tuning;
    }

    /// Map a continuous pitch in keys through the tuning, interpolating
    /// linearly between the two neighbouring keys. Result is in
    /// 12-per-octave units above MIDI note 0.
    #[inline]
    pub fn remap_key(&self, pitch: f32) -> f32 {
        let base = floorf(pitch);
        let frac = pitch - base;
        let idx = base as i32;
        let b0 = self.tuning.log_scaled_frequency_for_midi_note(idx) * 12.0;
        let b1 = self.tuning.log_scaled_frequency_for_midi_note(idx + 1) * 12.0;
        (b0 + (b1 - b0) * f64::from(frac)) as f32
    }
}

fn build_safety_filter() -> Box<[f32; SAFETY_FILTER_LEN]> {
    let mut table = Box::new([0.0; SAFETY_FILTER_LEN]);
    for (i, slot) in table.iter_mut().enumerate() {
        let hz = map_range(
            i as f32,
            0.0,
            (SAFETY_FILTER_LEN - 1) as f32,
            MIN_PARTIAL_HZ,
            MAX_PARTIAL_HZ,
        );
        let gain = if hz <= SAFETY_LOW_CUTOFF {
            map_range(hz, MIN_PARTIAL_HZ, SAFETY_LOW_CUTOFF, 0.0, 1.0)
        } else if hz >= SAFETY_HIGH_CUTOFF {
            map_range(hz, SAFETY_HIGH_CUTOFF, MAX_PARTIAL_HZ, 1.0, 0.0)
        } else {
            1.0
        };
        *slot = gain.clamp(0.0, 1.0);
    }
    table
}

fn build_pan_law() -> Box<[[f32; PAN_TABLE_LEN]; 2]> {
    let mut table = Box::new([[0.0; PAN_TABLE_LEN]; 2]);
    for i in 0..PAN_TABLE_LEN {
        let p = i as f32 / (PAN_TABLE_LEN - 1) as f32;
        let left = sinf(FRAC_PI_2 * (1.0 - p));
        let right = sinf(FRAC_PI_2 * p);
        table[0][i] = 2.0 * left * left;
        table[1][i] = 2.0 * right * right;
    }
    table
}

fn build_random_filter_gains() -> [f32; RANDOM_FILTER_LEN] {
    let mut rng = SmallRng::seed_from_u64(RANDOM_FILTER_SEED);
    core::array::from_fn(|_| db_to_linear(-30.0 + 30.0 * rng.r#gen::<f32>()))
}
