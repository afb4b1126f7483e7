//! Morph tables: per-partial gain and pan frames with a guard frame.
//!
//! A morph table holds [`MORPH_FRAMES`] authored frames of [`MAX_PARTIALS`]
//! values each, plus one trailing guard frame that duplicates the last
//! authored frame. A continuous morph position in `[0, 1]` selects a pair of
//! adjacent frames and a blend factor; position 1.0 lands on the last
//! authored frame with the guard frame as its (identical) neighbour, so the
//! lookup never needs a bounds special case.
//!
//! The factory presets are generated here from fixed seeds.

use core::f32::consts::TAU;

use libm::{cosf, powf, sinf};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use sinefield_core::{db_to_linear, lerp, map_range};

/// Maximum partials per voice.
pub const MAX_PARTIALS: usize = 64;
/// Authored frames per morph table.
pub const MORPH_FRAMES: usize = 16;
/// Frames stored per morph table, including the guard frame.
pub const MORPH_TABLE_FRAMES: usize = MORPH_FRAMES + 1;
/// Number of factory amplitude presets.
pub const AMPLITUDE_PRESET_COUNT: usize = 9;
/// Preset index that selects the user-editable amplitude table.
pub const CUSTOM_AMPLITUDE_PRESET: usize = AMPLITUDE_PRESET_COUNT;
/// Number of factory pan presets.
pub const PAN_PRESET_COUNT: usize = 4;

const AMPLITUDE_SEED: u64 = 78901;
const PAN_SEED: u64 = 763;

/// One frame of per-partial values.
pub type MorphFrame = [f32; MAX_PARTIALS];

/// Frame pair and blend factor for a morph position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MorphPosition {
    /// Lower frame index, `0..MORPH_FRAMES`.
    pub frame: usize,
    /// Blend toward `frame + 1`, `[0, 1)`.
    pub frac: f32,
}

impl MorphPosition {
    /// Resolve a morph amount. Values outside `[0, 1]` are clamped.
    #[inline]
    pub fn new(mix: f32) -> Self {
        let scaled = mix.clamp(0.0, 1.0) * (MORPH_FRAMES - 1) as f32;
        let frame = scaled as usize;
        Self {
            frame,
            frac: scaled - frame as f32,
        }
    }
}

/// A table of [`MORPH_TABLE_FRAMES`] frames.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphTable {
    frames: [MorphFrame; MORPH_TABLE_FRAMES],
}

impl Default for MorphTable {
    fn default() -> Self {
        Self::filled(0.0)
    }
}

impl MorphTable {
    /// Table with every value set to `value`.
    pub fn filled(value: f32) -> Self {
        Self {
            frames: [[value; MAX_PARTIALS]; MORPH_TABLE_FRAMES],
        }
    }

    /// Build from an authored-frame generator `f(frame, partial)`.
    pub fn from_fn(mut f: impl FnMut(usize, usize) -> f32) -> Self {
        let mut table = Self::default();
        for i in 0..MORPH_FRAMES {
            for j in 0..MAX_PARTIALS {
                table.frames[i][j] = f(i, j);
            }
        }
        table.update_guard_frame();
        table
    }

    /// Copy the last authored frame into the guard frame.
    pub fn update_guard_frame(&mut self) {
        self.frames[MORPH_FRAMES] = self.frames[MORPH_FRAMES - 1];
    }

    /// Whether the guard frame matches the last authored frame.
    pub fn guard_frame_is_valid(&self) -> bool {
        self.frames[MORPH_FRAMES] == self.frames[MORPH_FRAMES - 1]
    }

    /// One stored frame, guard frame included.
    pub fn frame(&self, index: usize) -> &MorphFrame {
        &self.frames[index]
    }

    /// Read one value.
    pub fn get(&self, frame: usize, partial: usize) -> f32 {
        self.frames[frame][partial]
    }

    /// Write one authored value, keeping the guard frame in step. The value
    /// is clamped into `[0, 1]`.
    pub fn set(&mut self, frame: usize, partial: usize, value: f32) {
        debug_assert!(frame < MORPH_FRAMES && partial < MAX_PARTIALS);
        self.frames[frame][partial] = value.clamp(0.0, 1.0);
        if frame == MORPH_FRAMES - 1 {
            self.update_guard_frame();
        }
    }

    /// Blend between two adjacent frames for one partial.
    #[inline]
    pub fn interpolate(&self, pos: MorphPosition, partial: usize) -> f32 {
        debug_assert!(pos.frame < MORPH_FRAMES && partial < MAX_PARTIALS);
        lerp(
            self.frames[pos.frame][partial],
            self.frames[pos.frame + 1][partial],
            pos.frac,
        )
    }
}

/// Generate the factory amplitude presets, in preset-index order.
pub fn amplitude_presets() -> Vec<MorphTable> {
    let mut presets = Vec::with_capacity(AMPLITUDE_PRESET_COUNT);

    // 0: lowpass sweep, opening up across the frames
    let floor = db_to_linear(-48.0);
    presets.push(MorphTable::from_fn(|i, j| {
        let maxpart = map_range(i as f32, 0.0, 15.0, 2.0, 63.0) as usize;
        if j >= maxpart {
            0.0
        } else {
            map_range(j as f32, 0.0, maxpart as f32, 1.0, floor)
        }
    }));

    // 1: travelling cosine ripple with a downward tilt
    presets.push(MorphTable::from_fn(|i, j| {
        let db = -15.0 + 15.0 * cosf(TAU / 16.0 * i as f32 + TAU / 64.0 * j as f32)
            + map_range(j as f32, 0.0, 63.0, 0.0, -9.0);
        db_to_linear(db)
    }));

    // 2: comb ripple shifting one radian per frame
    presets.push(MorphTable::from_fn(|i, j| {
        db_to_linear(-15.0 + 15.0 * cosf(TAU / 64.0 * j as f32 * 4.0 + i as f32))
    }));

    // 3: Lissajous scatter
    let mut scatter = MorphTable::default();
    for k in 0..256 {
        let x = (32.0 + 32.0 * sinf(TAU / 256.0 * k as f32 * 2.63)).clamp(0.0, 63.0);
        let y = (7.5 + 8.0 * sinf(TAU / 256.0 * k as f32 * 3.5)).clamp(0.0, 15.0);
        scatter.frames[y as usize][x as usize] = map_range(x, 0.0, 63.0, 1.0, 0.25);
    }
    scatter.update_guard_frame();
    presets.push(scatter);

    // 4..=6 share one generator so their contents depend on generation order
    let mut rng = SmallRng::seed_from_u64(AMPLITUDE_SEED);
    presets.push(MorphTable::from_fn(|_, _| {
        random_db_gain(rng.gen_range(-48.0..0.0))
    }));
    presets.push(MorphTable::from_fn(|_, _| {
        let n: f32 = rng.sample(StandardNormal);
        random_db_gain(-12.0 + 4.0 * n)
    }));
    presets.push(MorphTable::from_fn(|i, _| {
        let prob = map_range(i as f32, 0.0, 15.0, 0.1, 0.95);
        let db = if rng.r#gen::<f32>() < prob { 0.0 } else { -40.0 };
        random_db_gain(db)
    }));

    // 7: spectral slope steepening from flat to 1/n
    presets.push(MorphTable::from_fn(|i, j| {
        let slope = map_range(i as f32, 0.0, 15.0, 0.01, 1.0);
        powf((j + 1) as f32, -slope)
    }));

    // 8: filtered checkerboard alternating odd/even partials per frame
    presets.push(MorphTable::from_fn(|i, j| {
        let base = if j % 2 == i % 2 || j == 0 { 1.0 } else { 0.0 };
        let tilt_db = map_range(i as f32, 0.0, 15.0, -60.0, 0.0);
        base * db_to_linear(map_range(j as f32, 0.0, 63.0, 0.0, tilt_db))
    }));

    debug_assert_eq!(presets.len(), AMPLITUDE_PRESET_COUNT);
    presets
}

fn random_db_gain(db: f32) -> f32 {
    db_to_linear(db.clamp(-60.0, 0.0))
}

/// Generate the factory pan presets, in preset-index order.
pub fn pan_presets() -> Vec<MorphTable> {
    let mut rng = SmallRng::seed_from_u64(PAN_SEED);
    vec![
        // 0: random scatter, fundamental and first frame centred
        MorphTable::from_fn(|i, j| {
            let pan = 0.05 + 0.9 * rng.r#gen::<f32>();
            if i == 0 || j == 0 { 0.5 } else { pan }
        }),
        // 1: rotating sine
        MorphTable::from_fn(|i, j| {
            0.5 + 0.475 * sinf(TAU / 64.0 * 2.0 * j as f32 + TAU / 16.0 * i as f32)
        }),
        // 2: sine accelerating across the frames
        MorphTable::from_fn(|i, j| {
            let rate = powf(2.0, i as f32 * 0.25);
            0.5 + 0.475 * sinf(TAU / 64.0 * rate * j as f32)
        }),
        // 3: sine widening from centre to full spread
        MorphTable::from_fn(|i, j| {
            let width = map_range(i as f32, 0.0, 15.0, 0.0, 0.5);
            0.5 + width * sinf(TAU / 64.0 * 8.0 * j as f32)
        }),
    ]
}

/// Default contents of the user-editable amplitude table: fundamental only.
pub fn fundamental_only_table() -> MorphTable {
    MorphTable::from_fn(|_, j| if j == 0 { 1.0 } else { 0.0 })
}
