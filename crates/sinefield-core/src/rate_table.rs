//! Exponential envelope-rate table.
//!
//! Envelope segments and modulators advance once per [`BLOCK_SIZE`] frames.
//! A segment of duration `2^x` seconds needs a per-block phase increment of
//! `BLOCK_SIZE / (sample_rate * 2^x)`; the table holds that value for `x`
//! from -16 to +16 in steps of 1/16 so the conversion is a lookup plus a
//! lerp instead of an `exp2` and a divide.
//!
//! The table is computed at twice the sample rate with a doubled block so
//! the ratio matches the oversampled envelope designs this layout comes
//! from; the ratio cancels and the increments are those of the plain block.

use libm::exp2f;

use crate::lerp;

/// Frames between modulation updates.
pub const BLOCK_SIZE: usize = 32;
/// Block size at the table's doubled rate.
pub const BLOCK_SIZE_OS: usize = BLOCK_SIZE * 2;
/// Number of entries in the rate table.
pub const RATE_TABLE_LEN: usize = 512;

const TABLE_CENTER: f32 = 256.0;
const STEPS_PER_OCTAVE: f32 = 16.0;

/// Sample-rate dependent envelope-rate table.
///
/// Two-phase construction: `RateTable::default()` is usable at 48 kHz, and
/// [`set_sample_rate`](Self::set_sample_rate) rebuilds it once the host
/// rate is known.
#[derive(Debug, Clone)]
pub struct RateTable {
    table: [f32; RATE_TABLE_LEN],
    sample_rate: f32,
    sample_rate_inv: f32,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(48000.0)
    }
}

impl RateTable {
    /// Build the table for `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        let mut rates = Self {
            table: [0.0; RATE_TABLE_LEN],
            sample_rate,
            sample_rate_inv: 1.0 / sample_rate,
        };
        rates.rebuild();
        rates
    }

    /// Rebuild for a new sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        debug_assert!(sample_rate > 0.0);
        self.sample_rate = sample_rate;
        self.sample_rate_inv = 1.0 / sample_rate;
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let sr_os = self.sample_rate * 2.0;
        for (i, slot) in self.table.iter_mut().enumerate() {
            let k = sr_os * exp2f((i as f32 - TABLE_CENTER) / STEPS_PER_OCTAVE)
                / BLOCK_SIZE_OS as f32;
            *slot = 1.0 / k;
        }
    }

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Reciprocal of the sample rate.
    pub fn sample_rate_inv(&self) -> f32 {
        self.sample_rate_inv
    }

    /// Per-block phase increment for a segment lasting `2^x` seconds.
    ///
    /// `x` outside roughly `[-16, 15.9]` clamps to the table ends.
    #[inline]
    pub fn envelope_rate_linear_nowrap(&self, x: f32) -> f32 {
        let pos = x * STEPS_PER_OCTAVE + TABLE_CENTER;
        let pos = pos.clamp(0.0, (RATE_TABLE_LEN - 2) as f32);
        let e = pos as usize;
        let a = pos - e as f32;
        lerp(self.table[e], self.table[e + 1], a)
    }
}
