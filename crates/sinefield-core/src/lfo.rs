//! Block-rate low frequency oscillator.
//!
//! [`BlockLfo::process_block`] is called once per [`BLOCK_SIZE`] frames and
//! fills [`BlockLfo::output_block`] with one value per frame, so a voice can
//! read per-frame modulation without running the oscillator per sample.
//!
//! Rate is given in octaves relative to 1 Hz (`0.0` = 1 Hz, `1.0` = 2 Hz,
//! `-3.0` = 0.125 Hz). Deform is bipolar in `[-1, 1]` and means something
//! different per shape:
//!
//! | Shape | Deform |
//! |-------|--------|
//! | Sine, ramps, triangle | Cubic bend toward the peaks (+) or the zero line (-) |
//! | Pulse | Duty cycle from 5% to 95% |
//! | Smooth noise, sample & hold | Correlation between successive targets |

use core::f32::consts::PI;

use libm::{cosf, exp2f};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::fast_math::fast_sin_turns;
use crate::rate_table::{BLOCK_SIZE, RateTable};

/// LFO waveform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LfoShape {
    /// Sine wave.
    #[default]
    Sine,
    /// Rising sawtooth.
    RampUp,
    /// Falling sawtooth.
    RampDown,
    /// Triangle.
    Triangle,
    /// Square with variable duty cycle.
    Pulse,
    /// Cosine-interpolated random targets, one per cycle.
    SmoothNoise,
    /// Random steps, one per cycle.
    SampleAndHold,
}

impl LfoShape {
    /// Number of shapes.
    pub const COUNT: usize = 7;

    /// Shape for a parameter index; out-of-range indices clamp to the last shape.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Sine,
            1 => Self::RampUp,
            2 => Self::RampDown,
            3 => Self::Triangle,
            4 => Self::Pulse,
            5 => Self::SmoothNoise,
            _ => Self::SampleAndHold,
        }
    }
}

/// Low frequency oscillator advanced one block at a time.
///
/// Output is bipolar, in `[-1, 1]`.
#[derive(Debug, Clone)]
pub struct BlockLfo {
    /// Per-frame output of the most recent block.
    pub output_block: [f32; BLOCK_SIZE],
    phase: f32,
    noise_from: f32,
    noise_to: f32,
    rng: SmallRng,
}

impl BlockLfo {
    /// Create an LFO whose noise shapes draw from a generator seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let noise_to = rng.gen_range(-1.0..1.0);
        Self {
            output_block: [0.0; BLOCK_SIZE],
            phase: 0.0,
            noise_from: 0.0,
            noise_to,
            rng,
        }
    }

    /// Restart the cycle. Noise targets are kept so retriggers stay varied.
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.output_block = [0.0; BLOCK_SIZE];
    }

    /// Current phase in turns, `[0, 1)`.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Most recent output value.
    pub fn last_output(&self) -> f32 {
        self.output_block[BLOCK_SIZE - 1]
    }

    /// Render one block of output.
    pub fn process_block(&mut self, rate: f32, deform: f32, shape: LfoShape, rates: &RateTable) {
        let deform = deform.clamp(-1.0, 1.0);
        let inc = exp2f(rate) * rates.sample_rate_inv();
        for i in 0..BLOCK_SIZE {
            self.output_block[i] = self.value_at_phase(deform, shape);
            self.phase += inc;
            if self.phase >= 1.0 {
                self.phase -= libm::floorf(self.phase);
                self.next_noise_target(deform);
            }
        }
    }

    fn next_noise_target(&mut self, deform: f32) {
        let correlation = deform.abs() * 0.9;
        let fresh: f32 = self.rng.gen_range(-1.0..1.0);
        self.noise_from = self.noise_to;
        self.noise_to = fresh + (self.noise_from - fresh) * correlation;
    }

    #[inline]
    fn value_at_phase(&self, deform: f32, shape: LfoShape) -> f32 {
        let p = self.phase;
        match shape {
            LfoShape::Sine => bend(fast_sin_turns(p), deform),
            LfoShape::RampUp => bend(2.0 * p - 1.0, deform),
            LfoShape::RampDown => bend(1.0 - 2.0 * p, deform),
            LfoShape::Triangle => {
                let tri = if p < 0.5 { 4.0 * p - 1.0 } else { 3.0 - 4.0 * p };
                bend(tri, deform)
            }
            LfoShape::Pulse => {
                let width = 0.5 + 0.45 * deform;
                if p < width { 1.0 } else { -1.0 }
            }
            LfoShape::SmoothNoise => {
                let t = 0.5 - 0.5 * cosf(PI * p);
                self.noise_from + (self.noise_to - self.noise_from) * t
            }
            LfoShape::SampleAndHold => self.noise_from,
        }
    }
}

/// Cubic bend that keeps `[-1, 1]` mapped onto itself.
#[inline]
fn bend(x: f32, deform: f32) -> f32 {
    // d > 0 pushes toward the peaks, d < 0 toward zero
    let shaped = if deform >= 0.0 {
        let c = 1.0 - (1.0 - x.abs()) * (1.0 - x.abs()) * (1.0 - x.abs());
        x.signum() * c
    } else {
        x * x * x
    };
    (x + (shaped - x) * deform.abs()).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(shape: LfoShape, rate: f32, deform: f32, blocks: usize) -> (f32, f32) {
        let rates = RateTable::new(48000.0);
        let mut lfo = BlockLfo::new(7);
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        for _ in 0..blocks {
            lfo.process_block(rate, deform, shape, &rates);
            for &v in lfo.output_block.iter() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        (lo, hi)
    }

    #[test]
    fn test_all_shapes_bounded() {
        for idx in 0..LfoShape::COUNT {
            let shape = LfoShape::from_index(idx);
            for &deform in &[-1.0, -0.3, 0.0, 0.6, 1.0] {
                let (lo, hi) = run(shape, 3.0, deform, 400);
                assert!(lo >= -1.0 && hi <= 1.0, "{shape:?} d={deform}: {lo}..{hi}");
            }
        }
    }

    #[test]
    fn test_sine_swings_full_range() {
        // 8 Hz over ~0.27 s covers two cycles
        let (lo, hi) = run(LfoShape::Sine, 3.0, 0.0, 400);
        assert!(lo < -0.99 && hi > 0.99);
    }

    #[test]
    fn test_rate_sets_phase_advance() {
        let rates = RateTable::new(48000.0);
        let mut lfo = BlockLfo::new(1);
        // 2^0 Hz: one block advances 32 / 48000 turns
        lfo.process_block(0.0, 0.0, LfoShape::RampUp, &rates);
        assert!((lfo.phase() - 32.0 / 48000.0).abs() < 1e-6);
    }

    #[test]
    fn test_pulse_duty_cycle() {
        let rates = RateTable::new(48000.0);
        let mut lfo = BlockLfo::new(3);
        let mut high = 0usize;
        let mut total = 0usize;
        // 1 Hz for one second is exactly one cycle
        for _ in 0..1500 {
            lfo.process_block(0.0, 0.8, LfoShape::Pulse, &rates);
            for &v in lfo.output_block.iter() {
                total += 1;
                if v > 0.0 {
                    high += 1;
                }
            }
        }
        let duty = high as f32 / total as f32;
        assert!((duty - 0.86).abs() < 0.02, "duty = {duty}");
    }

    #[test]
    fn test_from_index_clamps() {
        assert_eq!(LfoShape::from_index(0), LfoShape::Sine);
        assert_eq!(LfoShape::from_index(6), LfoShape::SampleAndHold);
        assert_eq!(LfoShape::from_index(99), LfoShape::SampleAndHold);
    }
}
