//! Burst generator: a train of short percussive envelopes.
//!
//! Within a cycle of `duration` seconds the generator schedules `count`
//! bursts. Each scheduled burst fires with probability `probability`,
//! retriggering an internal fast ADSR from its current level. The
//! `distribution` control skews the burst times: below 0.5 the bursts bunch
//! toward the end of the cycle, above 0.5 toward the start, and at 0.5 they
//! are evenly spaced. With auto-repeat on, the cycle restarts when it ends.
//!
//! The generator runs once per block, like the other voice modulators.

use libm::powf;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use sinefield_core::{BLOCK_SIZE, RateTable, map_range};

use crate::envelope::{BlockAdsr, EnvelopeParams};

/// Fixed shape of a single burst.
const BURST_ENVELOPE: EnvelopeParams = EnvelopeParams {
    attack: 0.01,
    decay: 0.3,
    sustain: 0.0,
    release: 0.6,
};

/// Burst generator settings.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BurstParams {
    /// Cycle length in seconds.
    pub duration: f32,
    /// Bursts scheduled per cycle.
    pub count: u32,
    /// Chance that a scheduled burst fires, `0..=1`.
    pub probability: f32,
    /// Time skew, `0..=1`; 0.5 is even spacing.
    pub distribution: f32,
    /// Restart the cycle when it ends.
    pub auto_repeat: bool,
}

impl Default for BurstParams {
    fn default() -> Self {
        Self {
            duration: 1.0,
            count: 4,
            probability: 1.0,
            distribution: 0.5,
            auto_repeat: true,
        }
    }
}

/// Normalized-then-scaled onset of burst `index` within a cycle, in seconds.
pub fn burst_time(params: &BurstParams, index: u32) -> f32 {
    let count = params.count.max(1) as f32;
    let t = (index as f32 / count).clamp(0.0, 1.0);
    let d = params.distribution;
    let shaped = if d < 0.5 {
        powf(t, map_range(d, 0.0, 0.5, 3.0, 1.0))
    } else if d > 0.5 {
        1.0 - powf(1.0 - t, map_range(d, 0.5, 1.0, 1.0, 3.0))
    } else {
        t
    };
    shaped * params.duration
}

/// Probabilistic burst envelope.
#[derive(Debug, Clone)]
pub struct BurstGenerator {
    params: BurstParams,
    env: BlockAdsr,
    /// Frames elapsed in the current cycle.
    position: f32,
    counter: u32,
    rng: SmallRng,
}

impl BurstGenerator {
    /// Create a generator whose firing decisions come from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            params: BurstParams::default(),
            env: BlockAdsr::new(),
            position: 0.0,
            counter: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Replace the settings. Takes effect at the next scheduled burst.
    pub fn set_params(&mut self, params: BurstParams) {
        self.params = BurstParams {
            duration: params.duration.max(0.001),
            count: params.count.max(1),
            probability: params.probability.clamp(0.0, 1.0),
            distribution: params.distribution.clamp(0.0, 1.0),
            auto_repeat: params.auto_repeat,
        };
    }

    /// Current settings.
    pub fn params(&self) -> &BurstParams {
        &self.params
    }

    /// Restart the cycle. The envelope keeps its level so repeats do not click.
    pub fn begin(&mut self) {
        self.position = 0.0;
        self.counter = 0;
    }

    /// Per-frame output of the most recent block.
    pub fn output_block(&self) -> &[f32; BLOCK_SIZE] {
        &self.env.output_cache
    }

    /// Advance one block.
    pub fn process_block(&mut self, rates: &RateTable) {
        let sr = rates.sample_rate();
        let block_end = self.position + BLOCK_SIZE as f32;
        while self.counter < self.params.count
            && burst_time(&self.params, self.counter) * sr < block_end
        {
            if self.rng.r#gen::<f32>() < self.params.probability {
                let level = self.env.output();
                self.env.attack_from(level);
            }
            self.counter += 1;
        }
        self.position = block_end;
        self.env
            .process_block(&BURST_ENVELOPE, self.counter <= self.params.count, rates);
        if self.params.auto_repeat && self.position >= self.params.duration * sr {
            self.begin();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_even_spacing_at_center() {
        let params = BurstParams {
            duration: 2.0,
            count: 4,
            distribution: 0.5,
            ..BurstParams::default()
        };
        let times: Vec<f32> = (0..4).map(|i| burst_time(&params, i)).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_skew_directions() {
        let late = BurstParams {
            distribution: 0.0,
            ..BurstParams::default()
        };
        let early = BurstParams {
            distribution: 1.0,
            ..BurstParams::default()
        };
        // t = 0.5 cubed is 0.125; mirrored it is 0.875
        assert!((burst_time(&late, 2) - 0.125).abs() < 1e-6);
        assert!((burst_time(&early, 2) - 0.875).abs() < 1e-6);
    }

    #[test]
    fn test_fires_and_decays() {
        let rates = RateTable::new(48000.0);
        let mut burst = BurstGenerator::new(5);
        burst.set_params(BurstParams {
            duration: 1.0,
            count: 1,
            probability: 1.0,
            distribution: 0.5,
            auto_repeat: false,
        });
        burst.begin();
        let mut peak = 0.0_f32;
        for _ in 0..200 {
            burst.process_block(&rates);
            peak = peak.max(burst.output_block()[BLOCK_SIZE - 1]);
        }
        assert!(peak > 0.9, "peak = {peak}");
        for _ in 0..3000 {
            burst.process_block(&rates);
        }
        assert!(burst.output_block()[BLOCK_SIZE - 1] < 1e-3);
    }

    #[test]
    fn test_zero_probability_stays_silent() {
        let rates = RateTable::new(48000.0);
        let mut burst = BurstGenerator::new(9);
        burst.set_params(BurstParams {
            probability: 0.0,
            ..BurstParams::default()
        });
        burst.begin();
        for _ in 0..3000 {
            burst.process_block(&rates);
            assert_eq!(burst.output_block()[0], 0.0);
        }
    }

    #[test]
    fn test_output_bounded() {
        let rates = RateTable::new(44100.0);
        let mut burst = BurstGenerator::new(1);
        burst.set_params(BurstParams {
            duration: 0.25,
            count: 16,
            probability: 0.7,
            distribution: 0.2,
            auto_repeat: true,
        });
        burst.begin();
        for _ in 0..5000 {
            burst.process_block(&rates);
            for &v in burst.output_block() {
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}
