//! Block-rate ADSR envelope.
//!
//! The envelope computes one new level per [`BLOCK_SIZE`] frames and fills
//! [`BlockAdsr::output_cache`] with a linear ramp from the previous level to
//! the new one, so per-frame reads are smooth without per-frame stage logic.
//!
//! Attack, decay and release are normalized `0..=1` controls mapped onto
//! durations from `2^-8` s (about 4 ms) to `2^5` s (32 s) on a log scale.

use sinefield_core::{BLOCK_SIZE, RateTable};

/// Shortest segment, in log2 seconds.
pub const MIN_SEGMENT_LOG2: f32 = -8.0;
/// Longest segment, in log2 seconds.
pub const MAX_SEGMENT_LOG2: f32 = 5.0;

/// Envelope stages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EnvelopeStage {
    /// Rising toward full level.
    Attack,
    /// Falling from full level toward sustain.
    Decay,
    /// Holding at the sustain level while the gate is held.
    Sustain,
    /// Falling to zero after the gate closed.
    Release,
    /// Finished. Output is zero until the next attack.
    #[default]
    EndOfCycle,
}

/// ADSR settings in normalized form.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EnvelopeParams {
    /// Attack time, `0..=1`.
    pub attack: f32,
    /// Decay time, `0..=1`.
    pub decay: f32,
    /// Sustain level, `0..=1`.
    pub sustain: f32,
    /// Release time, `0..=1`.
    pub release: f32,
}

impl Default for EnvelopeParams {
    fn default() -> Self {
        Self {
            attack: 0.1,
            decay: 0.1,
            sustain: 1.0,
            release: 0.1,
        }
    }
}

impl EnvelopeParams {
    /// Create a parameter set, clamping every field into `0..=1`.
    pub fn new(attack: f32, decay: f32, sustain: f32, release: f32) -> Self {
        Self {
            attack: attack.clamp(0.0, 1.0),
            decay: decay.clamp(0.0, 1.0),
            sustain: sustain.clamp(0.0, 1.0),
            release: release.clamp(0.0, 1.0),
        }
    }
}

/// Segment duration for a normalized time control, in log2 seconds.
#[inline]
pub fn segment_log2_seconds(normalized: f32) -> f32 {
    MIN_SEGMENT_LOG2 + (MAX_SEGMENT_LOG2 - MIN_SEGMENT_LOG2) * normalized.clamp(0.0, 1.0)
}

/// ADSR envelope advanced one block at a time.
///
/// # Example
///
/// ```rust
/// use sinefield_core::RateTable;
/// use sinefield_synth::{BlockAdsr, EnvelopeParams, EnvelopeStage};
///
/// let rates = RateTable::new(48000.0);
/// let params = EnvelopeParams::new(0.0, 0.2, 0.5, 0.1);
/// let mut env = BlockAdsr::new();
/// env.attack_from(0.0);
/// for _ in 0..20 {
///     env.process_block(&params, true, &rates);
/// }
/// assert_ne!(env.stage(), EnvelopeStage::Attack);
/// ```
#[derive(Debug, Clone)]
pub struct BlockAdsr {
    /// Per-frame level across the most recent block.
    pub output_cache: [f32; BLOCK_SIZE],
    stage: EnvelopeStage,
    phase: f32,
    output: f32,
    segment_start: f32,
}

impl Default for BlockAdsr {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockAdsr {
    /// Create an envelope in [`EnvelopeStage::EndOfCycle`].
    pub fn new() -> Self {
        Self {
            output_cache: [0.0; BLOCK_SIZE],
            stage: EnvelopeStage::EndOfCycle,
            phase: 0.0,
            output: 0.0,
            segment_start: 0.0,
        }
    }

    /// Start a new attack from `start` (0.0 for a fresh note, the current
    /// level for a legato retrigger).
    pub fn attack_from(&mut self, start: f32) {
        self.stage = EnvelopeStage::Attack;
        self.phase = 0.0;
        self.segment_start = start.clamp(0.0, 1.0);
        self.output = self.segment_start;
    }

    /// Current stage.
    pub fn stage(&self) -> EnvelopeStage {
        self.stage
    }

    /// Level at the end of the most recent block.
    pub fn output(&self) -> f32 {
        self.output
    }

    /// Whether the envelope has finished its release.
    pub fn is_finished(&self) -> bool {
        self.stage == EnvelopeStage::EndOfCycle
    }

    /// Advance one block with the gate state `gate`.
    pub fn process_block(&mut self, params: &EnvelopeParams, gate: bool, rates: &RateTable) {
        let previous = self.output;

        if !gate
            && matches!(
                self.stage,
                EnvelopeStage::Attack | EnvelopeStage::Decay | EnvelopeStage::Sustain
            )
        {
            self.stage = EnvelopeStage::Release;
            self.phase = 0.0;
            self.segment_start = self.output;
        }

        match self.stage {
            EnvelopeStage::Attack => {
                self.phase += rates.envelope_rate_linear_nowrap(segment_log2_seconds(params.attack));
                if self.phase >= 1.0 {
                    self.output = 1.0;
                    self.phase = 0.0;
                    self.stage = EnvelopeStage::Decay;
                } else {
                    self.output = self.segment_start + (1.0 - self.segment_start) * self.phase;
                }
            }
            EnvelopeStage::Decay => {
                self.phase += rates.envelope_rate_linear_nowrap(segment_log2_seconds(params.decay));
                if self.phase >= 1.0 {
                    self.output = params.sustain;
                    self.stage = EnvelopeStage::Sustain;
                } else {
                    let remaining = 1.0 - self.phase;
                    self.output = params.sustain + (1.0 - params.sustain) * remaining * remaining;
                }
            }
            EnvelopeStage::Sustain => {
                self.output = params.sustain;
            }
            EnvelopeStage::Release => {
                self.phase +=
                    rates.envelope_rate_linear_nowrap(segment_log2_seconds(params.release));
                if self.phase >= 1.0 {
                    self.output = 0.0;
                    self.stage = EnvelopeStage::EndOfCycle;
                } else {
                    let remaining = 1.0 - self.phase;
                    self.output = self.segment_start * remaining * remaining;
                }
            }
            EnvelopeStage::EndOfCycle => {
                self.output = 0.0;
            }
        }

        let step = (self.output - previous) / BLOCK_SIZE as f32;
        for (i, slot) in self.output_cache.iter_mut().enumerate() {
            *slot = previous + step * (i + 1) as f32;
        }
    }
}
