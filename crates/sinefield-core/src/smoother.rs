//! One-pole smoothing for control signals.
//!
//! ```text
//! y[n] = (1 - slope) * x[n] + slope * y[n-1]
//! ```
//!
//! The slope is used directly rather than derived from a cutoff frequency,
//! since the partial bank runs several thousand smoothers per block and the
//! constants are tuned by ear (0.990 for partial gains, 0.999 for pans and
//! CC inputs).

use crate::flush_denormal;

/// Slope used for partial gain smoothing.
pub const GAIN_SMOOTHING: f32 = 0.990;
/// Slope used for partial pan and CC smoothing.
pub const PAN_SMOOTHING: f32 = 0.999;

/// Advance a single smoothing history toward `target`.
#[inline]
pub fn one_pole_step(history: &mut f32, target: f32, slope: f32) -> f32 {
    *history = flush_denormal(target + slope * (*history - target));
    *history
}

/// A one-pole smoother that owns its history.
///
/// ## Invariants
///
/// - `slope` is in `[0, 1)`; 0 follows the input exactly.
#[derive(Debug, Clone, Copy)]
pub struct OnePoleSmoother {
    history: f32,
    slope: f32,
}

impl Default for OnePoleSmoother {
    fn default() -> Self {
        Self::new(PAN_SMOOTHING)
    }
}

impl OnePoleSmoother {
    /// Create a smoother at rest on 0.0.
    pub fn new(slope: f32) -> Self {
        debug_assert!((0.0..1.0).contains(&slope));
        Self {
            history: 0.0,
            slope,
        }
    }

    /// Feed one input and return the smoothed value.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        one_pole_step(&mut self.history, input, self.slope)
    }

    /// Last output.
    pub fn value(&self) -> f32 {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converges_to_target() {
        let mut s = OnePoleSmoother::new(GAIN_SMOOTHING);
        for _ in 0..2000 {
            s.process(0.75);
        }
        assert!((s.value() - 0.75).abs() < 1e-4);
    }

    #[test]
    fn test_first_step_size() {
        let mut s = OnePoleSmoother::new(0.999);
        let y = s.process(1.0);
        assert!((y - 0.001).abs() < 1e-6);
    }
}
