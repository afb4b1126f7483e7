//! Polynomial sine evaluation for the partial bank.
//!
//! | Function | Replaces | Use case | Max error |
//! |----------|----------|----------|-----------|
//! | [`fast_sin`] | `libm::sinf` | One partial | < 1e-6 on `[0, 2π)` |
//! | [`sine_block`] | `libm::sinf` in a loop | Whole phase vector | same |
//! | [`fast_sin_turns`] | `libm::sinf` | LFO shapes | < 0.001 |
//!
//! [`sine_block`] walks its input in lanes of [`SINE_LANES`] with no
//! branches in the polynomial, so the optimizer can keep four phases in one
//! vector register. Phases must already be wrapped into `[0, 2π)`.

use core::f32::consts::{FRAC_PI_2, PI};
use libm::floorf;

/// Lane width of the batched sine evaluation.
pub const SINE_LANES: usize = 4;

/// Sine of a phase in `[0, 2π)`.
///
/// The phase is shifted to `[-π, π)`, folded onto `[-π/2, π/2]`, and
/// evaluated with an odd Taylor polynomial through the 11th power.
///
/// ```rust
/// use sinefield_core::fast_math::fast_sin;
///
/// assert!(fast_sin(0.0).abs() < 1e-6);
/// assert!((fast_sin(core::f32::consts::FRAC_PI_2) - 1.0).abs() < 1e-6);
/// ```
#[inline]
pub fn fast_sin(phase: f32) -> f32 {
    // sin(p) = -sin(p - π)
    let x = phase - PI;
    let folded = if x > FRAC_PI_2 {
        PI - x
    } else if x < -FRAC_PI_2 {
        -PI - x
    } else {
        x
    };
    -odd_poly(folded)
}

#[inline(always)]
fn odd_poly(x: f32) -> f32 {
    const C3: f32 = -1.0 / 6.0;
    const C5: f32 = 1.0 / 120.0;
    const C7: f32 = -1.0 / 5040.0;
    const C9: f32 = 1.0 / 362_880.0;
    const C11: f32 = -1.0 / 39_916_800.0;
    let x2 = x * x;
    x * (1.0 + x2 * (C3 + x2 * (C5 + x2 * (C7 + x2 * (C9 + x2 * C11)))))
}

/// Evaluate `sin` for every phase in `phases`, writing into `out`.
///
/// Both slices must have the same length. The body runs over
/// [`SINE_LANES`]-wide chunks with a scalar tail.
#[inline]
pub fn sine_block(phases: &[f32], out: &mut [f32]) {
    debug_assert_eq!(phases.len(), out.len());
    let mut src = phases.chunks_exact(SINE_LANES);
    let mut dst = out.chunks_exact_mut(SINE_LANES);
    for (p, o) in (&mut src).zip(&mut dst) {
        let lanes: [f32; SINE_LANES] = [p[0], p[1], p[2], p[3]];
        for lane in 0..SINE_LANES {
            o[lane] = fast_sin(lanes[lane]);
        }
    }
    for (p, o) in src.remainder().iter().zip(dst.into_remainder()) {
        *o = fast_sin(*p);
    }
}

/// Fast sine for a phase given in turns (1.0 = one cycle).
///
/// Bhaskara-corrected parabola, accurate to about 0.001. Good enough for
/// modulation shapes, too coarse for audible partials.
#[inline]
pub fn fast_sin_turns(turns: f32) -> f32 {
    let p = turns - floorf(turns);
    let (half_p, sign) = if p < 0.5 {
        (p * 2.0, 1.0_f32)
    } else {
        ((p - 0.5) * 2.0, -1.0_f32)
    };
    let y = 4.0 * half_p * (1.0 - half_p);
    sign * (0.225 * y * (y - 1.0) + y)
}
