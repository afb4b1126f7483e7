//! Scalar helpers shared by every sinefield module.
//!
//! # Level Conversions
//!
//! - [`db_to_linear`] - Convert decibels to linear gain
//!
//! # Ranges
//!
//! - [`map_range`] - Affine remap of one interval onto another (no clamping)
//! - [`lerp`] - Linear interpolation
//! - [`reflect_unit`] - Fold a value back into `[0, 1]` at the edges
//!
//! # Saturation
//!
//! - [`soft_clip`] - `tanh` saturator used on the final mix

use libm::{expf, tanhf};

/// Frequency of MIDI note 0 in Hz.
pub const MIDI_0_FREQ: f32 = 8.175_799;

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use sinefield_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    // 10^(dB/20) = e^(dB * ln(10)/20)
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Map `x` from `[in_lo, in_hi]` onto `[out_lo, out_hi]`.
///
/// Values outside the input interval extrapolate; callers clamp when they
/// need a bounded result.
///
/// ```rust
/// use sinefield_core::map_range;
///
/// assert_eq!(map_range(5.0, 0.0, 10.0, 100.0, 200.0), 150.0);
/// assert_eq!(map_range(0.0, 0.0, 15.0, -60.0, 0.0), -60.0);
/// ```
#[inline]
pub fn map_range(x: f32, in_lo: f32, in_hi: f32, out_lo: f32, out_hi: f32) -> f32 {
    out_lo + (out_hi - out_lo) * (x - in_lo) / (in_hi - in_lo)
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Fold a value that overshot `[0, 1]` back into range.
///
/// `v >= 1` becomes `2 - v`, `v < 0` becomes `-v`. Inputs already inside the
/// range pass through unchanged, so the fold is idempotent on `[0, 1)`.
/// Composed pan values are at most one unit out of range, which a single
/// fold always brings back.
///
/// ```rust
/// use sinefield_core::reflect_unit;
///
/// assert_eq!(reflect_unit(1.25), 0.75);
/// assert_eq!(reflect_unit(-0.25), 0.25);
/// assert_eq!(reflect_unit(0.4), 0.4);
/// ```
#[inline]
pub fn reflect_unit(v: f32) -> f32 {
    if v >= 1.0 {
        2.0 - v
    } else if v < 0.0 {
        -v
    } else {
        v
    }
}

/// Soft clip using hyperbolic tangent. Output is in `(-1, 1)`.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    tanhf(x)
}

/// Flush subnormal values to zero.
#[inline]
pub fn flush_denormal(x: f32) -> f32 {
    if x.abs() < 1e-20 { 0.0 } else { x }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_linear_points() {
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-5);
    }

    #[test]
    fn test_map_range_extrapolates() {
        assert_eq!(map_range(20.0, 0.0, 10.0, 0.0, 1.0), 2.0);
        assert_eq!(map_range(1.0, 0.0, 1.0, -48.0, 0.0), 0.0);
    }

    #[test]
    fn test_reflect_edges() {
        assert_eq!(reflect_unit(1.0), 1.0);
        assert_eq!(reflect_unit(0.0), 0.0);
        assert_eq!(reflect_unit(1.5), 0.5);
        assert_eq!(reflect_unit(-1.0), 1.0);
    }

    #[test]
    fn test_soft_clip_bounded() {
        assert!(soft_clip(100.0) <= 1.0);
        assert!(soft_clip(-100.0) >= -1.0);
        assert!((soft_clip(0.1) - 0.0997).abs() < 1e-3);
    }

    #[test]
    fn test_flush_denormal() {
        assert_eq!(flush_denormal(1.0), 1.0);
        assert_eq!(flush_denormal(1e-21), 0.0);
        assert_eq!(flush_denormal(-1e-30), 0.0);
    }
}
