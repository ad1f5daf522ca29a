//! Scalar interpolation helpers.

/// Weighted blend `a * b + (1 - a) * c`.
///
/// `a = 1` returns `b` exactly and `a = 0` returns `c` exactly, which is what
/// strength mixing relies on. Lattice sampling uses the same form with the
/// fractional coordinate as `a` and the upper node as `b`.
///
/// ```rust
/// use clut_math::intp;
///
/// assert_eq!(intp(1.0, 7.0, 3.0), 7.0);
/// assert_eq!(intp(0.0, 7.0, 3.0), 3.0);
/// assert_eq!(intp(0.25, 8.0, 0.0), 2.0);
/// ```
#[inline]
pub fn intp(a: f32, b: f32, c: f32) -> f32 {
    a * b + (1.0 - a) * c
}
