//! SMPTE ST 2084 Perceptual Quantizer (PQ).
//!
//! Besides the absolute-luminance curve, this module exposes the shaper used
//! to index baked script lattices: relative scene values are mapped through
//! PQ with `100.0` standing in for reference white, so `[0, 100]` linear
//! covers the full `[0, 1]` lattice axis.
//!
//! # Reference
//!
//! SMPTE ST 2084:2014

/// Maximum luminance in cd/m2 (nits).
pub const L_MAX: f32 = 10000.0;

/// Relative value that maps to the top of the shaper axis.
pub const SHAPER_MAX: f32 = 100.0;

const M1: f32 = 2610.0 / 16384.0;
const M2: f32 = 2523.0 / 4096.0 * 128.0;
const C1: f32 = 3424.0 / 4096.0;
const C2: f32 = 2413.0 / 4096.0 * 32.0;
const C3: f32 = 2392.0 / 4096.0 * 32.0;

/// PQ EOTF: decodes a `[0, 1]` signal to cd/m2.
///
/// ```rust
/// use clut_transfer::pq::eotf;
///
/// assert!((eotf(0.508) - 100.0).abs() < 1.0);
/// ```
#[inline]
pub fn eotf(v: f32) -> f32 {
    L_MAX * eotf_normalized(v)
}

/// PQ OETF: encodes cd/m2 to a `[0, 1]` signal.
#[inline]
pub fn oetf(l: f32) -> f32 {
    oetf_normalized(l / L_MAX)
}

/// PQ curve on luminance normalized to `[0, 1]` (1.0 = 10000 nits).
#[inline]
pub fn oetf_normalized(y: f32) -> f32 {
    if y <= 0.0 {
        return 0.0;
    }
    let yp = y.powf(M1);
    ((C1 + C2 * yp) / (1.0 + C3 * yp)).powf(M2)
}

/// Inverse of [`oetf_normalized`].
#[inline]
pub fn eotf_normalized(v: f32) -> f32 {
    if v <= 0.0 {
        return 0.0;
    }
    let vp = v.powf(1.0 / M2);
    let num = (vp - C1).max(0.0);
    let den = C2 - C3 * vp;
    (num / den).powf(1.0 / M1)
}

/// Maps a relative linear value to the `[0, 1]` shaper axis.
///
/// Non-positive input maps to `0.0`.
#[inline]
pub fn shaper(a: f32) -> f32 {
    if a <= 0.0 {
        return 0.0;
    }
    oetf_normalized(a / SHAPER_MAX)
}

/// Maps a shaper-axis coordinate back to a relative linear value.
#[inline]
pub fn shaper_inverse(a: f32) -> f32 {
    if a <= 0.0 {
        return 0.0;
    }
    eotf_normalized(a) * SHAPER_MAX
}
