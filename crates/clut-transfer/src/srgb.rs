//! sRGB transfer function.
//!
//! Piecewise: a linear segment near black and a 2.4 power curve above it.
//! The `_16bit` variants work on the pipeline's `[0, 65535]` float scale.
//!
//! # Reference
//!
//! IEC 61966-2-1:1999

/// Scale of the 16-bit float convention.
const SCALE: f32 = 65535.0;

/// sRGB EOTF: decodes sRGB `[0, 1]` to linear `[0, 1]`.
///
/// ```text
/// if V <= 0.04045:  L = V / 12.92
/// else:             L = ((V + 0.055) / 1.055)^2.4
/// ```
///
/// ```rust
/// use clut_transfer::srgb::eotf;
///
/// assert!((eotf(0.5) - 0.214).abs() < 0.01);
/// ```
#[inline]
pub fn eotf(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

/// sRGB OETF: encodes linear `[0, 1]` to sRGB `[0, 1]`.
///
/// ```text
/// if L <= 0.0031308:  V = L * 12.92
/// else:               V = 1.055 * L^(1/2.4) - 0.055
/// ```
#[inline]
pub fn oetf(l: f32) -> f32 {
    if l <= 0.0031308 {
        l * 12.92
    } else {
        1.055 * l.powf(1.0 / 2.4) - 0.055
    }
}

/// Encodes a `[0, 65535]` linear value, clipping to the encodable range.
///
/// Lattice indices are only defined inside the cube, so anything below black
/// or above white is clipped first.
#[inline]
pub fn gamma_16bit_clipped(v: f32) -> f32 {
    if v <= 0.0 {
        0.0
    } else if v >= SCALE {
        SCALE
    } else {
        SCALE * oetf(v / SCALE)
    }
}

/// Decodes a `[0, 65535]` sRGB value back to linear. Not clipped.
#[inline]
pub fn igamma_16bit(v: f32) -> f32 {
    SCALE * eotf(v / SCALE)
}

/// Applies [`gamma_16bit_clipped`] to a run of samples.
pub fn gamma_16bit_clipped_slice(values: &mut [f32]) {
    values.iter_mut().for_each(|v| *v = gamma_16bit_clipped(*v));
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_roundtrip() {
        for i in 0..=100 {
            let v = i as f32 / 100.0;
            assert_abs_diff_eq!(v, oetf(eotf(v)), epsilon = 1e-5);
        }
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(eotf(0.0), 0.0);
        assert_abs_diff_eq!(eotf(1.0), 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(oetf(1.0), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_16bit_clipping() {
        assert_eq!(gamma_16bit_clipped(-10.0), 0.0);
        assert_eq!(gamma_16bit_clipped(70000.0), 65535.0);
        let mid = gamma_16bit_clipped(0.214 * 65535.0);
        assert_abs_diff_eq!(mid / 65535.0, 0.5, epsilon = 0.01);
    }

    #[test]
    fn test_16bit_roundtrip() {
        for i in 0..=64 {
            let v = i as f32 * 1023.98;
            let back = igamma_16bit(gamma_16bit_clipped(v));
            assert_abs_diff_eq!(back, v, epsilon = 0.05);
        }
    }
}
