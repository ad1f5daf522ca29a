//! Chromatic adaptation.
//!
//! Working spaces are exchanged through a D50 profile connection space, so
//! spaces defined under another white (D65, ACES D60, DCI) are Bradford
//! adapted before use.
//!
//! # Example
//!
//! ```rust
//! use clut_math::{adapt_matrix, BRADFORD, D50, D65};
//!
//! let d65_to_d50 = adapt_matrix(BRADFORD, D65, D50);
//! let white = d65_to_d50 * D65;
//! assert!((white.x - D50.x).abs() < 1e-3);
//! assert!((white.z - D50.z).abs() < 1e-3);
//! ```

use crate::{Mat3, Vec3};

// ============================================================================
// White Points (XYZ, Y = 1)
// ============================================================================

/// CIE D65 white point.
pub const D65: Vec3 = Vec3::new(0.95047, 1.0, 1.08883);

/// CIE D50 white point, the profile connection space white.
pub const D50: Vec3 = Vec3::new(0.96422, 1.0, 0.82521);

/// ACES white point (approximately D60).
pub const D60: Vec3 = Vec3::new(0.95265, 1.0, 1.00883);

/// DCI-P3 projector white.
pub const DCI_WHITE: Vec3 = Vec3::new(0.89459, 1.0, 0.95441);

// ============================================================================
// Adaptation Matrices
// ============================================================================

/// Bradford cone response matrix.
pub const BRADFORD: Mat3 = Mat3::from_rows([
    [0.8951, 0.2664, -0.1614],
    [-0.7502, 1.7135, 0.0367],
    [0.0389, -0.0685, 1.0296],
]);

/// Converts an xy chromaticity to XYZ with Y = 1.
#[inline]
pub fn xy_to_xyz(x: f32, y: f32) -> Vec3 {
    Vec3::new(x / y, 1.0, (1.0 - x - y) / y)
}

/// Computes the matrix adapting XYZ under `src_white` to `dst_white`.
///
/// `method` is the cone response matrix, normally [`BRADFORD`]. A singular
/// method matrix yields the identity.
pub fn adapt_matrix(method: Mat3, src_white: Vec3, dst_white: Vec3) -> Mat3 {
    let Some(method_inv) = method.inverse() else {
        return Mat3::IDENTITY;
    };
    let src = method * src_white;
    let dst = method * dst_white;
    let scale = Mat3::diagonal(dst.x / src.x, dst.y / src.y, dst.z / src.z);
    method_inv * scale * method
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_white_is_identity() {
        let m = adapt_matrix(BRADFORD, D65, D65);
        assert!(m.max_abs_diff(&Mat3::IDENTITY) < 1e-5);
    }

    #[test]
    fn test_roundtrip() {
        let there = adapt_matrix(BRADFORD, D60, D50);
        let back = adapt_matrix(BRADFORD, D50, D60);
        assert!((back * there).max_abs_diff(&Mat3::IDENTITY) < 1e-5);
    }

    #[test]
    fn test_xy_to_xyz() {
        let w = xy_to_xyz(0.3127, 0.3290);
        assert!((w.x - D65.x).abs() < 1e-3);
        assert!((w.z - D65.z).abs() < 1e-3);
    }
}
