//! SIMD helpers built on the `wide` crate.
//!
//! Two shapes of vectorization show up in the CLUT pipeline:
//!
//! - **Planar**: four pixels at a time, one `f32x4` per channel. Used for the
//!   working-space matrix conversion of a tile ([`Mat3x4`], [`transform_planes`]).
//! - **Packed quad**: one pixel at a time, the `[R, G, B, pad]` quad of a
//!   lattice node loaded as one `f32x4` ([`load_quad`], [`intp_x4`]).
//!
//! Both have scalar equivalents in [`crate::Mat3::apply`] and [`crate::intp`];
//! results agree to floating-point rounding.
//!
//! # Example
//!
//! ```rust
//! use clut_math::Mat3;
//! use clut_math::simd::{transform_planes, Mat3x4};
//!
//! let m = Mat3::diagonal(2.0, 3.0, 4.0);
//! let m4 = Mat3x4::splat(&m);
//! let mut r = vec![1.0; 6];
//! let mut g = vec![1.0; 6];
//! let mut b = vec![1.0; 6];
//! transform_planes(&m, &m4, &mut r, &mut g, &mut b);
//! assert_eq!((r[5], g[5], b[5]), (2.0, 3.0, 4.0));
//! ```

use crate::Mat3;
use wide::f32x4;

/// A [`Mat3`] with every element splatted across four lanes.
#[derive(Debug, Clone, Copy)]
pub struct Mat3x4 {
    m: [[f32x4; 3]; 3],
}

impl Mat3x4 {
    /// Splats a scalar matrix.
    pub fn splat(m: &Mat3) -> Self {
        let mut out = [[f32x4::ZERO; 3]; 3];
        for (i, row) in m.m.iter().enumerate() {
            for (j, v) in row.iter().enumerate() {
                out[i][j] = f32x4::splat(*v);
            }
        }
        Self { m: out }
    }

    /// Transforms four pixels given as channel vectors.
    #[inline]
    pub fn apply(&self, x: f32x4, y: f32x4, z: f32x4) -> [f32x4; 3] {
        let m = &self.m;
        [
            m[0][0] * x + m[0][1] * y + m[0][2] * z,
            m[1][0] * x + m[1][1] * y + m[1][2] * z,
            m[2][0] * x + m[2][1] * y + m[2][2] * z,
        ]
    }
}

/// Transforms planar pixels in place, four at a time, with a scalar tail.
///
/// `m4` must be `Mat3x4::splat(m)`; both are passed so callers can build the
/// splatted copy once per engine instead of once per tile.
pub fn transform_planes(m: &Mat3, m4: &Mat3x4, r: &mut [f32], g: &mut [f32], b: &mut [f32]) {
    let n = r.len().min(g.len()).min(b.len());
    let body = n - n % 4;

    for i in (0..body).step_by(4) {
        let [x, y, z] = m4.apply(load_x4(&r[i..]), load_x4(&g[i..]), load_x4(&b[i..]));
        r[i..i + 4].copy_from_slice(&x.to_array());
        g[i..i + 4].copy_from_slice(&y.to_array());
        b[i..i + 4].copy_from_slice(&z.to_array());
    }

    for i in body..n {
        let [x, y, z] = m.apply(r[i], g[i], b[i]);
        r[i] = x;
        g[i] = y;
        b[i] = z;
    }
}

/// Loads the first four values of `s`.
///
/// # Panics
///
/// Panics if `s` holds fewer than four values.
#[inline]
pub fn load_x4(s: &[f32]) -> f32x4 {
    f32x4::from([s[0], s[1], s[2], s[3]])
}

/// Loads the quad starting at `quad_index * 4`.
#[inline]
pub fn load_quad(data: &[f32], quad_index: usize) -> f32x4 {
    load_x4(&data[quad_index * 4..])
}

/// Lane-wise `a * b + (1 - a) * c`.
#[inline]
pub fn intp_x4(a: f32x4, b: f32x4, c: f32x4) -> f32x4 {
    a * b + (f32x4::ONE - a) * c
}

/// Clamps 4 values to `[lo, hi]`.
#[inline]
pub fn clamp_x4(v: f32x4, lo: f32, hi: f32) -> f32x4 {
    v.max(f32x4::splat(lo)).min(f32x4::splat(hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intp;

    #[test]
    fn test_transform_planes_matches_scalar() {
        let m = Mat3::from_rows([
            [0.4124564, 0.3575761, 0.1804375],
            [0.2126729, 0.7151522, 0.0721750],
            [0.0193339, 0.1191920, 0.9503041],
        ]);
        let m4 = Mat3x4::splat(&m);
        let src: Vec<[f32; 3]> = (0..11)
            .map(|i| [i as f32 * 100.0, 5000.0 - i as f32, (i * i) as f32])
            .collect();
        let mut r: Vec<f32> = src.iter().map(|p| p[0]).collect();
        let mut g: Vec<f32> = src.iter().map(|p| p[1]).collect();
        let mut b: Vec<f32> = src.iter().map(|p| p[2]).collect();

        transform_planes(&m, &m4, &mut r, &mut g, &mut b);

        for (i, p) in src.iter().enumerate() {
            let want = m.apply(p[0], p[1], p[2]);
            assert!((r[i] - want[0]).abs() < 1e-2);
            assert!((g[i] - want[1]).abs() < 1e-2);
            assert!((b[i] - want[2]).abs() < 1e-2);
        }
    }

    #[test]
    fn test_intp_x4() {
        let a = f32x4::from([0.0, 0.25, 0.5, 1.0]);
        let out = intp_x4(a, f32x4::splat(8.0), f32x4::splat(4.0)).to_array();
        for (k, t) in [0.0, 0.25, 0.5, 1.0].iter().enumerate() {
            assert_eq!(out[k], intp(*t, 8.0, 4.0));
        }
    }

    #[test]
    fn test_load_quad_and_clamp() {
        let data = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        assert_eq!(load_quad(&data, 1).to_array(), [4.0, 5.0, 6.0, 7.0]);
        assert_eq!(clamp_x4(load_quad(&data, 1), 4.5, 6.5).to_array(), [4.5, 5.0, 6.0, 6.5]);
    }
}
