//! Cubic RGB lattice with trilinear sampling.
//!
//! A [`Lattice`] stores `N^3` RGB nodes as `[R, G, B, 0]` quads, red varying
//! fastest:
//!
//! ```text
//! quad(r, g, b) = r + g * N + b * N^2
//! ```
//!
//! followed by one zeroed guard quad. Input coordinates live on
//! `[0, domain_max]`; `domain_max` is 65535 for Hald images (16-bit scale)
//! and 1.0 for lattices baked from scripts or read from CLF files.
//!
//! # Sampling
//!
//! Each channel value is scaled to lattice units (`v * (N-1) / domain_max`),
//! split into an integer node index clamped to `N - 2` and a fraction, then
//! the eight surrounding nodes are blended along red, green and blue in that
//! order. Clamping the index to `N - 2` keeps the `+1` neighbour in range, so
//! the top edge is reached with a fraction of exactly 1.
//!
//! [`Lattice::get_rgb`] runs the blend on whole quads with `wide::f32x4`;
//! [`Lattice::get_rgb_scalar`] is the per-channel reference. They agree to
//! rounding.

use crate::{LutError, LutResult};
use clut_math::intp;
use clut_math::simd::{intp_x4, load_quad};
use wide::f32x4;

/// Smallest lattice side.
pub const MIN_SIDE: usize = 2;

/// Cubic RGB lattice, immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice {
    side: usize,
    domain_max: f32,
    scale: f32,
    clamp: f32,
    data: Vec<f32>,
}

impl Lattice {
    /// Builds a lattice by evaluating `f(r, g, b)` at every node index.
    ///
    /// # Errors
    ///
    /// [`LutError::InvalidSize`] when `side < 2` or `domain_max` is not a
    /// positive finite number.
    pub fn from_fn<F>(side: usize, domain_max: f32, mut f: F) -> LutResult<Self>
    where
        F: FnMut(usize, usize, usize) -> [f32; 3],
    {
        check_geometry(side, domain_max)?;
        let mut data = Vec::with_capacity((side * side * side + 1) * 4);
        for b in 0..side {
            for g in 0..side {
                for r in 0..side {
                    let [x, y, z] = f(r, g, b);
                    data.extend_from_slice(&[x, y, z, 0.0]);
                }
            }
        }
        data.extend_from_slice(&[0.0; 4]);
        Ok(Self::with_data(side, domain_max, data))
    }

    /// Builds a lattice from nodes already in red-fastest order.
    ///
    /// # Errors
    ///
    /// [`LutError::InvalidSize`] when the node count is not `side^3`.
    pub fn from_nodes<I>(side: usize, domain_max: f32, nodes: I) -> LutResult<Self>
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        check_geometry(side, domain_max)?;
        let expected = side * side * side;
        let mut data = Vec::with_capacity((expected + 1) * 4);
        for [x, y, z] in nodes {
            data.extend_from_slice(&[x, y, z, 0.0]);
        }
        if data.len() != expected * 4 {
            return Err(LutError::InvalidSize(format!(
                "expected {} nodes for side {}, got {}",
                expected,
                side,
                data.len() / 4
            )));
        }
        data.extend_from_slice(&[0.0; 4]);
        Ok(Self::with_data(side, domain_max, data))
    }

    /// Identity lattice: node `(r, g, b)` holds its own coordinates.
    ///
    /// ```rust
    /// use clut_lut::Lattice;
    ///
    /// let lat = Lattice::identity(17, 1.0).unwrap();
    /// let out = lat.sample([0.25, 0.5, 0.75]);
    /// assert!((out[2] - 0.75).abs() < 1e-6);
    /// ```
    pub fn identity(side: usize, domain_max: f32) -> LutResult<Self> {
        let step = domain_max / side.saturating_sub(1).max(1) as f32;
        Self::from_fn(side, domain_max, |r, g, b| {
            [r as f32 * step, g as f32 * step, b as f32 * step]
        })
    }

    fn with_data(side: usize, domain_max: f32, data: Vec<f32>) -> Self {
        Self {
            side,
            domain_max,
            scale: (side - 1) as f32 / domain_max,
            clamp: (side - 2) as f32,
            data,
        }
    }

    /// Nodes per axis.
    #[inline]
    pub fn side(&self) -> usize {
        self.side
    }

    /// Largest input coordinate.
    #[inline]
    pub fn domain_max(&self) -> f32 {
        self.domain_max
    }

    /// Input to lattice-unit scale, `(N - 1) / domain_max`.
    #[inline]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Raw quad buffer including the guard quad.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Stored value of node `(r, g, b)`.
    ///
    /// # Panics
    ///
    /// Panics if an index is `>= side`.
    pub fn node(&self, r: usize, g: usize, b: usize) -> [f32; 3] {
        assert!(r < self.side && g < self.side && b < self.side);
        let q = (r + g * self.side + b * self.side * self.side) * 4;
        [self.data[q], self.data[q + 1], self.data[q + 2]]
    }

    /// Input coordinate of node index `i` on any axis.
    #[inline]
    pub fn node_coord(&self, i: usize) -> f32 {
        i as f32 / self.scale
    }

    /// Samples a single color (no strength blend).
    pub fn sample(&self, rgb: [f32; 3]) -> [f32; 3] {
        self.interpolate(rgb)
    }

    /// Samples `r.len()` pixels with the SIMD kernel.
    ///
    /// Writes `[R, G, B, 0]` per pixel into `out_rgbx`, blended with the
    /// input by `strength` (`1` replaces, `0` passes through). The batch
    /// length is the shortest of the inputs and `out_rgbx.len() / 4`.
    pub fn get_rgb(&self, strength: f32, r: &[f32], g: &[f32], b: &[f32], out_rgbx: &mut [f32]) {
        let n = batch_len(r, g, b, out_rgbx);
        let side = self.side;
        let plane = side * side;
        let s = f32x4::splat(strength);
        let d = &self.data;

        for i in 0..n {
            let (ri, rf) = self.locate(r[i]);
            let (gi, gf) = self.locate(g[i]);
            let (bi, bf) = self.locate(b[i]);
            let base = ri + gi * side + bi * plane;
            let rf = f32x4::splat(rf);
            let gf = f32x4::splat(gf);

            let t1 = intp_x4(rf, load_quad(d, base + 1), load_quad(d, base));
            let t2 = intp_x4(rf, load_quad(d, base + side + 1), load_quad(d, base + side));
            let lo = intp_x4(gf, t2, t1);

            let c = base + plane;
            let t1 = intp_x4(rf, load_quad(d, c + 1), load_quad(d, c));
            let t2 = intp_x4(rf, load_quad(d, c + side + 1), load_quad(d, c + side));
            let hi = intp_x4(gf, t2, t1);

            let out = intp_x4(f32x4::splat(bf), hi, lo);
            let input = f32x4::from([r[i], g[i], b[i], 0.0]);
            let blended = intp_x4(s, out, input).to_array();
            out_rgbx[i * 4..i * 4 + 4].copy_from_slice(&blended);
        }
    }

    /// Scalar reference for [`get_rgb`](Self::get_rgb).
    pub fn get_rgb_scalar(
        &self,
        strength: f32,
        r: &[f32],
        g: &[f32],
        b: &[f32],
        out_rgbx: &mut [f32],
    ) {
        let n = batch_len(r, g, b, out_rgbx);
        for i in 0..n {
            let px = self.interpolate([r[i], g[i], b[i]]);
            let o = &mut out_rgbx[i * 4..i * 4 + 4];
            o[0] = intp(strength, px[0], r[i]);
            o[1] = intp(strength, px[1], g[i]);
            o[2] = intp(strength, px[2], b[i]);
            o[3] = 0.0;
        }
    }

    #[inline]
    fn locate(&self, v: f32) -> (usize, f32) {
        let x = (v * self.scale).clamp(0.0, self.clamp + 1.0);
        let i = x.min(self.clamp) as usize;
        (i, x - i as f32)
    }

    fn interpolate(&self, rgb: [f32; 3]) -> [f32; 3] {
        let (ri, rf) = self.locate(rgb[0]);
        let (gi, gf) = self.locate(rgb[1]);
        let (bi, bf) = self.locate(rgb[2]);
        let side = self.side;
        let plane = side * side;
        let base = ri + gi * side + bi * plane;
        let at = |q: usize, c: usize| self.data[q * 4 + c];

        let mut out = [0.0; 3];
        for (c, o) in out.iter_mut().enumerate() {
            let t1 = intp(rf, at(base + 1, c), at(base, c));
            let t2 = intp(rf, at(base + side + 1, c), at(base + side, c));
            let lo = intp(gf, t2, t1);
            let t1 = intp(rf, at(base + plane + 1, c), at(base + plane, c));
            let t2 = intp(rf, at(base + plane + side + 1, c), at(base + plane + side, c));
            let hi = intp(gf, t2, t1);
            *o = intp(bf, hi, lo);
        }
        out
    }
}

fn check_geometry(side: usize, domain_max: f32) -> LutResult<()> {
    if side < MIN_SIDE {
        return Err(LutError::InvalidSize(format!("lattice side {} < {}", side, MIN_SIDE)));
    }
    if !(domain_max.is_finite() && domain_max > 0.0) {
        return Err(LutError::InvalidSize(format!("domain max {}", domain_max)));
    }
    Ok(())
}

#[inline]
fn batch_len(r: &[f32], g: &[f32], b: &[f32], out_rgbx: &[f32]) -> usize {
    r.len().min(g.len()).min(b.len()).min(out_rgbx.len() / 4)
}
