//! Per-channel 1D lookup tables.

use crate::{LutError, LutResult};

/// A 1D LUT over the normalized domain `[0, 1]`.
///
/// Holds one curve shared by all channels or one curve per channel.
/// Inputs are clamped to the domain and linearly interpolated.
#[derive(Debug, Clone, PartialEq)]
pub struct Lut1D {
    curves: Vec<Vec<f32>>,
}

impl Lut1D {
    /// Identity LUT with `size` entries.
    pub fn identity(size: usize) -> Self {
        let last = size.saturating_sub(1).max(1) as f32;
        Self {
            curves: vec![(0..size.max(2)).map(|i| i as f32 / last).collect()],
        }
    }

    /// Builds a LUT from interleaved entries with `channels` values each
    /// (1 or 3).
    ///
    /// # Errors
    ///
    /// [`LutError::InvalidSize`] for fewer than two entries, a channel
    /// count other than 1 or 3, or a length not divisible by it.
    pub fn from_interleaved(values: &[f32], channels: usize) -> LutResult<Self> {
        if channels != 1 && channels != 3 {
            return Err(LutError::InvalidSize(format!("{} channels", channels)));
        }
        if values.len() % channels != 0 || values.len() / channels < 2 {
            return Err(LutError::InvalidSize(format!(
                "{} values for {} channels",
                values.len(),
                channels
            )));
        }
        let curves = (0..channels)
            .map(|c| values.iter().skip(c).step_by(channels).copied().collect())
            .collect();
        Ok(Self { curves })
    }

    /// Entries per curve.
    pub fn size(&self) -> usize {
        self.curves[0].len()
    }

    /// Evaluates channel `c` at `v`.
    #[inline]
    pub fn eval(&self, c: usize, v: f32) -> f32 {
        let curve = &self.curves[c.min(self.curves.len() - 1)];
        let last = curve.len() - 1;
        let x = v.clamp(0.0, 1.0) * last as f32;
        let i = (x as usize).min(last - 1);
        let t = x - i as f32;
        curve[i] + (curve[i + 1] - curve[i]) * t
    }

    /// Applies to an RGB triple in place.
    pub fn apply(&self, rgb: &mut [f32; 3]) {
        for (c, v) in rgb.iter_mut().enumerate() {
            *v = self.eval(c, *v);
        }
    }

    /// Multiplies every entry by `k`.
    pub(crate) fn scale_values(&mut self, k: f32) {
        for v in self.curves.iter_mut().flatten() {
            *v *= k;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_identity() {
        let lut = Lut1D::identity(17);
        let mut rgb = [0.3, 0.55, 1.2];
        lut.apply(&mut rgb);
        assert_abs_diff_eq!(rgb[0], 0.3, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb[1], 0.55, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb[2], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_per_channel() {
        let lut = Lut1D::from_interleaved(&[0.0, 0.0, 1.0, 1.0, 0.5, 0.0], 3).unwrap();
        let mut rgb = [0.5, 0.5, 0.5];
        lut.apply(&mut rgb);
        assert_abs_diff_eq!(rgb[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb[1], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(rgb[2], 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid() {
        assert!(Lut1D::from_interleaved(&[0.0], 1).is_err());
        assert!(Lut1D::from_interleaved(&[0.0; 7], 3).is_err());
        assert!(Lut1D::from_interleaved(&[0.0; 4], 2).is_err());
    }
}
