//! Planar float image.
//!
//! [`PlanarImage`] keeps red, green and blue in three separate `f32` planes,
//! the layout the CLUT engine works on: each backend reads a run of reds, a
//! run of greens and a run of blues for one row (or one column tile of a row)
//! at a time.
//!
//! # Parallel Rows
//!
//! [`PlanarImage::par_rows_mut`] hands out disjoint [`RowMut`] views that can
//! be processed on any rayon worker:
//!
//! ```rust
//! use clut_core::PlanarImage;
//! use rayon::prelude::*;
//!
//! let mut img = PlanarImage::filled(64, 32, [1000.0, 2000.0, 3000.0]);
//! img.par_rows_mut().for_each(|row| {
//!     for v in row.r.iter_mut() {
//!         *v *= 2.0;
//!     }
//! });
//! assert_eq!(img.pixel(5, 5), [2000.0, 2000.0, 3000.0]);
//! ```
//!
//! # Dependencies
//!
//! - [`rayon`] - Parallel row iteration

use crate::{Error, Result};
use rayon::prelude::*;

/// A float RGB image stored as three planes.
///
/// Samples are row-major inside each plane: sample `(x, y)` lives at index
/// `y * width + x` of `r`, `g` and `b`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarImage {
    width: usize,
    height: usize,
    r: Vec<f32>,
    g: Vec<f32>,
    b: Vec<f32>,
}

/// Mutable view of one image row.
#[derive(Debug)]
pub struct RowMut<'a> {
    /// Row index.
    pub y: usize,
    /// Red samples of the row.
    pub r: &'a mut [f32],
    /// Green samples of the row.
    pub g: &'a mut [f32],
    /// Blue samples of the row.
    pub b: &'a mut [f32],
}

impl RowMut<'_> {
    /// Number of pixels in the row.
    #[inline]
    pub fn len(&self) -> usize {
        self.r.len()
    }

    /// Returns true for a zero-width row.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.r.is_empty()
    }
}

impl PlanarImage {
    /// Creates a black image.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, [0.0; 3])
    }

    /// Creates an image with every pixel set to `rgb`.
    pub fn filled(width: usize, height: usize, rgb: [f32; 3]) -> Self {
        let n = width * height;
        Self {
            width,
            height,
            r: vec![rgb[0]; n],
            g: vec![rgb[1]; n],
            b: vec![rgb[2]; n],
        }
    }

    /// Creates an image from three planes.
    ///
    /// # Errors
    ///
    /// [`Error::BufferSize`] if any plane does not hold `width * height` samples.
    pub fn from_planes(
        width: usize,
        height: usize,
        r: Vec<f32>,
        g: Vec<f32>,
        b: Vec<f32>,
    ) -> Result<Self> {
        let expected = width * height;
        for plane in [&r, &g, &b] {
            if plane.len() != expected {
                return Err(Error::BufferSize { expected, got: plane.len() });
            }
        }
        Ok(Self { width, height, r, g, b })
    }

    /// Creates an image from interleaved samples with `channels` values per
    /// pixel. Channels past the third (alpha) are dropped; one channel is
    /// replicated to gray.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidDimensions`] for a channel count of zero,
    /// [`Error::BufferSize`] if `data` is too short.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        channels: usize,
        data: &[f32],
    ) -> Result<Self> {
        if channels == 0 {
            return Err(Error::InvalidDimensions {
                width,
                height,
                reason: "zero channels".into(),
            });
        }
        let expected = width * height * channels;
        if data.len() < expected {
            return Err(Error::BufferSize { expected, got: data.len() });
        }

        let mut img = Self::new(width, height);
        for (i, px) in data[..expected].chunks_exact(channels).enumerate() {
            let (r, g, b) = if channels >= 3 {
                (px[0], px[1], px[2])
            } else {
                (px[0], px[0], px[0])
            };
            img.r[i] = r;
            img.g[i] = g;
            img.b[i] = b;
        }
        Ok(img)
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// Red plane.
    #[inline]
    pub fn r(&self) -> &[f32] {
        &self.r
    }

    /// Green plane.
    #[inline]
    pub fn g(&self) -> &[f32] {
        &self.g
    }

    /// Blue plane.
    #[inline]
    pub fn b(&self) -> &[f32] {
        &self.b
    }

    /// All three planes, mutably.
    #[inline]
    pub fn planes_mut(&mut self) -> (&mut [f32], &mut [f32], &mut [f32]) {
        (&mut self.r, &mut self.g, &mut self.b)
    }

    /// Returns the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
        let i = y * self.width + x;
        [self.r[i], self.g[i], self.b[i]]
    }

    /// Returns the pixel at `(x, y)`, or `None` when out of bounds.
    pub fn get_pixel(&self, x: usize, y: usize) -> Option<[f32; 3]> {
        (x < self.width && y < self.height).then(|| self.pixel(x, y))
    }

    /// Sets the pixel at `(x, y)`.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfBounds`] when the coordinates fall outside the image.
    pub fn set_pixel(&mut self, x: usize, y: usize, rgb: [f32; 3]) -> Result<()> {
        if x >= self.width || y >= self.height {
            return Err(Error::OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        let i = y * self.width + x;
        self.r[i] = rgb[0];
        self.g[i] = rgb[1];
        self.b[i] = rgb[2];
        Ok(())
    }

    /// Mutable view of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row_mut(&mut self, y: usize) -> RowMut<'_> {
        let range = y * self.width..(y + 1) * self.width;
        RowMut {
            y,
            r: &mut self.r[range.clone()],
            g: &mut self.g[range.clone()],
            b: &mut self.b[range],
        }
    }

    /// Sequential iterator over mutable rows.
    pub fn rows_mut(&mut self) -> impl Iterator<Item = RowMut<'_>> + '_ {
        let w = self.width.max(1);
        self.r
            .chunks_mut(w)
            .zip(self.g.chunks_mut(w))
            .zip(self.b.chunks_mut(w))
            .enumerate()
            .map(|(y, ((r, g), b))| RowMut { y, r, g, b })
    }

    /// Parallel iterator over mutable rows.
    pub fn par_rows_mut(&mut self) -> impl IndexedParallelIterator<Item = RowMut<'_>> + '_ {
        let w = self.width.max(1);
        self.r
            .par_chunks_mut(w)
            .zip(self.g.par_chunks_mut(w))
            .zip(self.b.par_chunks_mut(w))
            .enumerate()
            .map(|(y, ((r, g), b))| RowMut { y, r, g, b })
    }

    /// Interleaves the planes into `[r, g, b, r, g, b, ...]`.
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.pixel_count() * 3);
        for i in 0..self.pixel_count() {
            out.extend_from_slice(&[self.r[i], self.g[i], self.b[i]]);
        }
        out
    }

    /// Largest absolute per-sample difference to another image of the same
    /// size, or `None` when the sizes differ.
    pub fn max_abs_diff(&self, other: &Self) -> Option<f32> {
        if self.dimensions() != other.dimensions() {
            return None;
        }
        let planes = [(&self.r, &other.r), (&self.g, &other.g), (&self.b, &other.b)];
        Some(
            planes
                .iter()
                .flat_map(|(a, b)| a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()))
                .fold(0.0f32, f32::max),
        )
    }
}
