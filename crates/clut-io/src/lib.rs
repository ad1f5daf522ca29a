//! # clut-io
//!
//! Raster decoding for Hald CLUT images.
//!
//! Only what Hald loading needs is here: square RGB rasters decoded into
//! float samples on the 16-bit scale (`0.0..=65535.0`), regardless of the
//! file's own bit depth. A writer for 16-bit PNGs generates identity Hald
//! images for tests and for the `clut hald` command.
//!
//! # Supported Layouts
//!
//! | Format | Depths | Channels |
//! |--------|--------|----------|
//! | PNG | 8, 16 | Gray, Gray+Alpha, RGB, RGBA |
//! | TIFF | 8, 16, 32 float | Gray, RGB, RGBA |
//!
//! Alpha is carried through in [`ImageData::channels`]; consumers read the
//! first three channels.
//!
//! # Example
//!
//! ```rust,no_run
//! let img = clut_io::read("film_look.png")?;
//! assert_eq!(img.width, img.height);
//! # Ok::<(), clut_io::IoError>(())
//! ```
//!
//! # Dependencies
//!
//! - [`png`] - PNG codec (feature `png`)
//! - [`tiff`] - TIFF codec (feature `tiff`)
//! - [`thiserror`] - Error derive
//! - [`tracing`] - Decode logging
//!
//! # Used By
//!
//! - `clut-lut` - [`HaldClut`](../clut_lut/struct.HaldClut.html) loading
//! - `clut-cli` - input images and identity Hald output

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod hald;

#[cfg(feature = "png")]
pub mod png;
#[cfg(feature = "tiff")]
pub mod tiff;

pub use error::{IoError, IoResult};

use std::path::Path;

/// Largest sample value after decoding.
pub const SAMPLE_MAX: f32 = 65535.0;

/// A decoded raster, interleaved, on the 16-bit float scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Interleaved channels per pixel (1 to 4).
    pub channels: usize,
    /// `width * height * channels` samples in `0.0..=65535.0`.
    pub data: Vec<f32>,
}

impl ImageData {
    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// RGB of pixel `index`; gray is replicated.
    pub fn rgb(&self, index: usize) -> [f32; 3] {
        let px = &self.data[index * self.channels..];
        if self.channels >= 3 {
            [px[0], px[1], px[2]]
        } else {
            [px[0]; 3]
        }
    }
}

/// Decodes a raster file, choosing the codec by extension.
///
/// # Errors
///
/// [`IoError::UnsupportedFormat`] for an unknown extension or a codec
/// disabled at build time; decoder errors otherwise.
pub fn read<P: AsRef<Path>>(path: P) -> IoResult<ImageData> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    tracing::trace!(path = %path.display(), "decoding raster");

    match ext.as_str() {
        #[cfg(feature = "png")]
        "png" => png::read(path),
        #[cfg(feature = "tiff")]
        "tif" | "tiff" => tiff::read(path),
        _ => Err(IoError::UnsupportedFormat(ext)),
    }
}

/// Scales unsigned integer samples of `bits` depth onto `0.0..=65535.0`.
pub(crate) fn scale_samples<T: Copy + Into<f32>>(samples: &[T], bits: u32) -> Vec<f32> {
    let max = ((1u32 << bits) - 1) as f32;
    samples
        .iter()
        .map(|&v| v.into() * SAMPLE_MAX / max)
        .collect()
}
