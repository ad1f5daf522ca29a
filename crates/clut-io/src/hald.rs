//! Identity Hald image generation.
//!
//! A Hald image of level `L` is a square of `L^3` pixels per side holding
//! every node of an `L^2`-per-axis RGB lattice, red varying fastest. An
//! identity Hald maps every color to itself; grading it in an editor and
//! saving the result produces a CLUT.

use crate::{IoError, IoResult};
use std::path::Path;

/// Smallest usable Hald level.
pub const MIN_LEVEL: u32 = 2;

/// Largest generated level (4096 x 4096 pixels).
pub const MAX_LEVEL: u32 = 16;

/// Image edge for a Hald level.
pub fn edge(level: u32) -> u32 {
    level * level * level
}

/// Generates identity samples for `level` as interleaved 16-bit RGB.
///
/// Returns the image edge and `edge^2 * 3` samples.
///
/// ```rust
/// let (edge, rgb) = clut_io::hald::identity(2).unwrap();
/// assert_eq!(edge, 8);
/// // first node is black, second is one lattice step of red
/// assert_eq!(&rgb[..6], &[0, 0, 0, 21845, 0, 0]);
/// ```
pub fn identity(level: u32) -> IoResult<(u32, Vec<u16>)> {
    if !(MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        return Err(IoError::InvalidLevel(level));
    }
    let side = (level * level) as usize;
    let step = 65535.0 / (side - 1) as f64;
    let node = |i: usize| (i as f64 * step).round() as u16;

    let mut rgb = Vec::with_capacity(side * side * side * 3);
    for b in 0..side {
        for g in 0..side {
            for r in 0..side {
                rgb.extend_from_slice(&[node(r), node(g), node(b)]);
            }
        }
    }
    Ok((edge(level), rgb))
}

/// Writes an identity Hald of `level` as a 16-bit PNG.
#[cfg(feature = "png")]
pub fn write_identity_png<P: AsRef<Path>>(path: P, level: u32) -> IoResult<()> {
    let (edge, rgb) = identity(level)?;
    tracing::debug!(level, edge, path = %path.as_ref().display(), "writing identity Hald");
    crate::png::write_rgb16(path, edge, edge, &rgb)
}

/// Writes an identity Hald of `level` as a 16-bit TIFF.
#[cfg(feature = "tiff")]
pub fn write_identity_tiff<P: AsRef<Path>>(path: P, level: u32) -> IoResult<()> {
    let (edge, rgb) = identity(level)?;
    crate::tiff::write_rgb16(path, edge, edge, &rgb)
}
