//! Error types for clut-core operations.
//!
//! Covers buffer construction and pixel addressing. Decoding, parsing and
//! evaluation errors live in the crates that produce them (`IoError`,
//! `LutError`, `CtlError`, `StoreError`).
//!
//! # Usage
//!
//! ```rust
//! use clut_core::{Error, PlanarImage};
//!
//! let err = PlanarImage::from_planes(2, 2, vec![0.0; 3], vec![0.0; 4], vec![0.0; 4]);
//! assert!(matches!(err, Err(Error::BufferSize { .. })));
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by image buffer operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel coordinates are outside image bounds.
    #[error("pixel ({x}, {y}) out of bounds for image {width}x{height}")]
    OutOfBounds {
        /// X coordinate that was out of bounds
        x: usize,
        /// Y coordinate that was out of bounds
        y: usize,
        /// Image width
        width: usize,
        /// Image height
        height: usize,
    },

    /// A plane or interleaved buffer does not hold `width * height` samples.
    #[error("buffer holds {got} samples, expected {expected}")]
    BufferSize {
        /// Samples required by the image geometry
        expected: usize,
        /// Samples actually supplied
        got: usize,
    },

    /// Invalid image dimensions.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
        /// Reason why dimensions are invalid
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = Error::OutOfBounds { x: 100, y: 50, width: 80, height: 60 };
        assert!(err.to_string().contains("100"));
        assert!(err.to_string().contains("80x60"));

        let err = Error::BufferSize { expected: 12, got: 9 };
        assert_eq!(err.to_string(), "buffer holds 9 samples, expected 12");
    }
}
