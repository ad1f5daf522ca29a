//! LUT error types.

use clut_io::IoError;
use thiserror::Error;

/// Result type for LUT operations.
pub type LutResult<T> = Result<T, LutError>;

/// Errors that can occur while building or loading lookup tables.
#[derive(Debug, Error)]
pub enum LutError {
    /// Invalid lattice or table size.
    #[error("invalid LUT size: {0}")]
    InvalidSize(String),

    /// Raster is not a Hald image.
    #[error("not a Hald image: {width}x{height}")]
    InvalidHald {
        /// Raster width
        width: u32,
        /// Raster height
        height: u32,
    },

    /// Parse error when loading LUT files.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Operation present in the file but not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Raster decoding failed.
    #[error(transparent)]
    Image(#[from] IoError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
