//! Error types for raster I/O.

use std::io;
use thiserror::Error;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Extension not handled by any compiled-in decoder.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// Encoding error.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// Pixel layout the decoders do not convert.
    #[error("unsupported pixel layout: {0}")]
    UnsupportedLayout(String),

    /// Hald level outside the supported range.
    #[error("invalid Hald level {0}")]
    InvalidLevel(u32),
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
