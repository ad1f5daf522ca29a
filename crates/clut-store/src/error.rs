//! Store error types.

use std::path::PathBuf;

use clut_ctl::CtlError;
use clut_lut::LutError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised while loading cached resources or settings.
///
/// These stay inside the crate's public lookups, which log them and return
/// `None`; they surface directly only from [`crate::StoreSettings`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// File not found or not a regular file.
    #[error("not a file: {0}")]
    NotFound(PathBuf),

    /// Script source is not UTF-8.
    #[error("{0}: invalid UTF-8 in script source")]
    Encoding(PathBuf),

    /// Hald or CLF loading failed.
    #[error(transparent)]
    Lut(#[from] LutError),

    /// Script parsing, signature or annotation error.
    #[error(transparent)]
    Script(#[from] CtlError),

    /// YAML settings error.
    #[error("settings parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
