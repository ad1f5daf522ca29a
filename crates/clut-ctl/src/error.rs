//! Script error types.

use thiserror::Error;

/// Result type for script operations.
pub type CtlResult<T> = Result<T, CtlError>;

/// Errors from loading, validating or running a script.
#[derive(Debug, Error)]
pub enum CtlError {
    /// Malformed token.
    #[error("line {line}: {msg}")]
    Lex {
        /// 1-based source line
        line: usize,
        /// Description
        msg: String,
    },

    /// Syntax error.
    #[error("line {line}: syntax error: {msg}")]
    Parse {
        /// 1-based source line
        line: usize,
        /// Description
        msg: String,
    },

    /// Error raised while evaluating.
    #[error("line {line}: runtime error: {msg}")]
    Runtime {
        /// 1-based source line
        line: usize,
        /// Description
        msg: String,
    },

    /// Missing function or unusable signature.
    #[error("{0}")]
    Signature(String),

    /// Invalid `@ART-param` annotation or parameter declaration.
    #[error("parameter error: {0}")]
    Param(String),

    /// Reading the script failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CtlError {
    /// Source line the error refers to, if any.
    pub fn line(&self) -> Option<usize> {
        match self {
            CtlError::Lex { line, .. } | CtlError::Parse { line, .. } | CtlError::Runtime { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }

    pub(crate) fn runtime(line: usize, msg: impl Into<String>) -> Self {
        CtlError::Runtime { line, msg: msg.into() }
    }
}
