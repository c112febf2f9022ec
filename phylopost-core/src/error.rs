//! Structured error types for the phylopost workspace.

use thiserror::Error;

/// Unified error type for all phylopost operations.
#[derive(Debug, Error)]
pub enum PhylopostError {
    /// I/O error (file not found, permission denied, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error (malformed input data, missing columns)
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid input (bad arguments, out-of-range values)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Inputs are individually readable but inconsistent with each other
    #[error("validation error: {0}")]
    Validation(String),

    /// A statistical test cannot be evaluated on the given data
    /// (zero variance, zero effective sample size, no degrees of freedom)
    #[error("statistically degenerate input: {0}")]
    Degenerate(String),

    /// Catch-all for other errors
    #[error("{0}")]
    Other(String),
}

impl PhylopostError {
    /// Whether this error means a source could not be read.
    ///
    /// Load failures exclude a single chain from a batch; every other kind
    /// aborts the run.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, PhylopostError::Io(_) | PhylopostError::Parse(_))
    }

    /// Prefix the message with `context` (a path, a chain), keeping the kind.
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            PhylopostError::Io(e) => {
                PhylopostError::Io(std::io::Error::new(e.kind(), format!("{}: {}", context, e)))
            }
            PhylopostError::Parse(m) => PhylopostError::Parse(format!("{}: {}", context, m)),
            PhylopostError::InvalidInput(m) => {
                PhylopostError::InvalidInput(format!("{}: {}", context, m))
            }
            PhylopostError::Validation(m) => {
                PhylopostError::Validation(format!("{}: {}", context, m))
            }
            PhylopostError::Degenerate(m) => {
                PhylopostError::Degenerate(format!("{}: {}", context, m))
            }
            PhylopostError::Other(m) => PhylopostError::Other(format!("{}: {}", context, m)),
        }
    }
}

/// Convenience alias used throughout the phylopost workspace.
pub type Result<T> = std::result::Result<T, PhylopostError>;
