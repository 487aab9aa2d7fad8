use thiserror::Error;

use crate::{sink::SinkError, source::SourceError};

/// Main application error type for hbasemon.
#[derive(Debug, Error)]
pub enum HbasemonError {
    /// Capture handle errors (device open, filter compile, read failure)
    #[error("capture source error: {0}")]
    Source(#[from] SourceError),

    /// Sink write failures, surfaced without retry
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// Command-line surface errors
    #[error("invalid arguments: {0}")]
    Args(String),
}

/// Type alias for Result with HbasemonError
pub type Result<T> = std::result::Result<T, HbasemonError>;
