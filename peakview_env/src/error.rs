//! Error types for the PeakView environment layer.

use peakview_core::IngestError;
use thiserror::Error;

/// Errors that can occur while loading trajectories.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Reading the payload failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The payload could not be turned into trajectories
    #[error("Payload error: {0}")]
    Payload(#[from] IngestError),

    /// The source refused or could not serve the request
    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    /// Loading took longer than allowed
    #[error("Timeout after {0}ms")]
    Timeout(u64),
}

impl EnvError {
    /// Creates an unavailable-source error.
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }
}
