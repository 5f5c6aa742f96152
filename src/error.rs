//! Error types for block-wise processing.

use thiserror::Error;

/// Result type for block-wise operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds raised at component boundaries.
///
/// None of these are recovered from inside the crate: a job either writes a
/// complete artifact or returns one of these.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad shapes, out-of-bounds ROI or unknown strategy keys.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An expected per-block artifact is absent from storage.
    #[error("missing data for block {block_id}: {reason}")]
    MissingBlockData { block_id: u64, reason: String },

    /// Mismatched array shapes or label ranges between related arrays.
    #[error("inconsistent shape: {0}")]
    InconsistentShape(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn missing(block_id: u64, reason: impl Into<String>) -> Self {
        Error::MissingBlockData {
            block_id,
            reason: reason.into(),
        }
    }
}
