//! Error types for the tstat transport pipeline.

use thiserror::Error;

/// Result type alias for tstat transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the tstat transport pipeline.
///
/// Malformed rows and undeliverable directional records are not errors;
/// they are logged as warnings and skipped by the row loop.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Walk errors (20-29)
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("{failed} of {visited} directories failed delivery")]
    WalkIncomplete { failed: usize, visited: usize },

    // Delivery errors (30-39)
    #[error("delivery failed: {0}")]
    Delivery(String),

    // Interruption (40-49)
    #[error("interrupted by signal")]
    Interrupted,

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    /// Used to derive the process exit status.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidPath(_) => 20,
            Error::WalkIncomplete { .. } => 21,
            Error::Delivery(_) => 30,
            Error::Interrupted => 40,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}
