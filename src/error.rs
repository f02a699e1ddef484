//! Error types for the engine

use thiserror::Error;

use crate::types::RequestKind;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    /// Request rejected at the coordinator boundary before anything was issued
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Series backend failed to produce raw data
    #[error("Backend error for series '{series}': {message}")]
    Backend {
        /// Series the backend was asked for
        series: String,
        /// Description of the failure
        message: String,
    },

}

impl Error {
    /// Create a backend error
    pub fn backend(series: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            series: series.into(),
            message: message.into(),
        }
    }
}

/// A failure delivered on the asynchronous error channel.
///
/// Validation errors surface synchronously from `load_data`; failures that
/// happen after the request boundary (a backend that cannot produce its raw
/// series) are broadcast as `LoadFailure` instead of being thrown across the
/// async boundary. The failed half of the request never completes, so no
/// partial graph data is emitted for that generation.
#[derive(Debug, Clone)]
pub struct LoadFailure {
    /// Series whose request failed
    pub series: String,
    /// Which half of the request pair failed
    pub kind: RequestKind,
    /// Sequence number of the failed request
    pub seq: u64,
    /// Description of the failure
    pub message: String,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
