//! Error types for inference operations.

use thiserror::Error;

/// Errors that can occur when talking to an inference endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// Client-side configuration problem (missing key, bad URL).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network-level failure before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint returned a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The circuit breaker is open; no request was attempted.
    #[error("inference temporarily degraded: {0}")]
    Unavailable(String),
}

impl InferenceError {
    /// Whether this failure should count against the circuit breaker.
    ///
    /// Request-shape rejections (4xx other than 429) indicate a bug in the
    /// caller, not a provider outage, and must not trip the breaker.
    pub fn counts_as_outage(&self) -> bool {
        match self {
            Self::Network(_) | Self::Parse(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Configuration(_) | Self::Unavailable(_) => false,
        }
    }
}
