//! Error types for capability operations.

use thiserror::Error;

/// Errors that can occur inside a capability or the registry.
///
/// These never cross the invoker boundary: the invoker translates every
/// variant into a structured error payload on the invocation result.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Capability not found in the registry.
    #[error("capability not found: {0}")]
    NotFound(String),

    /// Missing required input field.
    #[error("missing required input field: {0}")]
    MissingInput(String),

    /// Input field present but of the wrong shape.
    #[error("invalid input field '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    /// HTTP request to a remote capability failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON handling failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General execution failure inside a capability.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}
