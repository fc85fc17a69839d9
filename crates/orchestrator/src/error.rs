//! Error types for pipeline operations.

use assistant_core::InferenceError;
use thiserror::Error;

/// Errors that can occur inside the pipeline.
///
/// These circulate between components only; the public entry point
/// resolves every one of them into prose via the recovery path.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The inference endpoint failed.
    #[error("inference error: {0}")]
    Inference(#[from] InferenceError),

    /// The orchestration-level deadline fired.
    #[error("turn deadline of {0}s exceeded")]
    DeadlineExceeded(u64),
}
