//! Failing inference client - every call errors.

use std::sync::atomic::{AtomicUsize, Ordering};

use assistant_core::{async_trait, ChatRequest, ChatResponse, InferenceClient, InferenceError};

/// What kind of failure a [`FailingInference`] produces.
#[derive(Debug, Clone, Copy)]
pub enum FailureKind {
    Network,
    Overloaded,
    Unavailable,
}

/// An inference client that always fails.
///
/// Useful for exercising the soft-failure paths: classifier fallback,
/// recovery escalation, and circuit-breaker behavior.
pub struct FailingInference {
    kind: FailureKind,
    calls: AtomicUsize,
}

impl FailingInference {
    /// Create a client that fails with network errors.
    pub fn new() -> Self {
        Self::with_kind(FailureKind::Network)
    }

    /// Create a client that fails with the given kind.
    pub fn with_kind(kind: FailureKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn error(&self) -> InferenceError {
        match self.kind {
            FailureKind::Network => InferenceError::Network("connection reset".to_string()),
            FailureKind::Overloaded => InferenceError::Api {
                status: 529,
                message: "overloaded".to_string(),
            },
            FailureKind::Unavailable => {
                InferenceError::Unavailable("breaker open".to_string())
            }
        }
    }
}

impl Default for FailingInference {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceClient for FailingInference {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error())
    }

    fn name(&self) -> &str {
        "FailingInference"
    }
}
