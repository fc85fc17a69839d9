//! Delayed inference client - wraps another client with artificial latency.

use std::time::Duration;

use assistant_core::{async_trait, ChatRequest, ChatResponse, InferenceClient, InferenceError};
use tokio::time::sleep;

/// An inference client that delays before delegating to the inner client.
///
/// Useful for testing orchestration deadlines and streaming behavior
/// under slow inference.
pub struct DelayedInference<C: InferenceClient> {
    inner: C,
    delay: Duration,
}

impl<C: InferenceClient> DelayedInference<C> {
    /// Wrap `inner` with the given delay.
    pub fn new(inner: C, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// Wrap with a delay in milliseconds.
    pub fn with_millis(inner: C, millis: u64) -> Self {
        Self::new(inner, Duration::from_millis(millis))
    }

    /// Wrap with a delay in seconds.
    pub fn with_secs(inner: C, secs: u64) -> Self {
        Self::new(inner, Duration::from_secs(secs))
    }
}

#[async_trait]
impl<C: InferenceClient> InferenceClient for DelayedInference<C> {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        sleep(self.delay).await;
        self.inner.complete(request).await
    }

    fn name(&self) -> &str {
        "DelayedInference"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScriptedInference;
    use assistant_core::ChatMessage;
    use std::time::Instant;

    #[tokio::test]
    async fn test_delays_before_answering() {
        let client = DelayedInference::with_millis(ScriptedInference::single_text("hi"), 50);
        let request = ChatRequest {
            model: "torque-large".to_string(),
            max_tokens: 16,
            system: None,
            messages: vec![ChatMessage::user("hello")],
            tools: Vec::new(),
        };

        let start = Instant::now();
        let response = client.complete(request).await.unwrap();

        assert_eq!(response.text(), "hi");
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_client_name() {
        let client = DelayedInference::with_millis(ScriptedInference::single_text("hi"), 0);
        assert_eq!(client.name(), "DelayedInference");
    }
}
