//! The InferenceClient trait definition.

use async_trait::async_trait;

use crate::chat::{ChatRequest, ChatResponse};
use crate::error::InferenceError;

/// A stateless client for one inference endpoint.
///
/// Implementations range from scripted test doubles to the production HTTP
/// client. This trait is object-safe; the pipeline holds
/// `Arc<dyn InferenceClient>`.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Issue one completion request and return the parsed response.
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError>;

    /// Get a human-readable name for this client implementation.
    fn name(&self) -> &str;
}
