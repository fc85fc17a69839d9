//! Scripted inference client - pops pre-queued responses in order.

use std::sync::Mutex;

use assistant_core::{
    async_trait, ChatRequest, ChatResponse, ContentBlock, InferenceClient, InferenceError,
    StopReason, TokenUsage,
};

/// An inference client that replays a fixed script of responses.
///
/// Responses are returned in queue order; every received request is
/// recorded for later assertions. Running past the end of the script
/// returns a `Network` error, which surfaces test bugs as failures
/// rather than hangs.
pub struct ScriptedInference {
    responses: Mutex<Vec<ChatResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedInference {
    /// Create a client that replays `responses` in order.
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        let mut queue = responses;
        queue.reverse();
        Self {
            responses: Mutex::new(queue),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a client scripted with a single plain-text reply.
    pub fn single_text(text: impl Into<String>) -> Self {
        Self::new(vec![text_response(text)])
    }

    /// All requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Build a terminal text response with token usage.
pub fn text_response(text: impl Into<String>) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage::new(100, 50),
    }
}

/// Build a response that requests one tool invocation.
pub fn tool_use_response(
    id: impl Into<String>,
    name: impl Into<String>,
    input: serde_json::Value,
) -> ChatResponse {
    ChatResponse {
        content: vec![ContentBlock::tool_use(id, name, input)],
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage::new(100, 30),
    }
}

#[async_trait]
impl InferenceClient for ScriptedInference {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, InferenceError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        self.responses
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop()
            .ok_or_else(|| InferenceError::Network("script exhausted".to_string()))
    }

    fn name(&self) -> &str {
        "ScriptedInference"
    }
}
