//! Inference endpoint request and response types.
//!
//! The endpoint is consumed as a stateless request/response contract:
//! a request carries the model, system prompt, message list, and tool
//! declarations; a response carries block-structured content, a stop
//! reason, and token usage.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single block of message or response content.
///
/// Model output interleaves text blocks with tool-use blocks; tool results
/// are fed back as blocks inside a user-role message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text produced by the model or the user.
    Text { text: String },
    /// A tool invocation requested by the model.
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// The result of a tool invocation, keyed to its request.
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Create a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Create a tool-use block.
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Create a tool-result block.
    pub fn tool_result(
        tool_use_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error,
        }
    }

    /// The text content, if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A chat message: a role plus one or more content blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl ChatMessage {
    /// Create a user message with a single text block.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant message with a single text block.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Create an assistant message from raw content blocks.
    pub fn assistant_blocks(content: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Create the user-role message that carries tool results back to the model.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::User,
            content: results,
        }
    }
}

/// Declaration of a tool the model may invoke.
///
/// `input_schema` is a JSON-schema-like description of the expected input
/// object; the pipeline treats it as opaque and forwards it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Terminal: the model is done.
    EndTurn,
    /// The model wants one or more tools invoked before continuing.
    ToolUse,
    /// Terminal: generation hit the token ceiling.
    MaxTokens,
    /// Any stop reason this crate does not know about; treated as terminal.
    #[serde(other)]
    Other,
}

/// Token usage reported by the inference endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Create a usage record.
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Accumulate another usage record into this one.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// A request to the inference endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A response from the inference endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl ChatResponse {
    /// Concatenated text from all text blocks.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for block in &self.content {
            if let Some(text) = block.as_text() {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    /// All tool-use blocks, in request order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }

    /// Whether the model stopped to request tool invocations.
    pub fn wants_tools(&self) -> bool {
        self.stop_reason == StopReason::ToolUse
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_block_serde_shape() {
        let block = ContentBlock::text("hello");
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["text"], "hello");

        let block = ContentBlock::tool_use("tu_1", "part_search", serde_json::json!({"q": "intake"}));
        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(json["type"], "tool_use");
        assert_eq!(json["name"], "part_search");
    }

    #[test]
    fn test_stop_reason_tolerates_unknown() {
        let reason: StopReason = serde_json::from_str(r#""end_turn""#).unwrap();
        assert_eq!(reason, StopReason::EndTurn);

        let reason: StopReason = serde_json::from_str(r#""pause_turn""#).unwrap();
        assert_eq!(reason, StopReason::Other);
    }

    #[test]
    fn test_response_text_concatenates_blocks() {
        let response = ChatResponse {
            content: vec![
                ContentBlock::text("First."),
                ContentBlock::tool_use("tu_1", "vehicle_specs", serde_json::json!({})),
                ContentBlock::text("Second."),
            ],
            stop_reason: StopReason::ToolUse,
            usage: TokenUsage::default(),
        };

        assert_eq!(response.text(), "First.\nSecond.");
        assert!(response.wants_tools());
        assert_eq!(response.tool_uses().len(), 1);
        assert_eq!(response.tool_uses()[0].1, "vehicle_specs");
    }

    #[test]
    fn test_usage_accumulation() {
        let mut usage = TokenUsage::new(100, 20);
        usage.add(TokenUsage::new(50, 30));
        assert_eq!(usage.input_tokens, 150);
        assert_eq!(usage.output_tokens, 50);
    }

    #[test]
    fn test_request_skips_empty_tools() {
        let request = ChatRequest {
            model: "torque-large".to_string(),
            max_tokens: 1024,
            system: None,
            messages: vec![ChatMessage::user("hi")],
            tools: Vec::new(),
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("tools"));
        assert!(!json.contains("system"));
    }
}
