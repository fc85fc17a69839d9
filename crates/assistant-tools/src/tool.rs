//! Capability trait definition and argument types.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::ToolError;

/// Request-scoped metadata handed to every capability invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    /// Identifier of the turn that triggered the invocation, if known.
    pub turn_id: Option<String>,
    /// Label of the intent the active specialist is serving.
    pub intent_label: Option<String>,
}

/// Input to a capability: the model-provided JSON object plus context.
#[derive(Debug, Clone)]
pub struct ToolArgs {
    input: Map<String, Value>,
    /// Invocation metadata, available to capabilities that key behavior on it.
    pub context: InvocationContext,
}

impl ToolArgs {
    /// Create args from a JSON value. Non-object inputs become an empty map.
    pub fn new(input: Value, context: InvocationContext) -> Self {
        let input = match input {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self { input, context }
    }

    /// The raw input object.
    pub fn input(&self) -> &Map<String, Value> {
        &self.input
    }

    /// Get an optional string field.
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.input.get(key).and_then(|v| v.as_str())
    }

    /// Get a required string field.
    pub fn require_string(&self, key: &str) -> Result<&str, ToolError> {
        match self.input.get(key) {
            None => Err(ToolError::MissingInput(key.to_string())),
            Some(value) => value.as_str().ok_or_else(|| ToolError::InvalidInput {
                name: key.to_string(),
                reason: "expected string".to_string(),
            }),
        }
    }

    /// Get an optional integer field.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.input.get(key).and_then(|v| v.as_u64())
    }

    /// Get an optional boolean field with a default.
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.input
            .get(key)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }
}

/// Output from a capability execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Result payload, forwarded to the model as a tool result.
    pub content: Value,
    /// Whether the capability considers the execution successful.
    pub success: bool,
}

impl ToolOutput {
    /// Create a successful output.
    pub fn success(content: Value) -> Self {
        Self {
            content,
            success: true,
        }
    }

    /// Create a failed output with a descriptive payload.
    pub fn failure(content: Value) -> Self {
        Self {
            content,
            success: false,
        }
    }
}

/// An external capability a specialist may invoke mid-generation.
///
/// Capabilities declare their name and input shape; the pipeline treats
/// them uniformly regardless of what they do internally.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The capability's unique name (used for dispatch and tool declarations).
    fn name(&self) -> &str;

    /// Human-readable description shown to the model.
    fn description(&self) -> &str;

    /// JSON-schema-like description of the expected input object.
    fn input_schema(&self) -> Value;

    /// Execute the capability with the given input.
    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError>;
}
