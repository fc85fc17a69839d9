//! Capability registry.

use std::collections::HashMap;
use std::sync::Arc;

use assistant_core::ToolDefinition;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ToolError;
use crate::tool::{InvocationContext, Tool, ToolArgs, ToolOutput};

/// Registry of named capabilities.
///
/// The registry dispatches execution requests by name and produces the
/// tool declarations a specialist advertises to the inference endpoint.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a capability.
    ///
    /// If a capability with the same name already exists, it is replaced.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        info!("registering capability: {}", name);
        self.tools.insert(name, Arc::new(tool));
    }

    /// Register a shared capability.
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        info!("registering capability: {}", name);
        self.tools.insert(name, tool);
    }

    /// Names of all registered capabilities.
    pub fn list(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get a capability by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    /// Check whether a capability is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Build inference-endpoint tool declarations for a subset of names.
    ///
    /// Unknown names are skipped with a warning so a stale specialist
    /// config degrades rather than failing the turn.
    pub fn definitions_for(&self, names: &[String]) -> Vec<ToolDefinition> {
        let mut definitions = Vec::with_capacity(names.len());
        for name in names {
            match self.tools.get(name) {
                Some(tool) => definitions.push(ToolDefinition {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    input_schema: tool.input_schema(),
                }),
                None => warn!("specialist references unknown capability: {}", name),
            }
        }
        definitions
    }

    /// Execute a capability by name.
    pub async fn execute(
        &self,
        name: &str,
        input: Value,
        context: InvocationContext,
    ) -> Result<ToolOutput, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        debug!(capability = name, "executing capability");

        let result = tool.execute(ToolArgs::new(input, context)).await?;

        debug!(
            capability = name,
            success = result.success,
            "capability complete"
        );

        Ok(result)
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
