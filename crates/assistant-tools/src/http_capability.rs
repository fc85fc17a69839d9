//! HTTP adapter exposing a remote capability through the Tool contract.
//!
//! Capability implementations live in other services; the pipeline only
//! owns the contract. This adapter turns a declared remote capability
//! (name + input schema + endpoint URL) into a [`Tool`]: the input object
//! is POSTed as JSON, the JSON response becomes the output payload.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::ToolError;
use crate::tool::{Tool, ToolArgs, ToolOutput};

/// A remote capability reachable over HTTP.
pub struct HttpCapability {
    name: String,
    description: String,
    input_schema: Value,
    endpoint: String,
    client: Client,
}

impl HttpCapability {
    /// Declare a remote capability.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            endpoint: endpoint.into(),
            client: Client::new(),
        }
    }

    /// The endpoint URL this capability posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Tool for HttpCapability {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> Value {
        self.input_schema.clone()
    }

    async fn execute(&self, args: ToolArgs) -> Result<ToolOutput, ToolError> {
        debug!(capability = %self.name, endpoint = %self.endpoint, "posting capability input");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&Value::Object(args.input().clone()))
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        if status.is_success() {
            Ok(ToolOutput::success(body))
        } else {
            Err(ToolError::ExecutionFailed(format!(
                "capability endpoint returned {}",
                status.as_u16()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_declared_shape() {
        let capability = HttpCapability::new(
            "part_search",
            "Search the parts catalog",
            json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
            "https://capabilities.internal/part_search",
        );

        assert_eq!(capability.name(), "part_search");
        assert_eq!(capability.input_schema()["required"][0], "query");
        assert!(capability.endpoint().ends_with("/part_search"));
    }
}
