use crate::error::ToolError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// What a tool hands back to the loop. Only `output` of a successful
/// result ever reaches the model as an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Observation text for a successful result, [`ToolError::Execution`] otherwise.
    pub fn into_observation(self, tool: &str) -> Result<String, ToolError> {
        if self.success {
            return Ok(self.output);
        }
        Err(ToolError::Execution {
            name: tool.to_string(),
            message: self
                .error
                .unwrap_or_else(|| "tool reported failure".to_string()),
        })
    }
}

/// Name, description and JSON-schema parameters, as declared to providers
/// that accept structured tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

impl ToolSpec {
    /// `name: description`, the form listed in ReAct prompts.
    pub fn prompt_line(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// A named capability the agent can invoke.
///
/// `execute` may report failure either by returning `Err` or by returning
/// [`ToolResult::error`]; the registry treats both as an execution failure.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn parameters_schema(&self) -> serde_json::Value;

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters_schema: self.parameters_schema(),
        }
    }
}
