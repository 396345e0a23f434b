use thiserror::Error;

/// Failures raised by the tool registry.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool '{name}' not found")]
    NotFound { name: String },

    #[error("Tool '{name}' failed: {message}")]
    Execution { name: String, message: String },

    #[error("Tool '{name}' is already registered")]
    DuplicateName { name: String },
}

impl ToolError {
    pub fn tool_name(&self) -> &str {
        match self {
            Self::NotFound { name } | Self::Execution { name, .. } | Self::DuplicateName { name } => {
                name
            }
        }
    }
}

/// Failures that abort a single-agent run or a collaboration.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Provider error: {0}")]
    Provider(#[source] anyhow::Error),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Role '{name}' not found")]
    RoleNotFound { name: String },

    #[error("No roles configured")]
    NoRoles,

    #[error("Role '{name}' is declared more than once")]
    DuplicateRole { name: String },

    #[error("Run cancelled: event stream dropped")]
    Cancelled,
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_error_messages() {
        let err = ToolError::NotFound {
            name: "weather".into(),
        };
        assert_eq!(err.to_string(), "Tool 'weather' not found");
        assert_eq!(err.tool_name(), "weather");

        let err = ToolError::Execution {
            name: "calculator".into(),
            message: "division by zero".into(),
        };
        assert_eq!(err.to_string(), "Tool 'calculator' failed: division by zero");
    }

    #[test]
    fn tool_error_converts_into_agent_error() {
        let err: AgentError = ToolError::NotFound { name: "x".into() }.into();
        assert!(matches!(err, AgentError::Tool(ToolError::NotFound { .. })));
        assert_eq!(err.to_string(), "Tool 'x' not found");
    }
}
