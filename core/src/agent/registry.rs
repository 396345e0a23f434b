use crate::agent::prompt::Language;
use crate::error::ToolError;
use crate::tools::{CalculatorTool, SearchTool, TimeTool};
use crate::traits::{Tool, ToolSpec};
use std::sync::Arc;
use tracing::{debug, warn};

/// Tools available to an agent, kept in registration order.
///
/// Built once and then shared read-only, so lookups need no locking.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry holding `search`, `calculator` and `get_time`, worded in `language`.
    pub fn with_builtin_tools(language: Language) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchTool::new(language)));
        registry.register(Box::new(CalculatorTool::new(language)));
        registry.register(Box::new(TimeTool::new(language)));
        registry
    }

    /// Inserts `tool` under its name. A tool with the same name is replaced
    /// in place and keeps its listing position.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let tool: Arc<dyn Tool> = Arc::from(tool);

        match self.position(tool.name()) {
            Some(idx) => {
                warn!(tool = tool.name(), "Replacing previously registered tool");
                self.tools[idx] = tool;
            }
            None => self.tools.push(tool),
        }
    }

    /// Like [`register`](Self::register) but refuses to replace an existing tool.
    pub fn try_register(&mut self, tool: Box<dyn Tool>) -> Result<(), ToolError> {
        if self.contains(tool.name()) {
            return Err(ToolError::DuplicateName {
                name: tool.name().to_string(),
            });
        }
        self.tools.push(Arc::from(tool));
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, ToolError> {
        self.position(name)
            .map(|idx| self.tools[idx].clone())
            .ok_or_else(|| ToolError::NotFound {
                name: name.to_string(),
            })
    }

    pub fn list(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get_specs(&self) -> Vec<ToolSpec> {
        self.tools.iter().map(|t| t.spec()).collect()
    }

    /// One `name: description` line per tool, for prompt text.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| t.spec().prompt_line())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Resolves `name` and runs it. No retries.
    pub async fn execute(&self, name: &str, args: serde_json::Value) -> Result<String, ToolError> {
        let tool = self.resolve(name)?;
        debug!(tool = name, %args, "Executing tool");

        match tool.execute(args).await {
            Ok(result) => result.into_observation(name),
            Err(e) => Err(ToolError::Execution {
                name: name.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.tools.iter().position(|t| t.name() == name)
    }
}
