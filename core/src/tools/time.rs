use crate::agent::prompt::Language;
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;

#[derive(Debug, Default, Clone, Copy)]
pub struct TimeTool {
    language: Language,
}

impl TimeTool {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

#[async_trait]
impl Tool for TimeTool {
    fn name(&self) -> &str {
        "get_time"
    }

    fn description(&self) -> &str {
        match self.language {
            Language::Chinese => "获取当前时间信息",
            Language::English => "Get the current date and time",
        }
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let now = chrono::Local::now();
        let output = match self.language {
            Language::Chinese => format!("当前时间：{}", now.format("%Y/%m/%d %H:%M:%S")),
            Language::English => format!("Current time: {}", now.format("%Y-%m-%d %H:%M:%S (%A)")),
        };
        Ok(ToolResult::success(output))
    }
}
