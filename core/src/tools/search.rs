use crate::agent::prompt::Language;
use crate::tools::extract_string_arg;
use crate::traits::{Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;

/// Simulated web search. Returns a canned summary for the query.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchTool {
    language: Language,
}

impl SearchTool {
    pub fn new(language: Language) -> Self {
        Self { language }
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        match self.language {
            Language::Chinese => "搜索网络信息，输入搜索关键词",
            Language::English => "Search the web for information; input is a search query",
        }
    }

    fn parameters_schema(&self) -> serde_json::Value {
        let query = match self.language {
            Language::Chinese => "搜索关键词",
            Language::English => "Search keywords",
        };
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": query
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let query = extract_string_arg(&args, "query")?;
        let summary = match self.language {
            Language::Chinese => format!("搜索结果：{} 的相关信息...", query),
            Language::English => format!("Search results: information related to {}...", query),
        };
        Ok(ToolResult::success(summary))
    }
}
