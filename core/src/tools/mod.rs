use serde_json::Value;

pub mod calculator;
pub mod search;
pub mod time;

pub use calculator::CalculatorTool;
pub use search::SearchTool;
pub use time::TimeTool;

pub fn extract_string_arg(args: &Value, key: &str) -> anyhow::Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("Missing '{}' parameter", key))
        .map(|s| s.to_string())
}
