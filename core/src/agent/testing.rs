//! Provider and tool doubles shared by the agent tests.

use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, Tool, ToolResult};
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Replays canned responses in order; the last one repeats forever.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ChatResponse>>,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
    declared_tools: Mutex<Vec<usize>>,
    tool_calls: bool,
    yield_first: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ChatResponse>) -> Self {
        assert!(!responses.is_empty(), "script needs at least one response");
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(vec![]),
            declared_tools: Mutex::new(vec![]),
            tool_calls: false,
            yield_first: false,
        }
    }

    pub fn texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(ChatResponse::text).collect())
    }

    pub fn with_tool_calls(mut self) -> Self {
        self.tool_calls = true;
        self
    }

    /// Yields to the scheduler before answering, like a real network call.
    pub fn yielding(mut self) -> Self {
        self.yield_first = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Content of the last message of every request, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .map(|m| m.last().map(|m| m.content.clone()).unwrap_or_default())
            .collect()
    }

    /// Number of tool specs declared on every request, in call order.
    pub fn declared_tools(&self) -> Vec<usize> {
        self.declared_tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn chat(
        &self,
        request: ChatRequest<'_>,
        _model: &str,
        _temperature: f64,
    ) -> anyhow::Result<ChatResponse> {
        if self.yield_first {
            tokio::task::yield_now().await;
        }
        self.prompts.lock().unwrap().push(request.messages.to_vec());
        self.declared_tools
            .lock()
            .unwrap()
            .push(request.tools.map_or(0, |t| t.len()));

        let mut responses = self.responses.lock().unwrap();
        let response = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        response.ok_or_else(|| anyhow::anyhow!("script exhausted"))
    }

    fn supports_tool_calls(&self) -> bool {
        self.tool_calls
    }
}

/// Answers every role prompt with `"<role name>#<call number>"`.
pub struct EchoRoleProvider {
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl EchoRoleProvider {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(vec![]),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for EchoRoleProvider {
    async fn chat(
        &self,
        request: ChatRequest<'_>,
        _model: &str,
        _temperature: f64,
    ) -> anyhow::Result<ChatResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(prompt.clone());

        let role = prompt
            .strip_prefix("You are ")
            .and_then(|rest| rest.split(',').next())
            .unwrap_or("unknown");
        Ok(ChatResponse::text(format!("{role}#{n}")))
    }
}

pub struct FailingProvider;

#[async_trait]
impl Provider for FailingProvider {
    async fn chat(
        &self,
        _request: ChatRequest<'_>,
        _model: &str,
        _temperature: f64,
    ) -> anyhow::Result<ChatResponse> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

/// `add {a, b}` returning `a + b`, counting its invocations.
pub struct AddTool {
    invocations: Arc<AtomicUsize>,
}

impl AddTool {
    pub fn new() -> Self {
        Self {
            invocations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        self.invocations.clone()
    }
}

#[async_trait]
impl Tool for AddTool {
    fn name(&self) -> &str {
        "add"
    }

    fn description(&self) -> &str {
        "Add two numbers"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "a": {"type": "number"},
                "b": {"type": "number"}
            },
            "required": ["a", "b"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        let a = args.get("a").and_then(|v| v.as_f64());
        let b = args.get("b").and_then(|v| v.as_f64());
        match (a, b) {
            (Some(a), Some(b)) => Ok(ToolResult::success(format!("{}", a + b))),
            _ => Err(anyhow::anyhow!("expected numeric 'a' and 'b'")),
        }
    }
}
