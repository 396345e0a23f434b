use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolCall, ToolSpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OllamaTool>>,
    options: OllamaOptions,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaTool {
    r#type: String,
    function: OllamaToolFunction,
}

#[derive(Debug, Serialize)]
struct OllamaToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<OllamaToolCallResponse>>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCallResponse {
    function: OllamaFunctionResponse,
}

#[derive(Debug, Deserialize)]
struct OllamaFunctionResponse {
    name: String,
    arguments: serde_json::Value,
}

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .connect_timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: "http://localhost:11434".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let url = base_url.into();
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    fn convert_messages(messages: &[ChatMessage]) -> Vec<OllamaMessage<'_>> {
        messages
            .iter()
            .map(|m| OllamaMessage {
                role: &m.role,
                content: &m.content,
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSpec]) -> Vec<OllamaTool> {
        tools
            .iter()
            .map(|t| OllamaTool {
                r#type: "function".to_string(),
                function: OllamaToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters_schema.clone(),
                },
            })
            .collect()
    }

    fn into_chat_response(response: OllamaResponse) -> ChatResponse {
        let tool_calls: Vec<ToolCall> = response
            .message
            .tool_calls
            .map(|tcs| {
                tcs.into_iter()
                    .map(|tc| {
                        let args_str =
                            serde_json::to_string(&tc.function.arguments).unwrap_or_default();
                        ToolCall {
                            id: format!("ollama_{}", uuid::Uuid::new_v4()),
                            name: tc.function.name,
                            arguments: args_str,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        ChatResponse {
            text: response.message.content.filter(|c| !c.is_empty()),
            tool_calls,
        }
    }
}

impl Default for OllamaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for OllamaProvider {
    async fn chat(
        &self,
        request: ChatRequest<'_>,
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<ChatResponse> {
        let ollama_request = OllamaRequest {
            model,
            messages: Self::convert_messages(request.messages),
            tools: request.tools.map(Self::convert_tools),
            options: OllamaOptions { temperature },
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ollama_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!(
                "Ollama API error ({}): {}",
                status,
                error_text
            ));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        Ok(Self::into_chat_response(ollama_response))
    }

    fn supports_tool_calls(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_call_arguments_are_serialized() {
        let raw = json!({
            "message": {
                "content": "",
                "tool_calls": [{"function": {"name": "search", "arguments": {"query": "rust"}}}]
            }
        });
        let response: OllamaResponse = serde_json::from_value(raw).unwrap();
        let chat = OllamaProvider::into_chat_response(response);
        assert!(chat.text.is_none());
        assert_eq!(chat.tool_calls.len(), 1);
        assert_eq!(chat.tool_calls[0].arguments, r#"{"query":"rust"}"#);
        assert!(chat.tool_calls[0].id.starts_with("ollama_"));
    }

    #[test]
    fn plain_text_response() {
        let raw = json!({"message": {"content": "最终答案：5"}});
        let response: OllamaResponse = serde_json::from_value(raw).unwrap();
        let chat = OllamaProvider::into_chat_response(response);
        assert_eq!(chat.text_or_empty(), "最终答案：5");
        assert!(!chat.has_tool_calls());
    }
}
