use crate::agent::events::{AgentEvent, EventSink};
use crate::agent::parser::{Markers, ParsedResponse, ResponseParser, parse_action_input};
use crate::agent::prompt::{Language, PromptBuilder};
use crate::agent::ToolRegistry;
use crate::error::{AgentError, AgentResult};
use crate::traits::{ChatMessage, ChatRequest, ChatResponse, Provider, ToolSpec};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_STEPS: usize = 5;

/// What the loop does when a dispatched tool fails or does not exist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorPolicy {
    /// Record `tool failed: <reason>` as the observation and keep going.
    #[default]
    Observe,
    /// Abort the run with [`AgentError::Tool`].
    Abort,
}

/// One entry of the reasoning trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub question: String,
    pub thought: String,
    #[serde(flatten)]
    pub kind: StepKind,
    pub step_index: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    Action {
        action: String,
        action_input: Value,
        observation: String,
        #[serde(default)]
        failed: bool,
    },
    Answer {
        answer: String,
    },
}

impl Step {
    pub fn action(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Action { action, .. } => Some(action),
            StepKind::Answer { .. } => None,
        }
    }

    pub fn observation(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Action { observation, .. } => Some(observation),
            StepKind::Answer { .. } => None,
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match &self.kind {
            StepKind::Answer { answer } => Some(answer),
            StepKind::Action { .. } => None,
        }
    }

    pub fn is_final(&self) -> bool {
        matches!(self.kind, StepKind::Answer { .. })
    }
}

/// How a run ended, with the trace accumulated up to that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model gave a final answer; the last step carries it.
    Completed { steps: Vec<Step>, answer: String },
    /// The step budget ran out before a final answer.
    Exhausted { steps: Vec<Step> },
    /// The model produced neither a final answer nor a usable action.
    Confused { steps: Vec<Step>, raw_output: String },
}

impl RunOutcome {
    pub fn steps(&self) -> &[Step] {
        match self {
            Self::Completed { steps, .. } | Self::Exhausted { steps } | Self::Confused { steps, .. } => {
                steps
            }
        }
    }

    pub fn into_steps(self) -> Vec<Step> {
        match self {
            Self::Completed { steps, .. } | Self::Exhausted { steps } | Self::Confused { steps, .. } => {
                steps
            }
        }
    }

    pub fn answer(&self) -> Option<&str> {
        match self {
            Self::Completed { answer, .. } => Some(answer),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Single-agent reason → act → observe loop.
///
/// Each turn sends one prompt holding the tool list, the question and the
/// transcript of earlier turns. The loop is stateless between runs; one
/// instance can serve concurrent `run` calls.
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    tool_registry: Arc<ToolRegistry>,
    prompts: PromptBuilder,
    parser: ResponseParser,
    model: String,
    temperature: f64,
    max_steps: usize,
    structured_tool_calls: bool,
    on_tool_error: ToolErrorPolicy,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        tool_registry: Arc<ToolRegistry>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            tool_registry,
            prompts: PromptBuilder::default(),
            parser: ResponseParser::default(),
            model: model.into(),
            temperature: 0.0,
            max_steps: DEFAULT_MAX_STEPS,
            structured_tool_calls: false,
            on_tool_error: ToolErrorPolicy::default(),
        }
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Switches prompt wording and section markers together.
    pub fn with_language(mut self, language: Language) -> Self {
        self.prompts = PromptBuilder::new(language);
        self.parser = ResponseParser::new(Markers::for_language(language));
        self
    }

    pub fn with_markers(mut self, markers: Markers) -> Self {
        self.prompts = self.prompts.with_markers(markers.clone());
        self.parser = ResponseParser::new(markers);
        self
    }

    pub fn with_structured_tool_calls(mut self, enabled: bool) -> Self {
        self.structured_tool_calls = enabled;
        self
    }

    pub fn with_tool_error_policy(mut self, policy: ToolErrorPolicy) -> Self {
        self.on_tool_error = policy;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub async fn run(&self, question: &str) -> AgentResult<RunOutcome> {
        self.run_with_events(question, &EventSink::none()).await
    }

    /// Runs on a background task, yielding a [`AgentEvent::Step`] per step and a
    /// closing [`AgentEvent::Finished`] or [`AgentEvent::Failed`].
    pub fn run_stream(self: Arc<Self>, question: impl Into<String>) -> BoxStream<'static, AgentEvent> {
        let question = question.into();
        let (sink, rx) = EventSink::channel();

        tokio::spawn(async move {
            let closing = match self.run_with_events(&question, &sink).await {
                Ok(outcome) => AgentEvent::Finished(outcome),
                Err(AgentError::Cancelled) => {
                    debug!("Event stream dropped, run stopped");
                    return;
                }
                Err(e) => AgentEvent::Failed(e.to_string()),
            };
            let _ = sink.emit(closing).await;
        });

        Box::pin(ReceiverStream::new(rx))
    }

    async fn run_with_events(&self, question: &str, events: &EventSink) -> AgentResult<RunOutcome> {
        let tools = self.tool_registry.describe();
        let specs = self.declared_tool_specs();
        let mut transcript = String::new();
        let mut steps = Vec::new();
        let mut step_index = 0;

        info!(max_steps = self.max_steps, "Starting ReAct run");

        while step_index < self.max_steps {
            events.ensure_open()?;
            let prompt = self.prompts.react_prompt(&tools, question, &transcript);
            let messages = [ChatMessage::user(prompt)];
            let request = ChatRequest {
                messages: &messages,
                tools: specs.as_deref(),
            };

            debug!(step = step_index, model = %self.model, "Calling provider");
            let response = self
                .provider
                .chat(request, &self.model, self.temperature)
                .await
                .map_err(AgentError::Provider)?;

            let turn = self.interpret(&response);
            let thought = turn.thought.clone().unwrap_or_default();

            if let Some(answer) = turn.answer.clone() {
                let step = Step {
                    question: question.to_string(),
                    thought,
                    kind: StepKind::Answer {
                        answer: answer.clone(),
                    },
                    step_index,
                };
                events.emit(AgentEvent::Step(step.clone())).await?;
                steps.push(step);
                info!(steps = steps.len(), "Final answer reached");
                return Ok(RunOutcome::Completed { steps, answer });
            }

            let Some((action, input)) = turn.action_call() else {
                warn!(
                    step = step_index,
                    "Model output has neither a final answer nor an action, stopping"
                );
                return Ok(RunOutcome::Confused {
                    steps,
                    raw_output: response.text_or_empty().to_string(),
                });
            };

            let (observation, failed) = match self.tool_registry.execute(action, input.clone()).await {
                Ok(output) => (output, false),
                Err(e) => match self.on_tool_error {
                    ToolErrorPolicy::Observe => {
                        warn!(tool = action, error = %e, "Tool failed, recording as observation");
                        (format!("tool failed: {}", e), true)
                    }
                    ToolErrorPolicy::Abort => return Err(e.into()),
                },
            };

            info!(step = step_index, tool = action, failed, "Tool step completed");
            transcript.push_str(&self.prompts.transcript_fragment(&thought, action, &observation));

            let step = Step {
                question: question.to_string(),
                thought,
                kind: StepKind::Action {
                    action: action.to_string(),
                    action_input: input.clone(),
                    observation,
                    failed,
                },
                step_index,
            };
            events.emit(AgentEvent::Step(step.clone())).await?;
            steps.push(step);
            step_index += 1;
        }

        info!(max_steps = self.max_steps, "Step budget exhausted");
        Ok(RunOutcome::Exhausted { steps })
    }

    fn declared_tool_specs(&self) -> Option<Vec<ToolSpec>> {
        let enabled = self.structured_tool_calls
            && self.provider.supports_tool_calls()
            && !self.tool_registry.is_empty();
        enabled.then(|| self.tool_registry.get_specs())
    }

    /// Prefers a structured tool call; falls back to the text grammar.
    fn interpret(&self, response: &ChatResponse) -> ParsedResponse {
        let text = response.text_or_empty();
        let mut parsed = self.parser.parse(text);

        let Some(call) = response.tool_calls.first() else {
            return parsed;
        };
        if response.tool_calls.len() > 1 {
            debug!(
                ignored = response.tool_calls.len() - 1,
                "Only the first tool call of a turn is dispatched"
            );
        }

        parsed.action = Some(call.name.clone());
        parsed.action_input = Some(if call.arguments.trim().is_empty() {
            json!({})
        } else {
            parse_action_input(&call.arguments)
        });
        parsed.observation = None;
        parsed.answer = None;
        if parsed.thought.is_none() && !text.trim().is_empty() {
            parsed.thought = Some(text.trim().to_string());
        }
        parsed
    }
}
