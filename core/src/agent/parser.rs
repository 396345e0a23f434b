//! Line-oriented parser for marker-prefixed ReAct output.
//!
//! Each line is matched against a fixed set of section markers and the
//! trimmed remainder becomes the field value. Field bodies are single-line:
//! continuation lines are ignored like any other unrecognized line.

use crate::agent::prompt::Language;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Literal line prefixes for each section of a reasoning turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Markers {
    pub thought: String,
    pub action: String,
    pub action_input: String,
    pub observation: String,
    pub final_answer: String,
}

impl Markers {
    pub fn chinese() -> Self {
        Self {
            thought: "思考：".into(),
            action: "行动：".into(),
            action_input: "行动输入：".into(),
            observation: "观察：".into(),
            final_answer: "最终答案：".into(),
        }
    }

    pub fn english() -> Self {
        Self {
            thought: "Thought:".into(),
            action: "Action:".into(),
            action_input: "Action Input:".into(),
            observation: "Observation:".into(),
            final_answer: "Final Answer:".into(),
        }
    }

    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Chinese => Self::chinese(),
            Language::English => Self::english(),
        }
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::chinese()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub thought: Option<String>,
    pub action: Option<String>,
    pub action_input: Option<Value>,
    pub observation: Option<String>,
    pub answer: Option<String>,
}

impl ParsedResponse {
    pub fn is_final(&self) -> bool {
        self.answer.is_some()
    }

    /// The action name and its input, when both were present.
    pub fn action_call(&self) -> Option<(&str, &Value)> {
        match (&self.action, &self.action_input) {
            (Some(action), Some(input)) => Some((action.as_str(), input)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    Thought,
    Action,
    ActionInput,
    Observation,
    Answer,
}

#[derive(Debug, Clone)]
pub struct ResponseParser {
    markers: Markers,
    // Longest marker first, so "Action Input:" wins over "Action:".
    ordered: Vec<(String, Field)>,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new(Markers::default())
    }
}

impl ResponseParser {
    pub fn new(markers: Markers) -> Self {
        let mut ordered = vec![
            (markers.thought.clone(), Field::Thought),
            (markers.action.clone(), Field::Action),
            (markers.action_input.clone(), Field::ActionInput),
            (markers.observation.clone(), Field::Observation),
            (markers.final_answer.clone(), Field::Answer),
        ];
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        Self { markers, ordered }
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Extracts the marked sections from one model turn.
    ///
    /// A later line for the same marker replaces an earlier one. When a final
    /// answer is present only `thought` and `answer` are kept.
    pub fn parse(&self, content: &str) -> ParsedResponse {
        let mut result = ParsedResponse::default();

        for line in content.lines() {
            let line = line.trim_start();

            let Some((field, rest)) = self
                .ordered
                .iter()
                .find_map(|(marker, field)| line.strip_prefix(marker.as_str()).map(|r| (*field, r)))
            else {
                continue;
            };

            let value = rest.trim().to_string();
            match field {
                Field::Thought => result.thought = Some(value),
                Field::Action => result.action = Some(value),
                Field::ActionInput => result.action_input = Some(parse_action_input(&value)),
                Field::Observation => result.observation = Some(value),
                Field::Answer => result.answer = Some(value),
            }
        }

        if result.is_final() {
            result.action = None;
            result.action_input = None;
            result.observation = None;
        }

        result
    }
}

/// Decodes the input as JSON, keeping the raw text when it is not valid JSON.
pub fn parse_action_input(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
