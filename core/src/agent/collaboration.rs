//! Two-round collaboration between role agents.
//!
//! Every role first answers on its own, then revises after reading its
//! peers' first answers, and the coordinator role finally integrates all of
//! them. Rounds are separated by a barrier; calls inside a round may run
//! concurrently.

use crate::agent::events::{AgentEvent, EventSink};
use crate::agent::prompt::{Language, PromptBuilder};
use crate::agent::roles::{AgentRole, coordinator_name};
use crate::error::{AgentError, AgentResult};
use crate::traits::{ChatMessage, ChatRequest, Provider};
use futures_util::future::try_join_all;
use futures_util::stream::BoxStream;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

pub const DEFAULT_ROLE_TEMPERATURE: f64 = 0.5;
const FINAL_SUFFIX: &str = "_final";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    InitialAnalysis,
    CollaborativeAdjustment,
    FinalIntegration,
}

impl Stage {
    pub fn label(self, language: Language) -> &'static str {
        match (self, language) {
            (Self::InitialAnalysis, Language::Chinese) => "初始分析阶段",
            (Self::CollaborativeAdjustment, Language::Chinese) => "协作调整阶段",
            (Self::FinalIntegration, Language::Chinese) => "最终整合",
            (Self::InitialAnalysis, Language::English) => "initial analysis",
            (Self::CollaborativeAdjustment, Language::English) => "collaborative adjustment",
            (Self::FinalIntegration, Language::English) => "final integration",
        }
    }
}

/// Role outputs keyed by `<role>` (round one) and `<role>_final` (round two),
/// in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndividualResults {
    entries: Vec<(String, String)>,
}

impl IndividualResults {
    pub fn insert(&mut self, key: impl Into<String>, content: impl Into<String>) {
        let key = key.into();
        let content = content.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = content,
            None => self.entries.push((key, content)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for IndividualResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollaborationResult {
    pub individual_results: IndividualResults,
    pub final_answer: String,
}

/// One role bound to its model handle and prompt template.
pub struct RoleAgent {
    role: AgentRole,
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f64,
    prompts: PromptBuilder,
}

impl RoleAgent {
    pub fn new(role: AgentRole, provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            role,
            provider,
            model: model.into(),
            temperature: DEFAULT_ROLE_TEMPERATURE,
            prompts: PromptBuilder::default(),
        }
    }

    pub fn role(&self) -> &AgentRole {
        &self.role
    }

    pub fn name(&self) -> &str {
        &self.role.name
    }

    pub async fn respond(&self, task: &str, stage: Stage, other_opinions: &str) -> AgentResult<String> {
        let prompt = self.prompts.role_prompt(&self.role, task, stage, other_opinions);
        let messages = [ChatMessage::user(prompt)];
        let request = ChatRequest {
            messages: &messages,
            tools: None,
        };

        debug!(role = %self.role.name, ?stage, "Calling provider");
        let response = self
            .provider
            .chat(request, &self.model, self.temperature)
            .await
            .map_err(AgentError::Provider)?;

        Ok(response.text_or_empty().to_string())
    }
}

/// Owns one [`RoleAgent`] per configured role and runs the protocol.
pub struct Coordinator {
    agents: Vec<RoleAgent>,
    coordinator: String,
    language: Language,
    concurrent_rounds: bool,
}

impl Coordinator {
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        roles: Vec<AgentRole>,
    ) -> AgentResult<Self> {
        if roles.is_empty() {
            return Err(AgentError::NoRoles);
        }

        let mut seen = HashSet::new();
        for role in &roles {
            if !seen.insert(role.name.as_str()) {
                return Err(AgentError::DuplicateRole {
                    name: role.name.clone(),
                });
            }
        }
        // `X_final` would share a result key with round two of `X`.
        for role in &roles {
            if let Some(base) = role.name.strip_suffix(FINAL_SUFFIX)
                && seen.contains(base)
            {
                return Err(AgentError::DuplicateRole {
                    name: role.name.clone(),
                });
            }
        }

        let model = model.into();
        let agents = roles
            .into_iter()
            .map(|role| RoleAgent::new(role, provider.clone(), model.clone()))
            .collect();

        let language = Language::default();
        Ok(Self {
            agents,
            coordinator: coordinator_name(language).to_string(),
            language,
            concurrent_rounds: true,
        })
    }

    /// Also resets the coordinator role name to the language's default.
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self.coordinator = coordinator_name(language).to_string();
        for agent in &mut self.agents {
            agent.prompts = PromptBuilder::new(language);
        }
        self
    }

    pub fn with_coordinator(mut self, name: impl Into<String>) -> Self {
        self.coordinator = name.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        for agent in &mut self.agents {
            agent.temperature = temperature;
        }
        self
    }

    pub fn with_concurrent_rounds(mut self, enabled: bool) -> Self {
        self.concurrent_rounds = enabled;
        self
    }

    pub fn agents(&self) -> &[RoleAgent] {
        &self.agents
    }

    pub fn agent(&self, name: &str) -> Option<&RoleAgent> {
        self.agents.iter().find(|a| a.name() == name)
    }

    pub async fn collaborate(&self, task: &str) -> AgentResult<CollaborationResult> {
        self.collaborate_with_events(task, &EventSink::none()).await
    }

    /// Runs on a background task, yielding round and role events and a closing
    /// [`AgentEvent::Collaborated`] or [`AgentEvent::Failed`].
    pub fn collaborate_stream(self: Arc<Self>, task: impl Into<String>) -> BoxStream<'static, AgentEvent> {
        let task = task.into();
        let (sink, rx) = EventSink::channel();

        tokio::spawn(async move {
            let closing = match self.collaborate_with_events(&task, &sink).await {
                Ok(result) => AgentEvent::Collaborated(result),
                Err(AgentError::Cancelled) => {
                    debug!("Event stream dropped, collaboration stopped");
                    return;
                }
                Err(e) => AgentEvent::Failed(e.to_string()),
            };
            let _ = sink.emit(closing).await;
        });

        Box::pin(ReceiverStream::new(rx))
    }

    async fn collaborate_with_events(
        &self,
        task: &str,
        events: &EventSink,
    ) -> AgentResult<CollaborationResult> {
        // Checked up front so a missing coordinator costs no model calls.
        let coordinator = self
            .agent(&self.coordinator)
            .ok_or_else(|| AgentError::RoleNotFound {
                name: self.coordinator.clone(),
            })?;

        info!(roles = self.agents.len(), "Starting collaboration");
        let none = PromptBuilder::new(self.language).no_opinions();
        let mut results = IndividualResults::default();

        let initial = self
            .run_round(Stage::InitialAnalysis, task, |_| none.to_string(), events)
            .await?;

        let opinions: Vec<(&str, String)> = initial
            .iter()
            .map(|(name, content)| (name.as_str(), format!("{}: {}", name, content)))
            .collect();
        for (name, content) in &initial {
            results.insert(name.clone(), content.clone());
        }

        let revised = self
            .run_round(
                Stage::CollaborativeAdjustment,
                task,
                |agent| {
                    let others: Vec<&str> = opinions
                        .iter()
                        .filter(|(owner, _)| *owner != agent.name())
                        .map(|(_, line)| line.as_str())
                        .collect();
                    if others.is_empty() {
                        none.to_string()
                    } else {
                        others.join("\n")
                    }
                },
                events,
            )
            .await?;
        for (name, content) in revised {
            results.insert(format!("{}{}", name, FINAL_SUFFIX), content);
        }

        info!(coordinator = %self.coordinator, "Final integration");
        events
            .emit(AgentEvent::RoundStarted {
                stage: Stage::FinalIntegration,
            })
            .await?;
        let all_results = results
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join("\n");
        let final_answer = coordinator
            .respond(task, Stage::FinalIntegration, &all_results)
            .await?;
        events
            .emit(AgentEvent::RoleResponded {
                stage: Stage::FinalIntegration,
                role: coordinator.name().to_string(),
                content: final_answer.clone(),
            })
            .await?;

        Ok(CollaborationResult {
            individual_results: results,
            final_answer,
        })
    }

    /// Asks every role once and waits for all of them. Output follows role order.
    async fn run_round<F>(
        &self,
        stage: Stage,
        task: &str,
        opinions_for: F,
        events: &EventSink,
    ) -> AgentResult<Vec<(String, String)>>
    where
        F: Fn(&RoleAgent) -> String,
    {
        info!(?stage, concurrent = self.concurrent_rounds, "Starting round");
        events.ensure_open()?;
        events.emit(AgentEvent::RoundStarted { stage }).await?;

        let inputs: Vec<(&RoleAgent, String)> = self
            .agents
            .iter()
            .map(|agent| (agent, opinions_for(agent)))
            .collect();

        let responses = if self.concurrent_rounds {
            try_join_all(
                inputs
                    .iter()
                    .map(|(agent, opinions)| agent.respond(task, stage, opinions)),
            )
            .await?
        } else {
            let mut responses = Vec::with_capacity(inputs.len());
            for (agent, opinions) in &inputs {
                responses.push(agent.respond(task, stage, opinions).await?);
            }
            responses
        };

        let mut round = Vec::with_capacity(responses.len());
        for ((agent, _), content) in inputs.iter().zip(responses) {
            events
                .emit(AgentEvent::RoleResponded {
                    stage,
                    role: agent.name().to_string(),
                    content: content.clone(),
                })
                .await?;
            round.push((agent.name().to_string(), content));
        }
        Ok(round)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::roles::default_roles;
    use crate::agent::testing::{EchoRoleProvider, FailingProvider};
    use futures_util::StreamExt;

    fn english_coordinator(provider: Arc<dyn Provider>) -> Coordinator {
        Coordinator::new(provider, "test-model", default_roles(Language::English))
            .unwrap()
            .with_language(Language::English)
    }

    #[tokio::test]
    async fn collaborate_collects_two_rounds_and_synthesis() {
        let provider = Arc::new(EchoRoleProvider::new());
        let coordinator = english_coordinator(provider.clone());

        let result = coordinator.collaborate("Plan a launch").await.unwrap();

        assert_eq!(result.individual_results.len(), 6);
        assert_eq!(
            result.individual_results.keys().collect::<Vec<_>>(),
            vec![
                "Researcher",
                "Analyst",
                "Coordinator",
                "Researcher_final",
                "Analyst_final",
                "Coordinator_final",
            ]
        );
        assert_eq!(provider.calls(), 7);
        assert_eq!(result.final_answer, "Coordinator#7");
        assert!(result.individual_results.get("Researcher").unwrap().starts_with("Researcher#"));
        assert!(
            result
                .individual_results
                .get("Coordinator_final")
                .unwrap()
                .starts_with("Coordinator#")
        );
    }

    #[tokio::test]
    async fn rounds_are_separated_and_self_excluded() {
        for concurrent in [false, true] {
            let provider = Arc::new(EchoRoleProvider::new());
            let coordinator =
                english_coordinator(provider.clone()).with_concurrent_rounds(concurrent);

            let result = coordinator.collaborate("task").await.unwrap();
            let prompts = provider.prompts();
            assert_eq!(prompts.len(), 7);

            // Barrier per round: all round-one prompts precede every round-two prompt.
            for prompt in &prompts[..3] {
                assert!(prompt.contains("Current stage: initial analysis"));
                assert!(prompt.contains("Other agents' opinions: none"));
            }
            for prompt in &prompts[3..6] {
                assert!(prompt.contains("Current stage: collaborative adjustment"));
            }

            let roles = ["Researcher", "Analyst", "Coordinator"];
            for role in roles {
                let prompt = prompts[3..6]
                    .iter()
                    .find(|p| p.starts_with(&format!("You are {role},")))
                    .unwrap_or_else(|| panic!("no round-two prompt for {role}"));
                let own = format!("{}: {}", role, result.individual_results.get(role).unwrap());
                assert!(!prompt.contains(&own), "{role} saw its own opinion");
                for other in roles.iter().filter(|r| **r != role) {
                    let line =
                        format!("{}: {}", other, result.individual_results.get(other).unwrap());
                    assert!(prompt.contains(&line), "{role} missed {other}");
                }
            }

            let synthesis = &prompts[6];
            assert!(synthesis.starts_with("You are Coordinator,"));
            assert!(synthesis.contains("Current stage: final integration"));
            for (key, value) in result.individual_results.iter() {
                assert!(synthesis.contains(&format!("{key}: {value}")));
            }
        }
    }

    #[tokio::test]
    async fn self_exclusion_uses_role_identity_not_prefix() {
        let provider = Arc::new(EchoRoleProvider::new());
        let roles = vec![
            AgentRole::new("A", "first"),
            AgentRole::new("AB", "second"),
            AgentRole::new("Coordinator", "integrates"),
        ];
        let coordinator = Coordinator::new(provider.clone(), "m", roles)
            .unwrap()
            .with_language(Language::English)
            .with_concurrent_rounds(false);

        let result = coordinator.collaborate("task").await.unwrap();
        let round_two_for_a = &provider.prompts()[3];
        let ab_line = format!("AB: {}", result.individual_results.get("AB").unwrap());
        assert!(round_two_for_a.contains(&ab_line));
    }

    #[tokio::test]
    async fn single_role_sees_no_peers() {
        let provider = Arc::new(EchoRoleProvider::new());
        let coordinator = Coordinator::new(
            provider.clone(),
            "m",
            vec![AgentRole::new("Coordinator", "does everything")],
        )
        .unwrap()
        .with_language(Language::English);

        let result = coordinator.collaborate("task").await.unwrap();

        assert_eq!(result.individual_results.len(), 2);
        assert!(provider.prompts()[1].contains("Other agents' opinions: none"));
    }

    #[tokio::test]
    async fn missing_coordinator_fails_before_any_call() {
        let provider = Arc::new(EchoRoleProvider::new());
        let coordinator = Coordinator::new(
            provider.clone(),
            "m",
            vec![AgentRole::new("Researcher", "r"), AgentRole::new("Analyst", "a")],
        )
        .unwrap()
        .with_language(Language::English);

        let err = coordinator.collaborate("task").await.unwrap_err();

        assert!(matches!(err, AgentError::RoleNotFound { ref name } if name == "Coordinator"));
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn custom_coordinator_name() {
        let provider = Arc::new(EchoRoleProvider::new());
        let coordinator = Coordinator::new(
            provider,
            "m",
            vec![AgentRole::new("Writer", "w"), AgentRole::new("Editor", "e")],
        )
        .unwrap()
        .with_language(Language::English)
        .with_coordinator("Editor");

        let result = coordinator.collaborate("task").await.unwrap();
        assert_eq!(result.final_answer, "Editor#5");
    }

    #[test]
    fn construction_validates_roles() {
        let provider: Arc<dyn Provider> = Arc::new(EchoRoleProvider::new());
        assert!(matches!(
            Coordinator::new(provider.clone(), "m", vec![]),
            Err(AgentError::NoRoles)
        ));
        assert!(matches!(
            Coordinator::new(
                provider,
                "m",
                vec![AgentRole::new("A", "x"), AgentRole::new("A", "y")]
            ),
            Err(AgentError::DuplicateRole { .. })
        ));
    }

    #[test]
    fn role_named_like_a_revision_key_is_rejected() {
        let provider: Arc<dyn Provider> = Arc::new(EchoRoleProvider::new());
        let roles = vec![
            AgentRole::new("X", "x"),
            AgentRole::new("X_final", "y"),
            AgentRole::new("Coordinator", "c"),
        ];
        let err = Coordinator::new(provider.clone(), "m", roles).err().unwrap();
        assert!(matches!(err, AgentError::DuplicateRole { ref name } if name == "X_final"));

        let reversed = vec![AgentRole::new("X_final", "y"), AgentRole::new("X", "x")];
        assert!(Coordinator::new(provider.clone(), "m", reversed).is_err());

        let unrelated = vec![AgentRole::new("Y_final", "y"), AgentRole::new("X", "x")];
        assert!(Coordinator::new(provider, "m", unrelated).is_ok());
    }

    #[tokio::test]
    async fn provider_failure_aborts_collaboration() {
        let coordinator = english_coordinator(Arc::new(FailingProvider));
        let err = coordinator.collaborate("task").await.unwrap_err();
        assert!(matches!(err, AgentError::Provider(_)));
    }

    #[tokio::test]
    async fn chinese_prompts_use_chinese_stage_labels() {
        let provider = Arc::new(EchoRoleProvider::new());
        let coordinator =
            Coordinator::new(provider.clone(), "m", default_roles(Language::Chinese)).unwrap();

        let result = coordinator.collaborate("写一份计划").await.unwrap();

        assert_eq!(result.individual_results.len(), 6);
        assert!(result.individual_results.get("协调员_final").is_some());
        let prompts = provider.prompts();
        assert!(prompts[0].contains("当前状态：初始分析阶段"));
        assert!(prompts[0].contains("其他 Agent 的意见：暂无"));
        assert!(prompts[3].contains("当前状态：协作调整阶段"));
        assert!(prompts[6].starts_with("你是 协调员"));
        assert!(prompts[6].contains("当前状态：最终整合"));
    }

    #[tokio::test]
    async fn stream_reports_rounds_in_order() {
        let coordinator = Arc::new(
            english_coordinator(Arc::new(EchoRoleProvider::new())).with_concurrent_rounds(false),
        );

        let events: Vec<AgentEvent> = coordinator.collaborate_stream("task").collect().await;

        let stages: Vec<Stage> = events
            .iter()
            .filter_map(|e| match e {
                AgentEvent::RoundStarted { stage } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![
                Stage::InitialAnalysis,
                Stage::CollaborativeAdjustment,
                Stage::FinalIntegration
            ]
        );
        let responded = events
            .iter()
            .filter(|e| matches!(e, AgentEvent::RoleResponded { .. }))
            .count();
        assert_eq!(responded, 7);
        assert!(matches!(events.last(), Some(AgentEvent::Collaborated(r)) if r.final_answer == "Coordinator#7"));
    }

    #[test]
    fn individual_results_serialize_in_order() {
        let mut results = IndividualResults::default();
        results.insert("b", "1");
        results.insert("a", "2");
        results.insert("b", "3");
        assert_eq!(serde_json::to_string(&results).unwrap(), r#"{"b":"3","a":"2"}"#);
    }
}
