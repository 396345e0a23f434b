//! Mode dispatch: one entry point for the single-agent loop and the
//! multi-role collaboration, wired from [`Config`].

use crate::agent::collaboration::{CollaborationResult, Coordinator};
use crate::agent::loop_::{AgentLoop, RunOutcome};
use crate::agent::ToolRegistry;
use crate::config::Config;
use crate::error::AgentResult;
use crate::providers::create_provider;
use crate::traits::Provider;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    #[default]
    React,
    Multi,
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentMode::React => write!(f, "react"),
            AgentMode::Multi => write!(f, "multi"),
        }
    }
}

impl FromStr for AgentMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "react" => Ok(AgentMode::React),
            "multi" => Ok(AgentMode::Multi),
            other => Err(anyhow!("Unknown agent mode: {}. Available: react, multi", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", content = "result", rename_all = "lowercase")]
pub enum RuntimeResponse {
    #[serde(rename = "react")]
    Single(RunOutcome),
    Multi(CollaborationResult),
}

impl RuntimeResponse {
    /// The final answer, if the run produced one.
    pub fn answer(&self) -> Option<&str> {
        match self {
            RuntimeResponse::Single(outcome) => outcome.answer(),
            RuntimeResponse::Multi(result) => Some(&result.final_answer),
        }
    }
}

pub struct Runtime {
    agent_loop: Arc<AgentLoop>,
    coordinator: Arc<Coordinator>,
}

impl Runtime {
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider: Arc<dyn Provider> = Arc::from(create_provider(config)?);
        Self::new(provider, config)
    }

    /// Builds both engines over a shared provider and the built-in tools.
    pub fn new(provider: Arc<dyn Provider>, config: &Config) -> Result<Self> {
        let registry = Arc::new(ToolRegistry::with_builtin_tools(config.language));

        let agent_loop = AgentLoop::new(provider.clone(), registry, config.model.clone())
            .with_language(config.language)
            .with_max_steps(config.agent.max_steps)
            .with_temperature(config.agent.temperature)
            .with_structured_tool_calls(config.agent.structured_tool_calls)
            .with_tool_error_policy(config.agent.on_tool_error);

        let coordinator = Coordinator::new(provider, config.model.clone(), config.roles())?
            .with_language(config.language)
            .with_coordinator(config.coordinator_role())
            .with_temperature(config.collaboration.temperature)
            .with_concurrent_rounds(config.collaboration.concurrent_rounds);

        Ok(Self {
            agent_loop: Arc::new(agent_loop),
            coordinator: Arc::new(coordinator),
        })
    }

    pub fn agent_loop(&self) -> &Arc<AgentLoop> {
        &self.agent_loop
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub async fn run_single_agent(&self, task: &str) -> AgentResult<RunOutcome> {
        self.agent_loop.run(task).await
    }

    pub async fn run_multi_agent(&self, task: &str) -> AgentResult<CollaborationResult> {
        self.coordinator.collaborate(task).await
    }

    pub async fn run(&self, mode: AgentMode, task: &str) -> AgentResult<RuntimeResponse> {
        info!(%mode, "Dispatching task");
        match mode {
            AgentMode::React => self.run_single_agent(task).await.map(RuntimeResponse::Single),
            AgentMode::Multi => self.run_multi_agent(task).await.map(RuntimeResponse::Multi),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::prompt::Language;
    use crate::agent::roles::AgentRole;
    use crate::agent::testing::{EchoRoleProvider, ScriptedProvider};
    use crate::error::AgentError;

    #[test]
    fn mode_parses_route_values() {
        assert_eq!("react".parse::<AgentMode>().unwrap(), AgentMode::React);
        assert_eq!(" Multi ".parse::<AgentMode>().unwrap(), AgentMode::Multi);
        assert!("swarm".parse::<AgentMode>().is_err());
        assert_eq!(AgentMode::Multi.to_string(), "multi");
    }

    #[tokio::test]
    async fn react_mode_uses_builtin_calculator() {
        let provider = Arc::new(ScriptedProvider::texts([
            "思考：需要计算\n行动：calculator\n行动输入：{\"expression\": \"2 + 3\"}",
            "最终答案：5",
        ]));
        let runtime = Runtime::new(provider.clone(), &Config::default()).unwrap();

        let response = runtime.run(AgentMode::React, "2+3?").await.unwrap();
        assert_eq!(response.answer(), Some("5"));
        let RuntimeResponse::Single(outcome) = response else {
            panic!("expected single-agent response");
        };
        assert_eq!(outcome.steps()[0].observation(), Some("计算结果：5"));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn config_limits_reach_the_loop() {
        let mut config = Config::default();
        config.agent.max_steps = 2;
        let provider = Arc::new(ScriptedProvider::texts(["行动：get_time\n行动输入：{}"]));
        let runtime = Runtime::new(provider, &config).unwrap();

        assert_eq!(runtime.agent_loop().max_steps(), 2);
        let outcome = runtime.run_single_agent("time?").await.unwrap();
        assert!(matches!(outcome, RunOutcome::Exhausted { .. }));
        assert_eq!(outcome.steps().len(), 2);
    }

    #[tokio::test]
    async fn multi_mode_collaborates_over_configured_roles() {
        let config = Config {
            language: Language::English,
            ..Default::default()
        };
        let provider = Arc::new(EchoRoleProvider::new());
        let runtime = Runtime::new(provider.clone(), &config).unwrap();

        let response = runtime.run(AgentMode::Multi, "plan a launch").await.unwrap();
        let RuntimeResponse::Multi(result) = response else {
            panic!("expected collaboration response");
        };
        assert_eq!(result.individual_results.len(), 6);
        assert_eq!(result.final_answer, "Coordinator#7");
        assert_eq!(provider.calls(), 7);
    }

    #[tokio::test]
    async fn missing_coordinator_fails_without_model_calls() {
        let mut config = Config {
            language: Language::English,
            ..Default::default()
        };
        config.collaboration.roles = vec![AgentRole::new("Solo", "works alone")];
        let provider = Arc::new(EchoRoleProvider::new());
        let runtime = Runtime::new(provider.clone(), &config).unwrap();

        let err = runtime.run_multi_agent("task").await.unwrap_err();
        assert!(matches!(err, AgentError::RoleNotFound { name } if name == "Coordinator"));
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn duplicate_roles_are_rejected_at_construction() {
        let mut config = Config::default();
        config.collaboration.roles = vec![
            AgentRole::new("A", "first"),
            AgentRole::new("A", "second"),
        ];
        let provider = Arc::new(EchoRoleProvider::new());
        assert!(Runtime::new(provider, &config).is_err());
    }
}
