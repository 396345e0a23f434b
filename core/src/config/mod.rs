use crate::agent::collaboration::DEFAULT_ROLE_TEMPERATURE;
use crate::agent::loop_::{DEFAULT_MAX_STEPS, ToolErrorPolicy};
use crate::agent::prompt::Language;
use crate::agent::roles::{AgentRole, coordinator_name, default_roles};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const COGITO_DIR: &str = ".cogito";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    pub max_steps: usize,
    pub temperature: f64,
    /// Prefer structured tool calls when the provider supports them.
    pub structured_tool_calls: bool,
    pub on_tool_error: ToolErrorPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            temperature: 0.0,
            structured_tool_calls: false,
            on_tool_error: ToolErrorPolicy::Observe,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CollaborationConfig {
    pub temperature: f64,
    pub concurrent_rounds: bool,
    /// Name of the synthesizing role; defaults to the built-in coordinator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<String>,
    /// Replaces the built-in roles when non-empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<AgentRole>,
}

impl Default for CollaborationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_ROLE_TEMPERATURE,
            concurrent_rounds: true,
            coordinator: None,
            roles: vec![],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub api_key: String,
    pub base_url: Option<String>,
    pub model: String,
    pub language: Language,
    pub agent: AgentConfig,
    pub collaboration: CollaborationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            provider: None,
            api_key: String::new(),
            base_url: None,
            model: "deepseek-chat".to_string(),
            language: Language::default(),
            agent: AgentConfig::default(),
            collaboration: CollaborationConfig::default(),
        }
    }
}

impl Config {
    /// Loads `~/.cogito/config.toml`, or defaults when there is none yet so
    /// keys can come from the environment alone.
    pub fn load_or_init() -> Result<Self> {
        Self::load_or_init_from(&get_config_path())
    }

    pub fn load_or_init_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            load_config_from(config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn roles(&self) -> Vec<AgentRole> {
        if self.collaboration.roles.is_empty() {
            default_roles(self.language)
        } else {
            self.collaboration.roles.clone()
        }
    }

    pub fn coordinator_role(&self) -> String {
        self.collaboration
            .coordinator
            .clone()
            .unwrap_or_else(|| coordinator_name(self.language).to_string())
    }
}

pub fn get_cogito_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(COGITO_DIR)
}

pub fn get_config_path() -> PathBuf {
    get_cogito_dir().join("config.toml")
}

pub fn ensure_cogito_dir() -> Result<PathBuf> {
    let cogito_dir = get_cogito_dir();

    if !cogito_dir.exists() {
        std::fs::create_dir_all(&cogito_dir).with_context(|| {
            format!(
                "Failed to create cogito directory at {}",
                cogito_dir.display()
            )
        })?;
    }

    Ok(cogito_dir)
}

pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            anyhow::anyhow!(
                "Config file not found. Run 'cogito onboard' to set up your configuration."
            )
        } else {
            anyhow::anyhow!("Failed to read config from {}: {}", config_path.display(), e)
        }
    })?;

    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config from {}", config_path.display()))
}

pub fn save_config(config: &Config) -> Result<()> {
    ensure_cogito_dir()?;
    save_config_to(config, &get_config_path())
}

pub fn save_config_to(config: &Config, config_path: &Path) -> Result<()> {
    let content =
        toml::to_string_pretty(config).with_context(|| "Failed to serialize config to TOML")?;

    std::fs::write(config_path, content)
        .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

    Ok(())
}

pub fn config_exists() -> bool {
    get_config_path().exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = Config::default();
        assert_eq!(config.agent.max_steps, 5);
        assert_eq!(config.agent.temperature, 0.0);
        assert_eq!(config.collaboration.temperature, 0.5);
        assert!(config.collaboration.concurrent_rounds);
        assert_eq!(config.language, Language::Chinese);
        assert_eq!(config.coordinator_role(), "协调员");
        assert_eq!(config.roles().len(), 3);
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config {
            provider: Some("openai".into()),
            api_key: "sk-test".into(),
            model: "gpt-4o-mini".into(),
            language: Language::English,
            ..Default::default()
        };
        config.agent.on_tool_error = ToolErrorPolicy::Abort;
        config.collaboration.roles = vec![AgentRole::new("Coordinator", "integrates")];

        save_config_to(&config, &path).unwrap();
        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(
            &path,
            "model = \"gpt-4o\"\nlanguage = \"en\"\n\n[agent]\nmax_steps = 8\n\n[collaboration]\ncoordinator = \"Lead\"\n",
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.agent.max_steps, 8);
        assert_eq!(config.agent.on_tool_error, ToolErrorPolicy::Observe);
        assert_eq!(config.coordinator_role(), "Lead");
        assert_eq!(config.roles()[0].name, "Researcher");
    }

    #[test]
    fn load_or_init_falls_back_to_defaults_only_when_absent() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");

        assert_eq!(Config::load_or_init_from(&path).unwrap(), Config::default());

        std::fs::write(&path, "model = \"gpt-4o\"\n").unwrap();
        assert_eq!(Config::load_or_init_from(&path).unwrap().model, "gpt-4o");

        std::fs::write(&path, "model = [").unwrap();
        assert!(Config::load_or_init_from(&path).is_err());
    }

    #[test]
    fn missing_file_mentions_onboarding() {
        let tmp = TempDir::new().unwrap();
        let err = load_config_from(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("cogito onboard"));
    }
}
