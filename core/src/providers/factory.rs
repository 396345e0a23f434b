use crate::config::Config;
use crate::providers::openai::DEEPSEEK_BASE_URL;
use crate::providers::{OllamaProvider, OpenAIProvider};
use crate::traits::Provider;
use anyhow::{Result, anyhow};

pub const DEFAULT_PROVIDER: &str = "deepseek";

pub fn create_provider(config: &Config) -> Result<Box<dyn Provider>> {
    let provider_name = config.provider.as_deref().unwrap_or(DEFAULT_PROVIDER);

    match provider_name.to_lowercase().as_str() {
        "ollama" => {
            let mut provider = OllamaProvider::new();
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Box::new(provider))
        }
        "openai" => {
            let api_key = resolve_api_key_with_fallback(
                &["OPENAI_API_KEY", "COGITO_API_KEY"],
                &config.api_key,
            )?;
            let mut provider = OpenAIProvider::new(api_key);
            if let Some(base_url) = &config.base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            Ok(Box::new(provider))
        }
        "deepseek" => {
            let api_key = resolve_api_key_with_fallback(
                &["DEEPSEEK_API_KEY", "COGITO_API_KEY"],
                &config.api_key,
            )?;
            let base_url = config.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);
            Ok(Box::new(OpenAIProvider::new(api_key).with_base_url(base_url)))
        }
        _ => Err(anyhow!(
            "Unknown provider: {}. Available: openai, deepseek, ollama",
            provider_name
        )),
    }
}

fn resolve_api_key_with_fallback(env_vars: &[&str], config_key: &str) -> Result<String> {
    for var_name in env_vars {
        if let Ok(key) = resolve_api_key_from_env(var_name) {
            return Ok(key);
        }
    }
    if !config_key.is_empty() {
        Ok(config_key.to_string())
    } else {
        Err(anyhow!(
            "No API key found. Set one of {} or run 'cogito onboard'",
            env_vars.join(", ")
        ))
    }
}

fn resolve_api_key_from_env(var_name: &str) -> Result<String> {
    std::env::var(var_name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("Environment variable {} not set", var_name))
}
