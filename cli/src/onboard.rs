use anyhow::{Context, Result};
use cogito_core::agent::Language;
use cogito_core::config::Config;
use console::style;
use dialoguer::{Input, Select};

const BANNER: &str = r"
    ----------------------------------

     c o g i t o   ·   ergo   ·   a g o

    ----------------------------------
";

const PROVIDERS: [&str; 3] = ["deepseek", "openai", "ollama"];

fn print_step(step: usize, total: usize, title: &str) {
    println!();
    println!(
        "{}",
        style(format!("[{}/{}] {}", step, total, title))
            .cyan()
            .bold()
    );
    println!();
}

fn models_for(provider: &str) -> &'static [&'static str] {
    match provider {
        "openai" => &["gpt-4o", "gpt-4o-mini", "gpt-4.1", "gpt-4.1-mini"],
        "ollama" => &["qwen2.5", "llama3.1", "mistral"],
        _ => &["deepseek-chat", "deepseek-reasoner"],
    }
}

fn setup_provider() -> Result<String> {
    let selection = Select::new()
        .with_prompt("Select your provider")
        .items(&PROVIDERS)
        .default(0)
        .interact()
        .context("Failed to select provider")?;

    Ok(PROVIDERS[selection].to_string())
}

fn setup_api_key(provider: &str) -> Result<String> {
    if provider == "ollama" {
        println!("  {} Ollama runs locally, no API key needed", style("✓").green());
        return Ok(String::new());
    }

    let api_key: String = Input::new()
        .with_prompt(format!("Enter your {} API key", provider))
        .interact_text()
        .context("Failed to read API key")?;

    if api_key.is_empty() {
        return Err(anyhow::anyhow!("API key cannot be empty"));
    }

    Ok(api_key)
}

fn setup_model(provider: &str) -> Result<String> {
    let models = models_for(provider);

    let selection = Select::new()
        .with_prompt("Select your model")
        .items(models)
        .default(0)
        .interact()
        .context("Failed to select model")?;

    Ok(models[selection].to_string())
}

fn setup_language() -> Result<Language> {
    let languages = [Language::Chinese, Language::English];
    let labels = ["中文 (zh)", "English (en)"];

    let selection = Select::new()
        .with_prompt("Select the prompt language")
        .items(&labels)
        .default(0)
        .interact()
        .context("Failed to select language")?;

    Ok(languages[selection])
}

pub fn run_onboard() -> Result<Config> {
    println!("{}", style(BANNER).cyan().bold());

    println!("  {}", style("Welcome to Cogito!").white().bold());
    println!(
        "  {}",
        style("This wizard will configure your agents in under 30 seconds.").dim()
    );
    println!();

    print_step(1, 4, "Provider");
    let provider = setup_provider()?;

    print_step(2, 4, "API Key Setup");
    let api_key = setup_api_key(&provider)?;

    print_step(3, 4, "Model Selection");
    let model = setup_model(&provider)?;

    print_step(4, 4, "Language");
    let language = setup_language()?;

    let config = Config {
        provider: Some(provider),
        api_key,
        model,
        language,
        ..Default::default()
    };

    println!();
    println!("  {} Configuration complete!", style("✓").green().bold());
    println!(
        "  {} Config saved to {}",
        style("→").green(),
        style(cogito_core::config::get_config_path().display()).cyan()
    );
    println!();
    println!(
        "  {} You can now run: {} or {}",
        style("→").green(),
        style("cogito chat").cyan().bold(),
        style("cogito run -m \"...\" --mode multi").cyan().bold()
    );
    println!();

    Ok(config)
}
