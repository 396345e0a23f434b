use anyhow::Result;
use clap::{Parser, Subcommand};
use cogito_core::agent::{AgentMode, Runtime};
use cogito_core::config;
use std::io::Write;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod onboard;
mod render;

#[derive(Parser)]
#[command(name = "cogito")]
#[command(about = "cogito - ReAct and multi-role LLM agents", long_about = None)]
struct Cli {
    /// Verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Onboard,
    /// Run one task and exit
    Run {
        #[arg(short, long)]
        message: String,
        /// react | multi
        #[arg(long, default_value = "react")]
        mode: String,
        /// Print the full result as JSON instead of progress
        #[arg(long)]
        json: bool,
    },
    Chat {
        /// react | multi
        #[arg(long, default_value = "react")]
        mode: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let command = cli.command.unwrap_or_else(|| {
        if !config::config_exists() {
            Commands::Onboard
        } else {
            Commands::Chat {
                mode: AgentMode::default().to_string(),
            }
        }
    });

    match command {
        Commands::Onboard => {
            let onboard_config = onboard::run_onboard().map_err(|e| {
                eprintln!("❌ Onboarding failed: {}", e);
                anyhow::anyhow!("Onboarding failed: {}", e)
            })?;
            config::save_config(&onboard_config)?;
        }
        Commands::Run {
            message,
            mode,
            json,
        } => {
            let mode: AgentMode = mode.parse()?;
            let config = config::Config::load_or_init()?;
            let runtime = Runtime::from_config(&config)?;
            info!(%mode, model = %config.model, "Running task");

            if json {
                let response = runtime.run(mode, &message).await?;
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                render::stream_task(&runtime, mode, &message, config.language).await?;
            }
        }
        Commands::Chat { mode } => {
            let mode: AgentMode = mode.parse()?;
            let config = config::Config::load_or_init()?;
            let runtime = Runtime::from_config(&config)?;

            println!("🧠 Cogito ({} mode)", mode);
            println!("Type your task (Ctrl+D to exit):\n");
            use std::io::{self, BufRead};
            let stdin = io::stdin();

            loop {
                print!("> ");
                let _ = io::stdout().flush();

                let mut input = String::new();
                match stdin.lock().read_line(&mut input) {
                    Ok(0) | Err(_) => {
                        println!("\n👋 Goodbye!");
                        break;
                    }
                    Ok(_) => {
                        let input = input.trim();
                        if input.is_empty() {
                            continue;
                        }

                        if let Err(e) =
                            render::stream_task(&runtime, mode, input, config.language).await
                        {
                            eprintln!("❌ Error: {}", e);
                        }
                        println!();
                    }
                }
            }
        }
    }

    Ok(())
}
