use anyhow::{Result, anyhow};
use cogito_core::agent::{AgentEvent, AgentMode, Language, RunOutcome, Runtime, Step, StepKind};
use console::style;
use futures_util::StreamExt;

/// Runs `task` in `mode`, printing progress as events arrive.
pub async fn stream_task(
    runtime: &Runtime,
    mode: AgentMode,
    task: &str,
    language: Language,
) -> Result<()> {
    println!("\n🤔 Processing...\n");

    let mut events = match mode {
        AgentMode::React => runtime.agent_loop().clone().run_stream(task),
        AgentMode::Multi => runtime.coordinator().clone().collaborate_stream(task),
    };

    while let Some(event) = events.next().await {
        match event {
            AgentEvent::Step(step) => print_step(&step),
            AgentEvent::Finished(outcome) => print_outcome(&outcome),
            AgentEvent::RoundStarted { stage } => {
                println!();
                println!("{}", style(format!("── {} ──", stage.label(language))).cyan().bold());
            }
            AgentEvent::RoleResponded { role, content, .. } => {
                println!("  {} {}", style(format!("{}:", role)).yellow().bold(), content);
            }
            AgentEvent::Collaborated(result) => {
                println!();
                println!("{}", style("✓ Final answer").green().bold());
                println!("{}", result.final_answer);
            }
            AgentEvent::Failed(message) => return Err(anyhow!(message)),
        }
    }

    Ok(())
}

fn print_step(step: &Step) {
    println!(
        "{} {}",
        style(format!("[{}]", step.step_index + 1)).dim(),
        style(&step.thought).italic()
    );
    if let StepKind::Action {
        action,
        action_input,
        observation,
        failed,
    } = &step.kind
    {
        println!("    {} {}", style("→").cyan(), action_call_line(action, action_input));
        if *failed {
            println!("    {} {}", style("!").red(), style(observation).red());
        } else {
            println!("    {} {}", style("←").green(), observation);
        }
    }
}

fn print_outcome(outcome: &RunOutcome) {
    println!();
    match outcome {
        RunOutcome::Completed { answer, .. } => {
            println!("{}", style("✓ Final answer").green().bold());
            println!("{}", answer);
        }
        RunOutcome::Exhausted { steps } => {
            println!(
                "{} Step budget used up after {} steps without a final answer",
                style("!").yellow().bold(),
                steps.len()
            );
        }
        RunOutcome::Confused { raw_output, .. } => {
            println!(
                "{} Model output named neither an action nor a final answer:",
                style("!").yellow().bold()
            );
            println!("{}", style(raw_output).dim());
        }
    }
}

fn action_call_line(action: &str, input: &serde_json::Value) -> String {
    match input {
        serde_json::Value::String(raw) => format!("{}({})", action, raw),
        other => format!("{}({})", action, other),
    }
}
