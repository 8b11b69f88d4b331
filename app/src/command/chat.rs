//! Interactive tutoring conversation.
//!
//! One `SessionContext` lives for the duration of the process; the loop
//! feeds user lines through the orchestrator and renders replies or
//! errors without ever exiting on a failed turn.

use std::io::Write;

use tracing::info;

use tutors_config::Config;
use tutors_conversation::{ChatError, ChatOrchestrator, SessionContext};

use super::{CommandStrategy, GeminiBinder, build_components};

/// Input parameters for the Chat command strategy.
#[derive(Debug, Clone)]
pub struct ChatInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Optional model override
    pub model: Option<String>,
    /// Optional history window override
    pub history_limit: Option<usize>,
}

/// Strategy for executing the Chat command.
#[derive(Debug, Clone, Copy)]
pub struct ChatStrategy;

impl CommandStrategy for ChatStrategy {
    type Input = ChatInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        info!("Loaded config from ~/tutors/config.json");

        let (orchestrator, binder) =
            build_components(&config, input.model, input.history_limit)?;

        let mut ctx = SessionContext::new();
        if let Some(api_key) = &config.provider.api_key {
            ctx.set_credential(api_key, &binder)?;
        }

        if let Some(message) = input.message {
            anyhow::ensure!(
                ctx.is_connected(),
                "No API key configured. Add provider.api_key to the config or run interactively."
            );
            let result = orchestrator.handle_turn(&mut ctx, &message).await?;
            println!("{}", result.reply);
            return Ok(());
        }

        run_interactive(&orchestrator, &binder, &mut ctx).await
    }
}

async fn run_interactive(
    orchestrator: &ChatOrchestrator,
    binder: &GeminiBinder,
    ctx: &mut SessionContext,
) -> anyhow::Result<()> {
    println!("=== Tutoring session: {} ===", ctx.id);
    println!(
        "Commands: /key <API_KEY>, /clear, /status. Type 'exit', 'quit', or Ctrl+C to end.\n"
    );
    if !ctx.is_connected() {
        println!("No API key configured yet. Set one with: /key <API_KEY>\n");
    }

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if matches!(input, "exit" | "quit" | "q") {
            println!("\nSession ended. Total messages: {}", ctx.message_count());
            break;
        }

        if input.is_empty() {
            continue;
        }

        if let Some(key) = input.strip_prefix("/key") {
            match ctx.set_credential(key.trim(), binder) {
                Ok(()) => println!(
                    "API key configured. History cleared for the new credential.\n"
                ),
                Err(e) => eprintln!("Invalid API key: {e}\n"),
            }
            continue;
        }

        if input == "/clear" {
            ctx.clear_history();
            println!("Conversation history cleared.\n");
            continue;
        }

        if input == "/status" {
            println!("Total messages: {}", ctx.message_count());
            println!(
                "API status: {}\n",
                if ctx.is_connected() {
                    "Connected"
                } else {
                    "Disconnected"
                }
            );
            continue;
        }

        match orchestrator.handle_turn(ctx, input).await {
            Ok(result) => println!("\n{}\n", result.reply),
            Err(e @ ChatError::NotConfigured) => {
                eprintln!("{e}. Set one with: /key <API_KEY>\n");
            }
            Err(e) => eprintln!("Error processing request: {e}\n"),
        }
    }

    Ok(())
}
