mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::{Args, Command};
use toolsmith::client::{ChatCompletionsBackend, Client, Outcome};
use toolsmith::config::Config;
use toolsmith::tools::{Registry, ToolLoader};
use toolsmith::ui::{display_answer, display_catalog, display_summary, display_truncated};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match run(args).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "toolsmith=debug" } else { "toolsmith=warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> Result<i32> {
    let config = Config::from_env_and_overrides(&args.overrides())?;
    init_tracing(config.verbose);

    tracing::debug!(tools_dir = %config.tools_dir.display(), "Loading tool scripts");
    let registry = Arc::new(Registry::new(config.duplicate_policy));
    let loader = ToolLoader::new(&config.tools_dir);
    let summary = loader
        .load(&registry)
        .with_context(|| format!("Failed to load tools from {}", config.tools_dir.display()))?;

    match args.command {
        Command::List => {
            display_catalog(&registry.all());
            Ok(0)
        }
        Command::Check => {
            display_summary(&summary);
            Ok(if summary.is_clean() { 0 } else { 1 })
        }
        Command::Ask { prompt } => {
            if config.cluster.is_none() {
                eprintln!("{}", "No cluster selected.".red());
                eprintln!(
                    "{}",
                    "Pass --cluster <name>, set TOOLSMITH_CLUSTER, or add `cluster:` to your config file."
                        .dimmed()
                );
                return Ok(1);
            }
            ask(&config, registry, &prompt.join(" ")).await
        }
    }
}

async fn ask(config: &Config, registry: Arc<Registry>, prompt: &str) -> Result<i32> {
    let backend =
        ChatCompletionsBackend::new(&config.api_endpoint, &config.model, config.api_key.as_deref())?;
    let mut client = Client::new(backend, registry, config.client_config());

    tracing::debug!(endpoint = %config.api_endpoint, model = %config.model, "Connecting");
    client.connect().await?;

    let conversation = client.send_message(prompt).await?;
    tracing::debug!(turns = conversation.turns, "Conversation finished");

    match conversation.outcome {
        Outcome::Answer(answer) => {
            display_answer(&answer);
            Ok(0)
        }
        Outcome::TurnLimitExceeded { turns } => {
            display_truncated(turns);
            Ok(1)
        }
    }
}
