use clap::{Parser, Subcommand};
use std::path::PathBuf;
use toolsmith::config::ConfigOverrides;
use toolsmith::tools::DuplicatePolicy;

#[derive(Parser, Debug)]
#[command(name = "toolsmith")]
#[command(about = "Script-defined tools for a language model, backed by HTTP and shell adapters", long_about = None)]
pub struct Args {
    #[arg(long = "config", global = true, help = "Path to a config file")]
    pub config: Option<PathBuf>,

    #[arg(long = "cluster", global = true, help = "Cluster the session works against")]
    pub cluster: Option<String>,

    #[arg(long = "tools-dir", global = true, help = "Directory of tool scripts")]
    pub tools_dir: Option<PathBuf>,

    #[arg(
        long = "max-turns",
        global = true,
        help = "Maximum model calls per message"
    )]
    pub max_turns: Option<usize>,

    #[arg(
        long = "api-endpoint",
        global = true,
        help = "Custom API base URL (e.g., http://localhost:11434/v1)"
    )]
    pub api_endpoint: Option<String>,

    #[arg(long = "model", global = true, help = "Model to use")]
    pub model: Option<String>,

    #[arg(
        long = "duplicate-policy",
        global = true,
        help = "What to do when a tool name is defined twice (reject, overwrite)"
    )]
    pub duplicate_policy: Option<DuplicatePolicy>,

    #[arg(short = 'v', long = "verbose", global = true, help = "Show debug output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the tools currently registered
    List,
    /// Load every tool script and report failures
    Check,
    /// Send a prompt to the model with the tool catalog attached
    Ask {
        #[arg(required = true, help = "Prompt to send")]
        prompt: Vec<String>,
    },
}

impl Args {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.config.clone(),
            cluster: self.cluster.clone(),
            tools_dir: self.tools_dir.clone(),
            max_turns: self.max_turns,
            api_endpoint: self.api_endpoint.clone(),
            model: self.model.clone(),
            duplicate_policy: self.duplicate_policy,
            verbose: self.verbose,
        }
    }
}
