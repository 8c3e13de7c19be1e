mod api;
mod defaults;
mod tools;
mod validation;

use crate::client::ClientConfig;
use crate::tools::{AdapterSettings, DuplicatePolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub use api::{normalize_endpoint, ApiConfig};
pub use defaults::default_tools_dir;
pub use tools::{AdaptersConfig, ClientSection, ToolsConfig};
pub use validation::{expand_env_var_in_string, expand_env_vars};

/// On-disk configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FileConfig {
    /// Currently selected cluster, opaque to the core.
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub client: ClientSection,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub adapters: AdaptersConfig,
    /// Debug logging unless `RUST_LOG` says otherwise.
    #[serde(default)]
    pub verbose: Option<bool>,
}

/// Values supplied on the command line; they win over everything else.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub cluster: Option<String>,
    pub tools_dir: Option<PathBuf>,
    pub max_turns: Option<usize>,
    pub api_endpoint: Option<String>,
    pub model: Option<String>,
    pub duplicate_policy: Option<DuplicatePolicy>,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub cluster: Option<String>,
    pub api_key: Option<String>,
    pub api_endpoint: String,
    pub model: String,
    pub system_prompt: Option<String>,
    pub max_turns: usize,
    pub tools_dir: PathBuf,
    pub duplicate_policy: DuplicatePolicy,
    pub adapters: AdaptersConfig,
    pub verbose: bool,
}

impl Config {
    pub fn from_env_and_overrides(overrides: &ConfigOverrides) -> Result<Self> {
        let file_config = match &overrides.config_path {
            Some(path) => FileConfig::load_from(path)?,
            None => FileConfig::load()?,
        };
        Self::resolve(file_config, |key| env::var(key).ok(), overrides)
            .map_err(anyhow::Error::msg)
    }

    /// Merge the layers: CLI overrides > environment > file > defaults.
    pub fn resolve(
        file_config: FileConfig,
        env: impl Fn(&str) -> Option<String>,
        overrides: &ConfigOverrides,
    ) -> std::result::Result<Self, String> {
        let cluster = overrides
            .cluster
            .clone()
            .or_else(|| env("TOOLSMITH_CLUSTER"))
            .or(file_config.cluster)
            .filter(|c| !c.trim().is_empty());

        // API key only ever comes from the environment
        let api_key = env("AI_API_KEY").or_else(|| env("OPENROUTER_API_KEY"));

        let api_endpoint = overrides
            .api_endpoint
            .clone()
            .or_else(|| env("AI_API_ENDPOINT"))
            .or(file_config.api.endpoint)
            .map(|endpoint| normalize_endpoint(&endpoint))
            .unwrap_or_else(defaults::default_api_endpoint);

        let model = overrides
            .model
            .clone()
            .or_else(|| env("AI_MODEL"))
            .or(file_config.api.model)
            .unwrap_or_else(defaults::default_model);

        let system_prompt = env("AI_SYSTEM_PROMPT").or(file_config.client.system_prompt);

        let max_turns = match overrides.max_turns {
            Some(max_turns) => max_turns,
            None => match env("TOOLSMITH_MAX_TURNS") {
                Some(value) => value.trim().parse::<usize>().map_err(|_| {
                    format!(
                        "invalid TOOLSMITH_MAX_TURNS '{}' (expected a positive integer)",
                        value
                    )
                })?,
                None => file_config.client.max_turns,
            },
        };
        if max_turns == 0 {
            return Err("max_turns must be at least 1".to_string());
        }

        let tools_dir = overrides
            .tools_dir
            .clone()
            .or_else(|| env("TOOLSMITH_TOOLS_DIR").map(PathBuf::from))
            .or_else(|| {
                file_config
                    .tools
                    .dir
                    .as_deref()
                    .map(expand_env_var_in_string)
                    .filter(|s| !s.is_empty())
                    .map(|s| expand_home(&s))
            })
            .unwrap_or_else(default_tools_dir);

        let duplicate_policy = match overrides.duplicate_policy {
            Some(policy) => policy,
            None => match env("TOOLSMITH_DUPLICATE_POLICY") {
                Some(value) => value.parse()?,
                None => file_config.tools.duplicate_policy,
            },
        };

        let verbose = overrides.verbose
            || env("AI_VERBOSE")
                .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
                .or(file_config.verbose)
                .unwrap_or(false);

        Ok(Config {
            cluster,
            api_key,
            api_endpoint,
            model,
            system_prompt,
            max_turns,
            tools_dir,
            duplicate_policy,
            adapters: file_config.adapters,
            verbose,
        })
    }

    pub fn adapter_settings(&self) -> AdapterSettings {
        AdapterSettings::from_config(&self.adapters)
    }

    pub fn client_config(&self) -> ClientConfig {
        let cluster_line = self
            .cluster
            .as_ref()
            .map(|c| format!("The currently selected cluster is '{}'.", c));
        let system_prompt = match (cluster_line, &self.system_prompt) {
            (Some(line), Some(prompt)) => Some(format!("{}\n\n{}", line, prompt)),
            (Some(line), None) => Some(line),
            (None, prompt) => prompt.clone(),
        };

        ClientConfig {
            max_turns: self.max_turns,
            system_prompt,
            adapters: self.adapter_settings(),
        }
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        for path in Self::get_config_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }

        // No config file found, return default
        Ok(FileConfig::default())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        if contents.trim().is_empty() {
            return Ok(FileConfig::default());
        }
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // 1. Current directory (highest priority - local override)
        paths.push(PathBuf::from(".toolsmith.yaml"));
        paths.push(PathBuf::from(".toolsmith.yml"));

        // 2. User's config directory (global config)
        if let Some(home_dir) = dirs::home_dir() {
            let config_dir = home_dir.join(".config").join("toolsmith");
            paths.push(config_dir.join("toolsmith.yaml"));
            paths.push(config_dir.join("toolsmith.yml"));
        }

        paths
    }
}
