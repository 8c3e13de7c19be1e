use serde::{Deserialize, Serialize};

use crate::config::defaults::{
    default_http_timeout, default_max_output_bytes, default_max_turns, default_shell_timeout,
};
use crate::tools::DuplicatePolicy;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Root directory scanned for tool scripts.
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdaptersConfig {
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    #[serde(default = "default_shell_timeout")]
    pub shell_timeout_secs: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: u64,
}

impl Default for AdaptersConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: default_http_timeout(),
            shell_timeout_secs: default_shell_timeout(),
            max_output_bytes: default_max_output_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientSection {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            system_prompt: None,
        }
    }
}
