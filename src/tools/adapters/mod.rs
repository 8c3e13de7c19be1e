mod http;
mod shell;

pub use http::{render_request, HttpAdapter, HttpResponse, RenderedRequest};
pub use shell::{render_command, ShellAdapter, ShellOutput};

use crate::config::AdaptersConfig;
use crate::error::AdapterInvocationError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use super::arguments::Arguments;
use super::definition::ToolDefinition;

/// Limits applied to every adapter call unless a tool overrides them.
#[derive(Debug, Clone)]
pub struct AdapterSettings {
    pub http_timeout: Duration,
    pub shell_timeout: Duration,
    pub max_output_bytes: u64,
}

impl AdapterSettings {
    pub fn from_config(config: &AdaptersConfig) -> Self {
        Self {
            http_timeout: Duration::from_secs(config.http_timeout_secs),
            shell_timeout: Duration::from_secs(config.shell_timeout_secs),
            max_output_bytes: config.max_output_bytes,
        }
    }
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self::from_config(&AdaptersConfig::default())
    }
}

/// What a successful invocation hands back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdapterOutput {
    Http(HttpResponse),
    Shell(ShellOutput),
}

/// Realizes a tool's side effect. Adapters hold no per-call state, so one
/// instance serves any number of concurrent calls.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn invoke(
        &self,
        tool: &ToolDefinition,
        arguments: &Arguments,
    ) -> Result<AdapterOutput, AdapterInvocationError>;
}
