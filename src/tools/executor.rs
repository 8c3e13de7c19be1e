use crate::error::ToolError;
use serde_json::Value;

use super::adapters::{Adapter, AdapterOutput, AdapterSettings, HttpAdapter, ShellAdapter};
use super::arguments::prepare;
use super::definition::{HandlerConfig, ToolDefinition};

/// Runs tools: validates arguments, then hands them to the adapter that
/// matches the tool's handler.
pub struct ToolExecutor {
    http: HttpAdapter,
    shell: ShellAdapter,
}

impl ToolExecutor {
    pub fn new(settings: AdapterSettings) -> Self {
        Self {
            http: HttpAdapter::new(settings.clone()),
            shell: ShellAdapter::new(settings),
        }
    }

    /// Resolved per call from the handler configuration.
    pub fn adapter_for(&self, tool: &ToolDefinition) -> &dyn Adapter {
        match tool.handler() {
            HandlerConfig::Http(_) => &self.http,
            HandlerConfig::Shell(_) => &self.shell,
        }
    }

    pub async fn invoke(
        &self,
        tool: &ToolDefinition,
        arguments: &Value,
    ) -> Result<AdapterOutput, ToolError> {
        let arguments = prepare(tool, arguments)?;
        tracing::debug!(tool = %tool.name(), kind = tool.handler().kind(), "Invoking tool");
        let output = self.adapter_for(tool).invoke(tool, &arguments).await?;
        Ok(output)
    }
}

impl Default for ToolExecutor {
    fn default() -> Self {
        Self::new(AdapterSettings::default())
    }
}
