use crate::config::expand_env_vars;
use crate::error::AdapterInvocationError;
use async_trait::async_trait;
use serde::Serialize;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;

use super::{Adapter, AdapterOutput, AdapterSettings};
use crate::tools::arguments::Arguments;
use crate::tools::definition::{HandlerConfig, ShellHandler, ToolDefinition};
use crate::tools::template::{render, sole_placeholder};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShellOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Render an argv template. Each token is rendered on its own, so every
/// argument value ends up inside exactly one argv element no matter what it
/// contains. A token made only of a placeholder for an absent optional
/// parameter is dropped rather than passed as an empty argument.
pub fn render_command(command: &[String], arguments: &Arguments) -> Vec<String> {
    command
        .iter()
        .filter(|token| match sole_placeholder(token) {
            Some(name) => arguments.get(name).is_some_and(|v| !v.is_null()),
            None => true,
        })
        .map(|token| render(token, arguments))
        .collect()
}

pub struct ShellAdapter {
    settings: AdapterSettings,
}

impl ShellAdapter {
    pub fn new(settings: AdapterSettings) -> Self {
        Self { settings }
    }

    async fn call(
        &self,
        tool: &ToolDefinition,
        handler: &ShellHandler,
        arguments: &Arguments,
    ) -> Result<ShellOutput, AdapterInvocationError> {
        let start_time = Instant::now();
        let argv = render_command(&handler.command, arguments);
        let (program, args) = argv.split_first().ok_or_else(|| {
            AdapterInvocationError::Render(format!("tool '{}' has an empty command", tool.name()))
        })?;
        let timeout_duration = handler
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.settings.shell_timeout);
        let max_output_bytes = handler
            .max_output_bytes
            .unwrap_or(self.settings.max_output_bytes);

        tracing::debug!(
            tool = %tool.name(),
            program = %program,
            args = ?args,
            timeout_secs = timeout_duration.as_secs(),
            "Running command"
        );

        // No shell is involved: argv goes straight to the program.
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &handler.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in expand_env_vars(&handler.env) {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| AdapterInvocationError::Spawn {
            program: program.clone(),
            message: e.to_string(),
        })?;

        // Dropping the wait future on timeout kills the child.
        let output = timeout(timeout_duration, child.wait_with_output())
            .await
            .map_err(|_| AdapterInvocationError::Timeout {
                secs: timeout_duration.as_secs(),
            })?
            .map_err(|e| AdapterInvocationError::Spawn {
                program: program.clone(),
                message: format!("failed to wait for process: {}", e),
            })?;

        let exit_code = output.status.code().unwrap_or(-1);
        tracing::debug!(
            tool = %tool.name(),
            exit_code,
            duration_ms = start_time.elapsed().as_millis() as u64,
            output_size = output.stdout.len(),
            "Command finished"
        );

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(AdapterInvocationError::NonZeroExit {
                code: exit_code,
                stdout,
                stderr,
            });
        }

        if output.stdout.len() as u64 > max_output_bytes {
            return Err(AdapterInvocationError::OutputTooLarge {
                size: output.stdout.len(),
                max: max_output_bytes,
            });
        }

        Ok(ShellOutput {
            stdout,
            stderr,
            exit_code,
        })
    }
}

#[async_trait]
impl Adapter for ShellAdapter {
    async fn invoke(
        &self,
        tool: &ToolDefinition,
        arguments: &Arguments,
    ) -> Result<AdapterOutput, AdapterInvocationError> {
        match tool.handler() {
            HandlerConfig::Shell(handler) => self
                .call(tool, handler, arguments)
                .await
                .map(AdapterOutput::Shell),
            _ => Err(AdapterInvocationError::Unsupported {
                adapter: "shell",
                tool: tool.name().to_string(),
            }),
        }
    }
}
