//! Evaluation context for one tool script.
//!
//! A script is a YAML document. It is deserialized into a closed set of typed
//! blocks and replayed against three builder operations (`add_tool`,
//! `add_parameter`, `set_handler`). Nothing in a script is executed at load
//! time. When the script has been fully replayed the collected definitions are
//! handed to the bound [`Registry`] in one batch; any failure before that point
//! discards the whole file.
//!
//! ```yaml
//! tools:
//!   - name: get_item
//!     description: Fetch one item
//!     parameters:
//!       - { name: id, type: string, required: true }
//!     handler:
//!       http:
//!         url: https://api.example.com/items/{id}
//! ```

use crate::error::{DefinitionError, ScriptError};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::definition::{
    HandlerConfig, HttpHandler, ParamType, ParameterDefinition, ShellHandler, ToolDefinition,
};
use super::registry::Registry;
use super::template::split_command;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptDocument {
    /// `tools:` with nothing under it reads as null.
    #[serde(default)]
    tools: Option<Vec<ToolBlock>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ToolBlock {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    parameters: Vec<ParameterBlock>,
    handler: HandlerBlock,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParameterBlock {
    name: String,
    #[serde(rename = "type", default)]
    param_type: ParamType,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    default: Option<Value>,
    #[serde(default)]
    description: String,
    #[serde(rename = "enum", default)]
    allowed: Option<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HandlerBlock {
    http: Option<HttpBlock>,
    shell: Option<ShellBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpBlock {
    #[serde(default = "default_method")]
    method: String,
    url: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ShellBlock {
    command: CommandBlock,
    #[serde(default)]
    timeout_secs: Option<u64>,
    #[serde(default)]
    working_dir: Option<PathBuf>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    max_output_bytes: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandBlock {
    Line(String),
    Argv(Vec<String>),
}

fn default_enabled() -> bool {
    true
}

fn default_method() -> String {
    "GET".to_string()
}

/// The tool currently being declared.
#[derive(Debug)]
struct PendingTool {
    name: String,
    description: String,
    parameters: Vec<ParameterDefinition>,
    handler: Option<HandlerConfig>,
}

pub struct Interpreter<'r> {
    registry: &'r Registry,
    source: PathBuf,
    declared: Vec<ToolDefinition>,
    pending: Option<PendingTool>,
}

impl<'r> Interpreter<'r> {
    pub fn new(registry: &'r Registry, source: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            source: source.into(),
            declared: Vec::new(),
            pending: None,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Open a new tool block, closing the previous one.
    pub fn add_tool(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<(), DefinitionError> {
        self.close_pending()?;
        self.pending = Some(PendingTool {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
            handler: None,
        });
        Ok(())
    }

    pub fn add_parameter(&mut self, parameter: ParameterDefinition) -> Result<(), DefinitionError> {
        let pending = self.pending_mut("parameter")?;
        pending.parameters.push(parameter);
        Ok(())
    }

    pub fn set_handler(&mut self, handler: HandlerConfig) -> Result<(), DefinitionError> {
        let source = self.source.clone();
        let pending = self.pending_mut("handler")?;
        if pending.handler.is_some() {
            return Err(DefinitionError::new(
                source,
                format!("tool '{}' declares more than one handler", pending.name),
            ));
        }
        pending.handler = Some(handler);
        Ok(())
    }

    /// Close the last block and register everything this script declared.
    pub fn finish(mut self) -> Result<usize, ScriptError> {
        self.close_pending()?;
        let declared = std::mem::take(&mut self.declared);
        self.registry
            .register_all(declared)
            .map_err(|source| ScriptError::Duplicate {
                file: self.source.clone(),
                source,
            })
    }

    /// Evaluate a whole script and register its tools.
    pub fn evaluate(mut self, text: &str) -> Result<usize, ScriptError> {
        if text.trim().is_empty() {
            tracing::debug!(path = %self.source.display(), "Tool script is empty");
            return self.finish();
        }

        let document: ScriptDocument = serde_yaml::from_str(text)
            .map_err(|e| DefinitionError::new(&self.source, format!("invalid tool script: {}", e)))?;

        for block in document.tools.unwrap_or_default() {
            if !block.enabled {
                tracing::debug!(tool = %block.name, path = %self.source.display(), "Skipping disabled tool");
                continue;
            }
            self.add_tool(block.name, block.description)?;
            for param in block.parameters {
                self.add_parameter(parameter_from_block(param))?;
            }
            let handler = self.handler_from_block(block.handler)?;
            self.set_handler(handler)?;
        }

        self.finish()
    }

    fn pending_mut(&mut self, what: &str) -> Result<&mut PendingTool, DefinitionError> {
        match self.pending.as_mut() {
            Some(pending) => Ok(pending),
            None => Err(DefinitionError::new(
                &self.source,
                format!("{} declared outside of a tool block", what),
            )),
        }
    }

    fn close_pending(&mut self) -> Result<(), DefinitionError> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };
        let handler = pending.handler.ok_or_else(|| {
            DefinitionError::new(
                &self.source,
                format!("tool '{}' has no handler", pending.name),
            )
        })?;
        if self.declared.iter().any(|t| t.name() == pending.name) {
            return Err(DefinitionError::new(
                &self.source,
                format!("tool '{}' is declared more than once in this file", pending.name),
            ));
        }
        let tool = ToolDefinition::new(
            pending.name,
            pending.description,
            pending.parameters,
            handler,
            &self.source,
        )?;
        self.declared.push(tool);
        Ok(())
    }

    fn handler_from_block(&self, block: HandlerBlock) -> Result<HandlerConfig, DefinitionError> {
        match (block.http, block.shell) {
            (Some(http), None) => Ok(HandlerConfig::Http(HttpHandler {
                method: http.method.to_uppercase(),
                url: http.url,
                headers: http.headers,
                body: http.body,
                timeout_secs: http.timeout_secs,
            })),
            (None, Some(shell)) => {
                let command = match shell.command {
                    CommandBlock::Line(line) => split_command(&line)
                        .map_err(|e| DefinitionError::new(&self.source, e))?,
                    CommandBlock::Argv(argv) => argv,
                };
                Ok(HandlerConfig::Shell(ShellHandler {
                    command,
                    timeout_secs: shell.timeout_secs,
                    working_dir: shell.working_dir,
                    env: shell.env,
                    max_output_bytes: shell.max_output_bytes,
                }))
            }
            (Some(_), Some(_)) => Err(DefinitionError::new(
                &self.source,
                "handler must declare exactly one of 'http' or 'shell', found both",
            )),
            (None, None) => Err(DefinitionError::new(
                &self.source,
                "handler must declare exactly one of 'http' or 'shell'",
            )),
        }
    }
}

fn parameter_from_block(block: ParameterBlock) -> ParameterDefinition {
    let mut param = ParameterDefinition::new(block.name, block.param_type)
        .required(block.required)
        .with_description(block.description);
    if let Some(default) = block.default {
        param = param.with_default(default);
    }
    if let Some(allowed) = block.allowed {
        param = param.with_allowed(allowed);
    }
    param
}

/// Read and evaluate one script file against `registry`.
pub fn evaluate_file(registry: &Registry, path: &Path) -> Result<usize, ScriptError> {
    let text = fs::read_to_string(path).map_err(|source| ScriptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Interpreter::new(registry, path).evaluate(&text)
}
