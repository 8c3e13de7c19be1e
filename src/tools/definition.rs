use crate::error::DefinitionError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use super::template::placeholders;

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
        }
    }

    /// Strict check, no coercion.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    name: String,
    param_type: ParamType,
    required: bool,
    default: Option<Value>,
    description: String,
    allowed: Option<Vec<Value>>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            default: None,
            description: String::new(),
            allowed: None,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_allowed(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn allowed(&self) -> Option<&[Value]> {
        self.allowed.as_deref()
    }

    fn schema(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("type".into(), json!(self.param_type.as_str()));
        if !self.description.is_empty() {
            schema.insert("description".into(), json!(self.description));
        }
        if let Some(default) = &self.default {
            schema.insert("default".into(), default.clone());
        }
        if let Some(allowed) = &self.allowed {
            schema.insert("enum".into(), Value::Array(allowed.clone()));
        }
        Value::Object(schema)
    }

    fn validate(&self) -> Result<(), String> {
        if !is_identifier(&self.name) {
            return Err(format!("invalid parameter name '{}'", self.name));
        }
        if let Some(default) = &self.default {
            if !self.param_type.matches(default) {
                return Err(format!(
                    "default for parameter '{}' must be of type {}, got {}",
                    self.name,
                    self.param_type.as_str(),
                    default
                ));
            }
        }
        if let Some(allowed) = &self.allowed {
            if allowed.is_empty() {
                return Err(format!("enum for parameter '{}' is empty", self.name));
            }
            if let Some(bad) = allowed.iter().find(|v| !self.param_type.matches(v)) {
                return Err(format!(
                    "enum value {} for parameter '{}' is not of type {}",
                    bad,
                    self.name,
                    self.param_type.as_str()
                ));
            }
            if let Some(default) = &self.default {
                if !allowed.contains(default) {
                    return Err(format!(
                        "default {} for parameter '{}' is not one of its enum values",
                        default, self.name
                    ));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpHandler {
    pub method: String,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShellHandler {
    /// argv template; the first token is the program and is never templated.
    pub command: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub working_dir: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    pub max_output_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerConfig {
    Http(HttpHandler),
    Shell(ShellHandler),
}

impl HandlerConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerConfig::Http(_) => "http",
            HandlerConfig::Shell(_) => "shell",
        }
    }

    /// Every string that may carry `{param}` placeholders.
    fn templates(&self) -> Vec<&str> {
        match self {
            HandlerConfig::Http(http) => {
                let mut templates = vec![http.url.as_str()];
                templates.extend(http.headers.values().map(String::as_str));
                templates.extend(http.body.as_deref());
                templates
            }
            HandlerConfig::Shell(shell) => shell.command.iter().map(String::as_str).collect(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            HandlerConfig::Http(http) => {
                if !HTTP_METHODS.contains(&http.method.as_str()) {
                    return Err(format!(
                        "unsupported HTTP method '{}' (expected one of {})",
                        http.method,
                        HTTP_METHODS.join(", ")
                    ));
                }
                if http.url.trim().is_empty() {
                    return Err("http handler requires a non-empty 'url'".to_string());
                }
            }
            HandlerConfig::Shell(shell) => {
                let program = shell
                    .command
                    .first()
                    .filter(|p| !p.trim().is_empty())
                    .ok_or_else(|| "shell handler requires a non-empty 'command'".to_string())?;
                if !placeholders(program).is_empty() {
                    return Err(format!(
                        "shell command program '{}' cannot contain placeholders",
                        program
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A validated tool. Construction is the only way to obtain one, so anything
/// held by a [`Registry`](super::Registry) has already passed every check.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    name: String,
    description: String,
    parameters: Vec<ParameterDefinition>,
    handler: HandlerConfig,
    source: PathBuf,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParameterDefinition>,
        handler: HandlerConfig,
        source: impl Into<PathBuf>,
    ) -> Result<Self, DefinitionError> {
        let tool = Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler,
            source: source.into(),
        };
        tool.validate()
            .map_err(|reason| DefinitionError::new(&tool.source, reason))?;
        Ok(tool)
    }

    fn validate(&self) -> Result<(), String> {
        if !is_tool_name(&self.name) {
            return Err(format!("invalid tool name '{}'", self.name));
        }

        let mut seen = HashSet::new();
        for param in &self.parameters {
            param
                .validate()
                .map_err(|e| format!("tool '{}': {}", self.name, e))?;
            if !seen.insert(param.name()) {
                return Err(format!(
                    "tool '{}': duplicate parameter '{}'",
                    self.name,
                    param.name()
                ));
            }
        }

        self.handler
            .validate()
            .map_err(|e| format!("tool '{}': {}", self.name, e))?;

        for template in self.handler.templates() {
            if let Some(unknown) = placeholders(template)
                .into_iter()
                .find(|p| !seen.contains(p))
            {
                return Err(format!(
                    "tool '{}': placeholder '{{{}}}' does not name a declared parameter",
                    self.name, unknown
                ));
            }
        }

        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn parameters(&self) -> &[ParameterDefinition] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|p| p.name() == name)
    }

    pub fn handler(&self) -> &HandlerConfig {
        &self.handler
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// JSON Schema (draft 7) for the argument object.
    pub fn input_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name().to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.is_required() && p.default().is_none())
            .map(|p| p.name())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false
        })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_tool_name(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}
