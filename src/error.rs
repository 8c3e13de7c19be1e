use std::path::PathBuf;
use thiserror::Error;

/// A tool script that could not be turned into valid definitions.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{}: {reason}", file.display())]
pub struct DefinitionError {
    pub file: PathBuf,
    pub reason: String,
}

impl DefinitionError {
    pub fn new(file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("tool '{name}' is already registered")]
pub struct DuplicateToolError {
    pub name: String,
}

/// Arguments rejected before any adapter side effect.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid arguments for tool '{tool}': {message}")]
pub struct ValidationError {
    pub tool: String,
    pub message: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("tool '{name}' not found")]
pub struct UnknownToolError {
    pub name: String,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdapterInvocationError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("execution timed out after {secs} seconds")]
    Timeout { secs: u64 },

    #[error("command exited with code {code}: {stderr}")]
    NonZeroExit {
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("output too large: {size} bytes (max: {max} bytes)")]
    OutputTooLarge { size: usize, max: u64 },

    #[error("failed to build request: {0}")]
    Render(String),

    #[error("{adapter} adapter cannot run tool '{tool}'")]
    Unsupported { adapter: &'static str, tool: String },
}

/// Every way a single tool call can fail. These are reported back to the
/// model, never raised out of the dispatch loop.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ToolError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Unknown(#[from] UnknownToolError),

    #[error(transparent)]
    Invocation(#[from] AdapterInvocationError),

    #[error("failed to parse arguments for tool '{tool}': {message}")]
    InvalidArguments { tool: String, message: String },
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "validation_error",
            ToolError::Unknown(_) => "unknown_tool",
            ToolError::Invocation(_) => "adapter_invocation_error",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
        }
    }
}

/// Why one tool script contributed nothing to the registry.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Definition(#[from] DefinitionError),

    #[error("{}: {source}", file.display())]
    Duplicate {
        file: PathBuf,
        #[source]
        source: DuplicateToolError,
    },
}

/// Failures that abort a whole load pass rather than a single file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("tools directory path is not valid UTF-8: {}", .0.display())]
    NonUtf8Root(PathBuf),

    #[error("invalid tools directory pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("connection to model backend failed: {0}")]
    Connection(String),

    #[error("client is not connected")]
    NotConnected,

    #[error("model backend error: {0}")]
    Backend(String),
}

/// The conversation was cut off before the model produced a final answer.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("conversation stopped after {turns} turns without a final answer")]
pub struct TurnLimitExceeded {
    pub turns: usize,
}
