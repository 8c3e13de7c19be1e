pub mod adapters;
pub mod arguments;
pub mod catalog;
pub mod definition;
pub mod executor;
pub mod interpreter;
pub mod loader;
pub mod registry;
pub mod template;

pub use adapters::{Adapter, AdapterOutput, AdapterSettings};
pub use catalog::{format_tools_for_llm, tool_schemas, ToolSchema};
pub use definition::{
    HandlerConfig, HttpHandler, ParamType, ParameterDefinition, ShellHandler, ToolDefinition,
};
pub use executor::ToolExecutor;
pub use interpreter::Interpreter;
pub use loader::{LoadFailure, LoadSummary, ToolLoader};
pub use registry::{Catalog, DuplicatePolicy, Registry};
