use serde::Serialize;
use serde_json::{json, Value};

use super::registry::Catalog;

/// Model-facing description of one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolSchema {
    /// OpenAI-style `function` tool entry.
    pub fn to_function(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

pub fn tool_schemas(catalog: &Catalog) -> Vec<ToolSchema> {
    catalog
        .iter()
        .map(|tool| ToolSchema {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.input_schema(),
        })
        .collect()
}

pub fn format_tools_for_llm(tools: &[ToolSchema]) -> Vec<Value> {
    tools.iter().map(ToolSchema::to_function).collect()
}
