use crate::error::ClientError;
use crate::models::ToolCall;
use serde_json::Value;

fn first_message(response_json: &Value) -> Result<&Value, ClientError> {
    let choices = response_json
        .get("choices")
        .and_then(|c| c.as_array())
        .ok_or_else(|| ClientError::Backend("No choices in response".to_string()))?;

    let first_choice = choices
        .first()
        .ok_or_else(|| ClientError::Backend("Empty choices array".to_string()))?;

    first_choice
        .get("message")
        .ok_or_else(|| ClientError::Backend("No message in response".to_string()))
}

/// Parse a non-streaming API response and extract tool calls if present.
///
/// Each call is parsed on its own. A call that cannot be run is kept, marked
/// malformed, so the model still gets a result for it.
pub fn parse_tool_calls(response_json: &Value) -> Result<Option<Vec<ToolCall>>, ClientError> {
    let message = first_message(response_json)?;

    match message.get("tool_calls") {
        Some(Value::Array(calls)) if !calls.is_empty() => Ok(Some(
            calls
                .iter()
                .enumerate()
                .map(|(index, call)| parse_tool_call(index, call))
                .collect(),
        )),
        _ => Ok(None),
    }
}

fn parse_tool_call(index: usize, call: &Value) -> ToolCall {
    let id = match call.get("id").and_then(|id| id.as_str()) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            let id = format!("call_{}_missing_id", index);
            tracing::warn!(index, id = %id, "Tool call without an id");
            return ToolCall::malformed(id, tool_name(call), "tool call has no id");
        }
    };

    let Some(function) = call.get("function") else {
        return ToolCall::malformed(id, "", "tool call has no function");
    };
    let name = match function.get("name").and_then(|n| n.as_str()) {
        Some(name) if !name.is_empty() => name,
        _ => return ToolCall::malformed(id, "", "tool call has no function name"),
    };

    // Some models send the argument object itself instead of its encoding.
    match function.get("arguments") {
        None | Some(Value::Null) => ToolCall::new(id, name, ""),
        Some(Value::String(arguments)) => ToolCall::new(id, name, arguments.as_str()),
        Some(arguments @ Value::Object(_)) => ToolCall::new(id, name, arguments.to_string()),
        Some(other) => ToolCall::malformed(
            id,
            name,
            format!("arguments must be a JSON object, got {}", other),
        ),
    }
}

fn tool_name(call: &Value) -> &str {
    call.get("function")
        .and_then(|f| f.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or_default()
}

/// Extract content from a non-streaming response
pub fn extract_content(response_json: &Value) -> Result<Option<String>, ClientError> {
    let message = first_message(response_json)?;

    Ok(message
        .get("content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string()))
}
