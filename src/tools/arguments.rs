use crate::error::ValidationError;
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Number, Value};

use super::definition::{ParamType, ParameterDefinition, ToolDefinition};

/// Argument values after defaults and coercion, keyed by parameter name.
pub type Arguments = Map<String, Value>;

/// Turn model-supplied arguments into values the adapters can trust.
///
/// Unknown keys are rejected, defaults fill absent parameters, loosely typed
/// values are coerced (`"42"` for an integer), and the result is checked
/// against the tool's input schema.
pub fn prepare(tool: &ToolDefinition, raw: &Value) -> Result<Arguments, ValidationError> {
    let invalid = |message: String| ValidationError {
        tool: tool.name().to_string(),
        message,
    };

    let supplied = match raw {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(invalid(format!(
                "arguments must be a JSON object, got {}",
                type_name(other)
            )))
        }
    };

    if let Some(unknown) = supplied.keys().find(|k| tool.parameter(k).is_none()) {
        return Err(invalid(format!("unknown parameter '{}'", unknown)));
    }

    let mut arguments = Arguments::new();
    for param in tool.parameters() {
        match supplied.get(param.name()).filter(|v| !v.is_null()) {
            Some(value) => {
                let coerced = coerce(param, value).map_err(&invalid)?;
                arguments.insert(param.name().to_string(), coerced);
            }
            None => {
                if let Some(default) = param.default() {
                    arguments.insert(param.name().to_string(), default.clone());
                } else if param.is_required() {
                    return Err(invalid(format!(
                        "missing required parameter '{}'",
                        param.name()
                    )));
                }
            }
        }
    }

    let schema_value = tool.input_schema();
    let schema = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&schema_value)
        .map_err(|e| invalid(format!("invalid tool schema: {}", e)))?;

    let instance = Value::Object(arguments.clone());
    if let Err(errors) = schema.validate(&instance) {
        let messages: Vec<String> = errors
            .map(|e| format!("{}: {}", e.instance_path, e))
            .collect();
        return Err(invalid(messages.join("; ")));
    }

    Ok(arguments)
}

fn coerce(param: &ParameterDefinition, value: &Value) -> Result<Value, String> {
    let mismatch = || {
        format!(
            "parameter '{}' expects {}, got {}",
            param.name(),
            param.param_type().as_str(),
            describe(value)
        )
    };

    match (param.param_type(), value) {
        (ParamType::String, Value::String(_)) => Ok(value.clone()),
        (ParamType::String, Value::Number(n)) => Ok(Value::String(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Ok(Value::String(b.to_string())),

        (ParamType::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Ok(value.clone())
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| Value::from(f as i64))
                    .ok_or_else(mismatch)
            }
        }
        (ParamType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| mismatch()),

        (ParamType::Number, Value::Number(_)) => Ok(value.clone()),
        (ParamType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(mismatch),

        (ParamType::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (ParamType::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(mismatch()),
        },

        _ => Err(mismatch()),
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::String(s) => format!("string \"{}\"", s),
        other => format!("{} {}", type_name(other), other),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
