use serde_json::json;
use std::collections::BTreeMap;
use toolsmith::tools::arguments::prepare;
use toolsmith::tools::{HandlerConfig, HttpHandler, ParamType, ParameterDefinition, ToolDefinition};

fn search_tool() -> ToolDefinition {
    ToolDefinition::new(
        "search",
        "Search items",
        vec![
            ParameterDefinition::new("query", ParamType::String).required(true),
            ParameterDefinition::new("limit", ParamType::Integer).with_default(json!(10)),
            ParameterDefinition::new("ratio", ParamType::Number),
            ParameterDefinition::new("exact", ParamType::Boolean),
            ParameterDefinition::new("sort", ParamType::String)
                .with_allowed(vec![json!("asc"), json!("desc")]),
        ],
        HandlerConfig::Http(HttpHandler {
            method: "GET".to_string(),
            url: "https://api.example.com/search?q={query}&limit={limit}".to_string(),
            headers: BTreeMap::new(),
            body: None,
            timeout_secs: None,
        }),
        "search.yaml",
    )
    .unwrap()
}

#[test]
fn test_defaults_fill_absent_parameters() {
    let args = prepare(&search_tool(), &json!({"query": "rust"})).unwrap();
    assert_eq!(args.get("query"), Some(&json!("rust")));
    assert_eq!(args.get("limit"), Some(&json!(10)));
    assert!(args.get("ratio").is_none());
}

#[test]
fn test_numeric_string_coerced_to_integer() {
    let args = prepare(&search_tool(), &json!({"query": "rust", "limit": "42"})).unwrap();
    assert_eq!(args.get("limit"), Some(&json!(42)));
}

#[test]
fn test_loose_values_coerced() {
    let args = prepare(
        &search_tool(),
        &json!({"query": 7, "limit": 5.0, "ratio": "0.5", "exact": "true"}),
    )
    .unwrap();
    assert_eq!(args.get("query"), Some(&json!("7")));
    assert_eq!(args.get("limit"), Some(&json!(5)));
    assert_eq!(args.get("ratio"), Some(&json!(0.5)));
    assert_eq!(args.get("exact"), Some(&json!(true)));
}

#[test]
fn test_uncoercible_value_rejected() {
    let err = prepare(&search_tool(), &json!({"query": "rust", "limit": "abc"})).unwrap_err();
    assert_eq!(err.tool, "search");
    assert!(err.message.contains("parameter 'limit' expects integer"));
}

#[test]
fn test_missing_required_parameter() {
    let err = prepare(&search_tool(), &json!({"limit": 3})).unwrap_err();
    assert!(err.message.contains("missing required parameter 'query'"));
}

#[test]
fn test_null_counts_as_absent() {
    let err = prepare(&search_tool(), &json!({"query": null})).unwrap_err();
    assert!(err.message.contains("missing required parameter 'query'"));
}

#[test]
fn test_unknown_parameter_rejected() {
    let err = prepare(&search_tool(), &json!({"query": "rust", "page": 2})).unwrap_err();
    assert!(err.message.contains("unknown parameter 'page'"));
}

#[test]
fn test_enum_enforced() {
    assert!(prepare(&search_tool(), &json!({"query": "rust", "sort": "asc"})).is_ok());
    assert!(prepare(&search_tool(), &json!({"query": "rust", "sort": "random"})).is_err());
}

#[test]
fn test_non_object_arguments_rejected() {
    let err = prepare(&search_tool(), &json!(["rust"])).unwrap_err();
    assert!(err.message.contains("must be a JSON object"));
}

#[test]
fn test_null_arguments_treated_as_empty_object() {
    let tool = ToolDefinition::new(
        "ping",
        "",
        vec![],
        HandlerConfig::Http(HttpHandler {
            method: "GET".to_string(),
            url: "https://api.example.com/ping".to_string(),
            headers: BTreeMap::new(),
            body: None,
            timeout_secs: None,
        }),
        "ping.yaml",
    )
    .unwrap();
    assert!(prepare(&tool, &serde_json::Value::Null).unwrap().is_empty());
}
