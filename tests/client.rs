use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use toolsmith::client::{
    parse_reply, Client, ClientConfig, ClientState, ModelBackend, ModelReply, Outcome,
};
use toolsmith::error::{ClientError, TurnLimitExceeded};
use toolsmith::models::{Message, Role, ToolCall};
use toolsmith::tools::{Interpreter, Registry, ToolSchema};

const TOOLS: &str = r#"
tools:
  - name: echo
    description: Echo a message
    parameters: [{ name: msg, required: true }]
    handler: { shell: { command: "echo {msg}" } }
  - name: slow
    description: Answer after a pause
    handler:
      shell:
        command: ["sh", "-c", "sleep 0.3; echo slow"]
  - name: count
    parameters: [{ name: n, type: integer, required: true }]
    handler: { shell: { command: "echo {n}" } }
"#;

/// Replays canned replies and records every request it receives.
#[derive(Clone, Default)]
struct ScriptedBackend {
    replies: Arc<Mutex<VecDeque<ModelReply>>>,
    repeat: Option<ModelReply>,
    refuse: bool,
    requests: Arc<Mutex<Vec<(Vec<Message>, Vec<String>)>>>,
}

impl ScriptedBackend {
    fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<(Vec<Message>, Vec<String>)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn connect(&self) -> Result<(), ClientError> {
        if self.refuse {
            return Err(ClientError::Connection("401 Unauthorized".to_string()));
        }
        Ok(())
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelReply, ClientError> {
        self.requests.lock().unwrap().push((
            messages.to_vec(),
            tools.iter().map(|t| t.name.clone()).collect(),
        ));
        let next = self.replies.lock().unwrap().pop_front();
        next.or_else(|| self.repeat.clone())
            .ok_or_else(|| ClientError::Backend("script exhausted".to_string()))
    }
}

fn calls(calls: &[(&str, &str, &str)]) -> ModelReply {
    ModelReply::ToolCalls {
        content: None,
        calls: calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
            .collect(),
    }
}

fn registry() -> Arc<Registry> {
    let registry = Registry::default();
    Interpreter::new(&registry, "tools.yaml").evaluate(TOOLS).unwrap();
    Arc::new(registry)
}

fn tool_results(messages: &[Message]) -> Vec<(String, Value)> {
    messages
        .iter()
        .filter(|m| m.role == Role::Tool)
        .map(|m| {
            (
                m.tool_call_id.clone().unwrap(),
                serde_json::from_str(m.content.as_deref().unwrap()).unwrap(),
            )
        })
        .collect()
}

async fn connected(backend: ScriptedBackend, config: ClientConfig) -> Client<ScriptedBackend> {
    let mut client = Client::new(backend, registry(), config);
    client.connect().await.unwrap();
    client
}

#[tokio::test]
async fn test_send_before_connect() {
    let mut client = Client::new(ScriptedBackend::default(), registry(), ClientConfig::default());
    assert_eq!(client.state(), ClientState::Disconnected);

    let err = client.send_message("hi").await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
}

#[tokio::test]
async fn test_connection_refused() {
    let backend = ScriptedBackend {
        refuse: true,
        ..ScriptedBackend::default()
    };
    let mut client = Client::new(backend, registry(), ClientConfig::default());

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::Connection(_)));
    assert_eq!(client.state(), ClientState::Disconnected);
}

#[tokio::test]
async fn test_direct_answer() {
    let backend = ScriptedBackend::new(vec![ModelReply::Final("42".to_string())]);
    let config = ClientConfig {
        system_prompt: Some("You manage the cluster.".to_string()),
        ..ClientConfig::default()
    };
    let mut client = connected(backend.clone(), config).await;

    let conversation = client.send_message("what is the answer?").await.unwrap();
    assert_eq!(conversation.turns, 1);
    assert_eq!(conversation.into_answer(), Ok("42".to_string()));
    assert_eq!(client.state(), ClientState::Done);

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    let (messages, tools) = &requests[0];
    assert_eq!(messages[0], Message::system("You manage the cluster."));
    assert_eq!(messages[1], Message::user("what is the answer?"));
    assert_eq!(tools, &vec!["echo", "slow", "count"]);
}

#[tokio::test]
async fn test_tool_result_fed_back() {
    let backend = ScriptedBackend::new(vec![
        calls(&[("call_1", "echo", r#"{"msg": "; rm -rf /"}"#)]),
        ModelReply::Final("done".to_string()),
    ]);
    let mut client = connected(backend.clone(), ClientConfig::default()).await;

    let conversation = client.send_message("echo something").await.unwrap();
    assert_eq!(conversation.outcome, Outcome::Answer("done".to_string()));
    assert_eq!(conversation.turns, 2);

    let requests = backend.requests();
    let results = tool_results(&requests[1].0);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "call_1");
    assert_eq!(results[0].1["stdout"], "; rm -rf /\n");
    assert_eq!(results[0].1["exit_code"], 0);
}

#[tokio::test]
async fn test_unknown_tool_reported_to_model() {
    let backend = ScriptedBackend::new(vec![
        calls(&[("call_1", "delete_cluster", "{}")]),
        ModelReply::Final("sorry".to_string()),
    ]);
    let mut client = connected(backend.clone(), ClientConfig::default()).await;

    let answer = client.send_message("go").await.unwrap().into_answer().unwrap();
    assert_eq!(answer, "sorry");

    let results = tool_results(&backend.requests()[1].0);
    assert_eq!(results[0].1["error"]["kind"], "unknown_tool");
    assert!(results[0].1["error"]["message"]
        .as_str()
        .unwrap()
        .contains("delete_cluster"));
}

#[tokio::test]
async fn test_bad_arguments_reported_to_model() {
    let backend = ScriptedBackend::new(vec![
        calls(&[
            ("call_1", "count", r#"{"n": "many"}"#),
            ("call_2", "count", "{not json"),
            ("call_3", "count", r#"{"n": "3"}"#),
        ]),
        ModelReply::Final("ok".to_string()),
    ]);
    let mut client = connected(backend.clone(), ClientConfig::default()).await;
    client.send_message("count").await.unwrap();

    let results = tool_results(&backend.requests()[1].0);
    assert_eq!(results[0].1["error"]["kind"], "validation_error");
    assert_eq!(results[1].1["error"]["kind"], "invalid_arguments");
    assert_eq!(results[2].1["stdout"], "3\n");
}

#[tokio::test]
async fn test_malformed_call_does_not_end_conversation() {
    let reply = parse_reply(&json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "tool_calls": [
                    {"function": {"name": "echo", "arguments": "{\"msg\": \"lost\"}"}},
                    {"id": "call_obj", "function": {"name": "echo", "arguments": {"msg": "object"}}},
                    {"id": "call_bad", "function": {"name": "echo", "arguments": [1, 2]}}
                ]
            }
        }]
    }))
    .unwrap();
    let backend = ScriptedBackend::new(vec![reply, ModelReply::Final("recovered".to_string())]);
    let mut client = connected(backend.clone(), ClientConfig::default()).await;

    let conversation = client.send_message("go").await.unwrap();
    assert_eq!(conversation.outcome, Outcome::Answer("recovered".to_string()));
    assert_eq!(client.state(), ClientState::Done);

    let results = tool_results(&backend.requests()[1].0);
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, "call_0_missing_id");
    assert_eq!(results[0].1["error"]["kind"], "invalid_arguments");
    assert_eq!(results[1].0, "call_obj");
    assert_eq!(results[1].1["stdout"], "object\n");
    assert_eq!(results[2].0, "call_bad");
    assert_eq!(results[2].1["error"]["kind"], "invalid_arguments");
}

#[tokio::test]
async fn test_results_keep_request_order() {
    let backend = ScriptedBackend::new(vec![
        calls(&[
            ("call_slow", "slow", ""),
            ("call_fast", "echo", r#"{"msg": "fast"}"#),
        ]),
        ModelReply::Final("both".to_string()),
    ]);
    let mut client = connected(backend.clone(), ClientConfig::default()).await;
    client.send_message("race").await.unwrap();

    let messages = &backend.requests()[1].0;
    let assistant = messages
        .iter()
        .find(|m| m.role == Role::Assistant)
        .unwrap();
    assert_eq!(assistant.tool_calls.as_ref().map(Vec::len), Some(2));

    let results = tool_results(messages);
    assert_eq!(results[0].0, "call_slow");
    assert_eq!(results[0].1["stdout"], "slow\n");
    assert_eq!(results[1].0, "call_fast");
    assert_eq!(results[1].1["stdout"], "fast\n");
}

#[tokio::test]
async fn test_turn_limit_stops_after_exactly_max_turns() {
    let backend = ScriptedBackend {
        repeat: Some(calls(&[("call", "echo", r#"{"msg": "again"}"#)])),
        ..ScriptedBackend::default()
    };
    let config = ClientConfig {
        max_turns: 3,
        ..ClientConfig::default()
    };
    let mut client = connected(backend.clone(), config).await;

    let conversation = client.send_message("loop forever").await.unwrap();
    assert_eq!(conversation.outcome, Outcome::TurnLimitExceeded { turns: 3 });
    assert_eq!(backend.requests().len(), 3);
    assert_eq!(
        conversation.into_answer(),
        Err(TurnLimitExceeded { turns: 3 })
    );
}

#[tokio::test]
async fn test_backend_error_fails_conversation() {
    let backend = ScriptedBackend::new(vec![]);
    let mut client = connected(backend, ClientConfig::default()).await;

    let err = client.send_message("hello").await.unwrap_err();
    assert!(matches!(err, ClientError::Backend(_)));
    assert_eq!(client.state(), ClientState::Failed);
}

#[tokio::test]
async fn test_catalog_read_fresh_each_turn() {
    let backend = ScriptedBackend::new(vec![ModelReply::Final("ok".to_string())]);
    let mut client = connected(backend.clone(), ClientConfig::default()).await;

    Interpreter::new(client.registry(), "late.yaml")
        .evaluate("tools:\n  - name: late\n    handler: { shell: { command: \"true\" } }\n")
        .unwrap();
    assert_eq!(client.list_tools().len(), 4);

    client.send_message("hi").await.unwrap();
    assert!(backend.requests()[0].1.contains(&"late".to_string()));
}

#[tokio::test]
async fn test_reset_clears_history() {
    let backend = ScriptedBackend::new(vec![
        ModelReply::Final("first".to_string()),
        ModelReply::Final("second".to_string()),
    ]);
    let config = ClientConfig {
        system_prompt: Some("sys".to_string()),
        ..ClientConfig::default()
    };
    let mut client = connected(backend.clone(), config).await;

    client.send_message("one").await.unwrap();
    assert_eq!(client.history().len(), 3);
    client.reset();
    assert!(client.history().is_empty());
    assert_eq!(client.state(), ClientState::Connected);

    client.send_message("two").await.unwrap();
    let (messages, _) = &backend.requests()[1];
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::System);
}

#[test]
fn test_error_payload_shape() {
    let err = toolsmith::error::ToolError::from(toolsmith::error::UnknownToolError {
        name: "nope".to_string(),
    });
    let payload: Value = serde_json::from_str(&toolsmith::client::error_payload(&err)).unwrap();
    assert_eq!(
        payload,
        json!({"error": {"kind": "unknown_tool", "message": "tool 'nope' not found"}})
    );
}
