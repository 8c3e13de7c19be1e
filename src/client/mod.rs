mod backend;

pub use backend::{parse_reply, ChatCompletionsBackend, ModelBackend, ModelReply};

use crate::error::{ClientError, ToolError, TurnLimitExceeded, UnknownToolError};
use crate::models::{Message, ToolCall};
use crate::tools::{tool_schemas, AdapterSettings, Registry, ToolExecutor, ToolSchema};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub max_turns: usize,
    pub system_prompt: Option<String>,
    pub adapters: AdapterSettings,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            system_prompt: None,
            adapters: AdapterSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Disconnected,
    Connected,
    AwaitingModel,
    DispatchingTools,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Answer(String),
    TurnLimitExceeded { turns: usize },
}

/// Result of one `send_message` call.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub outcome: Outcome,
    /// Model calls made for this message.
    pub turns: usize,
}

impl Conversation {
    pub fn into_answer(self) -> Result<String, TurnLimitExceeded> {
        match self.outcome {
            Outcome::Answer(answer) => Ok(answer),
            Outcome::TurnLimitExceeded { turns } => Err(TurnLimitExceeded { turns }),
        }
    }
}

/// Drives a conversation with a model backend, running the tools it asks for.
///
/// The registry is shared, not copied: every turn reads the current catalog,
/// so a reload shows up on the next model call.
pub struct Client<B> {
    backend: B,
    registry: Arc<Registry>,
    executor: ToolExecutor,
    config: ClientConfig,
    state: ClientState,
    history: Vec<Message>,
}

impl<B: ModelBackend> Client<B> {
    pub fn new(backend: B, registry: Arc<Registry>, config: ClientConfig) -> Self {
        let executor = ToolExecutor::new(config.adapters.clone());
        Self {
            backend,
            registry,
            executor,
            config,
            state: ClientState::Disconnected,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Forget the conversation so far. The connection is kept.
    pub fn reset(&mut self) {
        self.history.clear();
        if self.state != ClientState::Disconnected {
            self.state = ClientState::Connected;
        }
    }

    pub async fn connect(&mut self) -> Result<(), ClientError> {
        match self.backend.connect().await {
            Ok(()) => {
                tracing::debug!("Connected to model backend");
                self.state = ClientState::Connected;
                Ok(())
            }
            Err(e) => {
                self.state = ClientState::Disconnected;
                Err(e)
            }
        }
    }

    pub fn list_tools(&self) -> Vec<ToolSchema> {
        tool_schemas(&self.registry.all())
    }

    /// Run the turn loop for one user prompt.
    ///
    /// Tool failures never end the loop; they are returned to the model as
    /// error results. Only a backend failure is returned as `Err`.
    pub async fn send_message(&mut self, prompt: &str) -> Result<Conversation, ClientError> {
        if self.state == ClientState::Disconnected {
            return Err(ClientError::NotConnected);
        }

        if self.history.is_empty() {
            if let Some(system_prompt) = &self.config.system_prompt {
                self.history.push(Message::system(system_prompt.clone()));
            }
        }
        self.history.push(Message::user(prompt));

        for turn in 1..=self.config.max_turns {
            self.state = ClientState::AwaitingModel;
            let tools = self.list_tools();
            tracing::debug!(turn, tools = tools.len(), "Requesting model response");

            let reply = match self.backend.complete(&self.history, &tools).await {
                Ok(reply) => reply,
                Err(e) => {
                    self.state = ClientState::Failed;
                    return Err(e);
                }
            };

            match reply {
                ModelReply::ToolCalls { content, calls } if !calls.is_empty() => {
                    self.state = ClientState::DispatchingTools;
                    let results = self.dispatch(&calls).await;
                    self.history
                        .push(Message::assistant_tool_calls(content, calls));
                    self.history.extend(results);
                }
                ModelReply::ToolCalls { content, .. } => {
                    return Ok(self.finish(content.unwrap_or_default(), turn));
                }
                ModelReply::Final(answer) => {
                    return Ok(self.finish(answer, turn));
                }
            }
        }

        tracing::warn!(max_turns = self.config.max_turns, "Turn limit reached without a final answer");
        self.state = ClientState::Failed;
        Ok(Conversation {
            outcome: Outcome::TurnLimitExceeded {
                turns: self.config.max_turns,
            },
            turns: self.config.max_turns,
        })
    }

    fn finish(&mut self, answer: String, turns: usize) -> Conversation {
        self.history.push(Message::assistant(answer.clone()));
        self.state = ClientState::Done;
        Conversation {
            outcome: Outcome::Answer(answer),
            turns,
        }
    }

    /// Run every call from one turn concurrently. `join_all` yields results
    /// in the order the calls were requested.
    async fn dispatch(&self, calls: &[ToolCall]) -> Vec<Message> {
        join_all(calls.iter().map(|call| self.dispatch_one(call))).await
    }

    async fn dispatch_one(&self, call: &ToolCall) -> Message {
        let name = call.function.name.as_str();
        tracing::debug!(tool = %name, id = %call.id, "Dispatching tool call");

        let content = match self.run_tool(call).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(tool = %name, kind = e.kind(), error = %e, "Tool call failed");
                error_payload(&e)
            }
        };
        Message::tool_result(call.id.clone(), content)
    }

    async fn run_tool(&self, call: &ToolCall) -> Result<String, ToolError> {
        let name = &call.function.name;
        if let Some(reason) = &call.malformed {
            return Err(ToolError::InvalidArguments {
                tool: name.clone(),
                message: reason.clone(),
            });
        }
        let tool = self
            .registry
            .find(name)
            .ok_or_else(|| UnknownToolError { name: name.clone() })?;
        let arguments = parse_arguments(name, &call.function.arguments)?;
        let output = self.executor.invoke(&tool, &arguments).await?;
        Ok(serde_json::to_string(&output).unwrap_or_else(|e| {
            error_payload(&ToolError::InvalidArguments {
                tool: name.clone(),
                message: format!("failed to encode tool output: {}", e),
            })
        }))
    }
}

fn parse_arguments(tool: &str, arguments: &str) -> Result<Value, ToolError> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(arguments).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Structured error result fed back to the model.
pub fn error_payload(error: &ToolError) -> String {
    json!({
        "error": {
            "kind": error.kind(),
            "message": error.to_string(),
        }
    })
    .to_string()
}
