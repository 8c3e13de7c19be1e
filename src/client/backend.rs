use crate::api::response::{extract_content, parse_tool_calls};
use crate::api::{build_http_client, make_api_request, RequestBody};
use crate::error::ClientError;
use crate::models::{Message, ToolCall};
use crate::tools::{format_tools_for_llm, ToolSchema};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;

/// One model response.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Final(String),
    ToolCalls {
        content: Option<String>,
        calls: Vec<ToolCall>,
    },
}

/// A language-model service that can take a conversation plus a tool catalog.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Establish (or verify) the session with the service.
    async fn connect(&self) -> Result<(), ClientError>;

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelReply, ClientError>;
}

/// Interpret an OpenAI-style chat completion body.
pub fn parse_reply(response_json: &Value) -> Result<ModelReply, ClientError> {
    let content = extract_content(response_json)?;
    match parse_tool_calls(response_json)? {
        Some(calls) => Ok(ModelReply::ToolCalls { content, calls }),
        None => Ok(ModelReply::Final(content.unwrap_or_default())),
    }
}

/// OpenAI-compatible `/chat/completions` backend.
pub struct ChatCompletionsBackend {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl ChatCompletionsBackend {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<&str>,
    ) -> Result<Self, ClientError> {
        Ok(Self {
            http: build_http_client(api_key)?,
            endpoint: endpoint.into(),
            model: model.into(),
        })
    }

    fn models_url(&self) -> String {
        let base = self
            .endpoint
            .strip_suffix("/chat/completions")
            .unwrap_or(&self.endpoint);
        format!("{}/models", base.trim_end_matches('/'))
    }
}

#[async_trait]
impl ModelBackend for ChatCompletionsBackend {
    async fn connect(&self) -> Result<(), ClientError> {
        let url = self.models_url();
        tracing::debug!(url = %url, "Checking model backend");
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ClientError::Connection(format!("{}: {}", url, e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Connection(
                format!("{} rejected the API key (status {})", url, response.status()),
            )),
            status if status.is_server_error() => Err(ClientError::Connection(format!(
                "{} is unavailable (status {})",
                url, status
            ))),
            _ => Ok(()),
        }
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
    ) -> Result<ModelReply, ClientError> {
        let request_body = RequestBody {
            model: self.model.clone(),
            messages: messages.to_vec(),
            stream: false,
            tools: if tools.is_empty() {
                None
            } else {
                Some(format_tools_for_llm(tools))
            },
        };

        tracing::debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "Making API request");
        let response = make_api_request(&self.http, &self.endpoint, &request_body).await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::Backend(format!(
                "API error (status {}): {}",
                status, error_text
            )));
        }

        let response_json: Value = response
            .json()
            .await
            .map_err(|e| ClientError::Backend(format!("Invalid response body: {}", e)))?;
        parse_reply(&response_json)
    }
}
