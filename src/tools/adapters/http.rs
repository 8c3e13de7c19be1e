use crate::config::expand_env_var_in_string;
use crate::error::AdapterInvocationError;
use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::time::{Duration, Instant};

use super::{Adapter, AdapterOutput, AdapterSettings};
use crate::tools::arguments::Arguments;
use crate::tools::definition::{HandlerConfig, HttpHandler, ToolDefinition};
use crate::tools::template::{render, render_with, sole_placeholder, value_to_string};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// A request with every template resolved, ready to send.
#[derive(Debug, Clone)]
pub struct RenderedRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<String>,
}

/// Everything but the unreserved characters of RFC 3986.
const URL_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Resolve a handler's templates against prepared arguments.
///
/// `${VAR}` references are expanded in the template before argument values
/// are substituted, so an argument can never pull in environment values.
/// Values are percent-encoded into the URL once; the template text itself is
/// left as written. A JSON body gets JSON-escaped values.
pub fn render_request(
    handler: &HttpHandler,
    arguments: &Arguments,
) -> Result<RenderedRequest, AdapterInvocationError> {
    let method = Method::from_bytes(handler.method.as_bytes())
        .map_err(|e| AdapterInvocationError::Render(format!("invalid method: {}", e)))?;

    let url = render_url(&handler.url, arguments)?;

    let mut headers = HeaderMap::new();
    for (name, template) in &handler.headers {
        let value = render(&expand_env_var_in_string(template), arguments);
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| AdapterInvocationError::Render(format!("invalid header '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(&value).map_err(|e| {
            AdapterInvocationError::Render(format!("invalid value for header '{}': {}", name, e))
        })?;
        headers.insert(name, value);
    }

    let body = handler
        .body
        .as_ref()
        .map(|template| render_body(template, arguments));
    if let Some(body) = &body {
        if !headers.contains_key(CONTENT_TYPE)
            && serde_json::from_str::<serde_json::Value>(body).is_ok()
        {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
    }

    Ok(RenderedRequest {
        method,
        url,
        headers,
        body,
    })
}

fn render_url(template: &str, arguments: &Arguments) -> Result<Url, AdapterInvocationError> {
    let template = expand_env_var_in_string(template);
    let path_end = template
        .find(|c: char| c == '?' || c == '#')
        .unwrap_or(template.len());

    let url_text = render_with(&template, arguments, |offset, value| {
        let value = value.map(value_to_string).unwrap_or_default();
        if offset < path_end && (value == "." || value == "..") {
            return Err(AdapterInvocationError::Render(format!(
                "'{}' is not a valid path value",
                value
            )));
        }
        Ok(utf8_percent_encode(&value, URL_COMPONENT).to_string())
    })?;

    Url::parse(&url_text)
        .map_err(|e| AdapterInvocationError::Render(format!("invalid URL '{}': {}", url_text, e)))
}

/// A body template shaped like a JSON document gets JSON-encoded values:
/// escaped text inside a string literal, a JSON value anywhere else. Other
/// bodies are rendered as plain text.
fn render_body(template: &str, arguments: &Arguments) -> String {
    let trimmed = template.trim();
    let is_json = (trimmed.starts_with('{') || trimmed.starts_with('['))
        && sole_placeholder(trimmed).is_none();
    if !is_json {
        return render(template, arguments);
    }

    let rendered = render_with(template, arguments, |offset, value| {
        if inside_json_string(&template[..offset]) {
            let text = value.map(value_to_string).unwrap_or_default();
            let quoted = Value::String(text).to_string();
            Ok::<_, Infallible>(quoted[1..quoted.len() - 1].to_string())
        } else {
            Ok(value.cloned().unwrap_or(Value::Null).to_string())
        }
    });
    match rendered {
        Ok(body) => body,
        Err(never) => match never {},
    }
}

fn inside_json_string(prefix: &str) -> bool {
    let mut inside = false;
    let mut escaped = false;
    for c in prefix.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if inside => escaped = true,
            '"' => inside = !inside,
            _ => {}
        }
    }
    inside
}

pub struct HttpAdapter {
    client: reqwest::Client,
    settings: AdapterSettings,
}

impl HttpAdapter {
    pub fn new(settings: AdapterSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    async fn call(
        &self,
        tool: &ToolDefinition,
        handler: &HttpHandler,
        arguments: &Arguments,
    ) -> Result<HttpResponse, AdapterInvocationError> {
        let start_time = Instant::now();
        let request = render_request(handler, arguments)?;
        let timeout = handler
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.settings.http_timeout);

        tracing::debug!(
            tool = %tool.name(),
            method = %request.method,
            url = %request.url,
            timeout_secs = timeout.as_secs(),
            "Sending HTTP request"
        );

        let url = request.url.to_string();
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers)
            .timeout(timeout);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let network_error = |e: reqwest::Error| {
            if e.is_timeout() {
                AdapterInvocationError::Timeout {
                    secs: timeout.as_secs(),
                }
            } else {
                AdapterInvocationError::Network {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        };

        let response = builder.send().await.map_err(&network_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let bytes = response.bytes().await.map_err(&network_error)?;

        if bytes.len() as u64 > self.settings.max_output_bytes {
            return Err(AdapterInvocationError::OutputTooLarge {
                size: bytes.len(),
                max: self.settings.max_output_bytes,
            });
        }

        tracing::debug!(
            tool = %tool.name(),
            status,
            duration_ms = start_time.elapsed().as_millis() as u64,
            output_size = bytes.len(),
            "HTTP request finished"
        );

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

#[async_trait]
impl Adapter for HttpAdapter {
    async fn invoke(
        &self,
        tool: &ToolDefinition,
        arguments: &Arguments,
    ) -> Result<AdapterOutput, AdapterInvocationError> {
        match tool.handler() {
            HandlerConfig::Http(handler) => self
                .call(tool, handler, arguments)
                .await
                .map(AdapterOutput::Http),
            _ => Err(AdapterInvocationError::Unsupported {
                adapter: "http",
                tool: tool.name().to_string(),
            }),
        }
    }
}
