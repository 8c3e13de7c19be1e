use crate::api::RequestBody;
use crate::error::ClientError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

/// HTTP client carrying the bearer token and JSON content type on every
/// request.
pub fn build_http_client(api_key: Option<&str>) -> Result<reqwest::Client, ClientError> {
    let mut headers = HeaderMap::new();
    if let Some(api_key) = api_key {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key)).map_err(|e| {
                ClientError::Connection(format!("Invalid authorization header: {}", e))
            })?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .map_err(|e| ClientError::Connection(format!("Failed to build HTTP client: {}", e)))
}

pub async fn make_api_request(
    client: &reqwest::Client,
    api_endpoint: &str,
    request_body: &RequestBody,
) -> Result<reqwest::Response, ClientError> {
    client
        .post(api_endpoint)
        .json(request_body)
        .send()
        .await
        .map_err(|e| ClientError::Backend(format!("Network error: {}", e)))
}
