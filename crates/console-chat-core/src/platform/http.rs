//! REST implementation of [`PlatformClient`]

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use super::{HttpMethod, PlatformClient, PlatformRequest};
use crate::config::PlatformConfig;
use crate::error::{Error, PlatformError, Result};

/// Talks to the platform's `/v1` REST API
pub struct HttpPlatformClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpPlatformClient {
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Self::DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    pub fn from_config(config: &PlatformConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.get_api_key())
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn call(&self, request: PlatformRequest) -> std::result::Result<Value, PlatformError> {
        let url = format!("{}{}", self.endpoint, request.path);
        debug!(method = %request.method, url = %url, "Platform request");

        let mut builder = self
            .http
            .request(Self::method(request.method), &url)
            .header("X-Appwrite-Project", &request.project_id)
            .header("X-Appwrite-Response-Format", "1.5.0");
        if let Some(key) = &self.api_key {
            builder = builder.header("X-Appwrite-Key", key);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PlatformError::Request(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PlatformError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(PlatformError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        parse_body(&text)
    }
}

/// Extract the `message` field of an error body, falling back to the raw text
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(|s| s.to_string()))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty error response".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

fn parse_body(body: &str) -> std::result::Result<Value, PlatformError> {
    if body.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(body).map_err(|e| PlatformError::InvalidResponse(e.to_string()))
}
