//! Backend platform API boundary
//!
//! Tools reach the platform through the [`PlatformClient`] trait. One call is
//! one remote operation; failures come back as [`PlatformError`] with a
//! human-readable message.

mod http;

pub use http::HttpPlatformClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PlatformError;

/// HTTP verb of a platform operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether leftover arguments travel in the query string rather than a body
    pub fn uses_query(&self) -> bool {
        matches!(self, HttpMethod::Get | HttpMethod::Delete)
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single platform operation, already scoped to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformRequest {
    pub project_id: String,
    pub method: HttpMethod,
    /// Path below the API root, e.g. `/databases/main/collections`
    pub path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl PlatformRequest {
    pub fn new(project_id: impl Into<String>, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Performs platform operations
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn call(&self, request: PlatformRequest) -> Result<Value, PlatformError>;
}
