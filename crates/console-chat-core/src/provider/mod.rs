//! Language-model backend abstraction
//!
//! The engine talks to a model through two traits: a [`ModelBackend`] opens a
//! [`ModelSession`] for one configuration (model, tools, system instruction,
//! thinking), and the session turns a [`ModelRequest`] into a stream of
//! [`ModelEvent`]s. `GenAIBackend` implements both over the genai framework,
//! which covers:
//! - Google Gemini
//! - OpenAI
//! - Anthropic
//! - Groq, DeepSeek, xAI
//! - Ollama (local)

pub mod catalog;
mod genai_provider;
mod logging;

pub use genai_provider::{GenAIBackend, GenAISession};

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::attachments::FileAttachment;
use crate::error::Result;
use crate::session::types::{GroundingChunk, ToolCall, ToolResult};
use crate::tools::ToolDefinition;

/// One replayed conversation step
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEntry {
    User(String),
    Model(String),
    /// A resolved tool batch: calls and their results in the same order
    ToolExchange {
        calls: Vec<ToolCall>,
        results: Vec<ToolResult>,
    },
}

/// What gets sent on each model round
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    /// Full conversation so far, oldest first
    pub history: Vec<HistoryEntry>,
    /// Files for the current turn, attached to the last user entry
    pub attachments: Vec<FileAttachment>,
}

impl ModelRequest {
    pub fn tool_names(&self) -> Vec<&str> {
        self.history
            .iter()
            .filter_map(|e| match e {
                HistoryEntry::ToolExchange { calls, .. } => Some(calls),
                _ => None,
            })
            .flatten()
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// Events a model session streams back for one request
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    TextDelta(String),
    ToolCalls(Vec<ToolCall>),
    /// Complete text of the response, replacing any streamed deltas
    FinalText(String),
    Grounding(Vec<GroundingChunk>),
}

pub type EventStream = BoxStream<'static, Result<ModelEvent>>;

/// Everything a session is built from
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSpec {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub system_instruction: String,
    pub tools: Vec<ToolDefinition>,
    pub thinking: bool,
}

/// Creates model sessions
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn open_session(&self, spec: SessionSpec) -> Result<Arc<dyn ModelSession>>;
}

/// A configured model conversation
#[async_trait]
pub trait ModelSession: Send + Sync {
    async fn send(&self, request: ModelRequest) -> Result<EventStream>;
}
