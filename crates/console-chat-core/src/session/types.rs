//! Conversation message types
//!
//! These are the messages shown to the user and replayed to the model. They
//! serialize with a `role` tag so a saved transcript reads naturally.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::attachments::FileMeta;

/// Unique identifier for a message
pub type MessageId = String;

/// Generate a fresh message or call id
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Model-issued call id, used to pair the result on the wire
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args,
        }
    }
}

/// Outcome of one tool call: the handler's payload or `{ "error": message }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub response: Value,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, response: Value) -> Self {
        Self {
            name: name.into(),
            response,
        }
    }

    pub fn error(name: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self {
            name: name.into(),
            response: json!({ "error": message.to_string() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.response
            .as_object()
            .is_some_and(|obj| obj.len() == 1 && obj.contains_key("error"))
    }

    pub fn error_message(&self) -> Option<&str> {
        if self.is_error() {
            self.response.get("error").and_then(|e| e.as_str())
        } else {
            None
        }
    }
}

/// Citation attached to a model response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroundingChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMessage {
    pub id: MessageId,
    pub content: String,
    /// Display metadata only, the bytes are never kept
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileMeta>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMessage {
    pub id: MessageId,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grounding_chunks: Option<Vec<GroundingChunk>>,
    /// Failure notice shown to the user, never replayed to the model
    #[serde(default)]
    pub is_error: bool,
}

/// One batch of tool calls and, once all resolve, their results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionMessage {
    pub id: MessageId,
    pub tool_calls: Vec<ToolCall>,
    pub tool_results: Option<Vec<ToolResult>>,
    pub is_loading: bool,
}

/// A timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    User(UserMessage),
    Model(ModelMessage),
    Action(ActionMessage),
}

impl Message {
    pub fn user(content: impl Into<String>, files: Vec<FileMeta>) -> Self {
        Self::User(UserMessage {
            id: new_id(),
            content: content.into(),
            files,
        })
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::Model(ModelMessage {
            id: new_id(),
            content: content.into(),
            grounding_chunks: None,
            is_error: false,
        })
    }

    /// Visible failure notice, rendered as `Error: <message>`
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self::Model(ModelMessage {
            id: new_id(),
            content: format!("Error: {}", message),
            grounding_chunks: None,
            is_error: true,
        })
    }

    /// Action for a batch that has not resolved yet
    pub fn pending_action(tool_calls: Vec<ToolCall>) -> Self {
        Self::Action(ActionMessage {
            id: new_id(),
            tool_calls,
            tool_results: None,
            is_loading: true,
        })
    }

    pub fn id(&self) -> &str {
        match self {
            Self::User(m) => &m.id,
            Self::Model(m) => &m.id,
            Self::Action(m) => &m.id,
        }
    }

    pub fn role(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Model(_) => "model",
            Self::Action(_) => "action",
        }
    }

    pub fn as_action(&self) -> Option<&ActionMessage> {
        match self {
            Self::Action(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&ModelMessage> {
        match self {
            Self::Model(m) => Some(m),
            _ => None,
        }
    }
}
