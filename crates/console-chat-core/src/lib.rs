//! Console Chat Core - natural-language chat over a backend platform project
//!
//! This crate provides the core functionality for console-chat:
//! - Context binding for the selected project, database, bucket and function
//! - Tool registry of platform operations, grouped into switchable categories
//! - Model session lifecycle and multi-round turn orchestration
//! - The message timeline and transcript persistence
//! - genai and reqwest adapters for the model and the platform API

pub mod attachments;
pub mod config;
pub mod context;
pub mod error;
pub mod log_sink;
pub mod orchestration;
pub mod platform;
pub mod provider;
pub mod session;
pub mod tools;

pub use attachments::{validate_files, FileAttachment, FileMeta, MAX_FILES, MAX_FILE_SIZE};
pub use config::{Config, ConfigManager, PlatformConfig};
pub use context::{bind, describe, AIContext, ResourceRef, Selection};
pub use error::{Error, PlatformError, Result, ToolError, ValidationError};
pub use log_sink::{LogEntry, LogSink, MemoryLogSink, TracingLogSink};
pub use platform::{HttpMethod, HttpPlatformClient, PlatformClient, PlatformRequest};
pub use provider::{
    EventStream, GenAIBackend, HistoryEntry, ModelBackend, ModelEvent, ModelRequest, ModelSession,
    SessionSpec,
};
pub use tools::{
    create_platform_tool_registry, CategorySet, Tool, ToolCategory, ToolDefinition, ToolRegistry,
};

// Session exports
pub use session::{
    ChatController, ControllerEvent, ControllerSettings, Message, SessionState, TurnOutcome,
};
