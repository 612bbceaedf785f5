//! Error types for console-chat core

use thiserror::Error;

/// Result type alias using the console-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Console-chat error types
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any message was created
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Model session could not be constructed
    #[error("Session error: {0}")]
    Session(String),

    /// The last session build failed and the configuration has not changed since
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("No active project selected")]
    NoProject,

    /// A turn is in flight; the requested change must wait
    #[error("A turn is already in progress")]
    Busy,

    /// Model stream was malformed or ended unexpectedly
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Tool call round limit of {0} reached without a final response")]
    RoundLimit(usize),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Tool-specific errors
///
/// These never escape the dispatcher; they are rendered into the tool result
/// the model sees.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool '{name}' is disabled (category: {category})")]
    Disabled { name: String, category: String },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Platform(#[from] PlatformError),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// Errors raised by the backend platform client
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("Platform API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Attachment and input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Message is empty")]
    EmptyInput,

    #[error("Too many files: {count} attached, at most {max} allowed")]
    TooManyFiles { count: usize, max: usize },

    #[error("File '{name}' is {size} bytes, the limit is {max} bytes")]
    FileTooLarge { name: String, size: u64, max: u64 },

    #[error("A collection can only be selected after a database")]
    CollectionWithoutDatabase,
}
