//! Orchestration helpers shared by the session layer
//!
//! - System prompts bound to the current context
//! - Concurrent tool batch execution

mod dispatcher;
mod system_prompt;

pub use dispatcher::ToolDispatcher;
pub use system_prompt::{SystemPrompt, DEFAULT_SYSTEM_PROMPT};
