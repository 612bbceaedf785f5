//! Model request/response logging
//!
//! Set the `LLM_LOG_FILE` environment variable to append one JSON line per
//! model round to that file.
//!
//! Example: `LLM_LOG_FILE=/tmp/llm.log console-chat`

use std::io::Write;
use std::path::Path;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::session::types::ToolCall;
use crate::tools::ToolDefinition;

pub const LOG_FILE_ENV: &str = "LLM_LOG_FILE";

/// What to include in one log line
#[derive(Default)]
pub struct LogConfig<'a> {
    pub model: &'a str,
    pub provider: &'a str,
    pub history_len: usize,
    pub attachment_count: usize,
    pub tools: &'a [ToolDefinition],
    /// Final response text, if the round completed
    pub text: Option<&'a str>,
    pub tool_calls: &'a [ToolCall],
    pub error: Option<&'a str>,
}

impl LogConfig<'_> {
    fn to_json(&self) -> Value {
        json!({
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "model": self.model,
            "provider": self.provider,
            "request": {
                "history_len": self.history_len,
                "attachment_count": self.attachment_count,
                "tools": self.tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            },
            "response": {
                "type": if self.tool_calls.is_empty() { "message" } else { "tool_calls" },
                "text": self.text,
                "tool_calls": self.tool_calls.iter().map(|c| json!({
                    "id": c.id,
                    "name": c.name,
                    "args": c.args,
                })).collect::<Vec<_>>(),
            },
            "error": self.error,
        })
    }
}

/// Append the interaction to `LLM_LOG_FILE` when it is set
pub fn log_llm_interaction(config: LogConfig<'_>) {
    let Ok(log_file) = std::env::var(LOG_FILE_ENV) else {
        return;
    };
    write_entry(Path::new(&log_file), &config.to_json());
}

fn write_entry(path: &Path, entry: &Value) {
    match std::fs::OpenOptions::new().create(true).append(true).open(path) {
        Ok(mut file) => {
            if let Err(e) = writeln!(file, "{}", entry) {
                warn!("Failed to write to LLM log file: {}", e);
            }
        }
        Err(e) => {
            warn!("Failed to open LLM log file {}: {}", path.display(), e);
        }
    }

    debug!("Logged LLM interaction to {}", path.display());
}
