//! System prompt management
//!
//! The system instruction is part of a session's configuration: it embeds the
//! current selection, so a context change means a new session.

use crate::context::AIContext;

/// System prompt configuration and generation
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    base: String,
}

impl Default for SystemPrompt {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPrompt {
    pub fn new() -> Self {
        Self {
            base: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Create with custom base prompt
    pub fn with_base(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    /// Build the instruction for a session bound to `context`
    pub fn build(&self, context: &AIContext) -> String {
        let mut prompt = self.base.clone();
        prompt.push_str("\n\n## Current Context\n");
        prompt.push_str(&context.describe());
        prompt.push('\n');

        let ids: Vec<String> = [
            ("project_id", Some(&context.project)),
            ("database_id", context.database.as_ref()),
            ("collection_id", context.collection.as_ref()),
            ("bucket_id", context.bucket.as_ref()),
            ("function_id", context.function.as_ref()),
        ]
        .into_iter()
        .filter_map(|(key, resource)| resource.map(|r| format!("- {}: {}", key, r.id)))
        .collect();
        prompt.push_str(&ids.join("\n"));
        prompt
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an assistant embedded in a backend platform console. You help the user inspect and manage one project: its databases, collections and documents, storage buckets and files, functions and executions, users and teams.

## Guidelines
- Use the available tools to read live data instead of guessing. Only the tools you are offered are enabled.
- When a resource is selected below, tool arguments such as database_id or bucket_id default to it. Pass them explicitly to work on something else.
- Several independent lookups can be requested at once; they run in parallel.
- A tool result of the form {"error": "..."} means that call failed. Explain the failure instead of retrying blindly.
- Confirm with the user before deleting anything.
- Keep answers short. Summarize lists rather than dumping raw JSON unless asked."#;
