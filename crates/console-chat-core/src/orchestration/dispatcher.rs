//! Tool execution dispatcher
//!
//! Runs a batch of tool calls concurrently. Every call produces exactly one
//! [`ToolResult`] at the same index; failures (unknown tool, disabled category,
//! handler error, panic) become `{ "error": message }` for that call only.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::context::AIContext;
use crate::log_sink::{LogEntry, LogSink};
use crate::session::types::{ToolCall, ToolResult};
use crate::tools::{CategorySet, ToolRegistry};

#[derive(Clone)]
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    log: Arc<dyn LogSink>,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<ToolRegistry>, log: Arc<dyn LogSink>) -> Self {
        Self { registry, log }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Execute all calls, returning results in call order
    pub async fn execute_batch(
        &self,
        calls: &[ToolCall],
        context: &AIContext,
        enabled: &CategorySet,
    ) -> Vec<ToolResult> {
        let handles: Vec<_> = calls
            .iter()
            .cloned()
            .map(|call| {
                let registry = self.registry.clone();
                let log = self.log.clone();
                let context = context.clone();
                let enabled = enabled.clone();
                tokio::spawn(async move {
                    log.record(LogEntry::now(format!("Executing tool: {}", call.name)));
                    let result = match registry
                        .dispatch(&call.name, call.args.clone(), &context, &enabled)
                        .await
                    {
                        Ok(response) => ToolResult::success(&call.name, response),
                        Err(e) => ToolResult::error(&call.name, e),
                    };
                    match result.error_message() {
                        Some(message) => log.record(LogEntry::now(format!(
                            "Tool {} failed: {}",
                            call.name, message
                        ))),
                        None => log.record(LogEntry::now(format!("Tool {} completed", call.name))),
                    }
                    result
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (call, handle) in calls.iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "Tool task aborted");
                    self.log.record(LogEntry::now(format!(
                        "Tool {} aborted: {}",
                        call.name, e
                    )));
                    ToolResult::error(&call.name, format!("tool execution aborted: {}", e))
                }
            };
            results.push(result);
        }

        debug!(
            calls = calls.len(),
            failed = results.iter().filter(|r| r.is_error()).count(),
            "Tool batch finished"
        );
        results
    }
}
