//! Turn orchestration
//!
//! Drives one user turn: send the conversation, stream the reply into the
//! timeline, execute any requested tools as a batch, send the results back and
//! repeat until the model answers with text or the round limit is hit.
//!
//! ```text
//! Idle → Sending → AwaitingModel ─┬─ text ───────────────▶ Idle
//!                                 └─ tool calls → ExecutingTools → AwaitingModel
//! ```
//!
//! Any failure appends a visible `Error: ...` message and ends the turn; the
//! session and the rest of the timeline are kept.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use super::types::{new_id, ActionMessage, GroundingChunk, Message, ModelMessage, ToolCall};
use crate::attachments::{validate_files, FileAttachment};
use crate::context::AIContext;
use crate::error::{Error, Result, ValidationError};
use crate::log_sink::{LogEntry, LogSink};
use crate::orchestration::ToolDispatcher;
use crate::provider::{HistoryEntry, ModelEvent, ModelRequest, ModelSession};
use crate::tools::CategorySet;

/// Default upper bound on tool rounds in one turn
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 10;

/// Where a turn writes its messages
pub trait MessageSink: Send + Sync {
    fn append(&self, message: Message);

    /// Replace the message with `id`, appending when it is unknown
    fn patch(&self, id: &str, message: Message);

    /// Conversation replayed to the model on every send
    fn history(&self) -> Vec<HistoryEntry>;
}

/// Single in-flight flag shared by turns and configuration changes
#[derive(Debug, Default)]
pub struct BusyFlag(AtomicBool);

impl BusyFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the flag, or `None` when it is already held
    pub fn try_acquire(self: &Arc<Self>) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.clone()))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases the [`BusyFlag`] on drop
#[derive(Debug)]
pub struct BusyGuard(Arc<BusyFlag>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.0.store(false, Ordering::Release);
    }
}

/// Reject empty input and oversized attachments before anything is recorded
pub fn validate_input(input: &str, files: &[FileAttachment]) -> std::result::Result<(), ValidationError> {
    if input.trim().is_empty() && files.is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    validate_files(files)
}

/// One user submission
pub struct Turn {
    pub input: String,
    pub files: Vec<FileAttachment>,
    pub session: Arc<dyn ModelSession>,
    pub context: AIContext,
    pub enabled: CategorySet,
}

/// What a completed turn did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnSummary {
    /// Tool batches executed
    pub tool_rounds: usize,
    pub tool_calls: usize,
}

/// What one model round produced
#[derive(Default)]
struct RoundOutput {
    text: String,
    tool_calls: Vec<ToolCall>,
}

pub struct TurnOrchestrator {
    dispatcher: ToolDispatcher,
    log: Arc<dyn LogSink>,
    max_tool_rounds: usize,
}

impl TurnOrchestrator {
    pub fn new(dispatcher: ToolDispatcher, log: Arc<dyn LogSink>) -> Self {
        Self {
            dispatcher,
            log,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
        }
    }

    pub fn with_max_tool_rounds(mut self, max_tool_rounds: usize) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self
    }

    pub fn max_tool_rounds(&self) -> usize {
        self.max_tool_rounds
    }

    fn log(&self, text: String) {
        self.log.record(LogEntry::now(text));
    }

    /// Run a turn to completion.
    ///
    /// The user message is appended before the first network call. On error an
    /// `Error: ...` model message is appended and the error is returned.
    pub async fn run_turn(&self, turn: Turn, sink: &dyn MessageSink) -> Result<TurnSummary> {
        let metas = turn.files.iter().map(|f| f.meta()).collect();
        sink.append(Message::user(turn.input.clone(), metas));
        self.log(format!(
            "Sending message ({}){}",
            turn.context.describe(),
            if turn.files.is_empty() {
                String::new()
            } else {
                format!(" with {} file(s)", turn.files.len())
            }
        ));

        match self.drive(&turn, sink).await {
            Ok(summary) => {
                info!(
                    tool_rounds = summary.tool_rounds,
                    tool_calls = summary.tool_calls,
                    "Turn completed"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                self.log(format!("Turn failed: {}", e));
                sink.append(Message::error(&e));
                Err(e)
            }
        }
    }

    async fn drive(&self, turn: &Turn, sink: &dyn MessageSink) -> Result<TurnSummary> {
        let mut summary = TurnSummary::default();

        loop {
            let request = ModelRequest {
                history: sink.history(),
                attachments: turn.files.clone(),
            };
            debug!(
                history = request.history.len(),
                round = summary.tool_rounds,
                "Sending model request"
            );

            let round = self.receive(turn.session.send(request).await?, sink).await?;

            if round.tool_calls.is_empty() {
                if round.text.is_empty() {
                    return Err(Error::Protocol("empty model response".to_string()));
                }
                return Ok(summary);
            }

            if summary.tool_rounds >= self.max_tool_rounds {
                return Err(Error::RoundLimit(self.max_tool_rounds));
            }

            self.log(format!(
                "Model requested {} tool call(s): {}",
                round.tool_calls.len(),
                round
                    .tool_calls
                    .iter()
                    .map(|c| c.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));

            let pending = Message::pending_action(round.tool_calls.clone());
            let action_id = pending.id().to_string();
            sink.append(pending);

            let results = self
                .dispatcher
                .execute_batch(&round.tool_calls, &turn.context, &turn.enabled)
                .await;

            summary.tool_rounds += 1;
            summary.tool_calls += round.tool_calls.len();
            sink.patch(
                &action_id,
                Message::Action(ActionMessage {
                    id: action_id.clone(),
                    tool_calls: round.tool_calls,
                    tool_results: Some(results),
                    is_loading: false,
                }),
            );
        }
    }

    /// Consume one model stream, streaming text into a single message
    async fn receive(
        &self,
        mut stream: crate::provider::EventStream,
        sink: &dyn MessageSink,
    ) -> Result<RoundOutput> {
        let mut output = RoundOutput::default();
        let mut message_id: Option<String> = None;
        let mut grounding: Option<Vec<GroundingChunk>> = None;

        while let Some(event) = stream.next().await {
            match event? {
                ModelEvent::TextDelta(delta) => {
                    output.text.push_str(&delta);
                }
                // An empty final text keeps what the deltas streamed
                ModelEvent::FinalText(text) => {
                    if text.is_empty() {
                        continue;
                    }
                    output.text = text;
                }
                ModelEvent::Grounding(chunks) => {
                    grounding.get_or_insert_with(Vec::new).extend(chunks);
                    if message_id.is_none() {
                        continue;
                    }
                }
                ModelEvent::ToolCalls(calls) => {
                    output.tool_calls.extend(calls);
                    continue;
                }
            }

            if output.text.is_empty() {
                continue;
            }
            let id = message_id.get_or_insert_with(new_id).clone();
            sink.patch(
                &id,
                Message::Model(ModelMessage {
                    id: id.clone(),
                    content: output.text.clone(),
                    grounding_chunks: grounding.clone(),
                    is_error: false,
                }),
            );
        }

        Ok(output)
    }
}
