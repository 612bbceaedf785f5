//! GenAI-based model backend
//!
//! Uses the genai framework to reach multiple LLM providers with manual tool
//! control: tool calls are surfaced to the engine, never executed here.
//!
//! ## LLM Request/Response Logging
//!
//! Set the `LLM_LOG_FILE` environment variable to append a JSON line per model
//! round (see [`super::logging`]).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use futures::StreamExt;
use genai::chat::{
    ChatMessage, ChatOptions, ChatRequest, ChatStream, ChatStreamEvent, ContentPart,
    MessageContent, ReasoningEffort, Tool, ToolResponse,
};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, WebConfig};
use tracing::{debug, error};

use super::logging::{log_llm_interaction, LogConfig};
use super::{catalog, EventStream, HistoryEntry, ModelBackend, ModelEvent, ModelRequest, ModelSession, SessionSpec};
use crate::attachments::FileAttachment;
use crate::error::{Error, Result};
use crate::session::types::{new_id, ToolCall};

/// Opens genai-backed sessions
#[derive(Debug, Default, Clone)]
pub struct GenAIBackend;

impl GenAIBackend {
    /// Default timeout for LLM API requests (5 minutes)
    const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

    pub fn new() -> Self {
        Self
    }

    fn web_config() -> WebConfig {
        WebConfig::default()
            .with_timeout(Self::DEFAULT_TIMEOUT)
            .with_connect_timeout(Duration::from_secs(30))
    }

    fn client(api_key: Option<String>) -> Client {
        let builder = Client::builder().with_web_config(Self::web_config());
        match api_key {
            Some(api_key) => {
                let auth_resolver = AuthResolver::from_resolver_fn(
                    move |_model_iden| -> std::result::Result<Option<AuthData>, genai::resolver::Error> {
                        Ok(Some(AuthData::from_single(api_key.clone())))
                    },
                );
                builder.with_auth_resolver(auth_resolver).build()
            }
            None => builder.build(),
        }
    }
}

#[async_trait]
impl ModelBackend for GenAIBackend {
    async fn open_session(&self, spec: SessionSpec) -> Result<Arc<dyn ModelSession>> {
        let provider = catalog::get(&spec.provider)
            .ok_or_else(|| Error::Session(format!("Unknown provider: {}", spec.provider)))?;

        if spec.model.trim().is_empty() {
            return Err(Error::Session(format!("No model configured for {}", provider.name)));
        }

        let api_key = spec.api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_none() && !provider.is_local() {
            return Err(Error::Session(format!(
                "No API key configured for {}. Set one with /key or via {}",
                provider.name,
                provider.api_key_env.as_deref().unwrap_or("the environment"),
            )));
        }

        debug!(
            provider = %spec.provider,
            model = %spec.model,
            tools = spec.tools.len(),
            thinking = spec.thinking,
            "Opening GenAI session"
        );

        Ok(Arc::new(GenAISession {
            client: Self::client(api_key),
            spec: Arc::new(spec),
        }))
    }
}

/// One configured genai conversation
pub struct GenAISession {
    client: Client,
    spec: Arc<SessionSpec>,
}

impl GenAISession {
    fn user_content(text: &str, attachments: &[FileAttachment]) -> MessageContent {
        let mut content = MessageContent::from_text(text);
        for file in attachments {
            let encoded = base64::engine::general_purpose::STANDARD.encode(&file.data);
            content = content.append(ContentPart::from_binary_base64(
                file.mime_type.clone(),
                encoded,
                Some(file.name.clone()),
            ));
        }
        content
    }

    fn build_request(&self, request: &ModelRequest) -> ChatRequest {
        let mut chat_req = ChatRequest::default().with_system(self.spec.system_instruction.as_str());

        let last_user = request
            .history
            .iter()
            .rposition(|e| matches!(e, HistoryEntry::User(_)));

        for (index, entry) in request.history.iter().enumerate() {
            match entry {
                HistoryEntry::User(text) => {
                    let attachments: &[FileAttachment] = if Some(index) == last_user {
                        &request.attachments
                    } else {
                        &[]
                    };
                    chat_req =
                        chat_req.append_message(ChatMessage::user(Self::user_content(text, attachments)));
                }
                HistoryEntry::Model(text) => {
                    chat_req = chat_req.append_message(ChatMessage::assistant(text.as_str()));
                }
                HistoryEntry::ToolExchange { calls, results } => {
                    // Tool calls go out as a single assistant message, followed by one response each
                    let genai_calls: Vec<genai::chat::ToolCall> = calls
                        .iter()
                        .map(|c| genai::chat::ToolCall {
                            call_id: c.id.clone(),
                            fn_name: c.name.clone(),
                            fn_arguments: c.args.clone(),
                            thought_signatures: None,
                        })
                        .collect();
                    chat_req = chat_req.append_message(genai_calls);

                    for (call, result) in calls.iter().zip(results) {
                        let content = serde_json::to_string(&result.response).unwrap_or_default();
                        chat_req = chat_req.append_message(ToolResponse::new(call.id.clone(), content));
                    }
                }
            }
        }

        if !self.spec.tools.is_empty() {
            let tools: Vec<Tool> = self
                .spec
                .tools
                .iter()
                .map(|t| {
                    Tool::new(&t.name)
                        .with_description(&t.description)
                        .with_schema(t.parameters.clone())
                })
                .collect();
            chat_req = chat_req.with_tools(tools);
        }

        chat_req
    }

    fn options(&self) -> Option<ChatOptions> {
        (self.spec.thinking && catalog::supports_thinking(&self.spec.provider))
            .then(|| ChatOptions::default().with_reasoning_effort(ReasoningEffort::Medium))
    }
}

#[async_trait]
impl ModelSession for GenAISession {
    async fn send(&self, request: ModelRequest) -> Result<EventStream> {
        let chat_req = self.build_request(&request);
        let options = self.options();

        let log = RoundLog {
            spec: self.spec.clone(),
            history_len: request.history.len(),
            attachment_count: request.attachments.len(),
        };

        let response = self
            .client
            .exec_chat_stream(&self.spec.model, chat_req, options.as_ref())
            .await
            .map_err(|e| {
                let message = format!("GenAI error: {}", e);
                log.record(None, &[], Some(&message));
                error!(error = ?e, model = %self.spec.model, "LLM request failed");
                Error::Provider(message)
            })?;

        let state = StreamState {
            stream: response.stream,
            text: String::new(),
            tool_calls: Vec::new(),
            pending: VecDeque::new(),
            done: false,
            log,
        };

        Ok(futures::stream::unfold(state, StreamState::next_event).boxed())
    }
}

/// Context for the `LLM_LOG_FILE` line of one round
struct RoundLog {
    spec: Arc<SessionSpec>,
    history_len: usize,
    attachment_count: usize,
}

impl RoundLog {
    fn record(&self, text: Option<&str>, tool_calls: &[ToolCall], error: Option<&str>) {
        log_llm_interaction(LogConfig {
            model: &self.spec.model,
            provider: &self.spec.provider,
            history_len: self.history_len,
            attachment_count: self.attachment_count,
            tools: &self.spec.tools,
            text,
            tool_calls,
            error,
        });
    }
}

/// Translates the genai stream into [`ModelEvent`]s
struct StreamState {
    stream: ChatStream,
    text: String,
    tool_calls: Vec<ToolCall>,
    pending: VecDeque<ModelEvent>,
    done: bool,
    log: RoundLog,
}

impl StreamState {
    async fn next_event(mut self) -> Option<(Result<ModelEvent>, Self)> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some((Ok(event), self));
            }
            if self.done {
                return None;
            }

            match self.stream.next().await {
                Some(Ok(ChatStreamEvent::Chunk(chunk))) => {
                    if chunk.content.is_empty() {
                        continue;
                    }
                    self.text.push_str(&chunk.content);
                    return Some((Ok(ModelEvent::TextDelta(chunk.content)), self));
                }
                Some(Ok(ChatStreamEvent::ToolCallChunk(tc))) => {
                    let call = tc.tool_call;
                    let id = if call.call_id.is_empty() { new_id() } else { call.call_id };
                    self.tool_calls.push(ToolCall::new(id, call.fn_name, call.fn_arguments));
                }
                Some(Ok(ChatStreamEvent::ReasoningChunk(chunk))) => {
                    debug!(len = chunk.content.len(), "Reasoning chunk");
                }
                Some(Ok(ChatStreamEvent::End(_))) | None => self.finish(),
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    self.done = true;
                    let message = format!("GenAI stream error: {}", e);
                    self.log.record(None, &[], Some(&message));
                    error!(error = ?e, model = %self.log.spec.model, "LLM stream error");
                    return Some((Err(Error::Provider(message)), self));
                }
            }
        }
    }

    fn finish(&mut self) {
        self.done = true;
        let text = (!self.text.is_empty()).then_some(self.text.as_str());
        self.log.record(text, &self.tool_calls, None);

        if !self.text.is_empty() {
            self.pending.push_back(ModelEvent::FinalText(std::mem::take(&mut self.text)));
        }
        if !self.tool_calls.is_empty() {
            self.pending
                .push_back(ModelEvent::ToolCalls(std::mem::take(&mut self.tool_calls)));
        }
    }
}
