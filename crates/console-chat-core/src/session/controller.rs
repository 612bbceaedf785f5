//! Chat controller
//!
//! Single owner of everything a chat surface mutates: the selection, tool
//! categories, model settings, the message timeline, the busy flag and the
//! model session. Frontends call its methods and watch the
//! [`ControllerEvent`] channel; nothing else holds mutable chat state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::manager::{SessionConfig, SessionManager, SessionState};
use super::persistence::SavedTranscript;
use super::timeline::MessageTimeline;
use super::turn::{validate_input, BusyFlag, BusyGuard, MessageSink, Turn, TurnOrchestrator, TurnSummary};
use super::types::Message;
use crate::attachments::FileAttachment;
use crate::config::Config;
use crate::context::{AIContext, ResourceRef, Selection};
use crate::error::{Error, Result, ValidationError};
use crate::log_sink::{LogEntry, LogSink};
use crate::orchestration::{SystemPrompt, ToolDispatcher};
use crate::provider::{HistoryEntry, ModelBackend};
use crate::tools::{CategorySet, ToolCategory, ToolDefinition, ToolRegistry};

/// Notifications for the UI, in causal order
#[derive(Debug, Clone, PartialEq)]
pub enum ControllerEvent {
    /// A message was appended or patched; match on its id
    Message(Message),
    /// The timeline was emptied
    Cleared,
    /// Standing error changed; `None` clears it
    Error(Option<String>),
    Busy(bool),
    Log(LogEntry),
}

/// Result of [`ChatController::submit`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed(TurnSummary),
    Failed(String),
    /// Another turn was in flight; nothing happened
    Ignored,
}

/// Model settings the session is built from
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub thinking: bool,
    pub enabled: CategorySet,
    pub max_tool_rounds: usize,
}

impl ControllerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            provider: config.provider.clone(),
            model: config.model(),
            api_key: config.get_api_key(),
            thinking: config.thinking,
            enabled: config.category_set(),
            max_tool_rounds: config.max_tool_rounds,
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Mirrors log entries onto the event channel
struct EventLogSink {
    inner: Arc<dyn LogSink>,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl LogSink for EventLogSink {
    fn record(&self, entry: LogEntry) {
        let _ = self.events.send(ControllerEvent::Log(entry.clone()));
        self.inner.record(entry);
    }
}

struct State {
    selection: Selection,
    settings: ControllerSettings,
    timeline: MessageTimeline,
    last_error: Option<String>,
    /// Id and creation time of the transcript being continued
    transcript: Option<(String, DateTime<Utc>)>,
}

struct Inner {
    state: Mutex<State>,
    sessions: tokio::sync::Mutex<SessionManager>,
    orchestrator: TurnOrchestrator,
    registry: Arc<ToolRegistry>,
    busy: Arc<BusyFlag>,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl Inner {
    fn emit(&self, event: ControllerEvent) {
        let _ = self.events.send(event);
    }

    fn set_error(&self, error: Option<String>) {
        {
            let mut state = self.state.lock();
            if state.last_error == error {
                return;
            }
            state.last_error = error.clone();
        }
        self.emit(ControllerEvent::Error(error));
    }

    fn clear_timeline(&self) {
        {
            let mut state = self.state.lock();
            state.timeline.clear();
            state.transcript = None;
        }
        self.emit(ControllerEvent::Cleared);
    }

    fn session_config(&self) -> Option<SessionConfig> {
        let state = self.state.lock();
        let context = state.selection.context()?;
        let settings = &state.settings;
        Some(SessionConfig {
            provider: settings.provider.clone(),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            thinking: settings.thinking,
            enabled: settings.enabled.clone(),
            context,
        })
    }
}

impl MessageSink for Inner {
    fn append(&self, message: Message) {
        self.state.lock().timeline.append(message.clone());
        self.emit(ControllerEvent::Message(message));
    }

    fn patch(&self, id: &str, message: Message) {
        self.state.lock().timeline.patch(id, message.clone());
        self.emit(ControllerEvent::Message(message));
    }

    fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().timeline.history()
    }
}

#[derive(Clone)]
pub struct ChatController {
    inner: Arc<Inner>,
}

impl ChatController {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        log: Arc<dyn LogSink>,
        settings: ControllerSettings,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        Self::with_prompt(backend, registry, log, settings, SystemPrompt::new())
    }

    pub fn with_prompt(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        log: Arc<dyn LogSink>,
        settings: ControllerSettings,
        prompt: SystemPrompt,
    ) -> (Self, mpsc::UnboundedReceiver<ControllerEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let log: Arc<dyn LogSink> = Arc::new(EventLogSink {
            inner: log,
            events: events.clone(),
        });

        let dispatcher = ToolDispatcher::new(registry.clone(), log.clone());
        let orchestrator = TurnOrchestrator::new(dispatcher, log.clone())
            .with_max_tool_rounds(settings.max_tool_rounds);
        let sessions = SessionManager::new(backend, registry.clone(), prompt, log);

        let inner = Inner {
            state: Mutex::new(State {
                selection: Selection::new(),
                settings,
                timeline: MessageTimeline::new(),
                last_error: None,
                transcript: None,
            }),
            sessions: tokio::sync::Mutex::new(sessions),
            orchestrator,
            registry,
            busy: Arc::new(BusyFlag::new()),
            events,
        };

        (Self { inner: Arc::new(inner) }, events_rx)
    }

    fn acquire(&self) -> Option<BusyGuard> {
        let guard = self.inner.busy.try_acquire()?;
        self.inner.emit(ControllerEvent::Busy(true));
        Some(guard)
    }

    fn release(&self, guard: BusyGuard) {
        drop(guard);
        self.inner.emit(ControllerEvent::Busy(false));
    }

    /// Bring the session in line with the current configuration.
    ///
    /// Must be called with the busy flag held. Failures become the standing
    /// error.
    async fn refresh_session(&self) -> Result<()> {
        let mut sessions = self.inner.sessions.lock().await;
        let Some(config) = self.inner.session_config() else {
            sessions.reset();
            self.inner.set_error(None);
            return Err(Error::NoProject);
        };

        match sessions.ensure_session(&config).await {
            Ok(outcome) => {
                if outcome.project_changed {
                    debug!(project = %config.context.project.id, "Session rebuilt for new project");
                }
                self.inner.set_error(None);
                Ok(())
            }
            Err(e) => {
                self.inner.set_error(Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Apply a configuration change and eagerly rebuild the session.
    ///
    /// Leaving a project clears the timeline whether or not the rebuild
    /// succeeds.
    async fn reconfigure<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut State) -> Result<()>,
    {
        let guard = self.acquire().ok_or(Error::Busy)?;
        let (applied, left_project) = {
            let mut state = self.inner.state.lock();
            let before = state.selection.project().map(|p| p.id.clone());
            let applied = change(&mut state);
            let after = state.selection.project().map(|p| p.id.clone());
            (applied, before.is_some() && before != after)
        };
        if left_project {
            self.inner.clear_timeline();
        }
        if applied.is_ok() {
            // Session failures surface as the standing error, not as a failed change
            match self.refresh_session().await {
                Ok(()) | Err(Error::NoProject) => {}
                Err(e) => debug!(error = %e, "Session not available after change"),
            }
        }
        self.release(guard);
        applied
    }

    /// Send a user message and run the turn to completion.
    ///
    /// Returns `Err` only for invalid input, before anything is recorded.
    pub async fn submit(&self, text: impl Into<String>, files: Vec<FileAttachment>) -> Result<TurnOutcome> {
        let text = text.into();
        validate_input(&text, &files)?;

        let Some(guard) = self.acquire() else {
            debug!("Submission ignored, turn in flight");
            return Ok(TurnOutcome::Ignored);
        };

        let outcome = self.run_submission(text, files).await;
        self.release(guard);
        Ok(outcome)
    }

    async fn run_submission(&self, text: String, files: Vec<FileAttachment>) -> TurnOutcome {
        if let Err(e) = self.refresh_session().await {
            let message = e.to_string();
            self.inner.set_error(Some(message.clone()));
            return TurnOutcome::Failed(message);
        }

        let (session, config) = {
            let sessions = self.inner.sessions.lock().await;
            match (sessions.session(), sessions.config().cloned()) {
                (Some(session), Some(config)) => (session, config),
                _ => return TurnOutcome::Failed(Error::NoProject.to_string()),
            }
        };

        let turn = Turn {
            input: text,
            files,
            session,
            context: config.context,
            enabled: config.enabled,
        };

        match self.inner.orchestrator.run_turn(turn, &*self.inner).await {
            Ok(summary) => TurnOutcome::Completed(summary),
            Err(e) => TurnOutcome::Failed(e.to_string()),
        }
    }

    /// Submit the last user message's text again. Attachments are not resent.
    pub async fn resend(&self) -> Result<TurnOutcome> {
        let text = self
            .inner
            .state
            .lock()
            .timeline
            .last_user_message()
            .map(|m| m.content.clone())
            .ok_or(Error::Validation(ValidationError::EmptyInput))?;
        self.submit(text, Vec::new()).await
    }

    /// Empty the timeline and start a fresh model session
    pub async fn clear_chat(&self) -> Result<()> {
        let guard = self.acquire().ok_or(Error::Busy)?;
        self.inner.clear_timeline();
        self.inner.sessions.lock().await.invalidate();
        info!("Chat cleared");
        let _ = self.refresh_session().await;
        self.release(guard);
        Ok(())
    }

    /// Replace the timeline with a saved transcript
    pub async fn load_transcript(&self, transcript: SavedTranscript) -> Result<()> {
        let guard = self.acquire().ok_or(Error::Busy)?;
        {
            let mut state = self.inner.state.lock();
            state.timeline = MessageTimeline::from_messages(transcript.messages.clone());
            state.transcript = Some((transcript.id.clone(), transcript.created_at));
        }
        self.inner.emit(ControllerEvent::Cleared);
        for message in transcript.messages {
            self.inner.emit(ControllerEvent::Message(message));
        }
        self.inner.sessions.lock().await.invalidate();
        let _ = self.refresh_session().await;
        self.release(guard);
        Ok(())
    }

    /// Current timeline as a transcript; saving it again overwrites the same file
    pub fn snapshot(&self) -> SavedTranscript {
        let mut state = self.inner.state.lock();
        let project_id = state.selection.project().map(|p| p.id.clone());
        let messages = state.timeline.messages().to_vec();
        let mut transcript = SavedTranscript::new(project_id, messages);
        match &state.transcript {
            Some((id, created_at)) => {
                transcript.id = id.clone();
                transcript.created_at = *created_at;
            }
            None => state.transcript = Some((transcript.id.clone(), transcript.created_at)),
        }
        transcript
    }

    pub async fn select_project(&self, project: ResourceRef) -> Result<()> {
        self.reconfigure(|state| {
            state.selection.select_project(project);
            Ok(())
        })
        .await
    }

    /// Deselect the project, dropping the session and the timeline
    pub async fn clear_project(&self) -> Result<()> {
        self.reconfigure(|state| {
            state.selection.clear_project();
            Ok(())
        })
        .await
    }

    pub async fn select_database(&self, database: Option<ResourceRef>) -> Result<()> {
        self.reconfigure(|state| {
            state.selection.select_database(database);
            Ok(())
        })
        .await
    }

    pub async fn select_collection(&self, collection: Option<ResourceRef>) -> Result<()> {
        self.reconfigure(|state| Ok(state.selection.select_collection(collection)?))
            .await
    }

    pub async fn select_bucket(&self, bucket: Option<ResourceRef>) -> Result<()> {
        self.reconfigure(|state| {
            state.selection.select_bucket(bucket);
            Ok(())
        })
        .await
    }

    pub async fn select_function(&self, function: Option<ResourceRef>) -> Result<()> {
        self.reconfigure(|state| {
            state.selection.select_function(function);
            Ok(())
        })
        .await
    }

    pub async fn set_category_enabled(&self, category: ToolCategory, enabled: bool) -> Result<()> {
        self.reconfigure(|state| {
            if enabled {
                state.settings.enabled.insert(category);
            } else {
                state.settings.enabled.remove(&category);
            }
            Ok(())
        })
        .await
    }

    pub async fn set_provider(&self, provider: impl Into<String>) -> Result<()> {
        let provider = provider.into();
        self.reconfigure(|state| {
            state.settings.provider = provider;
            Ok(())
        })
        .await
    }

    pub async fn set_model(&self, model: impl Into<String>) -> Result<()> {
        let model = model.into();
        self.reconfigure(|state| {
            state.settings.model = model;
            Ok(())
        })
        .await
    }

    pub async fn set_thinking(&self, thinking: bool) -> Result<()> {
        self.reconfigure(|state| {
            state.settings.thinking = thinking;
            Ok(())
        })
        .await
    }

    pub async fn set_api_key(&self, api_key: Option<String>) -> Result<()> {
        self.reconfigure(|state| {
            state.settings.api_key = api_key;
            Ok(())
        })
        .await
    }

    /// Replace provider, model, key, thinking and categories in one rebuild.
    /// The tool round limit is fixed at construction and is not changed.
    pub async fn update_settings(&self, settings: ControllerSettings) -> Result<()> {
        self.reconfigure(|state| {
            let max_tool_rounds = state.settings.max_tool_rounds;
            state.settings = ControllerSettings {
                max_tool_rounds,
                ..settings
            };
            Ok(())
        })
        .await
    }

    pub fn is_busy(&self) -> bool {
        self.inner.busy.is_busy()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.state.lock().timeline.messages().to_vec()
    }

    pub fn context(&self) -> Option<AIContext> {
        self.inner.state.lock().selection.context()
    }

    pub fn settings(&self) -> ControllerSettings {
        self.inner.state.lock().settings.clone()
    }

    pub fn enabled_categories(&self) -> CategorySet {
        self.inner.state.lock().settings.enabled.clone()
    }

    /// Tool definitions the next session is offered
    pub fn offered_tools(&self) -> Vec<ToolDefinition> {
        self.inner.registry.resolve(&self.enabled_categories())
    }

    pub async fn session_state(&self) -> SessionState {
        self.inner.sessions.lock().await.state().clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().last_error.clone()
    }
}
