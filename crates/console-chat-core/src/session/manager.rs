//! Model session lifecycle
//!
//! Owns the model session handle and rebuilds it whenever the configuration it
//! was built from (provider, model, API key, thinking, enabled tools, context)
//! changes by value. A failed build is sticky: the same configuration keeps
//! failing without retrying until something changes.

use std::sync::Arc;

use tracing::{info, warn};

use crate::context::AIContext;
use crate::error::{Error, Result};
use crate::log_sink::{LogEntry, LogSink};
use crate::orchestration::SystemPrompt;
use crate::provider::{ModelBackend, ModelSession, SessionSpec};
use crate::tools::{CategorySet, ToolRegistry};

/// Everything a model session is built from
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub provider: String,
    pub model: String,
    pub api_key: Option<String>,
    pub thinking: bool,
    pub enabled: CategorySet,
    pub context: AIContext,
}

impl SessionConfig {
    /// Names of the fields that differ from `other`
    fn changes_from(&self, other: &SessionConfig) -> Vec<&'static str> {
        let mut changed = Vec::new();
        if self.provider != other.provider {
            changed.push("provider");
        }
        if self.model != other.model {
            changed.push("model");
        }
        if self.api_key != other.api_key {
            changed.push("api key");
        }
        if self.thinking != other.thinking {
            changed.push("thinking");
        }
        if self.enabled != other.enabled {
            changed.push("tools");
        }
        if self.context != other.context {
            changed.push("context");
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Rebuilding,
    /// Last build failed; holds the message shown to the user
    Failed(String),
}

/// Result of [`SessionManager::ensure_session`]
#[derive(Clone)]
pub struct EnsureOutcome {
    pub session: Arc<dyn ModelSession>,
    /// A new session was built for this call
    pub rebuilt: bool,
    /// The active project differs from the previous session's; the caller
    /// clears the timeline
    pub project_changed: bool,
}

pub struct SessionManager {
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    prompt: SystemPrompt,
    log: Arc<dyn LogSink>,
    state: SessionState,
    session: Option<Arc<dyn ModelSession>>,
    /// Config of the current session or of the failed attempt
    config: Option<SessionConfig>,
    /// Project of the last build attempt, survives failures
    project_id: Option<String>,
    stale: bool,
}

impl SessionManager {
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        prompt: SystemPrompt,
        log: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            backend,
            registry,
            prompt,
            log,
            state: SessionState::Uninitialized,
            session: None,
            config: None,
            project_id: None,
            stale: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> Option<&SessionConfig> {
        self.config.as_ref()
    }

    pub fn session(&self) -> Option<Arc<dyn ModelSession>> {
        self.session.clone()
    }

    fn log(&self, text: String) {
        self.log.record(LogEntry::now(text));
    }

    /// Return a session matching `config`, building a new one if needed
    pub async fn ensure_session(&mut self, config: &SessionConfig) -> Result<EnsureOutcome> {
        let unchanged = !self.stale && self.config.as_ref() == Some(config);

        if unchanged {
            match (&self.state, &self.session) {
                (SessionState::Ready, Some(session)) => {
                    return Ok(EnsureOutcome {
                        session: session.clone(),
                        rebuilt: false,
                        project_changed: false,
                    });
                }
                (SessionState::Failed(message), _) => {
                    return Err(Error::SessionUnavailable(message.clone()));
                }
                _ => {}
            }
        }

        let project_changed = self
            .project_id
            .as_ref()
            .is_some_and(|previous| *previous != config.context.project.id);

        let reason = match &self.config {
            Some(previous) if !unchanged => {
                let changes = config.changes_from(previous);
                if changes.is_empty() { "reset".to_string() } else { changes.join(", ") }
            }
            Some(_) => "reset".to_string(),
            None => "initial".to_string(),
        };

        if self.state == SessionState::Ready {
            self.state = SessionState::Rebuilding;
            self.log(format!("Rebuilding session ({})", reason));
        }
        self.session = None;
        self.config = Some(config.clone());
        self.project_id = Some(config.context.project.id.clone());
        self.stale = false;

        let spec = SessionSpec {
            provider: config.provider.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
            system_instruction: self.prompt.build(&config.context),
            tools: self.registry.resolve(&config.enabled),
            thinking: config.thinking,
        };
        let tool_count = spec.tools.len();

        match self.backend.open_session(spec).await {
            Ok(session) => {
                self.state = SessionState::Ready;
                self.session = Some(session.clone());
                info!(
                    model = %config.model,
                    tools = tool_count,
                    project_changed,
                    "Model session ready"
                );
                self.log(format!(
                    "Session ready: {} with {} tools ({})",
                    config.model,
                    tool_count,
                    config.context.describe()
                ));
                Ok(EnsureOutcome {
                    session,
                    rebuilt: true,
                    project_changed,
                })
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Model session build failed");
                self.log(format!("Session failed: {}", message));
                self.state = SessionState::Failed(message);
                Err(e)
            }
        }
    }

    /// Force the next `ensure_session` to rebuild even with an unchanged config
    pub fn invalidate(&mut self) {
        if self.config.is_some() {
            self.stale = true;
            self.log("Session invalidated".to_string());
        }
    }

    /// Drop the session and forget the project
    pub fn reset(&mut self) {
        let had_session = self.state != SessionState::Uninitialized;
        self.state = SessionState::Uninitialized;
        self.session = None;
        self.config = None;
        self.project_id = None;
        self.stale = false;
        if had_session {
            self.log("Session reset".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ResourceRef;
    use crate::log_sink::MemoryLogSink;
    use crate::provider::{EventStream, ModelRequest};
    use crate::tools::ToolCategory;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct NullSession;

    #[async_trait]
    impl ModelSession for NullSession {
        async fn send(&self, _request: ModelRequest) -> Result<EventStream> {
            Err(Error::Provider("not used".to_string()))
        }
    }

    /// Records every spec and fails when the model is "broken"
    #[derive(Default)]
    struct RecordingBackend {
        specs: Mutex<Vec<SessionSpec>>,
    }

    #[async_trait]
    impl ModelBackend for RecordingBackend {
        async fn open_session(&self, spec: SessionSpec) -> Result<Arc<dyn ModelSession>> {
            let broken = spec.model == "broken";
            self.specs.lock().push(spec);
            if broken {
                return Err(Error::Session("model unavailable".to_string()));
            }
            Ok(Arc::new(NullSession))
        }
    }

    fn setup() -> (SessionManager, Arc<RecordingBackend>, Arc<MemoryLogSink>) {
        let backend = Arc::new(RecordingBackend::default());
        let log = Arc::new(MemoryLogSink::new());
        let manager = SessionManager::new(
            backend.clone(),
            Arc::new(ToolRegistry::new()),
            SystemPrompt::new(),
            log.clone(),
        );
        (manager, backend, log)
    }

    fn config(project: &str, model: &str) -> SessionConfig {
        SessionConfig {
            provider: "gemini".to_string(),
            model: model.to_string(),
            api_key: Some("key".to_string()),
            thinking: false,
            enabled: ToolCategory::all(),
            context: AIContext::for_project(ResourceRef::from_id(project)),
        }
    }

    #[tokio::test]
    async fn test_reuses_session_for_same_config() {
        let (mut manager, backend, _) = setup();
        let first = manager.ensure_session(&config("p1", "m")).await.unwrap();
        assert!(first.rebuilt);
        assert!(!first.project_changed);

        let second = manager.ensure_session(&config("p1", "m")).await.unwrap();
        assert!(!second.rebuilt);
        assert_eq!(backend.specs.lock().len(), 1);
        assert_eq!(manager.state(), &SessionState::Ready);
    }

    #[tokio::test]
    async fn test_rebuilds_on_change() {
        let (mut manager, backend, log) = setup();
        manager.ensure_session(&config("p1", "m")).await.unwrap();

        let mut changed = config("p1", "m");
        changed.thinking = true;
        let outcome = manager.ensure_session(&changed).await.unwrap();
        assert!(outcome.rebuilt);
        assert!(!outcome.project_changed);
        assert_eq!(backend.specs.lock().len(), 2);
        assert!(log.texts().iter().any(|t| t == "Rebuilding session (thinking)"));
    }

    #[tokio::test]
    async fn test_project_change_is_reported() {
        let (mut manager, _, _) = setup();
        manager.ensure_session(&config("p1", "m")).await.unwrap();
        let outcome = manager.ensure_session(&config("p2", "m")).await.unwrap();
        assert!(outcome.project_changed);
    }

    #[tokio::test]
    async fn test_failure_is_sticky_until_config_changes() {
        let (mut manager, backend, _) = setup();
        let err = manager.ensure_session(&config("p1", "broken")).await.err().unwrap();
        assert!(matches!(err, Error::Session(_)));
        assert!(matches!(manager.state(), SessionState::Failed(_)));

        let err = manager.ensure_session(&config("p1", "broken")).await.err().unwrap();
        assert!(matches!(err, Error::SessionUnavailable(_)));
        assert_eq!(backend.specs.lock().len(), 1);

        let outcome = manager.ensure_session(&config("p1", "m")).await.unwrap();
        assert!(outcome.rebuilt);
        assert_eq!(manager.state(), &SessionState::Ready);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let (mut manager, backend, _) = setup();
        manager.ensure_session(&config("p1", "m")).await.unwrap();
        manager.invalidate();
        let outcome = manager.ensure_session(&config("p1", "m")).await.unwrap();
        assert!(outcome.rebuilt);
        assert!(!outcome.project_changed);
        assert_eq!(backend.specs.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_reset_forgets_project() {
        let (mut manager, _, _) = setup();
        manager.ensure_session(&config("p1", "m")).await.unwrap();
        manager.reset();
        assert_eq!(manager.state(), &SessionState::Uninitialized);
        assert!(manager.session().is_none());

        let outcome = manager.ensure_session(&config("p2", "m")).await.unwrap();
        assert!(!outcome.project_changed);
    }

    #[tokio::test]
    async fn test_spec_carries_context_and_tools() {
        let (mut manager, backend, _) = setup();
        manager.ensure_session(&config("shop", "m")).await.unwrap();
        let spec = backend.specs.lock()[0].clone();
        assert!(spec.system_instruction.contains("Project: shop"));
        assert_eq!(spec.api_key.as_deref(), Some("key"));
    }
}
