//! Chat controller integration tests
//!
//! Drives the full engine (controller, session manager, turn orchestrator,
//! dispatcher and the real platform tool catalog) against a scripted model
//! backend and an in-memory platform.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Notify};

use console_chat_core::error::{Error, PlatformError, Result, ValidationError};
use console_chat_core::provider::{
    EventStream, HistoryEntry, ModelBackend, ModelEvent, ModelRequest, ModelSession, SessionSpec,
};
use console_chat_core::session::{
    ChatController, ControllerEvent, ControllerSettings, GroundingChunk, Message, SessionState,
    ToolCall, TurnOutcome,
};
use console_chat_core::{
    create_platform_tool_registry, FileAttachment, LogSink, MemoryLogSink, PlatformClient,
    PlatformRequest, ResourceRef, ToolCategory,
};

/// Model rounds handed out in order, plus everything the engine sent
#[derive(Default)]
struct Script {
    rounds: Mutex<VecDeque<Vec<Result<ModelEvent>>>>,
    requests: Mutex<Vec<ModelRequest>>,
    specs: Mutex<Vec<SessionSpec>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl Script {
    fn push_round(&self, events: Vec<Result<ModelEvent>>) {
        self.rounds.lock().push_back(events);
    }

    fn push_text(&self, text: &str) {
        self.push_round(vec![Ok(ModelEvent::FinalText(text.to_string()))]);
    }

    fn push_tool_calls(&self, calls: Vec<ToolCall>) {
        self.push_round(vec![Ok(ModelEvent::ToolCalls(calls))]);
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    fn specs(&self) -> Vec<SessionSpec> {
        self.specs.lock().clone()
    }
}

struct ScriptedBackend(Arc<Script>);

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn open_session(&self, spec: SessionSpec) -> Result<Arc<dyn ModelSession>> {
        let broken = spec.model == "broken";
        self.0.specs.lock().push(spec);
        if broken {
            return Err(Error::Session("model 'broken' does not exist".to_string()));
        }
        Ok(Arc::new(ScriptedSession(self.0.clone())))
    }
}

struct ScriptedSession(Arc<Script>);

#[async_trait]
impl ModelSession for ScriptedSession {
    async fn send(&self, request: ModelRequest) -> Result<EventStream> {
        self.0.requests.lock().push(request);
        let gate = self.0.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let events = self
            .0
            .rounds
            .lock()
            .pop_front()
            .unwrap_or_else(|| vec![Ok(ModelEvent::FinalText("Done.".to_string()))]);
        Ok(stream::iter(events).boxed())
    }
}

/// Answers list calls and 404s for a missing bucket
#[derive(Default)]
struct FakePlatform {
    requests: Mutex<Vec<PlatformRequest>>,
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn call(&self, request: PlatformRequest) -> std::result::Result<Value, PlatformError> {
        self.requests.lock().push(request.clone());
        match request.path.as_str() {
            "/databases" => Ok(json!({"total": 1, "databases": [{"$id": "main", "name": "main"}]})),
            "/storage/buckets" => Ok(json!({"total": 0, "buckets": []})),
            "/storage/buckets/missing" => Err(PlatformError::Api {
                status: 404,
                message: "Bucket not found".to_string(),
            }),
            other => Ok(json!({"path": other})),
        }
    }
}

struct Harness {
    controller: ChatController,
    events: mpsc::UnboundedReceiver<ControllerEvent>,
    script: Arc<Script>,
    platform: Arc<FakePlatform>,
    log: Arc<MemoryLogSink>,
}

impl Harness {
    fn drain(&mut self) -> Vec<ControllerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

fn settings() -> ControllerSettings {
    ControllerSettings {
        provider: "gemini".to_string(),
        model: "test-model".to_string(),
        api_key: Some("test-key".to_string()),
        thinking: false,
        enabled: ToolCategory::all(),
        max_tool_rounds: 10,
    }
}

fn harness_with(settings: ControllerSettings) -> Harness {
    let script = Arc::new(Script::default());
    let platform = Arc::new(FakePlatform::default());
    let log = Arc::new(MemoryLogSink::new());
    let registry = Arc::new(create_platform_tool_registry(platform.clone()));
    let sink: Arc<dyn LogSink> = log.clone();
    let (controller, events) = ChatController::new(
        Arc::new(ScriptedBackend(script.clone())),
        registry,
        sink,
        settings,
    );
    Harness {
        controller,
        events,
        script,
        platform,
        log,
    }
}

async fn harness() -> Harness {
    let h = harness_with(settings());
    h.controller
        .select_project(ResourceRef::new("shop", "Shop"))
        .await
        .unwrap();
    h
}

fn user_count(messages: &[Message]) -> usize {
    messages.iter().filter(|m| matches!(m, Message::User(_))).count()
}

mod plain_turn_tests {
    use super::*;

    #[tokio::test]
    async fn test_text_only_turn() {
        let mut h = harness().await;
        h.drain();
        h.script.push_text("You have one database: main.");

        let outcome = h.controller.submit("list databases", Vec::new()).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Completed(_)));

        let messages = h.controller.messages();
        assert_eq!(messages.len(), 2);
        assert!(matches!(&messages[0], Message::User(u) if u.content == "list databases"));
        assert!(matches!(&messages[1], Message::Model(m) if m.content == "You have one database: main." && !m.is_error));
        assert!(!h.controller.is_busy());

        let events = h.drain();
        assert_eq!(events.first(), Some(&ControllerEvent::Busy(true)));
        assert_eq!(events.last(), Some(&ControllerEvent::Busy(false)));
    }

    #[tokio::test]
    async fn test_user_message_precedes_model_request() {
        let h = harness().await;
        h.script.push_text("ok");
        h.controller.submit("hello", Vec::new()).await.unwrap();

        let requests = h.script.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].history,
            vec![HistoryEntry::User("hello".to_string())]
        );
    }

    #[tokio::test]
    async fn test_streamed_text_patches_one_message() {
        let mut h = harness().await;
        h.drain();
        h.script.push_round(vec![
            Ok(ModelEvent::TextDelta("Hel".to_string())),
            Ok(ModelEvent::TextDelta("lo".to_string())),
            Ok(ModelEvent::Grounding(vec![GroundingChunk {
                title: Some("Docs".to_string()),
                uri: "https://example.com/docs".to_string(),
            }])),
            Ok(ModelEvent::FinalText("Hello!".to_string())),
        ]);

        h.controller.submit("hi", Vec::new()).await.unwrap();

        let messages = h.controller.messages();
        assert_eq!(messages.len(), 2);
        let Message::Model(model) = &messages[1] else {
            panic!("expected model message");
        };
        assert_eq!(model.content, "Hello!");
        assert_eq!(model.grounding_chunks.as_ref().unwrap()[0].uri, "https://example.com/docs");

        // Every model update carried the same id
        let model_ids: Vec<String> = h
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ControllerEvent::Message(Message::Model(m)) => Some(m.id),
                _ => None,
            })
            .collect();
        assert!(model_ids.len() >= 3);
        assert!(model_ids.iter().all(|id| *id == model.id));
    }

    #[tokio::test]
    async fn test_empty_final_text_keeps_streamed_text() {
        let h = harness().await;
        h.script.push_round(vec![
            Ok(ModelEvent::TextDelta("Hel".to_string())),
            Ok(ModelEvent::TextDelta("lo".to_string())),
            Ok(ModelEvent::FinalText(String::new())),
        ]);

        let outcome = h.controller.submit("hi", Vec::new()).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Completed(_)));

        let messages = h.controller.messages();
        assert_eq!(messages.len(), 2);
        let Message::Model(model) = &messages[1] else {
            panic!("expected model message");
        };
        assert_eq!(model.content, "Hello");
        assert!(!model.is_error);
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_anything() {
        let h = harness().await;
        let err = h.controller.submit("   ", Vec::new()).await.unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::EmptyInput)));
        assert!(h.controller.messages().is_empty());
        assert!(h.script.requests().is_empty());
    }

    #[tokio::test]
    async fn test_no_project_is_standing_error() {
        let h = harness_with(settings());
        let outcome = h.controller.submit("hello", Vec::new()).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed(ref m) if m.contains("No active project")));
        assert!(h.controller.messages().is_empty());
        assert!(h.controller.last_error().is_some());
    }

    #[tokio::test]
    async fn test_resend_repeats_last_user_text() {
        let h = harness().await;
        h.script.push_round(vec![Err(Error::Provider("overloaded".to_string()))]);
        h.controller.submit("count users", Vec::new()).await.unwrap();

        h.script.push_text("42 users.");
        let outcome = h.controller.resend().await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Completed(_)));

        let messages = h.controller.messages();
        assert_eq!(user_count(&messages), 2);
        assert!(matches!(messages.last(), Some(Message::Model(m)) if m.content == "42 users."));
    }

    #[tokio::test]
    async fn test_resend_without_history() {
        let h = harness().await;
        assert!(matches!(
            h.controller.resend().await,
            Err(Error::Validation(ValidationError::EmptyInput))
        ));
    }
}

mod tool_round_tests {
    use super::*;

    #[tokio::test]
    async fn test_partial_tool_failure() {
        let mut h = harness().await;
        h.drain();
        h.script.push_tool_calls(vec![
            ToolCall::new("c1", "list_databases", json!({})),
            ToolCall::new("c2", "get_bucket", json!({"bucket_id": "missing"})),
        ]);
        h.script.push_text("One database; the bucket does not exist.");

        let outcome = h.controller.submit("what do I have?", Vec::new()).await.unwrap();
        let TurnOutcome::Completed(summary) = outcome else {
            panic!("turn failed: {:?}", outcome);
        };
        assert_eq!(summary.tool_rounds, 1);
        assert_eq!(summary.tool_calls, 2);

        let messages = h.controller.messages();
        assert_eq!(messages.len(), 3);
        let action = messages[1].as_action().unwrap();
        assert!(!action.is_loading);
        let results = action.tool_results.as_ref().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].name, "list_databases");
        assert!(!results[0].is_error());
        assert_eq!(results[1].name, "get_bucket");
        assert!(results[1].error_message().unwrap().contains("Bucket not found"));
        assert_eq!(results.iter().filter(|r| r.is_error()).count(), 1);

        // The continuation carries both results, paired with their calls
        let requests = h.script.requests();
        assert_eq!(requests.len(), 2);
        match requests[1].history.last() {
            Some(HistoryEntry::ToolExchange { calls, results }) => {
                assert_eq!(calls.len(), 2);
                assert_eq!(results.len(), 2);
                assert_eq!(calls[1].id, "c2");
                assert!(results[1].is_error());
            }
            other => panic!("unexpected history tail: {:?}", other),
        }

        // The action was emitted loading, then patched once under the same id
        let action_events: Vec<_> = h
            .drain()
            .into_iter()
            .filter_map(|e| match e {
                ControllerEvent::Message(Message::Action(a)) => Some(a),
                _ => None,
            })
            .collect();
        assert_eq!(action_events.len(), 2);
        assert!(action_events[0].is_loading);
        assert!(action_events[0].tool_results.is_none());
        assert!(!action_events[1].is_loading);
        assert_eq!(action_events[0].id, action_events[1].id);
    }

    #[tokio::test]
    async fn test_tool_calls_scoped_by_context() {
        let h = harness().await;
        h.controller
            .select_database(Some(ResourceRef::from_id("main")))
            .await
            .unwrap();
        h.script
            .push_tool_calls(vec![ToolCall::new("c1", "list_collections", json!({}))]);
        h.script.push_text("done");

        h.controller.submit("list collections", Vec::new()).await.unwrap();

        let requests = h.platform.requests.lock().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].project_id, "shop");
        assert_eq!(requests[0].path, "/databases/main/collections");
    }

    #[tokio::test]
    async fn test_round_limit() {
        let mut s = settings();
        s.max_tool_rounds = 2;
        let h = harness_with(s);
        h.controller
            .select_project(ResourceRef::from_id("shop"))
            .await
            .unwrap();
        for i in 0..3 {
            h.script.push_tool_calls(vec![ToolCall::new(
                format!("c{}", i),
                "list_databases",
                json!({}),
            )]);
        }

        let outcome = h.controller.submit("loop forever", Vec::new()).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed(ref m) if m.contains("round limit")));

        let messages = h.controller.messages();
        let actions: Vec<_> = messages.iter().filter_map(|m| m.as_action()).collect();
        assert_eq!(actions.len(), 2);
        assert!(actions.iter().all(|a| !a.is_loading));
        assert!(matches!(messages.last(), Some(Message::Model(m)) if m.is_error));
        assert!(!h.controller.is_busy());
    }

    #[tokio::test]
    async fn test_disabled_category_not_offered() {
        let h = harness().await;
        h.controller
            .set_category_enabled(ToolCategory::Storage, false)
            .await
            .unwrap();

        let spec = h.script.specs().last().cloned().unwrap();
        assert!(!spec.tools.is_empty());
        assert!(spec.tools.iter().all(|t| t.category != ToolCategory::Storage));
        assert!(!spec.tools.iter().any(|t| t.name == "list_buckets"));
        assert!(h
            .controller
            .offered_tools()
            .iter()
            .all(|t| t.category != ToolCategory::Storage));

        // A call the model makes anyway is answered with an error, not executed
        h.script
            .push_tool_calls(vec![ToolCall::new("c1", "list_buckets", json!({}))]);
        h.script.push_text("Storage is disabled.");
        h.controller.submit("list buckets", Vec::new()).await.unwrap();

        let messages = h.controller.messages();
        let action = messages[1].as_action().unwrap();
        assert!(action.tool_results.as_ref().unwrap()[0]
            .error_message()
            .unwrap()
            .contains("disabled"));
        assert!(h.platform.requests.lock().is_empty());
    }
}

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_provider_error_appends_visible_error() {
        let h = harness().await;
        h.script.push_round(vec![
            Ok(ModelEvent::TextDelta("Let me".to_string())),
            Err(Error::Provider("connection reset".to_string())),
        ]);

        let outcome = h.controller.submit("hi", Vec::new()).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed(_)));

        let messages = h.controller.messages();
        let last = messages.last().and_then(|m| m.as_model()).unwrap();
        assert!(last.is_error);
        assert!(last.content.starts_with("Error: "));
        assert!(last.content.contains("connection reset"));
        assert!(!h.controller.is_busy());

        // The error notice is never replayed; the session is kept
        h.script.push_text("Hello again");
        h.controller.submit("retry", Vec::new()).await.unwrap();
        let history = h.script.requests().last().unwrap().history.clone();
        assert!(!history.iter().any(|e| matches!(e, HistoryEntry::Model(t) if t.starts_with("Error"))));
        assert_eq!(h.script.specs().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_response_is_protocol_error() {
        let h = harness().await;
        h.script.push_round(Vec::new());
        let outcome = h.controller.submit("hi", Vec::new()).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed(ref m) if m.contains("empty model response")));
    }

    #[tokio::test]
    async fn test_session_failure_is_sticky() {
        let h = harness().await;
        assert_eq!(h.script.specs().len(), 1);

        h.controller.set_model("broken").await.unwrap();
        assert!(h.controller.last_error().unwrap().contains("broken"));
        assert!(matches!(h.controller.session_state().await, SessionState::Failed(_)));

        let outcome = h.controller.submit("hi", Vec::new()).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Failed(ref m) if m.contains("unavailable")));
        assert!(h.controller.messages().is_empty());
        // No retry for the unchanged configuration
        assert_eq!(h.script.specs().len(), 2);

        h.controller.set_model("test-model").await.unwrap();
        assert_eq!(h.controller.last_error(), None);
        assert_eq!(h.controller.session_state().await, SessionState::Ready);
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_context_change_keeps_timeline() {
        let h = harness().await;
        h.controller.submit("hello", Vec::new()).await.unwrap();
        assert_eq!(h.controller.messages().len(), 2);

        h.controller
            .select_database(Some(ResourceRef::from_id("main")))
            .await
            .unwrap();
        h.controller.set_thinking(true).await.unwrap();

        assert_eq!(h.controller.messages().len(), 2);
        let specs = h.script.specs();
        assert_eq!(specs.len(), 3);
        assert!(specs[1].system_instruction.contains("DB: main"));
        assert!(specs[2].thinking);
    }

    #[tokio::test]
    async fn test_project_change_clears_timeline() {
        let mut h = harness().await;
        h.controller.submit("hello", Vec::new()).await.unwrap();
        h.drain();

        h.controller
            .select_project(ResourceRef::new("blog", "Blog"))
            .await
            .unwrap();
        assert!(h.controller.messages().is_empty());
        assert!(h.drain().contains(&ControllerEvent::Cleared));
        assert!(h.script.specs().last().unwrap().system_instruction.contains("Project: Blog"));
    }

    #[tokio::test]
    async fn test_project_change_clears_timeline_while_session_failed() {
        let mut h = harness().await;
        h.controller.submit("hello", Vec::new()).await.unwrap();
        h.controller.set_model("broken").await.unwrap();
        assert!(h.controller.last_error().is_some());
        h.drain();

        h.controller
            .select_project(ResourceRef::new("blog", "Blog"))
            .await
            .unwrap();
        assert!(h.controller.messages().is_empty());
        assert!(h.drain().contains(&ControllerEvent::Cleared));

        h.controller.set_model("test-model").await.unwrap();
        assert!(h.controller.last_error().is_none());
        assert!(h.controller.messages().is_empty());
        assert_eq!(
            h.controller.context().map(|c| c.project.id),
            Some("blog".to_string())
        );
    }

    #[tokio::test]
    async fn test_clear_project_resets_session() {
        let h = harness().await;
        h.controller.submit("hello", Vec::new()).await.unwrap();
        h.controller.clear_project().await.unwrap();

        assert!(h.controller.messages().is_empty());
        assert!(h.controller.context().is_none());
        assert_eq!(h.controller.session_state().await, SessionState::Uninitialized);
    }

    #[tokio::test]
    async fn test_collection_requires_database() {
        let h = harness().await;
        let err = h
            .controller
            .select_collection(Some(ResourceRef::from_id("orders")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::CollectionWithoutDatabase)
        ));
        assert!(!h.controller.is_busy());
    }

    #[tokio::test]
    async fn test_clear_chat_rebuilds_session() {
        let h = harness().await;
        h.controller.submit("hello", Vec::new()).await.unwrap();
        h.controller.clear_chat().await.unwrap();

        assert!(h.controller.messages().is_empty());
        assert_eq!(h.script.specs().len(), 2);

        h.controller.submit("fresh start", Vec::new()).await.unwrap();
        let history = h.script.requests().last().unwrap().history.clone();
        assert_eq!(history, vec![HistoryEntry::User("fresh start".to_string())]);
    }

    #[tokio::test]
    async fn test_transcript_round_trip_through_controller() {
        let h = harness().await;
        h.script.push_text("You have one database.");
        h.controller.submit("list databases", Vec::new()).await.unwrap();
        let saved = h.controller.snapshot();
        assert_eq!(saved.project_id.as_deref(), Some("shop"));
        assert_eq!(h.controller.snapshot().id, saved.id);

        let other = harness().await;
        other.controller.load_transcript(saved.clone()).await.unwrap();
        assert_eq!(other.controller.messages(), saved.messages);

        other.controller.submit("and buckets?", Vec::new()).await.unwrap();
        let history = other.script.requests().last().unwrap().history.clone();
        assert_eq!(
            history,
            vec![
                HistoryEntry::User("list databases".to_string()),
                HistoryEntry::Model("You have one database.".to_string()),
                HistoryEntry::User("and buckets?".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_transitions_are_logged() {
        let h = harness().await;
        h.controller.set_thinking(true).await.unwrap();
        let texts = h.log.texts();
        assert!(texts.iter().any(|t| t.starts_with("Session ready")));
        assert!(texts.iter().any(|t| t == "Rebuilding session (thinking)"));
    }
}

mod attachment_tests {
    use super::*;

    fn file(name: &str, size: usize) -> FileAttachment {
        FileAttachment::new(name, "application/octet-stream", vec![0u8; size])
    }

    #[tokio::test]
    async fn test_too_many_files() {
        let h = harness().await;
        let files = (0..6).map(|i| file(&format!("f{}.bin", i), 10)).collect();
        let err = h.controller.submit("see attached", files).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::TooManyFiles { count: 6, max: 5 })
        ));
        assert!(h.controller.messages().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_file() {
        let h = harness().await;
        let err = h
            .controller
            .submit("see attached", vec![file("big.bin", 11 * 1024 * 1024)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::FileTooLarge { .. })
        ));
        assert!(h.controller.messages().is_empty());
    }

    #[tokio::test]
    async fn test_five_large_files_accepted() {
        let h = harness().await;
        h.script.push_tool_calls(vec![ToolCall::new("c1", "list_buckets", json!({}))]);
        h.script.push_text("Got them.");
        let files = (0..5)
            .map(|i| file(&format!("f{}.bin", i), 9 * 1024 * 1024))
            .collect();

        let outcome = h.controller.submit("", files).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Completed(_)));

        let messages = h.controller.messages();
        let Message::User(user) = &messages[0] else {
            panic!("expected user message");
        };
        assert_eq!(user.files.len(), 5);
        assert_eq!(user.files[0].size, 9 * 1024 * 1024);

        // Files ride along on every request of the turn
        let requests = h.script.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests.iter().all(|r| r.attachments.len() == 5));

        // ...but not on the next turn
        h.controller.submit("thanks", Vec::new()).await.unwrap();
        assert!(h.script.requests().last().unwrap().attachments.is_empty());
    }
}

mod concurrency_tests {
    use super::*;

    async fn wait_for_request(h: &Harness, count: usize) {
        for _ in 0..200 {
            if h.script.requests().len() >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("model request never arrived");
    }

    #[tokio::test]
    async fn test_single_in_flight_turn() {
        let h = harness().await;
        let gate = Arc::new(Notify::new());
        *h.script.gate.lock() = Some(gate.clone());
        h.script.push_text("first answer");

        let controller = h.controller.clone();
        let first = tokio::spawn(async move { controller.submit("first", Vec::new()).await });
        wait_for_request(&h, 1).await;
        assert!(h.controller.is_busy());

        let second = h.controller.submit("second", Vec::new()).await.unwrap();
        assert_eq!(second, TurnOutcome::Ignored);

        // Configuration changes wait for the turn as well
        assert!(matches!(h.controller.set_thinking(true).await, Err(Error::Busy)));
        assert!(matches!(h.controller.clear_chat().await, Err(Error::Busy)));

        gate.notify_one();
        let outcome = first.await.unwrap().unwrap();
        assert!(matches!(outcome, TurnOutcome::Completed(_)));

        let messages = h.controller.messages();
        assert_eq!(user_count(&messages), 1);
        assert_eq!(messages.len(), 2);
        assert!(!h.controller.is_busy());
        assert!(!h.controller.settings().thinking);
    }
}
