//! Session module - chat turns over a model session
//!
//! Key components:
//!
//! - `ChatController`: owns selection, settings, timeline and session; the
//!   only entry point for frontends
//! - `SessionManager`: builds and rebuilds the model session
//! - `TurnOrchestrator`: runs one user turn, including tool rounds
//! - `MessageTimeline`: the ordered messages the user sees
//!
//! # Architecture
//!
//! ```text
//! submit(text, files)
//!   │
//!   ├─ validate ─ busy flag ─ SessionManager::ensure_session
//!   │
//!   └─ TurnOrchestrator::run_turn ──▶ ModelSession::send
//!        │                 ▲                │
//!        │                 └── results ◀── ToolDispatcher::execute_batch
//!        ▼
//!   MessageTimeline (append / patch) ──▶ ControllerEvent channel
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use console_chat_core::session::{ChatController, ControllerSettings};
//!
//! let (controller, mut events) = ChatController::new(backend, registry, log, ControllerSettings::default());
//! controller.select_project(ResourceRef::new("shop-1", "Shop")).await?;
//! controller.submit("How many users signed up today?", Vec::new()).await?;
//!
//! while let Ok(event) = events.try_recv() {
//!     if let ControllerEvent::Message(message) = event {
//!         println!("{:?}", message);
//!     }
//! }
//! ```

mod controller;
mod manager;
pub mod persistence;
mod timeline;
mod turn;
pub mod types;

pub use controller::{ChatController, ControllerEvent, ControllerSettings, TurnOutcome};
pub use manager::{EnsureOutcome, SessionConfig, SessionManager, SessionState};
pub use persistence::SavedTranscript;
pub use timeline::MessageTimeline;
pub use turn::{
    validate_input, BusyFlag, BusyGuard, MessageSink, Turn, TurnOrchestrator, TurnSummary,
    DEFAULT_MAX_TOOL_ROUNDS,
};
pub use types::{
    ActionMessage, GroundingChunk, Message, MessageId, ModelMessage, ToolCall, ToolResult,
    UserMessage,
};
