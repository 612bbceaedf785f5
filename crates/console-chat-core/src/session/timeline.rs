//! Message timeline
//!
//! The ordered list of messages the user sees. Messages are appended or
//! patched in place by id and never removed one at a time; the only removal
//! is [`MessageTimeline::clear`].

use serde::{Deserialize, Serialize};

use super::types::{Message, UserMessage};
use crate::provider::HistoryEntry;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageTimeline {
    messages: Vec<Message>,
}

impl MessageTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the message with `id` in place, or append when it is unknown
    pub fn patch(&mut self, id: &str, message: Message) {
        match self.messages.iter_mut().find(|m| m.id() == id) {
            Some(existing) => *existing = message,
            None => self.messages.push(message),
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn last_user_message(&self) -> Option<&UserMessage> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::User(u) => Some(u),
            _ => None,
        })
    }

    /// Conversation as the model should see it.
    ///
    /// Error notices and unresolved actions are skipped, so a failed turn never
    /// leaves a dangling tool call in the replayed history.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::User(u) => Some(HistoryEntry::User(u.content.clone())),
                Message::Model(m) if !m.is_error && !m.content.is_empty() => {
                    Some(HistoryEntry::Model(m.content.clone()))
                }
                Message::Model(_) => None,
                Message::Action(a) => match &a.tool_results {
                    Some(results) if !a.is_loading && results.len() == a.tool_calls.len() => {
                        Some(HistoryEntry::ToolExchange {
                            calls: a.tool_calls.clone(),
                            results: results.clone(),
                        })
                    }
                    _ => None,
                },
            })
            .collect()
    }
}
