//! Append-only activity log
//!
//! Session transitions and tool executions are recorded here for an
//! observability surface outside the engine. Every entry is mirrored to
//! `tracing` as well.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// One log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
}

impl LogEntry {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            text: text.into(),
        }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.format("%H:%M:%S"), self.text)
    }
}

/// Destination for log entries
pub trait LogSink: Send + Sync {
    fn record(&self, entry: LogEntry);
}

/// Forwards entries to `tracing` only
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn record(&self, entry: LogEntry) {
        tracing::info!(target: "console_chat::activity", "{}", entry.text);
    }
}

/// Keeps the most recent entries in memory
#[derive(Debug)]
pub struct MemoryLogSink {
    capacity: usize,
    entries: Mutex<VecDeque<LogEntry>>,
}

impl MemoryLogSink {
    pub const DEFAULT_CAPACITY: usize = 500;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Snapshot of the buffered entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl Default for MemoryLogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink for MemoryLogSink {
    fn record(&self, entry: LogEntry) {
        tracing::debug!(target: "console_chat::activity", "{}", entry.text);
        let mut entries = self.entries.lock();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryLogSink::new();
        sink.record(LogEntry::now("first"));
        sink.record(LogEntry::now("second"));
        assert_eq!(sink.texts(), vec!["first", "second"]);
    }

    #[test]
    fn test_memory_sink_drops_oldest_at_capacity() {
        let sink = MemoryLogSink::with_capacity(2);
        for text in ["a", "b", "c"] {
            sink.record(LogEntry::now(text));
        }
        assert_eq!(sink.texts(), vec!["b", "c"]);
    }
}
