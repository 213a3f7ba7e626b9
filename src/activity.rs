use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::collections::VecDeque;
use uuid::Uuid;

pub const LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Error,
    Success,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: Uuid,
    pub level: LogLevel,
    pub headline: String,
    pub details: Option<String>,
    /// Set only on the terminal outcome of a dispatched item.
    pub item_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, headline: impl Into<String>, details: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            headline: headline.into(),
            details,
            item_id: None,
            timestamp: Utc::now(),
        }
    }

    pub fn info(headline: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, headline, None)
    }

    pub fn for_item(mut self, item_id: Uuid) -> Self {
        self.item_id = Some(item_id);
        self
    }
}

/// Append-only event log that keeps the newest [`LOG_CAPACITY`] entries.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }
}

impl ActivityLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn newest_first(&self) -> Vec<LogEntry> {
        self.entries.iter().rev().cloned().collect()
    }
}
