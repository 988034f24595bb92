//! Timestamped migration log shared by every entity kind of a run.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::core::EntityKind;

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// One entry of the migration log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Entity kind the entry belongs to (None for run-level entries).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<EntityKind>,
    pub message: String,
}

/// Append-only log, safe to share across per-kind tasks.
///
/// Every entry is also emitted as a `tracing` event at the matching level.
#[derive(Debug, Clone, Default)]
pub struct MigrationLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MigrationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, kind: Option<EntityKind>, message: impl Into<String>) {
        self.push(LogLevel::Info, kind, message.into());
    }

    pub fn warn(&self, kind: Option<EntityKind>, message: impl Into<String>) {
        self.push(LogLevel::Warn, kind, message.into());
    }

    pub fn error(&self, kind: Option<EntityKind>, message: impl Into<String>) {
        self.push(LogLevel::Error, kind, message.into());
    }

    fn push(&self, level: LogLevel, kind: Option<EntityKind>, message: String) {
        let scope = kind.map(|k| k.as_str()).unwrap_or("run");
        match level {
            LogLevel::Info => info!("{}: {}", scope, message),
            LogLevel::Warn => warn!("{}: {}", scope, message),
            LogLevel::Error => error!("{}: {}", scope, message),
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            kind,
            message,
        };
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Copy of every entry so far, in append order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
