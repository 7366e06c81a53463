//! Event logging subsystem for tvmode.
//!
//! Admission and device outcomes are appended to an NDJSON file (one JSON
//! object per line) in `<state_dir>/events.ndjson`. The log is append-only
//! and shared by every cooperating process; each event is written with a
//! single `write` call in append mode so concurrent lines do not interleave.
//!
//! # Event Format
//!
//! ```json
//! {"ts":"2026-10-18T09:15:02Z","action":"admit","actor":"alice@den",
//!  "ticket":"1760778902000-4242-9f0c...","details":{"waited_ms":310}}
//! ```
//!
//! `ticket` is omitted for events not tied to one queue entry.
//!
//! The log is diagnostic. A failed write is reported as a warning on stderr
//! and never fails the invocation.

use crate::error::{Result, TvModeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Identifier appended to the queue
    Enroll,
    /// Process reached the head of the queue (or took the single lock)
    Admit,
    /// Identifier removed from the queue
    Release,
    /// Gave up waiting for admission
    Timeout,
    /// Entry of a presumed-dead process removed
    EvictStale,
    /// Device accepted the picture mode
    ModeSet,
    /// Device command failed
    ModeFailed,
    /// Queue entries removed manually
    QueueClear,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Enroll => write!(f, "enroll"),
            EventAction::Admit => write!(f, "admit"),
            EventAction::Release => write!(f, "release"),
            EventAction::Timeout => write!(f, "timeout"),
            EventAction::EvictStale => write!(f, "evict_stale"),
            EventAction::ModeSet => write!(f, "mode_set"),
            EventAction::ModeFailed => write!(f, "mode_failed"),
            EventAction::QueueClear => write!(f, "queue_clear"),
        }
    }
}

/// One line of the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    /// `user@host` of the invoking process.
    pub actor: String,

    /// Queue identifier the event concerns.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticket: Option<String>,

    /// Action-specific fields.
    pub details: Value,
}

impl Event {
    /// Event stamped now, attributed to the current user and host.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor(),
            ticket: None,
            details: Value::Object(Default::default()),
        }
    }

    /// Set the queue identifier for this event.
    pub fn with_ticket(mut self, ticket: impl Into<String>) -> Self {
        self.ticket = Some(ticket.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| {
            TvModeError::QueueIo(format!("failed to serialize event to JSON: {}", e))
        })
    }
}

/// `user@host` for the current process; either half falls back to `unknown`.
pub(crate) fn actor() -> String {
    let user = ["USER", "USERNAME"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok())
        .unwrap_or_else(|| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", user, host)
}

/// Append an event to the events log at `path`.
///
/// The file (and its parent directory) is created if it doesn't exist. Each
/// append results in one line with a trailing newline.
pub fn append_event(path: &Path, event: &Event) -> Result<()> {
    let mut line = event.to_ndjson_line()?;
    line.push('\n');

    if let Some(parent) = path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            TvModeError::QueueIo(format!(
                "failed to create events directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            TvModeError::QueueIo(format!(
                "failed to open events file '{}': {}",
                path.display(),
                e
            ))
        })?;

    file.write_all(line.as_bytes()).map_err(|e| {
        TvModeError::QueueIo(format!(
            "failed to write event to '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(())
}

/// Optional, best-effort event sink.
///
/// A disabled log swallows events; an enabled one appends them and downgrades
/// write failures to warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    /// Log appending to `path`.
    pub fn to_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// Log that records nothing.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Record an event, warning on stderr if it cannot be written.
    pub fn record(&self, event: Event) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = append_event(path, &event) {
            eprintln!("Warning: failed to record {} event: {}", event.action, e);
        }
    }
}

/// Read every parseable event from an NDJSON log, skipping malformed lines.
pub fn read_events(path: &Path) -> Result<Vec<Event>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(|e| {
        TvModeError::QueueIo(format!(
            "failed to read events file '{}': {}",
            path.display(),
            e
        ))
    })?;

    Ok(content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
