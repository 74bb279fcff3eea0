//! Append-only audit log of daemon activity.
//!
//! Events are stored as NDJSON (one JSON object per line) in
//! `events.ndjson` inside the talks directory.
//!
//! # Event Format
//!
//! Each event is a JSON object with the following fields:
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (`daemon_start`, `daemon_end`, `kill`, `archive`)
//! - `actor`: the owner string (e.g., `user@HOST`)
//! - `talk`: talk number, when the event concerns one talk
//! - `details`: freeform object with action-specific details
//!
//! ```no_run
//! use talkd::events::{Event, EventAction, EventLog};
//! use serde_json::json;
//!
//! let log = EventLog::new(".talkd/talks/events.ndjson");
//! log.append(&Event::new(EventAction::Kill).with_talk(7).with_details(json!({"by": "admin"})))?;
//! # Ok::<(), talkd::error::TalkError>(())
//! ```

use crate::error::{Result, TalkError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Name of the events file inside the talks directory.
pub const EVENTS_FILE: &str = "events.ndjson";

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Daemon handed to the remote
    DaemonStart,
    /// Terminal daemon outcome reported
    DaemonEnd,
    /// Administrative kill
    Kill,
    /// Daemon moved to the archive
    Archive,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::DaemonStart => write!(f, "daemon_start"),
            EventAction::DaemonEnd => write!(f, "daemon_end"),
            EventAction::Kill => write!(f, "kill"),
            EventAction::Archive => write!(f, "archive"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,

    pub action: EventAction,

    /// Who performed the action (e.g., `user@HOST`).
    pub actor: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub talk: Option<u64>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event stamped now, with the actor taken from the
    /// environment (USER@HOSTNAME).
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: get_actor_string(),
            talk: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    pub fn with_talk(mut self, number: u64) -> Self {
        self.talk = Some(number);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| TalkError::UserError(format!("failed to serialize event to JSON: {}", e)))
    }
}

/// Get the actor string for event metadata.
pub(crate) fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Destination of audit events. A disabled log drops everything.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    path: Option<PathBuf>,
}

impl EventLog {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// The log kept next to the talks in `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(EVENTS_FILE))
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append the event as one JSON line, creating the file as needed.
    pub fn append(&self, event: &Event) -> Result<()> {
        let Some(events_file) = &self.path else {
            return Ok(());
        };
        let json_line = event.to_ndjson_line()?;

        if let Some(dir) = events_file.parent()
            && !dir.as_os_str().is_empty()
            && !dir.exists()
        {
            fs::create_dir_all(dir).map_err(|e| {
                TalkError::UserError(format!(
                    "failed to create events directory '{}': {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(events_file)
            .map_err(|e| {
                TalkError::UserError(format!(
                    "failed to open events file '{}': {}",
                    events_file.display(),
                    e
                ))
            })?;

        writeln!(file, "{}", json_line).map_err(|e| {
            TalkError::UserError(format!(
                "failed to write event to '{}': {}",
                events_file.display(),
                e
            ))
        })?;

        file.sync_all().map_err(|e| {
            TalkError::UserError(format!(
                "failed to sync events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

        Ok(())
    }

    /// Append, logging instead of failing. Used where an audit write must
    /// not block a state transition that already happened.
    pub fn record(&self, event: Event) {
        if let Err(e) = self.append(&event) {
            tracing::warn!(action = %event.action, error = %e, "failed to record event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_event_creation() {
        let event = Event::new(EventAction::DaemonStart);

        assert_eq!(event.action, EventAction::DaemonStart);
        assert!(!event.actor.is_empty());
        assert!(event.talk.is_none());
        let age = Utc::now().signed_duration_since(event.ts);
        assert!(age.num_minutes() < 1);
    }

    #[test]
    fn test_event_serialization() {
        let event = Event::new(EventAction::DaemonEnd)
            .with_talk(4)
            .with_details(json!({"status": "finished", "code": 0}));

        let json_line = event.to_ndjson_line().unwrap();
        assert!(!json_line.contains('\n'));
        assert!(json_line.contains("\"daemon_end\""));

        let parsed: Event = serde_json::from_str(&json_line).unwrap();
        assert_eq!(parsed.talk, Some(4));
        assert_eq!(parsed.details["code"], 0);
    }

    #[test]
    fn test_event_without_talk_omits_field() {
        let json_line = Event::new(EventAction::Kill).to_ndjson_line().unwrap();
        let parsed: Value = serde_json::from_str(&json_line).unwrap();
        assert!(parsed.get("talk").is_none());
    }

    #[test]
    fn test_append_creates_dir_and_appends_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log = EventLog::in_dir(temp_dir.path().join("talks"));

        log.append(&Event::new(EventAction::DaemonStart).with_talk(1))
            .unwrap();
        log.append(&Event::new(EventAction::Archive).with_talk(1))
            .unwrap();

        let content = fs::read_to_string(log.path().unwrap()).unwrap();
        assert!(content.ends_with('\n'));
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: Event = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.action, EventAction::Archive);
    }

    #[test]
    fn test_disabled_log_writes_nothing() {
        let log = EventLog::disabled();
        assert!(log.path().is_none());
        log.append(&Event::new(EventAction::Kill)).unwrap();
    }

    #[test]
    fn test_event_action_display() {
        assert_eq!(EventAction::DaemonStart.to_string(), "daemon_start");
        assert_eq!(EventAction::DaemonEnd.to_string(), "daemon_end");
        assert_eq!(EventAction::Kill.to_string(), "kill");
        assert_eq!(EventAction::Archive.to_string(), "archive");
    }

    #[test]
    fn test_get_actor_string() {
        assert!(get_actor_string().contains('@'));
    }
}
