//! Liveness of the runner itself.
//!
//! After each sweep the runner records a [`Tick`]. The runner counts as
//! healthy while the last tick started within [`HEALTHY_MINUTES`].

use crate::error::{Result, TalkError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub const HEALTHY_MINUTES: i64 = 5;

/// Errors kept for the health report.
const MAX_ERRORS: usize = 10;

/// Name of the pulse file inside the talks directory.
pub const PULSE_FILE: &str = "pulse.json";

/// One completed sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    pub start: DateTime<Utc>,
    pub duration_ms: u64,
    pub talks: usize,
}

/// Persisted health state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub last: Option<Tick>,
    /// Most recent failures, newest last.
    #[serde(default)]
    pub errors: Vec<String>,
}

impl Health {
    /// Read a pulse file; a missing file means no activity yet.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(TalkError::UserError(format!(
                    "failed to read pulse file '{}': {}",
                    path.display(),
                    e
                )));
            }
        };
        serde_json::from_str(&content).map_err(|e| {
            TalkError::UserError(format!(
                "failed to parse pulse file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn healthy(&self, now: DateTime<Utc>) -> bool {
        self.last
            .is_some_and(|tick| now.signed_duration_since(tick.start) <= Duration::minutes(HEALTHY_MINUTES))
    }

    /// Human-readable status text.
    pub fn report(&self, now: DateTime<Utc>) -> String {
        let mut text = match self.last {
            None => "There is no activity yet, check again in a few seconds.".to_string(),
            Some(tick) => {
                let age = now.signed_duration_since(tick.start).num_seconds().max(0);
                if self.healthy(now) {
                    format!(
                        "It is up and running, last sweep of {} talk(s) started {}s ago and took {}ms.",
                        tick.talks, age, tick.duration_ms
                    )
                } else {
                    format!("The system is down, for {}s already.", age)
                }
            }
        };
        for error in &self.errors {
            text.push_str("\n\n");
            text.push_str(error);
        }
        text
    }
}

/// In-process pulse, optionally mirrored to a file.
#[derive(Debug, Default)]
pub struct Pulse {
    path: Option<PathBuf>,
    health: Mutex<Health>,
}

impl Pulse {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: Some(path.into()),
            health: Mutex::new(Health::default()),
        }
    }

    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self::new(dir.as_ref().join(PULSE_FILE))
    }

    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn health(&self) -> Health {
        self.lock().clone()
    }

    /// Record a finished sweep and its failures, then persist.
    pub fn tick(&self, tick: Tick, failures: &[String]) -> Result<()> {
        let health = {
            let mut health = self.lock();
            health.last = Some(tick);
            health.errors.extend(failures.iter().cloned());
            let excess = health.errors.len().saturating_sub(MAX_ERRORS);
            health.errors.drain(..excess);
            health.clone()
        };
        let Some(path) = &self.path else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&health)
            .map_err(|e| TalkError::UserError(format!("failed to serialize pulse: {}", e)))?;
        crate::fs::atomic_write_file(path, &json)
    }

    fn lock(&self) -> MutexGuard<'_, Health> {
        self.health.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}
