//! Lock metadata structures and utilities.

use crate::error::{Result, TalkError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Lock metadata stored in lock files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockMetadata {
    /// Owner of the lock (e.g., `user@HOST`).
    pub owner: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    pub created_at: DateTime<Utc>,

    /// The command holding the lock.
    pub action: String,
}

impl LockMetadata {
    /// Create new lock metadata with the current timestamp.
    pub fn new(action: &str) -> Self {
        Self {
            owner: crate::events::get_actor_string(),
            pid: Some(std::process::id()),
            created_at: Utc::now(),
            action: action.to_string(),
        }
    }

    /// Parse lock metadata from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            TalkError::LockError(format!(
                "failed to read lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            TalkError::LockError(format!(
                "failed to parse lock file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TalkError::LockError(format!("failed to serialize lock metadata: {}", e)))
    }

    pub fn age(&self) -> Duration {
        Utc::now().signed_duration_since(self.created_at)
    }

    /// Format the age as a human-readable string.
    pub fn age_string(&self) -> String {
        let age = self.age();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else {
            format!("{}m", minutes)
        }
    }

    /// Check if the lock is stale based on the given threshold in minutes.
    pub fn is_stale(&self, stale_minutes: u32) -> bool {
        self.age().num_minutes() > stale_minutes as i64
    }
}

/// A lock found on disk.
#[derive(Debug, Clone)]
pub struct LockInfo {
    pub path: PathBuf,
    pub metadata: LockMetadata,
    pub is_stale: bool,
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (owner: {}, age: {}, action: {}{})",
            self.path.display(),
            self.metadata.owner,
            self.metadata.age_string(),
            self.metadata.action,
            if self.is_stale { ", STALE" } else { "" }
        )
    }
}
