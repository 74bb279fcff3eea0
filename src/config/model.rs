//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the talkd runner.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
/// Relative paths are resolved against the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Identity
    // =========================================================================
    /// Account the bot posts as; commands address it as `@login`.
    #[serde(default = "default_login")]
    pub login: String,

    // =========================================================================
    // Storage
    // =========================================================================
    /// Directory holding `<number>.json` talk files, events, and the pulse.
    #[serde(default = "default_talks_dir")]
    pub talks_dir: PathBuf,

    /// Directory of per-repository profiles (`<owner>_<name>.yml`).
    #[serde(default = "default_profiles_dir")]
    pub profiles_dir: PathBuf,

    /// Directory of the local ticket system.
    #[serde(default = "default_inbox_dir")]
    pub inbox_dir: PathBuf,

    /// Parent of per-daemon working directories.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,

    /// Directory receiving daemon output logs.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    // =========================================================================
    // Pipeline
    // =========================================================================
    /// Worker threads sweeping talks.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Passes one sweep may spend on a talk.
    #[serde(default = "default_pass_budget")]
    pub pass_budget: usize,

    /// Minutes without a liveness signal before a daemon is timed out.
    #[serde(default = "default_inactivity_minutes")]
    pub inactivity_minutes: u32,

    /// Pause between sweeps.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive bot comments in a thread after which answers stop.
    #[serde(default = "default_spam_limit")]
    pub spam_limit: usize,

    // =========================================================================
    // Lock settings
    // =========================================================================
    /// Minutes after which the runner lock is considered stale.
    #[serde(default = "default_lock_stale_minutes")]
    pub lock_stale_minutes: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            login: default_login(),
            talks_dir: default_talks_dir(),
            profiles_dir: default_profiles_dir(),
            inbox_dir: default_inbox_dir(),
            workdir: default_workdir(),
            logs_dir: default_logs_dir(),
            workers: default_workers(),
            pass_budget: default_pass_budget(),
            inactivity_minutes: default_inactivity_minutes(),
            interval_ms: default_interval_ms(),
            spam_limit: default_spam_limit(),
            lock_stale_minutes: default_lock_stale_minutes(),
        }
    }
}

fn default_login() -> String {
    "rultor".to_string()
}

fn default_talks_dir() -> PathBuf {
    PathBuf::from(".talkd/talks")
}

fn default_profiles_dir() -> PathBuf {
    PathBuf::from(".talkd/profiles")
}

fn default_inbox_dir() -> PathBuf {
    PathBuf::from(".talkd/inbox")
}

fn default_workdir() -> PathBuf {
    PathBuf::from(".talkd/work")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from(".talkd/logs")
}

fn default_workers() -> usize {
    4
}

fn default_pass_budget() -> usize {
    crate::pipeline::PASS_BUDGET
}

fn default_inactivity_minutes() -> u32 {
    crate::daemon::INACTIVITY_MINUTES as u32
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_spam_limit() -> usize {
    crate::ticket::SPAM_LIMIT
}

fn default_lock_stale_minutes() -> u32 {
    120
}
