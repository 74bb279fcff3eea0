//! The talks registry: number to talk lookup for one talks directory.

use crate::agents::{Agent, KillMode, Services};
use crate::daemon::DaemonStatus;
use crate::error::{Result, TalkError};
use crate::events::{Event, EventAction, EventLog};
use crate::talk::{Batch, Talk};
use crate::ticket::ThreadId;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};


/// Extension of the files that ask the runner to kill a talk's daemon.
pub const KILL_REQUEST_EXT: &str = "kill";

/// All known talks, shared by the pipeline and administrative entry points.
#[derive(Debug, Default)]
pub struct Talks {
    dir: Option<PathBuf>,
    talks: RwLock<BTreeMap<u64, Arc<Talk>>>,
    events: EventLog,
}

impl Talks {
    /// Load every `<number>.json` talk in `dir`, creating the directory.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            TalkError::UserError(format!(
                "failed to create talks directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        let entries = std::fs::read_dir(dir).map_err(|e| {
            TalkError::UserError(format!(
                "failed to read talks directory '{}': {}",
                dir.display(),
                e
            ))
        })?;

        let mut talks = BTreeMap::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let is_talk = path.extension().is_some_and(|ext| ext == "json")
                && path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.parse::<u64>().is_ok());
            if !is_talk {
                continue;
            }
            let talk = Talk::open(&path)?;
            talks.insert(talk.number(), Arc::new(talk));
        }
        tracing::debug!(dir = %dir.display(), count = talks.len(), "talks loaded");

        Ok(Self {
            dir: Some(dir.to_path_buf()),
            talks: RwLock::new(talks),
            events: EventLog::in_dir(dir),
        })
    }

    /// An empty registry whose talks live only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn get(&self, number: u64) -> Result<Arc<Talk>> {
        self.read()
            .get(&number)
            .cloned()
            .ok_or_else(|| TalkError::NotFound(format!("talk #{}", number)))
    }

    pub fn exists(&self, number: u64) -> bool {
        self.read().contains_key(&number)
    }

    /// Known talk numbers in ascending order.
    pub fn numbers(&self) -> Vec<u64> {
        self.read().keys().copied().collect()
    }

    pub fn all(&self) -> Vec<Arc<Talk>> {
        self.read().values().cloned().collect()
    }

    /// The talk wired to `thread`, if any.
    pub fn find(&self, thread: &ThreadId) -> Option<Arc<Talk>> {
        find_in(&self.read(), thread)
    }

    /// The talk wired to `thread`, created with the next free number on
    /// first reference.
    pub fn find_or_create(&self, thread: &ThreadId) -> Result<Arc<Talk>> {
        let mut talks = self.write();
        if let Some(talk) = find_in(&talks, thread) {
            return Ok(talk);
        }
        let number = talks.keys().next_back().map_or(1, |n| n + 1);
        let wire = Batch::new()
            .add("wire")
            .add("repo").set(thread.repo.as_str()).up()
            .add("issue").set(thread.number.to_string()).up()
            .add("seen").set("0");
        let talk = match &self.dir {
            Some(dir) => Talk::create_with(dir, number, &wire)?,
            None => {
                let talk = Talk::in_memory(number);
                talk.modify(wire)?;
                talk
            }
        };
        tracing::info!(talk = number, thread = %thread, "talk created");
        let talk = Arc::new(talk);
        talks.insert(number, talk.clone());
        Ok(talk)
    }

    /// Administrative kill: run the kill agent on one talk right away,
    /// outside pass scheduling. Returns the daemon status afterwards.
    pub fn kill(&self, number: u64, services: &Services) -> Result<Option<DaemonStatus>> {
        let talk = self.get(number)?;
        let agent = Agent::KillsDaemon(KillMode::Always);
        let committed = talk.update(|snapshot| agent.execute(snapshot, services))?;
        let status = talk.read().daemon().map(|d| d.status);
        tracing::info!(talk = number, killed = committed.is_some(), "daemon kill requested");
        self.events.record(
            Event::new(EventAction::Kill)
                .with_talk(number)
                .with_details(json!({
                    "killed": committed.is_some(),
                    "status": status.map(|s| s.as_str()),
                })),
        );
        Ok(status)
    }

    /// Leave a kill request for the runner that owns this directory, as
    /// `<dir>/<number>.kill`.
    pub fn request_kill(&self, number: u64) -> Result<PathBuf> {
        self.get(number)?;
        let Some(dir) = &self.dir else {
            return Err(TalkError::UserError(
                "kill requests need a talks directory".to_string(),
            ));
        };
        let path = dir.join(format!("{}.{}", number, KILL_REQUEST_EXT));
        crate::fs::atomic_write_file(&path, &format!("{}\n", chrono::Utc::now().to_rfc3339()))?;
        tracing::info!(talk = number, path = %path.display(), "kill request written");
        Ok(path)
    }

    /// Apply and remove every pending kill request. Returns one failure
    /// line per request that could not be applied.
    pub fn apply_kill_requests(&self, services: &Services) -> Vec<String> {
        let Some(dir) = &self.dir else {
            return Vec::new();
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => return vec![format!("kill requests: {}", e)],
        };

        let mut failures = Vec::new();
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.extension().is_some_and(|ext| ext == KILL_REQUEST_EXT) {
                continue;
            }
            let Some(number) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            else {
                continue;
            };
            if let Err(e) = self.kill(number, services) {
                tracing::warn!(talk = number, error = %e, "kill request failed");
                failures.push(format!("kill #{}: {}", number, e));
            }
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove kill request");
            }
        }
        failures
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<u64, Arc<Talk>>> {
        self.talks.read().unwrap_or_else(|poison| poison.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<u64, Arc<Talk>>> {
        self.talks.write().unwrap_or_else(|poison| poison.into_inner())
    }
}

fn find_in(talks: &BTreeMap<u64, Arc<Talk>>, thread: &ThreadId) -> Option<Arc<Talk>> {
    talks
        .values()
        .find(|talk| {
            talk.read()
                .wire()
                .is_some_and(|w| w.repo == thread.repo && w.issue == thread.number)
        })
        .cloned()
}
