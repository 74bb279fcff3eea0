//! Start, poll, and kill planning for the single daemon of a talk.
//!
//! Planners read a snapshot and return the batch that records the new
//! state; they are meant to run inside [`Talk::update`] so every check is
//! made against the post-lock document. Terminal writes are skipped when a
//! terminal status is already recorded, so the first outcome wins.

use super::remote::{Handle, Remote};
use super::status::DaemonStatus;
use crate::error::{Result, TalkError};
use crate::talk::{Batch, Snapshot, Talk};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

const DAEMON: &str = "/talk/daemon";

/// Default time a daemon may go without a liveness signal.
pub const INACTIVITY_MINUTES: i64 = 5;

/// Liveness refreshes closer together than this are not recorded.
fn seen_granularity() -> Duration {
    Duration::seconds(60)
}

/// Everything needed to launch one daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Launch {
    /// Operation name, e.g. `merge`.
    pub title: String,
    /// Working directory on the build host.
    pub dir: String,
    /// Script text handed to the remote.
    pub script: String,
    pub env: Vec<String>,
    /// Request arguments carried over for reporting.
    pub args: Vec<(String, String)>,
    pub author: Option<String>,
    pub comment: Option<u64>,
}

/// Daemon lifecycle over a remote-execution collaborator.
#[derive(Clone)]
pub struct Daemon {
    remote: Arc<dyn Remote>,
    inactivity: Duration,
}

impl std::fmt::Debug for Daemon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Daemon")
            .field("inactivity", &self.inactivity)
            .finish_non_exhaustive()
    }
}

impl Daemon {
    pub fn new(remote: Arc<dyn Remote>) -> Self {
        Self::with_inactivity(remote, Duration::minutes(INACTIVITY_MINUTES))
    }

    pub fn with_inactivity(remote: Arc<dyn Remote>, inactivity: Duration) -> Self {
        Self { remote, inactivity }
    }

    pub fn remote(&self) -> &dyn Remote {
        self.remote.as_ref()
    }

    pub fn inactivity(&self) -> Duration {
        self.inactivity
    }

    /// Id the daemon started from `snapshot` will get: the talk number and
    /// the revision its start commits.
    pub fn next_id(snapshot: &Snapshot) -> String {
        format!("{}-{}", snapshot.number(), snapshot.revision() + 1)
    }

    /// Record a PENDING daemon and hand its script to the remote.
    ///
    /// Fails with `AlreadyRunning` when the talk already holds a daemon. A
    /// remote that refuses the start is logged; the record stays PENDING
    /// without a handle until the inactivity timeout finalizes it.
    pub fn plan_start(
        &self,
        snapshot: &Snapshot,
        launch: &Launch,
        now: DateTime<Utc>,
    ) -> Result<Batch> {
        if snapshot.exists(DAEMON) {
            let id = snapshot.daemon().map(|d| d.id).unwrap_or_default();
            return Err(TalkError::AlreadyRunning(format!(
                "talk #{} already runs daemon '{}'",
                snapshot.number(),
                id
            )));
        }
        let id = Self::next_id(snapshot);
        let handle = match self.remote.start(&launch.dir, &launch.script, &launch.env) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(talk = snapshot.number(), daemon = %id, error = %e, "remote start failed");
                None
            }
        };

        let mut batch = Batch::new().add("daemon").attr("id", id.as_str());
        if let Some(author) = &launch.author {
            batch = batch.attr("author", author.as_str());
        }
        if let Some(comment) = launch.comment {
            batch = batch.attr("comment", comment.to_string());
        }
        batch = batch
            .add("title").set(launch.title.as_str()).up()
            .add("started").set(now.to_rfc3339()).up()
            .add("dir").set(launch.dir.as_str()).up()
            .add("script").set(launch.script.as_str()).up()
            .add("status").set(DaemonStatus::Pending.as_str()).up();
        if let Some(handle) = handle {
            batch = batch.add("handle").set(handle.0).up();
        }
        if !launch.args.is_empty() {
            batch = batch.add("args");
            for (name, value) in &launch.args {
                batch = batch.add("arg").attr("name", name.as_str()).set(value.as_str()).up();
            }
        }
        Ok(batch)
    }

    /// Refresh a non-terminal daemon from the remote, then apply the
    /// inactivity timeout. Returns `None` when nothing changed.
    pub fn plan_poll(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Option<Batch> {
        let daemon = snapshot.daemon()?;
        if daemon.status.is_terminal() {
            return None;
        }
        if let Some(handle) = daemon.handle.as_ref().map(|h| Handle(h.clone())) {
            match self.remote.poll(&handle) {
                Ok(liveness) => {
                    if let Some(code) = liveness.exit_code {
                        return Some(terminal(snapshot, DaemonStatus::Finished(code), now));
                    }
                    if liveness.alive {
                        let mut batch = Batch::new();
                        if daemon.status != DaemonStatus::Running {
                            batch = batch.put(snapshot, DAEMON, "status", DaemonStatus::Running.as_str());
                        }
                        let fresh = daemon
                            .seen
                            .is_some_and(|seen| now.signed_duration_since(seen) < seen_granularity());
                        if !fresh {
                            batch = batch.put(snapshot, DAEMON, "seen", now.to_rfc3339());
                        }
                        return (!batch.is_empty()).then_some(batch);
                    }
                }
                Err(e) => {
                    tracing::debug!(talk = snapshot.number(), error = %e, "daemon poll failed");
                }
            }
        }
        self.plan_timeout(snapshot, now)
    }

    /// Force a daemon with no liveness signal within the threshold into
    /// TIMED-OUT, through the same path as an explicit kill.
    pub fn plan_timeout(&self, snapshot: &Snapshot, now: DateTime<Utc>) -> Option<Batch> {
        let daemon = snapshot.daemon()?;
        let last = daemon.last_alive()?;
        if now.signed_duration_since(last) <= self.inactivity {
            return None;
        }
        tracing::info!(
            talk = snapshot.number(),
            daemon = %daemon.id,
            "daemon inactive since {}",
            last.to_rfc3339()
        );
        self.plan_kill(snapshot, DaemonStatus::TimedOut, now)
    }

    /// Request remote termination and record `outcome` (KILLED or
    /// TIMED-OUT). Never waits for confirmation; no-op once terminal.
    pub fn plan_kill(
        &self,
        snapshot: &Snapshot,
        outcome: DaemonStatus,
        now: DateTime<Utc>,
    ) -> Option<Batch> {
        let daemon = snapshot.daemon()?;
        if daemon.status.is_terminal() {
            return None;
        }
        if let Some(handle) = &daemon.handle {
            if let Err(e) = self.remote.kill(&Handle(handle.clone())) {
                tracing::warn!(talk = snapshot.number(), error = %e, "remote kill failed");
            }
        }
        Some(terminal(snapshot, outcome, now))
    }

    /// Start a daemon on `talk`. Returns the new daemon id.
    pub fn start(&self, talk: &Talk, launch: &Launch) -> Result<String> {
        talk.update(|snapshot| self.plan_start(snapshot, launch, Utc::now()).map(Some))?;
        talk.read()
            .daemon()
            .map(|d| d.id)
            .ok_or_else(|| TalkError::NotFound(format!("daemon of talk #{}", talk.number())))
    }

    /// Poll the daemon of `talk` and return its recorded status.
    pub fn poll(&self, talk: &Talk) -> Result<Option<DaemonStatus>> {
        talk.update(|snapshot| Ok(self.plan_poll(snapshot, Utc::now())))?;
        Ok(talk.read().daemon().map(|d| d.status))
    }

    /// Kill the daemon of `talk` and return its recorded status.
    pub fn kill(&self, talk: &Talk) -> Result<Option<DaemonStatus>> {
        talk.update(|snapshot| Ok(self.plan_kill(snapshot, DaemonStatus::Killed, Utc::now())))?;
        Ok(talk.read().daemon().map(|d| d.status))
    }
}

/// Record a terminal status with its code and end time.
fn terminal(snapshot: &Snapshot, status: DaemonStatus, now: DateTime<Utc>) -> Batch {
    let mut batch = Batch::new().put(snapshot, DAEMON, "status", status.as_str());
    if let Some(code) = status.code() {
        batch = batch.put(snapshot, DAEMON, "code", code.to_string());
    }
    batch.put(snapshot, DAEMON, "ended", now.to_rfc3339())
}
