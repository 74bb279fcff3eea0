//! Agents: the fixed rules that move a talk forward.
//!
//! Each agent reads a snapshot and either returns a batch or declines.
//! Side effects (comments, remote starts) are gated on the document
//! showing the work is not yet done, so running an agent twice is
//! harmless. Agents run inside [`Talk::update`](crate::talk::Talk::update),
//! under the talk's mutation lock.

mod archives;
mod kills;
mod phrases;
mod publishes;
mod reports;
mod starts;
mod understands;


use crate::daemon::Daemon;
use crate::error::Result;
use crate::events::EventLog;
use crate::profile::ProfileSource;
use crate::talk::{Batch, Snapshot, Wire};
use crate::ticket::{Answer, Comment, ThreadId, Ticket};
use chrono::Utc;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// How [`Agent::KillsDaemon`] decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillMode {
    /// Only daemons past the inactivity threshold.
    Inactive,
    /// Any non-terminal daemon.
    Always,
}

/// One state-transition rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Agent {
    KillsDaemon(KillMode),
    PollsDaemon,
    Understands,
    StartsRequest,
    AnnouncesDaemon,
    ReportsOutcome,
    ArchivesDaemon,
    Publishes,
}

impl Agent {
    /// The pipeline's agents in priority order: cleanup and status first,
    /// then intake, then reporting, then archival.
    pub fn standard() -> Vec<Agent> {
        vec![
            Agent::KillsDaemon(KillMode::Inactive),
            Agent::PollsDaemon,
            Agent::Understands,
            Agent::StartsRequest,
            Agent::AnnouncesDaemon,
            Agent::ReportsOutcome,
            Agent::ArchivesDaemon,
            Agent::Publishes,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Agent::KillsDaemon(KillMode::Inactive) => "kills-inactive-daemon",
            Agent::KillsDaemon(KillMode::Always) => "kills-daemon",
            Agent::PollsDaemon => "polls-daemon",
            Agent::Understands => "understands",
            Agent::StartsRequest => "starts-request",
            Agent::AnnouncesDaemon => "announces-daemon",
            Agent::ReportsOutcome => "reports-outcome",
            Agent::ArchivesDaemon => "archives-daemon",
            Agent::Publishes => "publishes",
        }
    }

    /// Decide the next batch for the talk, or `None` when there is nothing
    /// to do.
    pub fn execute(&self, snapshot: &Snapshot, services: &Services) -> Result<Option<Batch>> {
        let now = Utc::now();
        match self {
            Agent::KillsDaemon(mode) => Ok(kills::execute(snapshot, services, *mode, now)),
            Agent::PollsDaemon => Ok(services.daemon.plan_poll(snapshot, now)),
            Agent::Understands => understands::execute(snapshot, services),
            Agent::StartsRequest => starts::execute(snapshot, services, now),
            Agent::AnnouncesDaemon => reports::announce(snapshot, services),
            Agent::ReportsOutcome => reports::report(snapshot, services),
            Agent::ArchivesDaemon => Ok(archives::execute(snapshot, services)),
            Agent::Publishes => publishes::execute(snapshot, services),
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Collaborators shared by all agents.
#[derive(Clone)]
pub struct Services {
    pub ticket: Arc<dyn Ticket>,
    pub profiles: Arc<dyn ProfileSource>,
    pub daemon: Daemon,
    pub events: EventLog,
    /// Consecutive bot comments after which answers stop.
    pub spam_limit: usize,
    /// Parent of the per-daemon working directories.
    pub workdir: PathBuf,
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("login", &self.ticket.login())
            .field("daemon", &self.daemon)
            .field("events", &self.events)
            .field("spam_limit", &self.spam_limit)
            .field("workdir", &self.workdir)
            .finish_non_exhaustive()
    }
}

impl Services {
    pub fn new(ticket: Arc<dyn Ticket>, profiles: Arc<dyn ProfileSource>, daemon: Daemon) -> Self {
        Self {
            ticket,
            profiles,
            daemon,
            events: EventLog::disabled(),
            spam_limit: crate::ticket::SPAM_LIMIT,
            workdir: std::env::temp_dir().join("talkd"),
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn with_spam_limit(mut self, spam_limit: usize) -> Self {
        self.spam_limit = spam_limit;
        self
    }

    pub fn with_workdir<P: Into<PathBuf>>(mut self, workdir: P) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// Reply in the talk's thread, quoting comment `source` when known.
    pub(crate) fn reply(&self, wire: &Wire, source: Option<u64>, message: &str) -> Result<()> {
        let thread = ThreadId::new(wire.repo.as_str(), wire.issue);
        let comment = match source {
            Some(id) => self.comment(&thread, id)?,
            None => None,
        };
        self.answer(&thread, comment.as_ref(), message)
    }

    pub(crate) fn answer(
        &self,
        thread: &ThreadId,
        source: Option<&Comment>,
        message: &str,
    ) -> Result<()> {
        Answer::with_limit(self.ticket.as_ref(), self.spam_limit).post(thread, source, message)?;
        Ok(())
    }

    fn comment(&self, thread: &ThreadId, id: u64) -> Result<Option<Comment>> {
        Ok(self
            .ticket
            .list_comments(thread, id.saturating_sub(1))?
            .into_iter()
            .find(|c| c.id == id))
    }
}
