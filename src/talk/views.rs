//! Typed read helpers over the well-known subtrees of a talk.
//!
//! # Layout
//!
//! ```text
//! talk[@public]
//! ├── wire            repo, issue, seen
//! ├── request[@id]    type, args/arg[@name]          (0 or 1)
//! ├── daemon[@id]     title, started, seen, dir,      (0 or 1)
//! │                   script, handle, status, code,
//! │                   ended, args/arg[@name]
//! └── archive         log[@id]: title, status, code, ended
//! ```

use super::document::{Document, NodeId};
use crate::daemon::DaemonStatus;
use chrono::{DateTime, Utc};
use std::fmt;

/// Operation a request asks for. Each kind maps to a profile section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Merge,
    Deploy,
    Release,
    Run,
}

impl RequestKind {
    pub const ALL: [RequestKind; 4] = [
        RequestKind::Merge,
        RequestKind::Deploy,
        RequestKind::Release,
        RequestKind::Run,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Merge => "merge",
            RequestKind::Deploy => "deploy",
            RequestKind::Release => "release",
            RequestKind::Run => "run",
        }
    }

    /// Parse a request kind from its textual form.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where reports for this talk go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wire {
    pub repo: String,
    pub issue: u64,
    /// Id of the last comment already processed.
    pub seen: u64,
}

/// A pending request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub id: String,
    pub kind: RequestKind,
    pub args: Vec<(String, String)>,
    pub author: Option<String>,
    pub comment: Option<u64>,
}

impl Request {
    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The daemon subtree as recorded in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonRecord {
    pub id: String,
    pub title: String,
    pub started: Option<DateTime<Utc>>,
    pub seen: Option<DateTime<Utc>>,
    pub dir: String,
    pub script: String,
    pub handle: Option<String>,
    pub status: DaemonStatus,
    pub ended: Option<DateTime<Utc>>,
    pub args: Vec<(String, String)>,
    pub author: Option<String>,
    pub comment: Option<u64>,
    pub announced: bool,
    pub reported: bool,
}

impl DaemonRecord {
    /// Most recent liveness signal: `seen`, else `started`.
    pub fn last_alive(&self) -> Option<DateTime<Utc>> {
        self.seen.or(self.started)
    }

    pub fn arg(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// One archived outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub id: String,
    pub title: String,
    pub status: String,
    pub code: Option<i32>,
    pub ended: Option<DateTime<Utc>>,
}

impl Document {
    pub fn wire(&self) -> Option<Wire> {
        let id = *self.find("/talk/wire").first()?;
        Some(Wire {
            repo: self.child_text(id, "repo")?.to_string(),
            issue: self.child_text(id, "issue")?.parse().ok()?,
            seen: self
                .child_text(id, "seen")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
        })
    }

    /// The pending request, if any. A request with an unknown type is ignored.
    pub fn request(&self) -> Option<Request> {
        let id = *self.find("/talk/request").first()?;
        let node = self.node(id)?;
        Some(Request {
            id: node.attr("id").unwrap_or_default().to_string(),
            kind: RequestKind::from_str(self.child_text(id, "type")?)?,
            args: self.args_of(id),
            author: node.attr("author").map(str::to_string),
            comment: node.attr("comment").and_then(|c| c.parse().ok()),
        })
    }

    pub fn daemon(&self) -> Option<DaemonRecord> {
        let id = *self.find("/talk/daemon").first()?;
        let node = self.node(id)?;
        let text = |name: &str| self.child_text(id, name).map(str::to_string);
        let time = |name: &str| {
            self.child_text(id, name)
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc))
        };
        let code = self.child_text(id, "code").and_then(|c| c.parse().ok());
        let status = self
            .child_text(id, "status")
            .and_then(|s| DaemonStatus::parse(s, code))
            .unwrap_or(DaemonStatus::Pending);
        Some(DaemonRecord {
            id: node.attr("id").unwrap_or_default().to_string(),
            title: text("title").unwrap_or_default(),
            started: time("started"),
            seen: time("seen"),
            dir: text("dir").unwrap_or_default(),
            script: text("script").unwrap_or_default(),
            handle: text("handle"),
            status,
            ended: time("ended"),
            args: self.args_of(id),
            author: node.attr("author").map(str::to_string),
            comment: node.attr("comment").and_then(|c| c.parse().ok()),
            announced: node.attr("announced").is_some(),
            reported: node.attr("reported").is_some(),
        })
    }

    pub fn archive(&self) -> Vec<ArchiveEntry> {
        self.find("/talk/archive/log")
            .into_iter()
            .filter_map(|id| {
                let node = self.node(id)?;
                Some(ArchiveEntry {
                    id: node.attr("id").unwrap_or_default().to_string(),
                    title: self.child_text(id, "title").unwrap_or_default().to_string(),
                    status: self.child_text(id, "status").unwrap_or_default().to_string(),
                    code: self.child_text(id, "code").and_then(|c| c.parse().ok()),
                    ended: self
                        .child_text(id, "ended")
                        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                        .map(|t| t.with_timezone(&Utc)),
                })
            })
            .collect()
    }

    /// The `public` flag; `None` until some agent decided it.
    pub fn is_public(&self) -> Option<bool> {
        self.node(self.root())?
            .attr("public")
            .map(|v| v == "true")
    }

    fn args_of(&self, id: NodeId) -> Vec<(String, String)> {
        let Some((args, _)) = self.child(id, "args") else {
            return Vec::new();
        };
        self.children_of(args)
            .filter(|(_, n)| n.name() == "arg")
            .filter_map(|(_, n)| {
                Some((
                    n.attr("name")?.to_string(),
                    n.text().unwrap_or_default().to_string(),
                ))
            })
            .collect()
    }
}
