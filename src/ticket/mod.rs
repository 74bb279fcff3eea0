//! The ticket system boundary: threads, comments, and replies.
//!
//! A thread is one issue or pull request of a repository. Comments in a
//! thread are numbered from 1 in posting order, and reads ask for the
//! comments after a given id.

mod answer;
mod inbox;
mod parse;


pub use answer::{Answer, SPAM_LIMIT};
pub use inbox::Inbox;
pub use parse::{Command, parse_command};

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One issue or pull request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId {
    /// `owner/name`
    pub repo: String,
    pub number: u64,
}

impl ThreadId {
    pub fn new(repo: impl Into<String>, number: u64) -> Self {
        Self {
            repo: repo.into(),
            number,
        }
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    pub author: String,
    pub body: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub clone_url: String,
    pub default_branch: String,
    pub public: bool,
}

impl RepoInfo {
    /// Assumed facts for a repository nothing is known about.
    pub fn guess(repo: &str) -> Self {
        Self {
            clone_url: format!("git@github.com:{}.git", repo),
            default_branch: "master".to_string(),
            public: true,
        }
    }
}

/// Pull request facts needed to build a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullInfo {
    /// Branch the pull request wants merged.
    pub head_branch: String,
    /// Branch it merges into.
    pub base_branch: String,
    /// Clone URL of the repository holding `head_branch`.
    pub fork: String,
    pub checks_passed: bool,
}

/// A hosted ticket system.
pub trait Ticket: Send + Sync {
    /// The account this bot posts as.
    fn login(&self) -> &str;

    /// Post a comment and return its id.
    fn post_comment(&self, thread: &ThreadId, text: &str) -> Result<u64>;

    /// Comments with an id greater than `since`, oldest first.
    fn list_comments(&self, thread: &ThreadId, since: u64) -> Result<Vec<Comment>>;

    fn repo_info(&self, repo: &str) -> Result<RepoInfo>;

    /// Pull request details, `None` for a plain issue.
    fn pull(&self, thread: &ThreadId) -> Result<Option<PullInfo>>;
}
