//! A file-backed ticket system.
//!
//! # Layout
//!
//! ```text
//! <inbox>/
//! ├── acme_widgets-17.ndjson      comments of acme/widgets#17, one JSON per line
//! ├── acme_widgets-17.pull.json   pull request facts (absent for issues)
//! └── acme_widgets.repo.json      repository facts (optional)
//! ```
//!
//! Comments are appended under a process-wide lock and numbered from 1
//! within their thread.

use super::{Comment, PullInfo, RepoInfo, ThreadId, Ticket};
use crate::error::{Result, TalkError};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Local ticket system rooted at a directory.
#[derive(Debug)]
pub struct Inbox {
    dir: PathBuf,
    login: String,
    append: Mutex<()>,
}

impl Inbox {
    pub fn new<P: Into<PathBuf>>(dir: P, login: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            login: login.into(),
            append: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append a comment by `author` and return its id.
    pub fn append(&self, thread: &ThreadId, author: &str, body: &str) -> Result<u64> {
        let path = self.thread_file(thread, "ndjson")?;
        let _guard = self.append.lock().unwrap_or_else(|poison| poison.into_inner());
        let id = read_comments(&path)?.last().map_or(1, |c| c.id + 1);
        let comment = Comment {
            id,
            author: author.to_string(),
            body: body.to_string(),
            posted_at: Utc::now(),
        };
        let line = serde_json::to_string(&comment).map_err(|e| {
            TalkError::RemoteUnavailable(format!("failed to serialize comment: {}", e))
        })?;

        fs::create_dir_all(&self.dir).map_err(|e| {
            TalkError::RemoteUnavailable(format!(
                "failed to create inbox directory '{}': {}",
                self.dir.display(),
                e
            ))
        })?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                TalkError::RemoteUnavailable(format!(
                    "failed to open thread file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        writeln!(file, "{}", line).map_err(|e| {
            TalkError::RemoteUnavailable(format!(
                "failed to append to thread file '{}': {}",
                path.display(),
                e
            ))
        })?;
        file.sync_all().map_err(|e| {
            TalkError::RemoteUnavailable(format!(
                "failed to sync thread file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(id)
    }

    /// Every thread with at least one comment, sorted.
    pub fn threads(&self) -> Result<Vec<ThreadId>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(TalkError::RemoteUnavailable(format!(
                    "failed to list inbox '{}': {}",
                    self.dir.display(),
                    e
                )));
            }
        };
        let mut threads: Vec<ThreadId> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().to_string();
                parse_thread(name.strip_suffix(".ndjson")?)
            })
            .collect();
        threads.sort();
        Ok(threads)
    }

    /// Record pull request facts for a thread.
    pub fn set_pull(&self, thread: &ThreadId, pull: &PullInfo) -> Result<()> {
        let path = self.thread_file(thread, "pull.json")?;
        write_json(&path, pull)
    }

    /// Record repository facts.
    pub fn set_repo(&self, repo: &str, info: &RepoInfo) -> Result<()> {
        let path = self.dir.join(format!("{}.repo.json", flatten(repo)?));
        write_json(&path, info)
    }

    fn thread_file(&self, thread: &ThreadId, ext: &str) -> Result<PathBuf> {
        Ok(self
            .dir
            .join(format!("{}-{}.{}", flatten(&thread.repo)?, thread.number, ext)))
    }
}

impl Ticket for Inbox {
    fn login(&self) -> &str {
        &self.login
    }

    fn post_comment(&self, thread: &ThreadId, text: &str) -> Result<u64> {
        self.append(thread, &self.login, text)
    }

    fn list_comments(&self, thread: &ThreadId, since: u64) -> Result<Vec<Comment>> {
        let path = self.thread_file(thread, "ndjson")?;
        Ok(read_comments(&path)?
            .into_iter()
            .filter(|c| c.id > since)
            .collect())
    }

    fn repo_info(&self, repo: &str) -> Result<RepoInfo> {
        let path = self.dir.join(format!("{}.repo.json", flatten(repo)?));
        Ok(read_json(&path)?.unwrap_or_else(|| RepoInfo::guess(repo)))
    }

    fn pull(&self, thread: &ThreadId) -> Result<Option<PullInfo>> {
        read_json(&self.thread_file(thread, "pull.json")?)
    }
}

/// `owner/name` to `owner_name`. Owners may not contain `_`.
fn flatten(repo: &str) -> Result<String> {
    match repo.split_once('/') {
        Some((owner, name))
            if !owner.is_empty()
                && !name.is_empty()
                && !owner.contains('_')
                && !name.contains('/') =>
        {
            Ok(format!("{}_{}", owner, name))
        }
        _ => Err(TalkError::UserError(format!(
            "invalid repository '{}'\n\
             Fix: use the form 'owner/name'.",
            repo
        ))),
    }
}

fn parse_thread(stem: &str) -> Option<ThreadId> {
    let (owner, rest) = stem.split_once('_')?;
    let (name, number) = rest.rsplit_once('-')?;
    Some(ThreadId::new(format!("{}/{}", owner, name), number.parse().ok()?))
}

fn read_comments(path: &Path) -> Result<Vec<Comment>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(TalkError::RemoteUnavailable(format!(
                "failed to read thread file '{}': {}",
                path.display(),
                e
            )));
        }
    };
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line).map_err(|e| {
                TalkError::RemoteUnavailable(format!(
                    "malformed comment at {}:{}: {}",
                    path.display(),
                    n + 1,
                    e
                ))
            })
        })
        .collect()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(TalkError::RemoteUnavailable(format!(
                "failed to read '{}': {}",
                path.display(),
                e
            )));
        }
    };
    serde_json::from_str(&content).map(Some).map_err(|e| {
        TalkError::RemoteUnavailable(format!("failed to parse '{}': {}", path.display(), e))
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        TalkError::UserError(format!("failed to serialize '{}': {}", path.display(), e))
    })?;
    crate::fs::atomic_write_file(path, &json)
}
