//! Talks: the persistent, versioned state record of one request thread.
//!
//! A talk owns a [`Document`] and a revision counter. Readers take an
//! immutable [`Snapshot`]; writers submit a [`Batch`] which either commits
//! completely (revision + 1) or not at all. Writes to one talk are
//! serialized by an internal mutex.
//!
//! # Talk File Format
//!
//! Persisted talks are JSON files named `<number>.json`:
//!
//! ```text
//! {
//!   "number": 7,
//!   "revision": 12,
//!   "document": { "name": "talk", "children": [ ... ] }
//! }
//! ```
//!
//! The file is rewritten atomically before the in-memory revision moves,
//! so a crash leaves either the old or the new revision on disk.

mod batch;
mod document;
mod path;
mod views;

#[cfg(test)]
mod tests;

pub use batch::{Batch, Edit, Op};
pub use document::{Document, Node, NodeId, ROOT};
pub use path::{NodePath, Predicate, Step};
pub use views::{ArchiveEntry, DaemonRecord, Request, RequestKind, Wire};

use crate::error::{Result, TalkError};
use serde::{Deserialize, Serialize};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Immutable view of a talk at one revision.
#[derive(Debug, Clone)]
pub struct Snapshot {
    number: u64,
    revision: u64,
    document: Arc<Document>,
}

impl Snapshot {
    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn document(&self) -> &Document {
        &self.document
    }
}

impl Deref for Snapshot {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.document
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TalkFile {
    number: u64,
    revision: u64,
    document: Document,
}

/// A talk with serialized mutation and optional on-disk persistence.
#[derive(Debug)]
pub struct Talk {
    number: u64,
    path: Option<PathBuf>,
    state: Mutex<Snapshot>,
    pass: Mutex<()>,
}

impl Talk {
    /// Create an empty, memory-only talk.
    pub fn in_memory(number: u64) -> Self {
        Self::from_parts(number, 0, Document::new(), None)
    }

    /// Create an empty talk persisted as `<dir>/<number>.json`.
    ///
    /// Fails if a talk with that number already exists in `dir`.
    pub fn create<P: AsRef<Path>>(dir: P, number: u64) -> Result<Self> {
        Self::create_with(dir, number, &Batch::new())
    }

    /// Create a talk whose first file on disk already holds `initial`.
    ///
    /// Nothing is written when `initial` does not apply.
    pub fn create_with<P: AsRef<Path>>(dir: P, number: u64, initial: &Batch) -> Result<Self> {
        if number == 0 {
            return Err(TalkError::UserError(
                "talk numbers start at 1".to_string(),
            ));
        }
        let path = dir.as_ref().join(format!("{}.json", number));
        if path.exists() {
            return Err(TalkError::UserError(format!(
                "talk #{} already exists at '{}'",
                number,
                path.display()
            )));
        }
        let document = Document::new().apply(initial)?;
        let revision = u64::from(!initial.is_empty());
        let talk = Self::from_parts(number, revision, document, Some(path));
        talk.persist(&talk.read())?;
        Ok(talk)
    }

    /// Load a talk from its JSON file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TalkError::UserError(format!(
                "failed to read talk file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let file: TalkFile = serde_json::from_str(&content).map_err(|e| {
            TalkError::UserError(format!(
                "failed to parse talk file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::from_parts(
            file.number,
            file.revision,
            file.document,
            Some(path.to_path_buf()),
        ))
    }

    fn from_parts(number: u64, revision: u64, document: Document, path: Option<PathBuf>) -> Self {
        Self {
            number,
            path,
            state: Mutex::new(Snapshot {
                number,
                revision,
                document: Arc::new(document),
            }),
            pass: Mutex::new(()),
        }
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    /// Path of the backing file, if persisted.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Current snapshot.
    pub fn read(&self) -> Snapshot {
        self.lock_state().clone()
    }

    pub fn revision(&self) -> u64 {
        self.lock_state().revision
    }

    /// Apply a batch atomically and return the resulting revision.
    ///
    /// An empty batch is a no-op and returns the current revision.
    pub fn modify(&self, batch: Batch) -> Result<u64> {
        let mut state = self.lock_state();
        self.commit(&mut state, &batch)
    }

    /// Build and commit a batch against the post-lock snapshot.
    ///
    /// `plan` sees the latest committed state while holding this talk's
    /// mutation lock, so any precondition it checks still holds when its
    /// batch is applied. Returns the new revision when something committed.
    pub fn update<F>(&self, plan: F) -> Result<Option<u64>>
    where
        F: FnOnce(&Snapshot) -> Result<Option<Batch>>,
    {
        let mut state = self.lock_state();
        let current = state.clone();
        let Some(batch) = plan(&current)? else {
            return Ok(None);
        };
        let after = self.commit(&mut state, &batch)?;
        Ok((after != current.revision).then_some(after))
    }

    /// Claim the right to run a pipeline pass on this talk.
    ///
    /// Returns `None` while another pass holds it.
    pub fn try_begin_pass(&self) -> Option<MutexGuard<'_, ()>> {
        match self.pass.try_lock() {
            Ok(guard) => Some(guard),
            Err(std::sync::TryLockError::Poisoned(poison)) => Some(poison.into_inner()),
            Err(std::sync::TryLockError::WouldBlock) => None,
        }
    }

    fn commit(&self, state: &mut MutexGuard<'_, Snapshot>, batch: &Batch) -> Result<u64> {
        if batch.is_empty() {
            return Ok(state.revision);
        }
        let document = state.document.apply(batch)?;
        let next = Snapshot {
            number: self.number,
            revision: state.revision + 1,
            document: Arc::new(document),
        };
        self.persist(&next)?;
        tracing::debug!(
            talk = self.number,
            revision = next.revision,
            edits = batch.len(),
            "talk modified"
        );
        **state = next;
        Ok(state.revision)
    }

    fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let file = TalkFile {
            number: snapshot.number,
            revision: snapshot.revision,
            document: (*snapshot.document).clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|e| {
            TalkError::UserError(format!(
                "failed to serialize talk #{}: {}",
                snapshot.number, e
            ))
        })?;
        crate::fs::atomic_write_file(path, &json)
    }

    fn lock_state(&self) -> MutexGuard<'_, Snapshot> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }
}
