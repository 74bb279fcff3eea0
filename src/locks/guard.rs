//! RAII lock guard implementation.

use crate::error::{Result, TalkError};
use std::fs;
use std::path::{Path, PathBuf};

/// RAII guard for a lock file.
///
/// When dropped, the lock file is deleted. If deletion fails, a warning
/// is logged and no panic occurs.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,

    /// Whether the lock has been released manually.
    released: bool,
}

impl LockGuard {
    pub(super) fn new(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope, reporting
    /// failure to the caller.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|e| {
            TalkError::LockError(format!(
                "failed to release lock '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = fs::remove_file(&self.path)
        {
            tracing::warn!(
                lock = %self.path.display(),
                error = %e,
                "failed to release lock"
            );
        }
    }
}
