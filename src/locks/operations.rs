//! Runner lock acquisition and inspection.

use super::guard::LockGuard;
use super::metadata::{LockInfo, LockMetadata};
use crate::error::{Result, TalkError};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Name of the lock file inside the talks directory.
pub const LOCK_FILE: &str = "runner.lock";

/// Acquire a lock file using create_new semantics.
///
/// Fails with `LockError` when the file already exists.
fn acquire_lock(lock_path: &Path, metadata: &LockMetadata) -> Result<LockGuard> {
    if let Some(parent) = lock_path.parent()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            TalkError::UserError(format!(
                "failed to create lock directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                let existing_info = match LockMetadata::from_file(lock_path) {
                    Ok(meta) => format!(
                        "\nLock: {} (created {} ago by {})\nAction: {}",
                        lock_path.display(),
                        meta.age_string(),
                        meta.owner,
                        meta.action
                    ),
                    Err(_) => format!("\nLock: {}", lock_path.display()),
                };
                TalkError::LockError(format!("lock is held by another process{}", existing_info))
            } else {
                TalkError::LockError(format!(
                    "failed to acquire lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            }
        })?;

    let json = metadata.to_json()?;
    file.write_all(json.as_bytes()).map_err(|e| {
        let _ = fs::remove_file(lock_path);
        TalkError::LockError(format!("failed to write lock metadata: {}", e))
    })?;

    file.sync_all().map_err(|e| {
        let _ = fs::remove_file(lock_path);
        TalkError::LockError(format!("failed to sync lock file: {}", e))
    })?;

    Ok(LockGuard::new(lock_path.to_path_buf()))
}

/// Acquire the runner lock of a talks directory.
///
/// A lock older than `stale_minutes` is removed and acquisition retried
/// once.
pub fn acquire_runner_lock(talks_dir: &Path, action: &str, stale_minutes: u32) -> Result<LockGuard> {
    let lock_path = talks_dir.join(LOCK_FILE);
    let metadata = LockMetadata::new(action);
    match acquire_lock(&lock_path, &metadata) {
        Err(TalkError::LockError(msg)) => {
            let Some(info) = inspect_runner_lock(talks_dir, stale_minutes)?.filter(|i| i.is_stale)
            else {
                return Err(TalkError::LockError(msg));
            };
            tracing::warn!(lock = %info, "taking over stale runner lock");
            fs::remove_file(&lock_path).map_err(|e| {
                TalkError::LockError(format!(
                    "failed to clear stale lock '{}': {}",
                    lock_path.display(),
                    e
                ))
            })?;
            acquire_lock(&lock_path, &metadata)
        }
        other => other,
    }
}

/// The runner lock currently on disk, if any.
///
/// An unreadable lock file is reported as stale.
pub fn inspect_runner_lock(talks_dir: &Path, stale_minutes: u32) -> Result<Option<LockInfo>> {
    let path = talks_dir.join(LOCK_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let (metadata, is_stale) = match LockMetadata::from_file(&path) {
        Ok(metadata) => {
            let is_stale = metadata.is_stale(stale_minutes);
            (metadata, is_stale)
        }
        Err(e) => {
            tracing::debug!(error = %e, "unreadable runner lock");
            (
                LockMetadata {
                    owner: "unknown".to_string(),
                    pid: None,
                    created_at: chrono::DateTime::<chrono::Utc>::default(),
                    action: "unknown".to_string(),
                },
                true,
            )
        }
    };
    Ok(Some(LockInfo {
        path,
        metadata,
        is_stale,
    }))
}
