//! Atomic file replacement.
//!
//! 1. Write content to `.{filename}.tmp` next to the target
//! 2. fsync the temporary file
//! 3. rename it over the target and fsync the directory (POSIX)
//!
//! `rename()` is atomic only within one filesystem, which holds because the
//! temporary file lives in the target's directory. A crash may leave the
//! temporary file behind; it is overwritten by the next write.

use crate::error::{Result, TalkError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Atomically write bytes to a file, creating parent directories.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &[u8]) -> Result<()> {
    let path = path.as_ref();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|e| {
            TalkError::UserError(format!(
                "failed to create parent directory '{}': {}",
                parent.display(),
                e
            ))
        })?;
    }

    let temp_path = temp_path_for(path)?;
    write_and_sync(&temp_path, content)?;
    replace(&temp_path, path)
}

/// Atomically write a string to a file.
pub fn atomic_write_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    atomic_write(path, content.as_bytes())
}

fn temp_path_for(target: &Path) -> Result<PathBuf> {
    let parent = target.parent().unwrap_or(Path::new("."));
    let filename = target
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            TalkError::UserError(format!("invalid file path '{}'", target.display()))
        })?;
    Ok(parent.join(format!(".{}.tmp", filename)))
}

fn write_and_sync(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| {
        TalkError::UserError(format!(
            "failed to create temporary file '{}': {}",
            path.display(),
            e
        ))
    })?;

    file.write_all(content)
        .and_then(|()| file.sync_all())
        .map_err(|e| {
            let _ = fs::remove_file(path);
            TalkError::UserError(format!(
                "failed to write temporary file '{}': {}",
                path.display(),
                e
            ))
        })
}

fn replace(source: &Path, target: &Path) -> Result<()> {
    fs::rename(source, target).map_err(|e| {
        let _ = fs::remove_file(source);
        TalkError::UserError(format!(
            "failed to atomically replace '{}': {}",
            target.display(),
            e
        ))
    })?;

    #[cfg(unix)]
    if let Some(parent) = target.parent()
        && let Ok(dir) = File::open(parent)
    {
        let _ = dir.sync_all();
    }

    Ok(())
}
