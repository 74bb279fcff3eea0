//! Remote implementation running scripts as local child processes.
//!
//! Each start spawns `bash` in the given directory with the daemon's
//! environment applied, in its own process group. The script runs in an
//! inner `bash -c` and the wrapper writes its exit status to `<log>.exit`,
//! so any instance can learn the outcome, including one started after the
//! daemon finished. Standard output and error go to one log file under the
//! logs directory. Handles have the form `<pid>@<log path>`.

use super::remote::{Handle, Liveness, Remote};
use crate::error::{Result, TalkError};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

/// `$1` is the script, `$2` the exit status file.
const WRAPPER: &str = r#"bash -c "$1"; code=$?; printf '%s\n' "$code" > "$2"; exit "$code""#;

/// Runs daemons on this machine.
#[derive(Debug)]
pub struct LocalRemote {
    logs_dir: PathBuf,
    children: Mutex<HashMap<Handle, Child>>,
    seq: AtomicU64,
}

impl LocalRemote {
    pub fn new<P: Into<PathBuf>>(logs_dir: P) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            children: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Handle, Child>> {
        self.children.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn log_path(handle: &Handle) -> Option<&Path> {
        handle.as_str().split_once('@').map(|(_, path)| Path::new(path))
    }

    fn exit_path(log: &Path) -> PathBuf {
        let mut path = OsString::from(log.as_os_str());
        path.push(".exit");
        PathBuf::from(path)
    }

    fn pid(handle: &Handle) -> Option<u32> {
        handle
            .as_str()
            .split_once('@')
            .and_then(|(pid, _)| pid.parse::<u32>().ok())
            .filter(|pid| *pid > 1)
    }

    /// Exit status persisted next to the log, if the script has finished.
    fn recorded_exit(handle: &Handle) -> Option<i32> {
        let path = Self::exit_path(Self::log_path(handle)?);
        std::fs::read_to_string(path).ok()?.trim().parse().ok()
    }

    /// Persist an exit status unless the wrapper already wrote one.
    fn record_exit(handle: &Handle, code: i32) {
        let Some(log) = Self::log_path(handle) else {
            return;
        };
        let path = Self::exit_path(log);
        if path.exists() {
            return;
        }
        if let Err(e) = crate::fs::atomic_write_file(&path, &format!("{}\n", code)) {
            tracing::warn!(handle = %handle, error = %e, "failed to record exit status");
        }
    }
}

impl Remote for LocalRemote {
    fn start(&self, dir: &str, script: &str, env: &[String]) -> Result<Handle> {
        std::fs::create_dir_all(&self.logs_dir).map_err(|e| {
            TalkError::RemoteUnavailable(format!(
                "failed to create logs directory '{}': {}",
                self.logs_dir.display(),
                e
            ))
        })?;
        std::fs::create_dir_all(dir).map_err(|e| {
            TalkError::RemoteUnavailable(format!(
                "failed to create working directory '{}': {}",
                dir, e
            ))
        })?;

        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let log = self.logs_dir.join(format!(
            "{}-{}.log",
            chrono::Utc::now().format("%Y%m%d%H%M%S"),
            seq
        ));
        let stdout = std::fs::File::create(&log).map_err(|e| {
            TalkError::RemoteUnavailable(format!(
                "failed to create log '{}': {}",
                log.display(),
                e
            ))
        })?;
        let stderr = stdout.try_clone().map_err(|e| {
            TalkError::RemoteUnavailable(format!(
                "failed to share log '{}': {}",
                log.display(),
                e
            ))
        })?;

        let mut command = Command::new("bash");
        command
            .arg("-c")
            .arg(WRAPPER)
            .arg("talkd-daemon")
            .arg(script)
            .arg(Self::exit_path(&log))
            .current_dir(dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr));
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        for entry in env {
            match entry.split_once('=') {
                Some((key, value)) if !key.is_empty() => {
                    command.env(key, value);
                }
                _ => tracing::warn!(entry = %entry, "skipping malformed environment entry"),
            }
        }

        let child = command.spawn().map_err(|e| {
            TalkError::RemoteUnavailable(format!("failed to spawn 'bash' in '{}': {}", dir, e))
        })?;
        let handle = Handle(format!("{}@{}", child.id(), log.display()));
        tracing::debug!(handle = %handle, "local daemon spawned");
        self.lock().insert(handle.clone(), child);
        Ok(handle)
    }

    fn poll(&self, handle: &Handle) -> Result<Liveness> {
        let mut children = self.lock();
        if let Some(child) = children.get_mut(handle) {
            return match child.try_wait() {
                Ok(Some(status)) => {
                    children.remove(handle);
                    drop(children);
                    let code = Self::recorded_exit(handle).unwrap_or_else(|| exit_code(status));
                    Self::record_exit(handle, code);
                    Ok(Liveness::exited(code))
                }
                Ok(None) => Ok(Liveness::running()),
                Err(e) => Err(TalkError::RemoteUnavailable(format!(
                    "failed to check process status for '{}': {}",
                    handle, e
                ))),
            };
        }
        drop(children);

        // Not spawned by this instance, or already reaped.
        if let Some(code) = Self::recorded_exit(handle) {
            return Ok(Liveness::exited(code));
        }
        match Self::pid(handle) {
            Some(pid) if signal("-0", &pid.to_string()) => Ok(Liveness::running()),
            _ => Err(TalkError::RemoteUnavailable(format!(
                "no process is known for handle '{}'",
                handle
            ))),
        }
    }

    fn kill(&self, handle: &Handle) -> Result<()> {
        if let Some(mut child) = self.lock().remove(handle) {
            signal("-KILL", &format!("-{}", child.id()));
            // The leader may already be gone.
            let _ = child.kill();
            let code = child.wait().map(exit_code).unwrap_or(-1);
            Self::record_exit(handle, code);
            return Ok(());
        }
        if Self::recorded_exit(handle).is_some() {
            return Ok(());
        }
        let Some(pid) = Self::pid(handle) else {
            return Ok(());
        };
        if signal("-TERM", &format!("-{}", pid)) {
            tracing::debug!(pid, "foreign daemon signalled");
            Self::record_exit(handle, 128 + 15);
        } else {
            tracing::debug!(pid, "process already gone");
        }
        Ok(())
    }

    fn tail(&self, handle: &Handle, lines: usize) -> Result<Vec<String>> {
        let Some(path) = Self::log_path(handle) else {
            return Ok(Vec::new());
        };
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(TalkError::RemoteUnavailable(format!(
                    "failed to read log '{}': {}",
                    path.display(),
                    e
                )));
            }
        };
        let all: Vec<&str> = content.lines().collect();
        let skip = all.len().saturating_sub(lines);
        Ok(all[skip..].iter().map(|l| l.to_string()).collect())
    }
}

/// Run `kill <sig> -- <target>`; a negative target names a process group.
fn signal(sig: &str, target: &str) -> bool {
    match Command::new("kill")
        .arg(sig)
        .arg("--")
        .arg(target)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) => status.success(),
        Err(e) => {
            tracing::warn!(pid = target, error = %e, "failed to run 'kill'");
            false
        }
    }
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|s| 128 + s))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}
