//! The runner lock.
//!
//! At most one runner may sweep a talks directory. The runner holds
//! `runner.lock` in that directory for as long as it runs.
//!
//! # Lock Files
//!
//! The lock file is created using **create_new** semantics (exclusive
//! create), so only one process can acquire it at a time. A lock older
//! than the configured stale threshold is assumed to belong to a crashed
//! runner and is taken over.
//!
//! # Lock Metadata
//!
//! The lock file contains JSON metadata:
//! - `owner`: The owner of the lock (e.g., `user@HOST`)
//! - `pid`: The process ID (optional)
//! - `created_at`: RFC3339 timestamp
//! - `action`: The command holding the lock (e.g., `run`)
//!
//! # RAII Guards
//!
//! The lock is managed through a guard object that releases it when
//! dropped. If deletion fails during drop, a warning is logged but the
//! program does not crash.

mod guard;
mod metadata;
mod operations;


pub use guard::LockGuard;
pub use metadata::{LockInfo, LockMetadata};
pub use operations::{LOCK_FILE, acquire_runner_lock, inspect_runner_lock};
