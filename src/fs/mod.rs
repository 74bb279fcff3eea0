//! Filesystem utilities for talkd.
//!
//! Talk files, the pulse file, and inbox side files must never be observed
//! half-written, so all state files go through [`atomic_write`].

pub mod atomic;

pub use atomic::atomic_write;
pub use atomic::atomic_write_file;
