//! Daemons: one remote script execution tied to a talk.
//!
//! The daemon record lives in the talk document under `/talk/daemon`. Its
//! status moves `pending -> running -> finished | killed | timed-out`; the
//! remote side is reached through the [`Remote`] trait.

mod lifecycle;
mod local;
mod remote;
mod status;

#[cfg(test)]
mod tests;

pub use lifecycle::{Daemon, INACTIVITY_MINUTES, Launch};
pub use local::LocalRemote;
pub use remote::{Handle, Liveness, Remote};
pub use status::DaemonStatus;
