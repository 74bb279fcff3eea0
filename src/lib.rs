//! talkd: conversation-driven build, merge, deploy and release bot core.
//!
//! Users address the bot in issue threads. Each thread has a talk, a
//! versioned document holding the thread's wire, pending request, running
//! daemon and archive. A fixed pipeline of agents reads a talk snapshot,
//! talks to the ticket system and the remote executor, and commits batches
//! until nothing changes.

pub mod agents;
pub mod cli;
pub mod command;
pub mod commands;
pub mod config;
pub mod daemon;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod fs;
pub mod locks;
pub mod logging;
pub mod pipeline;
pub mod profile;
pub mod registry;
pub mod talk;
pub mod ticket;

#[cfg(test)]
mod test_support;
