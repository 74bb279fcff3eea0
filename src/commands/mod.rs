//! Command implementations for talkd.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, plus the wiring shared by commands that drive talks.

mod comment;
mod kill;
mod run;
mod script;
mod show;
mod status;

pub use run::Runner;

use crate::agents::Services;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::daemon::{Daemon, LocalRemote};
use crate::error::Result;
use crate::events::EventLog;
use crate::profile::DirProfiles;
use crate::ticket::Inbox;
use std::sync::Arc;

/// Dispatch a command to its implementation.
///
/// Loads the configuration named on the command line first; a missing
/// file means defaults.
pub fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;
    match cli.command {
        Command::Run(args) => run::cmd_run(&config, args),
        Command::Comment(args) => comment::cmd_comment(&config, args),
        Command::Kill(args) => kill::cmd_kill(&config, args),
        Command::Show(args) => show::cmd_show(&config, args),
        Command::Status => status::cmd_status(&config),
        Command::Script(args) => script::cmd_script(&config, args),
    }
}

/// The local ticket system named by the configuration.
fn open_inbox(config: &Config) -> Arc<Inbox> {
    Arc::new(Inbox::new(&config.inbox_dir, config.login.as_str()))
}

/// Agent collaborators backed by the local inbox, profile directory, and
/// local process remote.
fn open_services(config: &Config, inbox: Arc<Inbox>) -> Services {
    let remote = Arc::new(LocalRemote::new(&config.logs_dir));
    let daemon = Daemon::with_inactivity(
        remote,
        chrono::Duration::minutes(i64::from(config.inactivity_minutes)),
    );
    Services::new(inbox, Arc::new(DirProfiles::new(&config.profiles_dir)), daemon)
        .with_events(EventLog::in_dir(&config.talks_dir))
        .with_spam_limit(config.spam_limit)
        .with_workdir(&config.workdir)
}
