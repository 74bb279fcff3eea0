//! Implementation of the `talkd kill` command.

use super::{open_inbox, open_services};
use crate::cli::KillArgs;
use crate::config::Config;
use crate::error::{Result, TalkError};
use crate::locks;
use crate::registry::Talks;

/// Kill the daemon of one talk.
///
/// With no runner active the kill runs here under the runner lock. While a
/// runner holds the lock, a kill request is left for its next tick.
pub fn cmd_kill(config: &Config, args: KillArgs) -> Result<()> {
    let acquired =
        locks::acquire_runner_lock(&config.talks_dir, "kill", config.lock_stale_minutes);
    let _lock = match acquired {
        Ok(lock) => lock,
        Err(TalkError::LockError(reason)) => {
            tracing::debug!(reason = %reason, "runner active, handing the kill over");
            let talks = Talks::open(&config.talks_dir)?;
            talks.request_kill(args.number)?;
            println!(
                "Talk #{}: kill requested, the running runner will apply it",
                args.number
            );
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let talks = Talks::open(&config.talks_dir)?;
    let services = open_services(config, open_inbox(config));
    match talks.kill(args.number, &services)? {
        Some(status) => println!("Talk #{}: daemon is {}", args.number, status),
        None => println!("Talk #{}: no daemon", args.number),
    }
    Ok(())
}
