//! Implementation of the `talkd comment` command.

use super::open_inbox;
use crate::cli::CommentArgs;
use crate::config::Config;
use crate::error::{Result, TalkError};
use crate::ticket::ThreadId;

/// Append a comment to a thread of the local inbox.
///
/// The runner picks it up on its next tick; no lock is needed since the
/// inbox is not talk state.
pub fn cmd_comment(config: &Config, args: CommentArgs) -> Result<()> {
    if args.body.trim().is_empty() {
        return Err(TalkError::UserError(
            "comment body must not be empty".to_string(),
        ));
    }
    let thread = ThreadId::new(args.repo, args.issue);
    let id = open_inbox(config).append(&thread, &args.author, &args.body)?;
    println!("Posted comment #{} to {} as {}", id, thread, args.author);
    Ok(())
}
