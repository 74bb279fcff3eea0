//! Replies to a comment, with a guard against talking to ourselves.

use super::{Comment, ThreadId, Ticket};
use crate::error::Result;

/// Default number of consecutive bot comments after which replies stop.
pub const SPAM_LIMIT: usize = 5;

/// Posts replies into one thread.
pub struct Answer<'a> {
    ticket: &'a dyn Ticket,
    spam_limit: usize,
}

impl<'a> Answer<'a> {
    pub fn new(ticket: &'a dyn Ticket) -> Self {
        Self::with_limit(ticket, SPAM_LIMIT)
    }

    pub fn with_limit(ticket: &'a dyn Ticket, spam_limit: usize) -> Self {
        Self { ticket, spam_limit }
    }

    /// Reply to `source` (or to the thread when there is none).
    ///
    /// Returns the posted comment id, or `None` when the last
    /// `spam_limit` comments of the thread are all ours.
    pub fn post(
        &self,
        thread: &ThreadId,
        source: Option<&Comment>,
        message: &str,
    ) -> Result<Option<u64>> {
        let comments = self.ticket.list_comments(thread, 0)?;
        let login = self.ticket.login();
        let ours = comments
            .iter()
            .rev()
            .take_while(|c| c.author == login)
            .count();
        if ours >= self.spam_limit {
            tracing::warn!(thread = %thread, "too many answers in a row, staying silent");
            return Ok(None);
        }
        let text = render(source, message).replace('\0', "");
        self.ticket.post_comment(thread, &text).map(Some)
    }
}

fn render(source: Option<&Comment>, message: &str) -> String {
    let Some(source) = source else {
        return message.to_string();
    };
    let quote = source
        .body
        .lines()
        .map(|line| format!("> {}", line))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{}\n\n@{} {}", quote, source.author, message)
}
