//! Reading commands out of comment text.

use regex::Regex;
use std::sync::LazyLock;

/// Release tag as in ``tag is `1.0` `` (quotes optional).
static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\btag\s+is\s+[`'"]?([A-Za-z0-9][A-Za-z0-9._\-/+]*)[`'"]?"#)
        .expect("Invalid tag regex")
});

/// Words skipped while looking for the command word.
const FILLER: [&str; 5] = ["please", "pls", "kindly", "now", "do"];

/// A command addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Merge,
    Deploy,
    Release { tag: Option<String> },
    Run,
    /// Stop the running daemon.
    Stop,
    /// Addressed to the bot but not understood; carries the word seen.
    Unknown(String),
}

/// Parse `body` as a command to `@login`.
///
/// Returns `None` when the comment does not mention the bot.
pub fn parse_command(login: &str, body: &str) -> Option<Command> {
    let mention = format!("@{}", login.to_lowercase());
    let lower = body.to_lowercase();
    let at = lower.find(&mention)?;
    let after = &lower[at + mention.len()..];
    if after.starts_with(|c: char| c.is_alphanumeric() || c == '-' || c == '_') {
        return None;
    }

    let word = after
        .split(|c: char| c.is_whitespace() || ",.!?:;".contains(c))
        .filter(|w| !w.is_empty())
        .find(|w| !FILLER.contains(w))
        .unwrap_or_default();

    Some(match word {
        "merge" => Command::Merge,
        "deploy" => Command::Deploy,
        "release" => Command::Release {
            tag: TAG_REGEX
                .captures(body)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string()),
        },
        "run" => Command::Run,
        "stop" => Command::Stop,
        other => Command::Unknown(other.to_string()),
    })
}
