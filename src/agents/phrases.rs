//! Text of the comments the bot posts.

use crate::daemon::DaemonStatus;
use crate::talk::DaemonRecord;

pub(crate) const UNKNOWN: &str = "I'm not sure I understand you. \
     I know these commands: `merge`, `deploy`, `release`, `run`, and `stop`.";

pub(crate) const NOT_A_PULL: &str = "I can merge only pull requests, and this is an issue.";

pub(crate) const CHECKS_FAILED: &str =
    "I can't merge it, the checks of this pull request have not passed yet.";

pub(crate) const NO_TAG: &str =
    "I need to know the tag, for example: ``release, tag is `1.0` ``.";

pub(crate) const NOTHING_TO_STOP: &str = "Nothing is running here, there is nothing to stop.";

pub(crate) fn busy(title: &str) -> String {
    format!(
        "I'm busy with `{}` in this thread, please wait until it is finished.",
        title
    )
}

pub(crate) fn stopping(title: &str) -> String {
    format!("OK, I'm stopping `{}` now.", title)
}

pub(crate) fn no_section(section: &str) -> String {
    format!(
        "There is no `{}.script` in the profile of this repository, \
         so I don't know how to `{}` it.",
        section, section
    )
}

pub(crate) fn broken_profile(error: &dyn std::fmt::Display) -> String {
    format!(
        "I can't use the profile of this repository ({}), \
         please fix it and ask me again.",
        error
    )
}

pub(crate) fn started(daemon: &DaemonRecord, image: &str, deprecations: &[String]) -> String {
    let mut text = format!(
        "OK, I'm running `{}` now in `{}` (daemon `{}`).",
        daemon.title, image, daemon.id
    );
    for reason in deprecations {
        text.push_str("\n\nHeads up: ");
        text.push_str(reason);
    }
    text
}

pub(crate) fn outcome(daemon: &DaemonRecord, tail: &[String], inactivity_minutes: i64) -> String {
    let took = match (daemon.started, daemon.ended) {
        (Some(started), Some(ended)) => {
            format!(" in {}s", ended.signed_duration_since(started).num_seconds())
        }
        _ => String::new(),
    };
    let mut text = match daemon.status {
        DaemonStatus::Finished(0) => format!("Done! `{}` finished successfully{}.", daemon.title, took),
        DaemonStatus::Finished(code) => format!(
            "Oops, `{}` failed with exit code {}{}.",
            daemon.title, code, took
        ),
        DaemonStatus::Killed => format!("`{}` was stopped{}.", daemon.title, took),
        DaemonStatus::TimedOut => format!(
            "`{}` gave no sign of life for {} minutes, so I stopped it.",
            daemon.title, inactivity_minutes
        ),
        DaemonStatus::Pending | DaemonStatus::Running => {
            format!("`{}` is still {}.", daemon.title, daemon.status)
        }
    };
    if !daemon.status.is_success() && !tail.is_empty() {
        text.push_str("\n\n```\n");
        text.push_str(&tail.join("\n"));
        text.push_str("\n```");
    }
    text
}
