//! Daemon status values.

use std::fmt;

/// Where a daemon is in its lifecycle.
///
/// `Pending -> Running -> {Finished(code) | Killed | TimedOut}`. The last
/// three are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaemonStatus {
    Pending,
    Running,
    Finished(i32),
    Killed,
    TimedOut,
}

impl DaemonStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DaemonStatus::Finished(_) | DaemonStatus::Killed | DaemonStatus::TimedOut
        )
    }

    /// Whether this is a finish with exit code zero.
    pub fn is_success(&self) -> bool {
        matches!(self, DaemonStatus::Finished(0))
    }

    /// Exit code, recorded only for finished daemons.
    pub fn code(&self) -> Option<i32> {
        match self {
            DaemonStatus::Finished(code) => Some(*code),
            _ => None,
        }
    }

    /// Textual form stored in the talk document.
    pub fn as_str(&self) -> &'static str {
        match self {
            DaemonStatus::Pending => "pending",
            DaemonStatus::Running => "running",
            DaemonStatus::Finished(_) => "finished",
            DaemonStatus::Killed => "killed",
            DaemonStatus::TimedOut => "timed-out",
        }
    }

    /// Parse the stored status text. `finished` needs the exit code.
    pub fn parse(s: &str, code: Option<i32>) -> Option<Self> {
        match s {
            "pending" => Some(DaemonStatus::Pending),
            "running" => Some(DaemonStatus::Running),
            "finished" => code.map(DaemonStatus::Finished),
            "killed" => Some(DaemonStatus::Killed),
            "timed-out" => Some(DaemonStatus::TimedOut),
            _ => None,
        }
    }
}

impl fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DaemonStatus::Finished(code) => write!(f, "finished({})", code),
            other => f.write_str(other.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!DaemonStatus::Pending.is_terminal());
        assert!(!DaemonStatus::Running.is_terminal());
        assert!(DaemonStatus::Finished(1).is_terminal());
        assert!(DaemonStatus::Killed.is_terminal());
        assert!(DaemonStatus::TimedOut.is_terminal());
    }

    #[test]
    fn parse_reads_stored_form() {
        for status in [
            DaemonStatus::Pending,
            DaemonStatus::Running,
            DaemonStatus::Finished(7),
            DaemonStatus::Killed,
            DaemonStatus::TimedOut,
        ] {
            assert_eq!(DaemonStatus::parse(status.as_str(), status.code()), Some(status));
        }
    }

    #[test]
    fn finished_without_code_is_unreadable() {
        assert_eq!(DaemonStatus::parse("finished", None), None);
        assert_eq!(DaemonStatus::parse("exploded", Some(1)), None);
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(DaemonStatus::Finished(0).to_string(), "finished(0)");
        assert_eq!(DaemonStatus::TimedOut.to_string(), "timed-out");
        assert!(DaemonStatus::Finished(0).is_success());
        assert!(!DaemonStatus::Finished(2).is_success());
    }
}
