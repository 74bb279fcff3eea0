//! The remote-execution collaborator.

use crate::error::Result;
use std::fmt;

/// Opaque reference to a started remote execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle(pub String);

impl Handle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of one liveness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub alive: bool,
    /// Set once the execution has completed.
    pub exit_code: Option<i32>,
}

impl Liveness {
    pub fn running() -> Self {
        Self {
            alive: true,
            exit_code: None,
        }
    }

    pub fn exited(code: i32) -> Self {
        Self {
            alive: false,
            exit_code: Some(code),
        }
    }
}

/// Starts, polls, and stops script executions on a build host.
///
/// Implementations own their transport and its timeouts. `poll` must
/// return promptly; `kill` must succeed on an already-dead target.
pub trait Remote: Send + Sync {
    fn start(&self, dir: &str, script: &str, env: &[String]) -> Result<Handle>;

    fn poll(&self, handle: &Handle) -> Result<Liveness>;

    fn kill(&self, handle: &Handle) -> Result<()>;

    /// Last `lines` lines of the execution's output.
    fn tail(&self, _handle: &Handle, _lines: usize) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
