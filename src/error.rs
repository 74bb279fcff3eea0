//! Error types for talkd.
//!
//! Uses thiserror for derive macros and provides user-actionable error messages.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for talkd operations.
#[derive(Error, Debug)]
pub enum TalkError {
    /// A mutation batch targeted a path that does not resolve to exactly one node.
    #[error("malformed mutation: {0}")]
    MalformedMutation(String),

    /// A daemon start was requested while the talk already holds one.
    #[error("daemon already running: {0}")]
    AlreadyRunning(String),

    /// The addressed talk does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The remote execution collaborator could not be reached.
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// A profile could not be read or has an unusable shape.
    #[error("profile error: {0}")]
    Profile(String),

    /// User provided invalid arguments or the system is in an invalid state.
    #[error("{0}")]
    UserError(String),

    /// Lock could not be acquired.
    #[error("Lock acquisition failed: {0}")]
    LockError(String),
}

impl TalkError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            TalkError::MalformedMutation(_) | TalkError::Profile(_) => exit_codes::MALFORMED,
            TalkError::AlreadyRunning(_) | TalkError::NotFound(_) => exit_codes::STATE_CONFLICT,
            TalkError::RemoteUnavailable(_) => exit_codes::REMOTE_FAILURE,
            TalkError::UserError(_) => exit_codes::USER_ERROR,
            TalkError::LockError(_) => exit_codes::LOCK_FAILURE,
        }
    }
}

/// Result type alias for talkd operations.
pub type Result<T> = std::result::Result<T, TalkError>;
