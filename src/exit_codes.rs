//! Exit code constants for the talkd CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid state)
//! - 2: Malformed mutation or unreadable profile
//! - 3: Remote execution collaborator unavailable
//! - 4: Lock acquisition failure
//! - 5: Unknown talk, or a daemon is already running

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid state.
pub const USER_ERROR: i32 = 1;

/// A mutation batch or profile could not be applied.
pub const MALFORMED: i32 = 2;

/// The remote execution collaborator could not be reached.
pub const REMOTE_FAILURE: i32 = 3;

/// Lock acquisition failure: the runner lock could not be acquired.
pub const LOCK_FAILURE: i32 = 4;

/// The addressed talk or daemon is not in the expected state.
pub const STATE_CONFLICT: i32 = 5;
