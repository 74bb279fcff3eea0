//! Command construction.
//!
//! Turns a profile section into one portable shell script plus the
//! environment it runs with. The builder is pure: it reads the profile and
//! returns tokens, nothing else.
//!
//! # Script Layout
//!
//! ```text
//! <install steps> ;
//! function clean_up() { <uninstall steps> ; } ; trap clean_up EXIT ;
//! <section script steps> ;
//! ```
//!
//! `install` and `uninstall` are read from the profile root, the script
//! from the requested section. The cleanup function is declared ahead of
//! the main script and runs exactly once when the shell exits, whether the
//! script succeeded, failed, or was killed by a signal the shell traps.

mod builder;
mod comments;

#[cfg(test)]
mod tests;

pub use builder::{Command, build};
pub use comments::rewrite_comment;

/// Token separating script steps.
pub const SEPARATOR: &str = ";";

/// Name of the generated cleanup function.
pub const CLEANUP_FN: &str = "clean_up";
