//! CLI argument parsing for talkd.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// talkd: conversation-driven build, merge, deploy and release bot.
///
/// Users address the bot in issue threads (`@rultor merge`). Every thread
/// gets a talk, a persistent state record that a pipeline of agents drives
/// until a requested script has run and its outcome has been reported.
#[derive(Parser, Debug)]
#[command(name = "talkd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "talkd.yaml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands for talkd.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the pipeline over all talks.
    ///
    /// Holds the runner lock, picks up new threads from the inbox, and
    /// sweeps every talk until it is quiescent, then sleeps and repeats.
    Run(RunArgs),

    /// Post a comment to a thread of the local inbox.
    ///
    /// This is how requests reach the bot, e.g.
    /// `talkd comment acme/widgets 17 --author jeff "@rultor merge"`.
    Comment(CommentArgs),

    /// Kill the running daemon of a talk.
    ///
    /// While `talkd run` is active the kill is handed to the runner and
    /// applied on its next tick.
    Kill(KillArgs),

    /// Show the full state of a talk.
    Show(ShowArgs),

    /// Show runner health and a summary of all talks.
    Status,

    /// Print the script a profile section would run.
    ///
    /// Useful for checking a profile before asking the bot to run it.
    Script(ScriptArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Sweep once and exit instead of looping.
    #[arg(long)]
    pub once: bool,
}

/// Arguments for the `comment` command.
#[derive(Parser, Debug)]
pub struct CommentArgs {
    /// Repository coordinate, `owner/name`.
    pub repo: String,

    /// Issue or pull request number.
    pub issue: u64,

    /// Comment body.
    pub body: String,

    /// Who is speaking.
    #[arg(long, default_value = "guest")]
    pub author: String,
}

/// Arguments for the `kill` command.
#[derive(Parser, Debug)]
pub struct KillArgs {
    /// Talk number.
    pub number: u64,
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Talk number.
    pub number: u64,

    /// Print the raw document as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `script` command.
#[derive(Parser, Debug)]
pub struct ScriptArgs {
    /// Repository coordinate, `owner/name`, whose profile to read.
    pub repo: String,

    /// Dotted profile section, e.g. `merge` or `release`.
    #[arg(long, default_value = "")]
    pub section: String,

    /// Environment overrides (KEY=VALUE). Can be specified multiple times.
    #[arg(long = "arg", value_name = "KEY=VALUE")]
    pub args: Vec<String>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
