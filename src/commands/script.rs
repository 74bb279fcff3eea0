//! Implementation of the `talkd script` command.

use crate::cli::ScriptArgs;
use crate::command;
use crate::config::Config;
use crate::error::{Result, TalkError};
use crate::profile::{DirProfiles, ProfileSource};

/// Print the script, environment and image a profile section yields.
pub fn cmd_script(config: &Config, args: ScriptArgs) -> Result<()> {
    let overrides = parse_overrides(&args.args)?;
    let profile = DirProfiles::new(&config.profiles_dir).fetch(&args.repo)?;
    let command = command::build(&profile, &args.section, &overrides)?;

    println!("Image:  {}", command.image);
    if !command.env.is_empty() {
        println!("Env:");
        for entry in &command.env {
            println!("  {}", entry);
        }
    }
    println!("Script:");
    println!("  {}", command.text());
    for reason in profile.deprecations() {
        println!();
        println!("Warning: {}", reason);
    }
    Ok(())
}

/// Split `KEY=VALUE` arguments.
fn parse_overrides(args: &[String]) -> Result<Vec<(String, String)>> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
            _ => Err(TalkError::UserError(format!(
                "invalid argument '{}': expected KEY=VALUE",
                arg
            ))),
        })
        .collect()
}
