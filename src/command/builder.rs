//! Script and environment assembly.

use super::comments::rewrite_comment;
use super::{CLEANUP_FN, SEPARATOR};
use crate::error::{Result, TalkError};
use crate::profile::Profile;
use serde_yaml::Value;

/// A ready-to-run script with its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Shell tokens in execution order.
    pub script: Vec<String>,
    /// `KEY=VALUE` entries, in source order, duplicates preserved.
    pub env: Vec<String>,
    /// Container image the script is meant for.
    pub image: String,
}

impl Command {
    /// Script text handed to the remote shell.
    pub fn text(&self) -> String {
        self.script.join(" ")
    }

    /// Quoted token list, `( 'a' 'b' )`, for logs and diagnostics.
    pub fn quoted(&self) -> String {
        let mut out = String::from("(");
        for token in &self.script {
            out.push(' ');
            out.push_str(&shell_words::quote(token));
        }
        out.push_str(" )");
        out
    }
}

/// Build the command for the profile section at `path`.
///
/// `path` is a dotted profile path; `""` addresses the root. `overrides`
/// are appended to the environment after every profile-provided entry.
pub fn build(profile: &Profile, path: &str, overrides: &[(String, String)]) -> Result<Command> {
    Ok(Command {
        script: script(profile, path)?,
        env: envs(profile, path, overrides)?,
        image: profile.image(),
    })
}

fn envs(profile: &Profile, path: &str, overrides: &[(String, String)]) -> Result<Vec<String>> {
    let mut env = Vec::new();
    if !path.is_empty() {
        env.extend(env_entries(profile.node("env"), "env")?);
    }
    let own = child(path, "env");
    env.extend(env_entries(profile.node(&own), &own)?);
    env.extend(overrides.iter().map(|(k, v)| format!("{}={}", k, v)));
    Ok(env)
}

fn script(profile: &Profile, path: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();

    for step in steps(profile.node("install"), "install")? {
        tokens.push(rewrite_comment(&step));
        tokens.push(SEPARATOR.to_string());
    }

    let uninstall = steps(profile.node("uninstall"), "uninstall")?;
    if !uninstall.is_empty() {
        tokens.push("function".to_string());
        tokens.push(format!("{}()", CLEANUP_FN));
        tokens.push("{".to_string());
        for step in uninstall {
            tokens.push(rewrite_comment(&step));
            tokens.push(SEPARATOR.to_string());
        }
        tokens.push("}".to_string());
        tokens.push(SEPARATOR.to_string());
        tokens.push("trap".to_string());
        tokens.push(CLEANUP_FN.to_string());
        tokens.push("EXIT".to_string());
        tokens.push(SEPARATOR.to_string());
    }

    let own = child(path, "script");
    for step in steps(profile.node(&own), &own)? {
        tokens.push(rewrite_comment(&step));
        tokens.push(SEPARATOR.to_string());
    }

    Ok(tokens)
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

/// Script steps from a scalar (split per line) or a list of scalars.
fn steps(value: Option<&Value>, path: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    match value {
        None => {}
        Some(Value::Sequence(items)) => {
            for item in items {
                out.extend(lines(&scalar(item, path)?));
            }
        }
        Some(other) => out.extend(lines(&scalar(other, path)?)),
    }
    Ok(out)
}

/// Environment entries from a scalar, a list, or a `KEY: value` mapping.
fn env_entries(value: Option<&Value>, path: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    match value {
        None => {}
        Some(Value::Sequence(items)) => {
            for item in items {
                let entry = scalar(item, path)?;
                if !entry.is_empty() {
                    out.push(entry);
                }
            }
        }
        Some(Value::Mapping(map)) => {
            for (key, value) in map {
                out.push(format!("{}={}", scalar(key, path)?, scalar(value, path)?));
            }
        }
        Some(other) => out.extend(lines(&scalar(other, path)?)),
    }
    Ok(out)
}

fn lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn scalar(value: &Value, path: &str) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(TalkError::Profile(format!(
            "'{}' must contain plain strings, found a nested structure",
            path
        ))),
    }
}
