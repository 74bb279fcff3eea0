//! Path expressions addressing nodes of a talk document.
//!
//! A path is a `/`-separated list of steps starting at the root element:
//!
//! ```text
//! /talk/daemon/status
//! /talk/request/args/arg[@name='tag']
//! /talk/archive/log[2]
//! /talk/archive/log[last()]
//! /talk/*
//! ```
//!
//! Positional predicates count among the siblings that matched the step's
//! name under the same parent, so `log[2]` is the second `log` child.

use crate::error::{Result, TalkError};
use std::fmt;

/// Filter applied to the nodes matched by a step's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Every matching node.
    All,
    /// Nodes whose attribute equals the given value.
    Attr { key: String, value: String },
    /// The N-th matching sibling, 1-based.
    Index(usize),
    /// The last matching sibling.
    Last,
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Element name, or `*` for any element.
    pub name: String,
    pub predicate: Predicate,
}

impl Step {
    /// Whether the step's name test accepts an element name.
    pub fn accepts(&self, name: &str) -> bool {
        self.name == "*" || self.name == name
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePath {
    steps: Vec<Step>,
}

impl NodePath {
    /// Parse a path expression.
    ///
    /// Returns `MalformedMutation` when the expression is not absolute or a
    /// step cannot be understood.
    pub fn parse(raw: &str) -> Result<Self> {
        if !raw.starts_with('/') {
            return Err(TalkError::MalformedMutation(format!(
                "path '{}' must start with '/'",
                raw
            )));
        }
        let steps = split_steps(raw)
            .iter()
            .map(|s| parse_step(raw, s))
            .collect::<Result<Vec<_>>>()?;
        if steps.is_empty() {
            return Err(TalkError::MalformedMutation(format!(
                "path '{}' has no steps",
                raw
            )));
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{}", step.name)?;
            match &step.predicate {
                Predicate::All => {}
                Predicate::Attr { key, value } => write!(f, "[@{}='{}']", key, value)?,
                Predicate::Index(n) => write!(f, "[{}]", n)?,
                Predicate::Last => write!(f, "[last()]")?,
            }
        }
        Ok(())
    }
}

/// Split a path into raw step strings, ignoring `/` inside predicates.
pub(crate) fn split_steps(raw: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match c {
            '\'' | '"' if depth > 0 => {
                match quote {
                    Some(q) if q == c => quote = None,
                    None => quote = Some(c),
                    _ => {}
                }
                current.push(c);
            }
            '[' if quote.is_none() => {
                depth += 1;
                current.push(c);
            }
            ']' if quote.is_none() => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            '/' if depth == 0 && quote.is_none() => {
                if !current.is_empty() {
                    steps.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        steps.push(current);
    }
    steps
}

/// Join raw step strings back into an absolute path.
pub(crate) fn join_steps(steps: &[String]) -> String {
    let mut out = String::new();
    for step in steps {
        out.push('/');
        out.push_str(step);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

fn parse_step(raw: &str, step: &str) -> Result<Step> {
    let malformed = |why: &str| {
        TalkError::MalformedMutation(format!("path '{}': step '{}' {}", raw, step, why))
    };

    let (name, predicate) = match step.find('[') {
        None => (step, Predicate::All),
        Some(open) => {
            let body = step[open + 1..]
                .strip_suffix(']')
                .ok_or_else(|| malformed("has an unterminated predicate"))?;
            (&step[..open], parse_predicate(body).ok_or_else(|| malformed("has an unknown predicate"))?)
        }
    };

    let valid_name = name == "*"
        || (!name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.'));
    if !valid_name {
        return Err(malformed("has an invalid element name"));
    }

    Ok(Step {
        name: name.to_string(),
        predicate,
    })
}

fn parse_predicate(body: &str) -> Option<Predicate> {
    let body = body.trim();
    if body == "last()" {
        return Some(Predicate::Last);
    }
    if let Ok(n) = body.parse::<usize>() {
        return (n > 0).then_some(Predicate::Index(n));
    }
    let rest = body.strip_prefix('@')?;
    let (key, value) = rest.split_once('=')?;
    let value = value.trim();
    let unquoted = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| value.strip_prefix('"').and_then(|v| v.strip_suffix('"')))?;
    Some(Predicate::Attr {
        key: key.trim().to_string(),
        value: unquoted.to_string(),
    })
}
