//! Mutation batches.
//!
//! A batch is an ordered list of structural edits, each addressed by a
//! path. The builder keeps a cursor so nested structures read top-down:
//!
//! ```
//! use talkd::talk::Batch;
//!
//! let batch = Batch::at("/talk")
//!     .add("request")
//!     .attr("id", "a1")
//!     .add("type").set("merge").up()
//!     .add("args")
//!     .add("arg").attr("name", "head_branch").set("master");
//! assert_eq!(batch.len(), 8);
//! ```

use super::document::Document;
use super::path::{join_steps, split_steps};
use std::fmt;

/// A single structural operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// Append a child element with the given name.
    Add(String),
    /// Remove the target and its subtree.
    Remove,
    SetAttr(String, String),
    RemoveAttr(String),
    SetText(String),
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Add(name) => write!(f, "add '{}'", name),
            Op::Remove => write!(f, "remove"),
            Op::SetAttr(key, _) => write!(f, "set @{}", key),
            Op::RemoveAttr(key) => write!(f, "remove @{}", key),
            Op::SetText(_) => write!(f, "set text"),
        }
    }
}

/// An operation bound to the path of the node it edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub target: String,
    pub op: Op,
}

/// An ordered set of edits committed atomically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    edits: Vec<Edit>,
    cursor: Vec<String>,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

impl Batch {
    /// An empty batch with the cursor at the root.
    pub fn new() -> Self {
        Self::at("/talk")
    }

    /// An empty batch with the cursor at `path`.
    pub fn at(path: &str) -> Self {
        Self {
            edits: Vec::new(),
            cursor: split_steps(path),
        }
    }

    /// Move the cursor to an absolute path.
    pub fn xpath(mut self, path: &str) -> Self {
        self.cursor = split_steps(path);
        self
    }

    /// Append a child under the cursor and move the cursor onto it.
    pub fn add(mut self, name: &str) -> Self {
        self.push(Op::Add(name.to_string()));
        self.cursor.push(format!("{}[last()]", name));
        self
    }

    /// Move the cursor to its parent.
    pub fn up(mut self) -> Self {
        self.cursor.pop();
        self
    }

    pub fn attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.push(Op::SetAttr(key.to_string(), value.into()));
        self
    }

    pub fn remove_attr(mut self, key: &str) -> Self {
        self.push(Op::RemoveAttr(key.to_string()));
        self
    }

    /// Set the text of the node under the cursor.
    pub fn set(mut self, text: impl Into<String>) -> Self {
        self.push(Op::SetText(text.into()));
        self
    }

    /// Remove the node under the cursor; the cursor moves to its parent.
    pub fn remove(mut self) -> Self {
        self.push(Op::Remove);
        self.cursor.pop();
        self
    }

    /// Set the text of `<parent>/<name>`, adding the child when `document`
    /// does not have it yet. Leaves the cursor on the child.
    pub fn put(self, document: &Document, parent: &str, name: &str, value: impl Into<String>) -> Self {
        let path = format!("{}/{}", parent, name);
        if document.exists(&path) {
            self.xpath(&path).set(value)
        } else {
            self.xpath(parent).add(name).set(value)
        }
    }

    /// Append all edits of another batch, keeping this batch's cursor.
    pub fn append(mut self, other: Batch) -> Self {
        self.edits.extend(other.edits);
        self
    }

    pub fn edits(&self) -> &[Edit] {
        &self.edits
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    fn push(&mut self, op: Op) {
        self.edits.push(Edit {
            target: join_steps(&self.cursor),
            op,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_tracks_cursor() {
        let batch = Batch::at("/talk").add("wire").add("repo").set("a/b").up().up();
        let targets: Vec<_> = batch.edits().iter().map(|e| e.target.as_str()).collect();
        assert_eq!(
            targets,
            vec!["/talk", "/talk/wire[last()]", "/talk/wire[last()]/repo[last()]"]
        );
    }

    #[test]
    fn remove_moves_cursor_to_parent() {
        let batch = Batch::at("/talk/daemon").remove().attr("public", "true");
        assert_eq!(batch.edits()[0].target, "/talk/daemon");
        assert_eq!(batch.edits()[0].op, Op::Remove);
        assert_eq!(batch.edits()[1].target, "/talk");
    }

    #[test]
    fn put_adds_or_overwrites() {
        let empty = Document::new();
        let batch = Batch::new().put(&empty, "/talk", "seen", "3");
        assert_eq!(batch.edits()[0].op, Op::Add("seen".to_string()));

        let document = empty.apply(&batch).unwrap();
        let batch = Batch::new().put(&document, "/talk", "seen", "4");
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.edits()[0].target, "/talk/seen");
        assert_eq!(document.apply(&batch).unwrap().text("/talk/seen"), Some("4"));
    }

    #[test]
    fn append_concatenates_edits() {
        let a = Batch::new().attr("x", "1");
        let b = Batch::at("/talk/y").set("2");
        let joined = a.append(b);
        assert_eq!(joined.len(), 2);
        assert!(!joined.is_empty());
        assert!(Batch::new().is_empty());
    }
}
