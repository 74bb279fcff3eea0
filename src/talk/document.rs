//! Arena-backed talk document.
//!
//! Nodes live in a flat vector and refer to each other by index, so a
//! document can be cloned into an immutable snapshot and edited as a whole
//! without shared mutable references. Removed nodes leave a `None` slot;
//! indices of live nodes never change while a document is being edited.
//!
//! On disk the arena is stored as a nested element tree, which keeps the
//! JSON readable and drops the free slots.

use super::batch::{Batch, Op};
use super::path::{NodePath, Predicate, Step};
use crate::error::{Result, TalkError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the root element of every talk document.
pub const ROOT: &str = "talk";

/// Index of a node inside a document's arena.
pub type NodeId = usize;

/// A single element of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    name: String,
    attrs: BTreeMap<String, String>,
    text: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(name: &str, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            attrs: BTreeMap::new(),
            text: None,
            parent,
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn attrs(&self) -> &BTreeMap<String, String> {
        &self.attrs
    }

    /// Text content, if any was set.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// The tree of a talk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Element", into = "Element")]
pub struct Document {
    nodes: Vec<Option<Node>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the root element.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::new(ROOT, None))],
        }
    }

    pub fn root(&self) -> NodeId {
        0
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    /// Iterate over the live children of a node.
    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &Node)> {
        self.node(id)
            .map(|n| n.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(move |&c| self.node(c).map(|n| (c, n)))
    }

    /// Find the first child of a node with the given name.
    pub fn child(&self, id: NodeId, name: &str) -> Option<(NodeId, &Node)> {
        self.children_of(id).find(|(_, n)| n.name == name)
    }

    /// Text of the named child of a node.
    pub fn child_text(&self, id: NodeId, name: &str) -> Option<&str> {
        self.child(id, name).and_then(|(_, n)| n.text())
    }

    /// Resolve a parsed path to every matching node, in document order.
    pub fn select(&self, path: &NodePath) -> Vec<NodeId> {
        let mut steps = path.steps().iter();
        let Some(first) = steps.next() else {
            return Vec::new();
        };
        let root = self.root();
        let mut current = match self.node(root) {
            Some(node) if first.accepts(&node.name) => filter(vec![root], &first.predicate, self),
            _ => Vec::new(),
        };
        for step in steps {
            current = current
                .into_iter()
                .flat_map(|parent| self.step_from(parent, step))
                .collect();
        }
        current
    }

    fn step_from(&self, parent: NodeId, step: &Step) -> Vec<NodeId> {
        let named: Vec<NodeId> = self
            .children_of(parent)
            .filter(|(_, n)| step.accepts(&n.name))
            .map(|(id, _)| id)
            .collect();
        filter(named, &step.predicate, self)
    }

    /// Resolve a textual path; unparsable paths match nothing.
    pub fn find(&self, path: &str) -> Vec<NodeId> {
        match NodePath::parse(path) {
            Ok(parsed) => self.select(&parsed),
            Err(e) => {
                tracing::debug!(path, error = %e, "ignoring unparsable query path");
                Vec::new()
            }
        }
    }

    /// Whether at least one node matches the path.
    pub fn exists(&self, path: &str) -> bool {
        !self.find(path).is_empty()
    }

    /// Text of the first node matching the path.
    pub fn text(&self, path: &str) -> Option<&str> {
        self.find(path)
            .into_iter()
            .find_map(|id| self.node(id).and_then(Node::text))
    }

    /// Attribute of the first node matching the path.
    pub fn attr(&self, path: &str, key: &str) -> Option<&str> {
        self.find(path)
            .into_iter()
            .find_map(|id| self.node(id).and_then(|n| n.attr(key)))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Apply a batch to a copy of this document.
    ///
    /// Every edit must target exactly one node; otherwise the whole batch
    /// is rejected with `MalformedMutation` and `self` is untouched.
    pub fn apply(&self, batch: &Batch) -> Result<Document> {
        let mut next = self.clone();
        for (index, edit) in batch.edits().iter().enumerate() {
            let path = NodePath::parse(&edit.target)?;
            let matched = next.select(&path);
            let id = match matched.as_slice() {
                [id] => *id,
                _ => {
                    return Err(TalkError::MalformedMutation(format!(
                        "edit #{} ({}) targets '{}', which matched {} nodes",
                        index + 1,
                        edit.op,
                        edit.target,
                        matched.len()
                    )));
                }
            };
            next.apply_op(id, &edit.op, &edit.target)?;
        }
        Ok(next)
    }

    fn apply_op(&mut self, id: NodeId, op: &Op, target: &str) -> Result<()> {
        match op {
            Op::Add(name) => {
                self.add_child(id, name);
            }
            Op::Remove => {
                if id == self.root() {
                    return Err(TalkError::MalformedMutation(format!(
                        "cannot remove the root element via '{}'",
                        target
                    )));
                }
                self.remove(id);
            }
            Op::SetAttr(key, value) => {
                if let Some(node) = self.node_mut(id) {
                    node.attrs.insert(key.clone(), value.clone());
                }
            }
            Op::RemoveAttr(key) => {
                if let Some(node) = self.node_mut(id) {
                    node.attrs.remove(key);
                }
            }
            Op::SetText(text) => {
                if let Some(node) = self.node_mut(id) {
                    node.text = Some(text.clone());
                }
            }
        }
        Ok(())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id).and_then(Option::as_mut)
    }

    fn add_child(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(Node::new(name, Some(parent))));
        if let Some(node) = self.node_mut(parent) {
            node.children.push(id);
        }
        id
    }

    fn remove(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        if let Some(parent) = node.parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|&c| c != id);
        }
        for child in node.children {
            self.remove(child);
        }
    }
}

fn filter(ids: Vec<NodeId>, predicate: &Predicate, doc: &Document) -> Vec<NodeId> {
    match predicate {
        Predicate::All => ids,
        Predicate::Attr { key, value } => ids
            .into_iter()
            .filter(|&id| doc.node(id).and_then(|n| n.attr(key)) == Some(value.as_str()))
            .collect(),
        Predicate::Index(n) => ids.get(n - 1).copied().into_iter().collect(),
        Predicate::Last => ids.last().copied().into_iter().collect(),
    }
}

/// Nested representation used for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Element {
    name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    attrs: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Element>,
}

impl From<Document> for Element {
    fn from(doc: Document) -> Self {
        fn build(doc: &Document, id: NodeId) -> Element {
            let node = doc.node(id);
            Element {
                name: node.map(|n| n.name.clone()).unwrap_or_default(),
                attrs: node.map(|n| n.attrs.clone()).unwrap_or_default(),
                text: node.and_then(|n| n.text.clone()),
                children: doc
                    .children_of(id)
                    .map(|(child, _)| build(doc, child))
                    .collect(),
            }
        }
        build(&doc, doc.root())
    }
}

impl From<Element> for Document {
    fn from(root: Element) -> Self {
        fn push(doc: &mut Document, parent: Option<NodeId>, element: Element) {
            let id = doc.nodes.len();
            let mut node = Node::new(&element.name, parent);
            node.attrs = element.attrs;
            node.text = element.text;
            doc.nodes.push(Some(node));
            if let Some(p) = parent.and_then(|p| doc.node_mut(p)) {
                p.children.push(id);
            }
            for child in element.children {
                push(doc, Some(id), child);
            }
        }
        let mut doc = Document { nodes: Vec::new() };
        push(&mut doc, None, root);
        doc
    }
}
