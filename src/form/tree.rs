use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use super::entry::{Entry, FileHandle};

/// Decoded request data.
///
/// Serializes the way clients expect to read it back: scalars as strings,
/// files as objects, sequences as arrays and mappings as objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NestedTree {
    Scalar(String),
    File(FileHandle),
    Sequence(Vec<NestedTree>),
    Mapping(BTreeMap<String, NestedTree>),
}

/// Shape of a tree node, used when reporting decode conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Value,
    Sequence,
    Mapping,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Value => f.write_str("value"),
            NodeKind::Sequence => f.write_str("array"),
            NodeKind::Mapping => f.write_str("object"),
        }
    }
}

impl Default for NestedTree {
    fn default() -> Self {
        NestedTree::empty()
    }
}

impl From<Entry> for NestedTree {
    fn from(entry: Entry) -> Self {
        match entry {
            Entry::Scalar(value) => NestedTree::Scalar(value),
            Entry::File(handle) => NestedTree::File(handle),
        }
    }
}

impl NestedTree {
    /// An empty mapping, the value exposed when nothing was parsed.
    pub fn empty() -> Self {
        NestedTree::Mapping(BTreeMap::new())
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            NestedTree::Scalar(_) | NestedTree::File(_) => NodeKind::Value,
            NestedTree::Sequence(_) => NodeKind::Sequence,
            NestedTree::Mapping(_) => NodeKind::Mapping,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.kind() == NodeKind::Value
    }

    pub fn is_empty(&self) -> bool {
        match self {
            NestedTree::Sequence(items) => items.is_empty(),
            NestedTree::Mapping(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Looks up a key when this node is a mapping.
    pub fn get(&self, key: &str) -> Option<&NestedTree> {
        match self {
            NestedTree::Mapping(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            NestedTree::Scalar(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            NestedTree::File(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[NestedTree]> {
        match self {
            NestedTree::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Every file handle reachable from this node, depth first.
    pub fn files(&self) -> Vec<&FileHandle> {
        let mut found = Vec::new();
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            match node {
                NestedTree::File(handle) => found.push(handle),
                NestedTree::Scalar(_) => {}
                NestedTree::Sequence(items) => stack.extend(items.iter().rev()),
                NestedTree::Mapping(map) => stack.extend(map.values().rev()),
            }
        }

        found
    }
}
