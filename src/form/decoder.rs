//! Bracket-path decoding.
//!
//! Expands flat part names such as `user[name][first]` into nested mappings.
//! `[]` appends to an array; every other bracket token is an opaque object
//! key, so `a[0]` yields the key `"0"` rather than an array index.
//!
//! Two names that need incompatible shapes at the same position (an object
//! and an array, or a value and a container) fail the whole decode.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry as Slot;
use thiserror::Error;

use super::aggregator::FlatMap;
use super::entry::AggregatedValue;
use super::tree::{NestedTree, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("conflicting structure for field '{name}': expected {expected}, found {found}")]
    Conflict {
        name: String,
        expected: NodeKind,
        found: NodeKind,
    },
}

/// One step of a decoded part name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Append,
}

impl Segment {
    fn container(&self) -> NodeKind {
        match self {
            Segment::Key(_) => NodeKind::Mapping,
            Segment::Append => NodeKind::Sequence,
        }
    }
}

/// Splits a raw part name into path segments.
///
/// Never returns an empty path and the first segment is always a key.
pub fn parse_path(name: &str) -> Vec<Segment> {
    let literal = || vec![Segment::Key(name.to_string())];

    let Some(open) = name.find('[') else {
        return literal();
    };

    let base = &name[..open];
    let mut rest = &name[open..];
    let mut segments = Vec::new();

    while let Some(inner) = rest.strip_prefix('[') {
        match inner.find(['[', ']']) {
            Some(close) if inner.as_bytes()[close] == b']' => {
                let token = &inner[..close];
                segments.push(if token.is_empty() {
                    Segment::Append
                } else {
                    Segment::Key(token.to_string())
                });
                rest = &inner[close + 1..];
            }
            _ => break,
        }
    }

    if segments.is_empty() {
        return literal();
    }

    if !rest.is_empty() {
        segments.push(Segment::Key(rest.to_string()));
    }

    if base.is_empty() {
        // `[a][b]` is rooted at `a`; `[]` cannot start a path.
        return match segments.first() {
            Some(Segment::Key(_)) => segments,
            _ => literal(),
        };
    }

    segments.insert(0, Segment::Key(base.to_string()));
    segments
}

/// Expands a flat name map into a tree rooted at a mapping.
pub fn decode(flat: FlatMap) -> Result<NestedTree, DecodeError> {
    let mut root = NestedTree::empty();

    for (name, value) in flat {
        let path = parse_path(&name);
        insert(&mut root, &name, &path, value)?;
    }

    Ok(root)
}

fn insert(
    root: &mut NestedTree,
    name: &str,
    path: &[Segment],
    value: AggregatedValue,
) -> Result<(), DecodeError> {
    let Some((last, parents)) = path.split_last() else {
        return Ok(());
    };

    let mut node = root;
    for (depth, segment) in parents.iter().enumerate() {
        let demand = path[depth + 1].container();

        node = match segment {
            Segment::Key(key) => {
                let map = mapping(node, name)?;
                let child = map
                    .entry(key.clone())
                    .or_insert_with(|| new_container(demand));
                if child.kind() != demand {
                    return Err(conflict(name, demand, child.kind()));
                }
                child
            }
            Segment::Append => {
                let items = sequence(node, name)?;
                items.push(new_container(demand));
                let last_index = items.len() - 1;
                &mut items[last_index]
            }
        };
    }

    match last {
        Segment::Key(key) => match mapping(node, name)?.entry(key.clone()) {
            Slot::Vacant(slot) => {
                slot.insert(leaf(value));
            }
            Slot::Occupied(mut slot) => {
                combine(slot.get_mut(), value)
                    .map_err(|found| conflict(name, NodeKind::Value, found))?;
            }
        },
        Segment::Append => {
            sequence(node, name)?
                .extend(value.into_entries().into_iter().map(NestedTree::from));
        }
    }

    Ok(())
}

fn mapping<'a>(
    node: &'a mut NestedTree,
    name: &str,
) -> Result<&'a mut BTreeMap<String, NestedTree>, DecodeError> {
    match node {
        NestedTree::Mapping(map) => Ok(map),
        other => Err(conflict(name, NodeKind::Mapping, other.kind())),
    }
}

fn sequence<'a>(
    node: &'a mut NestedTree,
    name: &str,
) -> Result<&'a mut Vec<NestedTree>, DecodeError> {
    match node {
        NestedTree::Sequence(items) => Ok(items),
        other => Err(conflict(name, NodeKind::Sequence, other.kind())),
    }
}

fn new_container(kind: NodeKind) -> NestedTree {
    match kind {
        NodeKind::Sequence => NestedTree::Sequence(Vec::new()),
        _ => NestedTree::empty(),
    }
}

fn leaf(value: AggregatedValue) -> NestedTree {
    match value {
        AggregatedValue::Single(entry) => entry.into(),
        AggregatedValue::Many(entries) => {
            NestedTree::Sequence(entries.into_iter().map(NestedTree::from).collect())
        }
    }
}

/// Merges values from a second name that resolved to an occupied position.
/// Only plain values and arrays of plain values can absorb more values.
fn combine(existing: &mut NestedTree, value: AggregatedValue) -> Result<(), NodeKind> {
    let incoming = value.into_entries().into_iter().map(NestedTree::from);

    match existing {
        NestedTree::Scalar(_) | NestedTree::File(_) => {
            let previous = std::mem::replace(existing, NestedTree::Sequence(Vec::new()));
            let mut items = vec![previous];
            items.extend(incoming);
            *existing = NestedTree::Sequence(items);
            Ok(())
        }
        NestedTree::Sequence(items) if items.iter().all(NestedTree::is_leaf) => {
            items.extend(incoming);
            Ok(())
        }
        other => Err(other.kind()),
    }
}

fn conflict(name: &str, expected: NodeKind, found: NodeKind) -> DecodeError {
    DecodeError::Conflict {
        name: name.to_string(),
        expected,
        found,
    }
}
