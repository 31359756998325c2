//! Edits addressed by position rather than selection. Both commands check
//! the node kind first, so a position captured against an older revision
//! cannot silently hit a different node.

use super::transform::{finish, node_path_at};
use super::{CommandResult, Rejection};
use crate::state::EditorState;
use folio_schema::{canonical_attr, Document, Node, NodeKind, Schema};
use std::collections::BTreeMap;

/// Path of the node at `position`, provided it has kind `expect`
fn expect_node(doc: &Document, position: usize, expect: NodeKind) -> Result<(Vec<usize>, &Node), Rejection> {
    if position > doc.content_size() {
        return Err(Rejection::InvalidPosition(position));
    }

    match node_path_at(doc, position) {
        Some((path, node)) if node.kind == expect => Ok((path, node)),
        found => Err(Rejection::NodeMismatch {
            position,
            expected: expect,
            found: found
                .map(|(_, node)| node.kind.name())
                .or_else(|| doc.node_at(position).map(|n| n.kind.name()))
                .unwrap_or("nothing")
                .to_string(),
        }),
    }
}

pub(super) fn patch_attrs(
    state: &EditorState,
    position: usize,
    expect: NodeKind,
    attrs: &BTreeMap<String, Option<String>>,
) -> CommandResult {
    let (path, _) = expect_node(&state.doc, position, expect)?;

    let schema = Schema::manifest();
    let mut canonical = Vec::with_capacity(attrs.len());
    for (name, value) in attrs {
        let spec = schema.attr_spec(expect, name).ok_or_else(|| {
            Rejection::invalid_argument(format!("{expect} has no attribute {name}"))
        })?;
        let missing = value.as_deref().map_or(true, |v| v.trim().is_empty());
        if spec.required && missing {
            return Err(Rejection::invalid_argument(format!(
                "{expect}.{name} is required"
            )));
        }
        // Store what a reparse of the serialized node would hold
        let value = match value {
            Some(value) => Some(canonical_attr(expect, name, value).ok_or_else(|| {
                Rejection::invalid_argument(format!("{expect}.{name} cannot be {value:?}"))
            })?),
            None => None,
        };
        canonical.push((name, value));
    }

    let mut doc = state.doc.clone();
    let node = doc
        .node_at_path_mut(&path)
        .ok_or(Rejection::InvalidPosition(position))?;
    for (name, value) in canonical {
        match value {
            Some(value) => {
                node.attrs.insert(name.clone(), value);
            }
            None => {
                node.attrs.remove(name);
            }
        }
    }

    let mut next = finish(state, doc, state.selection);
    next.stored_marks = state.stored_marks.clone();
    Ok(next)
}

pub(super) fn delete_node_at(state: &EditorState, position: usize, expect: NodeKind) -> CommandResult {
    let (path, node) = expect_node(&state.doc, position, expect)?;
    let size = node.node_size();
    let (&index, parent_path) = path
        .split_last()
        .ok_or(Rejection::InvalidPosition(position))?;

    let mut doc = state.doc.clone();
    doc.node_at_path_mut(parent_path)
        .ok_or(Rejection::InvalidPosition(position))?
        .content
        .remove(index);
    doc.normalize();

    let end = position + size;
    let selection = state.selection.map(|pos| {
        let mapped = if pos <= position {
            pos
        } else if pos >= end {
            pos - size
        } else {
            position
        };
        doc.nearest_text_pos(mapped.min(doc.content_size()))
    });
    Ok(finish(state, doc, selection))
}
