//! Selection, typing, deletion and block splitting.

use super::blocks::lift_list_item;
use super::transform::{delete_range, finish, insert_inline, split_inline};
use super::{CommandResult, Rejection};
use crate::query::marks_at;
use crate::selection::Selection;
use crate::state::EditorState;
use folio_schema::{Document, MarkSet, Node, NodeKind};

pub(super) fn set_selection(state: &EditorState, anchor: usize, head: usize) -> CommandResult {
    let max = state.doc.content_size();
    if anchor > max || head > max {
        return Err(Rejection::InvalidPosition(anchor.max(head)));
    }
    Ok(state.with_selection(Selection::new(anchor, head)))
}

pub(super) fn select_all(state: &EditorState) -> CommandResult {
    Ok(state.with_selection(Selection::new(0, state.doc.content_size())))
}

/// Remove the selected range, returning the document and caret
fn take_selection(state: &EditorState) -> Result<(Document, usize), Rejection> {
    let selection = state.selection;
    if selection.is_empty() {
        return Ok((state.doc.clone(), selection.head));
    }
    delete_range(&state.doc, selection.from(), selection.to())
}

pub(super) fn delete_selection(state: &EditorState) -> CommandResult {
    if state.selection.is_empty() {
        return Err(Rejection::EmptySelection);
    }
    let (doc, caret) = take_selection(state)?;
    Ok(finish(state, doc, Selection::cursor(caret)))
}

/// Inline nodes for a run of typed text: newlines become hard breaks,
/// tabs and carriage returns collapse to spaces
fn text_nodes(text: &str, marks: &MarkSet) -> Vec<Node> {
    let text = text.replace("\r\n", "\n").replace(|c: char| c == '\r' || c == '\t', " ");
    let mut nodes = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            nodes.push(Node::hard_break());
        }
        if !line.is_empty() {
            nodes.push(Node::text(line, marks.clone()));
        }
    }
    nodes
}

pub(super) fn insert_text(state: &EditorState, text: &str) -> CommandResult {
    let marks = state
        .stored_marks
        .clone()
        .unwrap_or_else(|| marks_at(&state.doc, state.selection.from()));
    let (mut doc, caret) = take_selection(state)?;

    let block = doc.textblock_at(caret).ok_or(Rejection::NoTextblock)?;
    let nodes = text_nodes(text, &marks);
    let inserted: usize = nodes.iter().map(Node::node_size).sum();

    let offset = caret - block.content_start();
    let node = doc
        .node_at_path_mut(&block.location.path)
        .ok_or(Rejection::NoTextblock)?;
    insert_inline(&mut node.content, offset, nodes);

    let mut next = finish(state, doc, Selection::cursor(caret + inserted));
    if inserted == 0 {
        next.stored_marks = state.stored_marks.clone();
    }
    Ok(next)
}

/// Split the textblock at the caret. In an empty list item the item is
/// lifted out of its list instead.
pub(super) fn split_block(state: &EditorState) -> CommandResult {
    let (mut doc, caret) = take_selection(state)?;
    let block = doc.textblock_at(caret).ok_or(Rejection::NoTextblock)?;
    let path = block.location.path.clone();
    let offset = caret - block.content_start();

    let Some((&index, parent_path)) = path.split_last() else {
        return Err(Rejection::NoTextblock);
    };
    let parent = doc
        .node_at_path(parent_path)
        .ok_or(Rejection::NoTextblock)?;

    if parent.kind == NodeKind::ListItem {
        if block.content_size == 0 && parent.content.len() == 1 {
            let lifted = lift_list_item(&doc, parent_path)?;
            let anchor = doc.text_anchor(caret);
            let caret = anchor
                .and_then(|a| lifted.pos_from_anchor(a))
                .unwrap_or_else(|| lifted.nearest_text_pos(caret));
            return Ok(finish(state, lifted, Selection::cursor(caret)));
        }
        return split_list_item(state, doc, parent_path, index, offset);
    }

    let container = doc
        .node_at_path_mut(parent_path)
        .ok_or(Rejection::NoTextblock)?;
    let textblock = container.content.remove(index);
    let (left, right) = split_textblock(textblock, offset);
    container.content.splice(index..index, [left, right]);

    let mut right_path = parent_path.to_vec();
    right_path.push(index + 1);
    let caret = doc
        .content_start(&right_path)
        .ok_or(Rejection::NoTextblock)?;
    Ok(finish(state, doc, Selection::cursor(caret)))
}

/// Split a textblock's content at `offset`. A heading split at its very end
/// continues as a paragraph.
fn split_textblock(textblock: Node, offset: usize) -> (Node, Node) {
    let at_end = offset >= textblock.content_size();
    let (left_content, right_content) = split_inline(textblock.content.clone(), offset);

    let right = if textblock.kind == NodeKind::Heading && at_end {
        Node::paragraph(right_content)
    } else {
        Node {
            content: right_content,
            ..textblock.clone()
        }
    };
    let left = Node {
        content: left_content,
        ..textblock
    };
    (left, right)
}

fn split_list_item(
    state: &EditorState,
    mut doc: Document,
    item_path: &[usize],
    index: usize,
    offset: usize,
) -> CommandResult {
    let Some((&item_index, list_path)) = item_path.split_last() else {
        return Err(Rejection::NoTextblock);
    };
    let list = doc
        .node_at_path_mut(list_path)
        .ok_or(Rejection::NoTextblock)?;

    let item = list.content.remove(item_index);
    let mut head = item.content;
    let mut tail = head.split_off(index + 1);
    let textblock = head.pop().ok_or(Rejection::NoTextblock)?;
    let (left, right) = split_textblock(textblock, offset);
    head.push(left);
    tail.insert(0, right);

    let first = Node {
        content: head,
        ..Node::new(NodeKind::ListItem)
    };
    let second = Node {
        content: tail,
        ..Node::new(NodeKind::ListItem)
    };
    list.content
        .splice(item_index..item_index, [first, second]);

    let mut caret_path = list_path.to_vec();
    caret_path.extend([item_index + 1, 0]);
    let caret = doc
        .content_start(&caret_path)
        .ok_or(Rejection::NoTextblock)?;
    Ok(finish(state, doc, Selection::cursor(caret)))
}
