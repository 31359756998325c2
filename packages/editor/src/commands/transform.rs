//! Tree surgery shared by the command implementations.
//!
//! Everything here works on an owned [`Document`] copy; the commands decide
//! when to normalize and how to map the selection afterwards.

use super::Rejection;
use crate::selection::Selection;
use crate::state::EditorState;
use folio_schema::{split_chars, Document, MarkSet, Node, NodeKind, TextblockInfo};

/// Make sure an inline node boundary exists at `offset` (relative to the
/// textblock's content). Returns the index of the first node at or after it.
pub(crate) fn split_inline_at(content: &mut Vec<Node>, offset: usize) -> usize {
    let mut pos = 0;
    for i in 0..content.len() {
        if pos == offset {
            return i;
        }
        let size = content[i].node_size();
        if offset < pos + size {
            let (left, right) = {
                let (l, r) = split_chars(&content[i].text, offset - pos);
                (l.to_string(), r.to_string())
            };
            let marks = content[i].marks.clone();
            content[i].text = left;
            content.insert(i + 1, Node::text(right, marks));
            return i + 1;
        }
        pos += size;
    }
    content.len()
}

/// Remove and return the inline nodes between two content offsets
pub(crate) fn cut_inline(content: &mut Vec<Node>, from: usize, to: usize) -> Vec<Node> {
    if from >= to {
        return Vec::new();
    }
    let start = split_inline_at(content, from);
    let end = split_inline_at(content, to);
    content.drain(start..end).collect()
}

/// Split inline content in two at a content offset
pub(crate) fn split_inline(mut content: Vec<Node>, offset: usize) -> (Vec<Node>, Vec<Node>) {
    let index = split_inline_at(&mut content, offset);
    let right = content.split_off(index);
    (content, right)
}

/// Insert inline nodes at a content offset
pub(crate) fn insert_inline(content: &mut Vec<Node>, offset: usize, nodes: Vec<Node>) {
    let index = split_inline_at(content, offset);
    content.splice(index..index, nodes);
}

/// Apply `f` to the marks of every text node between two content offsets
pub(crate) fn map_inline_marks(
    content: &mut Vec<Node>,
    from: usize,
    to: usize,
    f: &impl Fn(&mut MarkSet),
) {
    if from >= to {
        return;
    }
    let start = split_inline_at(content, from);
    let end = split_inline_at(content, to);
    for node in content[start..end].iter_mut().filter(|n| n.is_text()) {
        f(&mut node.marks);
    }
}

/// Textblocks overlapping `from..=to`
pub(crate) fn textblocks_in(doc: &Document, from: usize, to: usize) -> Vec<TextblockInfo> {
    doc.textblocks()
        .into_iter()
        .filter(|b| b.content_end() >= from && b.content_start() <= to)
        .collect()
}

/// Apply `f` to the marks of every character in `from..to`
pub(crate) fn map_marks_in_range(
    doc: &mut Document,
    from: usize,
    to: usize,
    f: impl Fn(&mut MarkSet),
) {
    for block in textblocks_in(doc, from, to) {
        let lo = from.max(block.content_start()) - block.content_start();
        let hi = to.min(block.content_end()) - block.content_start();
        if let Some(node) = doc.node_at_path_mut(&block.location.path) {
            map_inline_marks(&mut node.content, lo, hi, &f);
        }
    }
}

/// Delete everything between two positions.
///
/// Nodes entirely inside the range are removed, partially covered nodes are
/// trimmed recursively. Table rows and cells are emptied rather than removed
/// so tables stay rectangular. When both ends sit in sibling textblocks the
/// second is joined onto the first. Returns the new document and the caret.
pub(crate) fn delete_range(
    doc: &Document,
    from: usize,
    to: usize,
) -> Result<(Document, usize), Rejection> {
    let size = doc.content_size();
    if from > size || to > size {
        return Err(Rejection::InvalidPosition(from.max(to)));
    }
    if from >= to {
        return Ok((doc.clone(), from));
    }

    let start_anchor = doc.text_anchor(from);
    let joins = match (doc.textblock_at(from), doc.textblock_at(to)) {
        (Some(a), Some(b)) => a.location != b.location,
        _ => false,
    };

    let mut next = doc.clone();
    delete_in(next.root_mut(), 0, from, to);

    if let (true, Some(anchor)) = (joins, start_anchor) {
        join_following_textblock(&mut next, anchor.ordinal);
    }

    next.normalize();
    let caret = match start_anchor {
        Some(anchor) => next
            .pos_from_anchor(anchor)
            .unwrap_or_else(|| next.nearest_text_pos(from)),
        None => next.nearest_text_pos(from.min(next.content_size())),
    };
    Ok((next, caret))
}

fn delete_in(node: &mut Node, content_start: usize, from: usize, to: usize) {
    if node.is_textblock() {
        let end = content_start + node.content_size();
        let lo = from.max(content_start) - content_start;
        let hi = to.min(end) - content_start;
        cut_inline(&mut node.content, lo, hi);
        return;
    }

    let keeps_shape = matches!(node.kind, NodeKind::Table | NodeKind::TableRow);
    let mut offset = content_start;
    let mut i = 0;

    while i < node.content.len() {
        let size = node.content[i].node_size();
        let (start, end) = (offset, offset + size);
        offset = end;

        if end <= from || start >= to {
            i += 1;
            continue;
        }

        if from <= start && end <= to {
            if keeps_shape {
                node.content[i] = emptied(&node.content[i]);
                i += 1;
            } else {
                node.content.remove(i);
            }
            continue;
        }

        let child = &mut node.content[i];
        if !child.is_leaf() && !child.is_text() {
            delete_in(child, start + 1, from, to);
        }
        i += 1;
    }
}

/// An emptied row or cell keeping its kind and shape
fn emptied(node: &Node) -> Node {
    match node.kind {
        NodeKind::TableRow => Node {
            content: node.content.iter().map(emptied).collect(),
            ..node.clone()
        },
        kind if kind.is_table_cell() => Node {
            content: vec![Node::paragraph(Vec::new())],
            ..node.clone()
        },
        _ => Node::paragraph(Vec::new()),
    }
}

/// Join the textblock after `ordinal` onto it when they are siblings
fn join_following_textblock(doc: &mut Document, ordinal: usize) {
    let blocks = doc.textblocks();
    let (Some(first), Some(second)) = (blocks.get(ordinal), blocks.get(ordinal + 1)) else {
        return;
    };
    let (first, second) = (&first.location.path, &second.location.path);
    let Some((&first_index, parent)) = first.split_last() else {
        return;
    };
    let adjacent = second.len() == first.len()
        && second[..parent.len()] == *parent
        && second.last() == Some(&(first_index + 1));
    if !adjacent {
        return;
    }

    let Some(container) = doc.node_at_path_mut(parent) else {
        return;
    };
    let moved = container.content.remove(first_index + 1).content;
    container.content[first_index].content.extend(moved);
}

/// Map a selection through a structural edit by textblock order and offset
pub(crate) fn remap_by_anchor(before: &Document, after: &Document, selection: Selection) -> Selection {
    selection.map(|pos| {
        before
            .text_anchor(pos)
            .and_then(|anchor| after.pos_from_anchor(anchor))
            .unwrap_or_else(|| after.nearest_text_pos(pos.min(after.content_size())))
    })
}

/// Normalize an edited document and build the resulting state
pub(crate) fn finish(state: &EditorState, mut doc: Document, selection: Selection) -> EditorState {
    doc.normalize();
    state.with_doc(doc, selection)
}

/// Same as [`finish`], mapping the old selection by textblock anchors
pub(crate) fn finish_anchored(state: &EditorState, mut doc: Document) -> EditorState {
    doc.normalize();
    let selection = remap_by_anchor(&state.doc, &doc, state.selection);
    state.with_doc(doc, selection)
}

/// Path and node directly after `pos`, when `pos` sits on a node boundary
pub(crate) fn node_path_at(doc: &Document, pos: usize) -> Option<(Vec<usize>, &Node)> {
    let resolved = doc.resolve(pos)?;
    if resolved.text_offset != 0 {
        return None;
    }
    let node = doc.node_at_path(&resolved.path)?.content.get(resolved.index)?;
    let mut path = resolved.path;
    path.push(resolved.index);
    Some((path, node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_schema::{parse, serialize, Mark};

    #[test]
    fn test_split_inline_inside_text() {
        let mut content = vec![Node::plain_text("hello")];
        let index = split_inline_at(&mut content, 2);
        assert_eq!(index, 1);
        assert_eq!(content[0].text, "he");
        assert_eq!(content[1].text, "llo");
    }

    #[test]
    fn test_split_inline_on_boundary_is_noop() {
        let mut content = vec![Node::plain_text("ab"), Node::hard_break()];
        assert_eq!(split_inline_at(&mut content, 2), 1);
        assert_eq!(split_inline_at(&mut content, 3), 2);
        assert_eq!(content.len(), 2);
    }

    #[test]
    fn test_map_marks_across_blocks() {
        let mut doc = parse("<p>abc</p><p>def</p>");
        map_marks_in_range(&mut doc, 2, 8, |m| m.add(Mark::Bold));
        doc.normalize();
        assert_eq!(
            serialize(&doc),
            "<p>a<strong>bc</strong></p><p><strong>de</strong>f</p>"
        );
    }

    #[test]
    fn test_delete_within_textblock() {
        let doc = parse("<p>hello</p>");
        let (next, caret) = delete_range(&doc, 2, 4).unwrap();
        assert_eq!(serialize(&next), "<p>hlo</p>");
        assert_eq!(caret, 2);
    }

    #[test]
    fn test_delete_across_blocks_joins() {
        let doc = parse(r#"<p>abc</p><img src="x.png"><p>def</p>"#);
        // p: 0..5, img: 5, p: 6..11
        let (next, caret) = delete_range(&doc, 2, 9).unwrap();
        assert_eq!(serialize(&next), "<p>af</p>");
        assert_eq!(caret, 2);
    }

    #[test]
    fn test_delete_everything_leaves_empty_paragraph() {
        let doc = parse("<h1>a</h1><p>b</p>");
        let size = doc.content_size();
        let (next, caret) = delete_range(&doc, 0, size).unwrap();
        assert_eq!(serialize(&next), "<p></p>");
        assert_eq!(caret, 1);
    }

    #[test]
    fn test_delete_across_cells_keeps_table_shape() {
        let doc = parse("<table><tr><td>ab</td><td>cd</td><td>ef</td></tr></table>");
        // table 0, row 1, cell 2, p 3, "ab" 4..6; second cell at 8, third at 14, "ef" 16..18
        let (next, _) = delete_range(&doc, 5, 17).unwrap();
        assert_eq!(
            serialize(&next),
            "<table><tbody><tr><td><p>a</p></td><td><p></p></td><td><p>f</p></td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_delete_out_of_range() {
        let doc = parse("<p>a</p>");
        assert_eq!(
            delete_range(&doc, 0, 9).unwrap_err(),
            Rejection::InvalidPosition(9)
        );
    }
}
