//! Block type changes: paragraphs, headings, blockquotes and lists.

use super::transform::{finish, finish_anchored, textblocks_in};
use super::{CommandResult, Rejection};
use crate::state::EditorState;
use folio_schema::{Document, Node, NodeKind, NodeLocation, TextblockInfo, MAX_HEADING_LEVEL};

/// A run of sibling blocks inside one block container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRange {
    /// Path of the container
    pub parent: Vec<usize>,
    pub start: usize,
    /// Exclusive
    pub end: usize,
}

/// The sibling blocks covering `from..to`, taken from the innermost block
/// container holding both ends
pub fn block_range(doc: &Document, from: usize, to: usize) -> Option<BlockRange> {
    let rf = doc.resolve(from)?;
    let rt = doc.resolve(to)?;

    let mut depth = rf
        .path
        .iter()
        .zip(&rt.path)
        .take_while(|(a, b)| a == b)
        .count();
    loop {
        let node = doc.node_at_path(&rf.path[..depth])?;
        if node.kind.is_block_container() {
            break;
        }
        depth = depth.checked_sub(1)?;
    }

    let parent = doc.node_at_path(&rf.path[..depth])?;
    let start = rf.path.get(depth).copied().unwrap_or(rf.index);
    let end = rt.path.get(depth).map(|i| i + 1).unwrap_or(rt.index);
    let end = end.max(start + 1).min(parent.content.len());
    if start >= end {
        return None;
    }

    Some(BlockRange {
        parent: rf.path[..depth].to_vec(),
        start,
        end,
    })
}

fn selected_textblocks(state: &EditorState) -> Result<Vec<TextblockInfo>, Rejection> {
    let blocks = textblocks_in(&state.doc, state.selection.from(), state.selection.to());
    if blocks.is_empty() {
        return Err(Rejection::NoTextblock);
    }
    Ok(blocks)
}

/// Retype every selected textblock. Sizes do not change, so the selection
/// carries over as is.
fn retype_textblocks(state: &EditorState, retype: impl Fn(&mut Node)) -> CommandResult {
    let mut doc = state.doc.clone();
    for block in selected_textblocks(state)? {
        if let Some(node) = doc.node_at_path_mut(&block.location.path) {
            retype(node);
        }
    }
    let mut next = finish(state, doc, state.selection);
    next.stored_marks = state.stored_marks.clone();
    Ok(next)
}

pub(super) fn set_paragraph(state: &EditorState) -> CommandResult {
    retype_textblocks(state, |node| {
        node.kind = NodeKind::Paragraph;
        node.attrs.clear();
    })
}

/// Heading of `level`, or back to paragraphs when every selected block
/// already is one
pub(super) fn toggle_heading(state: &EditorState, level: u8) -> CommandResult {
    if !(1..=MAX_HEADING_LEVEL).contains(&level) {
        return Err(Rejection::invalid_argument(format!(
            "heading level must be 1-{MAX_HEADING_LEVEL}, got {level}"
        )));
    }

    let all_match = selected_textblocks(state)?.iter().all(|b| {
        state
            .doc
            .node_at_path(&b.location.path)
            .is_some_and(|n| n.heading_level() == Some(level))
    });
    if all_match {
        return set_paragraph(state);
    }

    retype_textblocks(state, |node| {
        node.kind = NodeKind::Heading;
        node.attrs.clear();
        node.attrs.insert("level".to_string(), level.to_string());
    })
}

/// Innermost ancestor of `from` matching `pred` that also contains `to`
fn enclosing(
    doc: &Document,
    from: usize,
    to: usize,
    pred: impl Fn(&Node) -> bool,
) -> Option<NodeLocation> {
    let location = doc.find_ancestor(from, pred)?;
    let node = doc.node_at_path(&location.path)?;
    (to < location.start + node.node_size()).then_some(location)
}

fn wrap(doc: &mut Document, range: &BlockRange, wrapper: impl FnOnce(Vec<Node>) -> Node) -> Result<(), Rejection> {
    let parent = doc
        .node_at_path_mut(&range.parent)
        .ok_or(Rejection::NoTextblock)?;
    let taken: Vec<Node> = parent.content.drain(range.start..range.end).collect();
    parent.content.insert(range.start, wrapper(taken));
    Ok(())
}

/// Replace the node at `path` by its children
fn unwrap(doc: &mut Document, path: &[usize]) -> Result<(), Rejection> {
    let (&index, parent_path) = path.split_last().ok_or(Rejection::NoTextblock)?;
    let parent = doc
        .node_at_path_mut(parent_path)
        .ok_or(Rejection::NoTextblock)?;
    let node = parent.content.remove(index);
    parent.content.splice(index..index, node.content);
    Ok(())
}

pub(super) fn toggle_blockquote(state: &EditorState) -> CommandResult {
    let (from, to) = (state.selection.from(), state.selection.to());
    let mut doc = state.doc.clone();

    match enclosing(&doc, from, to, |n| n.kind == NodeKind::Blockquote) {
        Some(location) => unwrap(&mut doc, &location.path)?,
        None => {
            let range = block_range(&doc, from, to).ok_or(Rejection::NoTextblock)?;
            wrap(&mut doc, &range, |blocks| {
                Node::element(NodeKind::Blockquote, blocks)
            })?;
        }
    }

    Ok(finish_anchored(state, doc))
}

/// Wrap the selected blocks in a list of `kind`, switch the enclosing list
/// to `kind`, or lift the selected items out when it already is one
pub(super) fn toggle_list(state: &EditorState, kind: NodeKind) -> CommandResult {
    let (from, to) = (state.selection.from(), state.selection.to());
    let mut doc = state.doc.clone();

    if let Some(location) = enclosing(&doc, from, to, |n| n.kind.is_list()) {
        let list = doc
            .node_at_path_mut(&location.path)
            .ok_or(Rejection::NoTextblock)?;
        if list.kind != kind {
            list.kind = kind;
            list.attrs.clear();
            return Ok(finish(state, doc, state.selection));
        }

        let (first, last) = selected_items(list, location.content_start(), from, to)
            .ok_or(Rejection::NoTextblock)?;
        let lifted = lift_items(&doc, &location.path, first, last)?;
        return Ok(finish_anchored(state, lifted));
    }

    let range = block_range(&doc, from, to).ok_or(Rejection::NoTextblock)?;
    wrap(&mut doc, &range, |blocks| {
        let items = blocks
            .into_iter()
            .map(|block| Node::element(NodeKind::ListItem, vec![block]))
            .collect();
        Node::element(kind, items)
    })?;
    Ok(finish_anchored(state, doc))
}

/// Index span of the list items overlapping the selection
fn selected_items(list: &Node, content_start: usize, from: usize, to: usize) -> Option<(usize, usize)> {
    let to = to.max(from + 1);
    let mut offset = content_start;
    let mut span: Option<(usize, usize)> = None;

    for (i, item) in list.content.iter().enumerate() {
        let (start, end) = (offset, offset + item.node_size());
        offset = end;
        if from < end && to > start {
            span = Some(match span {
                Some((first, _)) => (first, i + 1),
                None => (i, i + 1),
            });
        }
    }
    span
}

/// Move items `first..last` of the list at `list_path` out into the list's
/// parent, splitting the list around them
fn lift_items(
    doc: &Document,
    list_path: &[usize],
    first: usize,
    last: usize,
) -> Result<Document, Rejection> {
    let (&index, parent_path) = list_path.split_last().ok_or(Rejection::NoTextblock)?;
    let mut next = doc.clone();
    let parent = next
        .node_at_path_mut(parent_path)
        .ok_or(Rejection::NoTextblock)?;

    let mut list = parent.content.remove(index);
    let mut lifted = list.content.split_off(first);
    let after = lifted.split_off(last - first);
    let before = std::mem::take(&mut list.content);

    let mut replacement = Vec::new();
    if !before.is_empty() {
        replacement.push(Node {
            content: before,
            ..list.clone()
        });
    }
    replacement.extend(lifted.into_iter().flat_map(|item| item.content));
    if !after.is_empty() {
        replacement.push(Node::element(list.kind, after));
    }

    parent.content.splice(index..index, replacement);
    Ok(next)
}

/// Lift a single list item out of its list
pub(super) fn lift_list_item(doc: &Document, item_path: &[usize]) -> Result<Document, Rejection> {
    let (&item, list_path) = item_path.split_last().ok_or(Rejection::NoTextblock)?;
    lift_items(doc, list_path, item, item + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;

    fn at(html: &str, anchor: usize, head: usize) -> EditorState {
        EditorState::from_html(html).with_selection(Selection::new(anchor, head))
    }

    #[test]
    fn test_toggle_heading_round_trip() {
        let state = at("<p>abc</p>", 2, 2);
        let heading = toggle_heading(&state, 2).unwrap();
        assert_eq!(heading.html(), "<h2>abc</h2>");
        assert_eq!(heading.selection, Selection::cursor(2));

        let back = toggle_heading(&heading, 2).unwrap();
        assert_eq!(back.html(), "<p>abc</p>");
    }

    #[test]
    fn test_heading_level_out_of_range() {
        let state = at("<p>abc</p>", 2, 2);
        assert!(matches!(
            toggle_heading(&state, 5),
            Err(Rejection::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_heading_applies_to_every_selected_block() {
        let state = at("<p>a</p><p>b</p>", 1, 4);
        let next = toggle_heading(&state, 1).unwrap();
        assert_eq!(next.html(), "<h1>a</h1><h1>b</h1>");
    }

    #[test]
    fn test_blockquote_wraps_and_unwraps() {
        let state = at("<p>a</p><p>b</p>", 1, 4);
        let quoted = toggle_blockquote(&state).unwrap();
        assert_eq!(quoted.html(), "<blockquote><p>a</p><p>b</p></blockquote>");
        // the caret follows its text
        assert_eq!(quoted.selection, Selection::new(2, 5));

        let plain = toggle_blockquote(&quoted).unwrap();
        assert_eq!(plain.html(), "<p>a</p><p>b</p>");
        assert_eq!(plain.selection, Selection::new(1, 4));
    }

    #[test]
    fn test_wrap_in_list() {
        let state = at("<p>a</p><p>b</p>", 1, 4);
        let next = toggle_list(&state, NodeKind::BulletList).unwrap();
        assert_eq!(
            next.html(),
            "<ul><li><p>a</p></li><li><p>b</p></li></ul>"
        );
    }

    #[test]
    fn test_switch_list_kind() {
        let state = at("<ul><li><p>a</p></li></ul>", 3, 3);
        let next = toggle_list(&state, NodeKind::OrderedList).unwrap();
        assert_eq!(next.html(), "<ol><li><p>a</p></li></ol>");
        assert_eq!(next.selection, Selection::cursor(3));
    }

    #[test]
    fn test_lift_middle_item_splits_list() {
        let html = "<ul><li><p>a</p></li><li><p>b</p></li><li><p>c</p></li></ul>";
        // ul 0, li 1..6, li 6..11 with "b" at 8, li 11..16
        let state = at(html, 8, 8);
        let next = toggle_list(&state, NodeKind::BulletList).unwrap();
        assert_eq!(
            next.html(),
            "<ul><li><p>a</p></li></ul><p>b</p><ul><li><p>c</p></li></ul>"
        );
    }

    #[test]
    fn test_block_range_in_single_textblock() {
        let doc = folio_schema::parse("<blockquote><p>a</p><p>b</p></blockquote>");
        let range = block_range(&doc, 2, 2).unwrap();
        assert_eq!(
            range,
            BlockRange {
                parent: vec![0],
                start: 0,
                end: 1
            }
        );
    }
}
