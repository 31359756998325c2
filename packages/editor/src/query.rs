//! # Queries
//!
//! Read-only questions a toolbar asks about a state: which marks apply at the
//! caret, which block type the selection is in, whether a command would run.

use crate::commands::{Command, Rejection};
use crate::state::EditorState;
use folio_schema::{validate, Document, Mark, MarkSet, MarkType, Node, NodeKind};
use serde::{Deserialize, Serialize};

/// Block-level formats a toolbar can show as active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "level", rename_all = "camelCase")]
pub enum BlockType {
    Paragraph,
    Heading(u8),
    BulletList,
    OrderedList,
    Blockquote,
}

/// Marks that typed text would receive at `pos`.
///
/// Inside a text run those are the run's marks. On a boundary the run before
/// wins, except that links do not extend past their end.
pub fn marks_at(doc: &Document, pos: usize) -> MarkSet {
    let Some(block) = doc.textblock_at(pos) else {
        return MarkSet::new();
    };
    let Some(node) = doc.node_at_path(&block.location.path) else {
        return MarkSet::new();
    };
    let offset = pos - block.content_start();

    let mut before = None;
    let mut after = None;
    let mut start = 0;
    for child in &node.content {
        let end = start + child.node_size();
        if start < offset && offset < end {
            return child.marks.clone();
        }
        if end == offset {
            before = Some(child);
        }
        if start == offset && after.is_none() {
            after = Some(child);
        }
        start = end;
    }

    let (main, other) = match (before, after) {
        (Some(b), a) => (b, a),
        (None, Some(a)) => (a, None),
        (None, None) => return MarkSet::new(),
    };

    let mut marks = main.marks.clone();
    if let Some(link) = main.marks.get(MarkType::Link) {
        if other.map_or(true, |o| o.marks.get(MarkType::Link) != Some(link)) {
            marks.remove(MarkType::Link);
        }
    }
    marks
}

/// Stored marks if any, otherwise the marks at the caret
pub fn current_marks(state: &EditorState) -> MarkSet {
    state
        .stored_marks
        .clone()
        .unwrap_or_else(|| marks_at(&state.doc, state.selection.head))
}

/// Text nodes overlapping `from..to`
pub(crate) fn text_nodes_in(doc: &Document, from: usize, to: usize) -> Vec<&Node> {
    let mut out = Vec::new();
    for block in doc.textblocks() {
        if block.content_end() <= from || block.content_start() >= to {
            continue;
        }
        let Some(node) = doc.node_at_path(&block.location.path) else {
            continue;
        };
        let mut start = block.content_start();
        for child in &node.content {
            let end = start + child.node_size();
            if child.is_text() && start < to && end > from {
                out.push(child);
            }
            start = end;
        }
    }
    out
}

pub fn is_mark_active(state: &EditorState, mark_type: MarkType) -> bool {
    let selection = state.selection;
    if selection.is_empty() {
        return current_marks(state).contains_type(mark_type);
    }
    let nodes = text_nodes_in(&state.doc, selection.from(), selection.to());
    !nodes.is_empty() && nodes.iter().all(|n| n.marks.contains_type(mark_type))
}

/// The mark of a type governing the selection, if any
pub fn active_mark(state: &EditorState, mark_type: MarkType) -> Option<Mark> {
    let selection = state.selection;
    if selection.is_empty() {
        return current_marks(state).get(mark_type).cloned();
    }
    text_nodes_in(&state.doc, selection.from(), selection.to())
        .into_iter()
        .find_map(|n| n.marks.get(mark_type).cloned())
}

pub fn active_highlight(state: &EditorState) -> Option<String> {
    match active_mark(state, MarkType::Highlight)? {
        Mark::Highlight { color } => Some(color),
        _ => None,
    }
}

/// Whether the whole selection carries a highlight of exactly `color`
pub fn is_highlight_active(state: &EditorState, color: &str) -> bool {
    let has_color = |marks: &MarkSet| {
        matches!(marks.get(MarkType::Highlight), Some(Mark::Highlight { color: c }) if c == color)
    };
    let selection = state.selection;
    if selection.is_empty() {
        return has_color(&current_marks(state));
    }
    let nodes = text_nodes_in(&state.doc, selection.from(), selection.to());
    !nodes.is_empty() && nodes.iter().all(|n| has_color(&n.marks))
}

pub fn active_link(state: &EditorState) -> Option<String> {
    match active_mark(state, MarkType::Link)? {
        Mark::Link { href } => Some(href),
        _ => None,
    }
}

/// Range of the run of `mark_type` touching `pos`, and the mark itself
pub fn mark_range(doc: &Document, pos: usize, mark_type: MarkType) -> Option<(usize, usize, Mark)> {
    let block = doc.textblock_at(pos)?;
    let node = doc.node_at_path(&block.location.path)?;
    let offset = pos - block.content_start();

    let mut spans = Vec::with_capacity(node.content.len());
    let mut start = 0;
    for child in &node.content {
        let end = start + child.node_size();
        spans.push((start, end, child.marks.get(mark_type)));
        start = end;
    }

    let hit = spans
        .iter()
        .position(|&(s, e, m)| m.is_some() && s <= offset && offset < e)
        .or_else(|| {
            spans
                .iter()
                .position(|&(_, e, m)| m.is_some() && e == offset)
        })?;
    let mark = spans[hit].2?;

    let mut first = hit;
    while first > 0 && spans[first - 1].2 == Some(mark) {
        first -= 1;
    }
    let mut last = hit;
    while last + 1 < spans.len() && spans[last + 1].2 == Some(mark) {
        last += 1;
    }

    let base = block.content_start();
    Some((base + spans[first].0, base + spans[last].1, mark.clone()))
}

pub fn is_block_active(state: &EditorState, block_type: BlockType) -> bool {
    let doc = &state.doc;
    let (from, to) = (state.selection.from(), state.selection.to());

    let textblock_matches = |pred: &dyn Fn(&Node) -> bool| {
        let blocks: Vec<_> = doc
            .textblocks()
            .into_iter()
            .filter(|b| b.content_end() >= from && b.content_start() <= to)
            .collect();
        !blocks.is_empty()
            && blocks.iter().all(|b| {
                doc.node_at_path(&b.location.path)
                    .is_some_and(|node| pred(node))
            })
    };

    match block_type {
        BlockType::Paragraph => textblock_matches(&|n| n.kind == NodeKind::Paragraph),
        BlockType::Heading(level) => textblock_matches(&|n| n.heading_level() == Some(level)),
        BlockType::BulletList => innermost_list(doc, from) == Some(NodeKind::BulletList),
        BlockType::OrderedList => innermost_list(doc, from) == Some(NodeKind::OrderedList),
        BlockType::Blockquote => doc
            .find_ancestor(from, |n| n.kind == NodeKind::Blockquote)
            .is_some(),
    }
}

fn innermost_list(doc: &Document, pos: usize) -> Option<NodeKind> {
    let location = doc.find_ancestor(pos, |n| n.kind.is_list())?;
    doc.node_at_path(&location.path).map(|n| n.kind)
}

/// Whether the caret is inside a table cell
pub fn selection_in_table(state: &EditorState) -> bool {
    state
        .doc
        .find_ancestor(state.selection.head, |n| n.kind.is_table_cell())
        .is_some()
}

/// Dry-run a command: would it succeed and leave a valid document
pub fn can(state: &EditorState, command: &Command) -> bool {
    check(state, command).is_ok()
}

/// Like [`can`], returning the reason for refusal
pub fn check(state: &EditorState, command: &Command) -> Result<(), Rejection> {
    let next = command.apply(state)?;
    validate(&next.doc)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;
    use folio_schema::parse;

    #[test]
    fn test_marks_inside_and_after_run() {
        let doc = parse("<p><strong>ab</strong>c</p>");
        assert!(marks_at(&doc, 2).contains_type(MarkType::Bold));
        // directly after "ab" the bold run wins
        assert!(marks_at(&doc, 3).contains_type(MarkType::Bold));
        assert!(marks_at(&doc, 4).is_empty());
    }

    #[test]
    fn test_link_does_not_extend_past_end() {
        let doc = parse(r#"<p><a href="https://x.y">ab</a>c</p>"#);
        assert!(marks_at(&doc, 2).contains_type(MarkType::Link));
        assert!(!marks_at(&doc, 3).contains_type(MarkType::Link));
    }

    #[test]
    fn test_highlight_active_needs_whole_range() {
        let state = EditorState::from_html(r##"<p><mark data-color="#fef08a">ab</mark>cd</p>"##)
            .with_selection(Selection::new(1, 3));
        assert!(is_highlight_active(&state, "#fef08a"));
        assert!(!is_highlight_active(&state, "#bbf7d0"));

        let state = state.with_selection(Selection::new(1, 5));
        assert!(!is_highlight_active(&state, "#fef08a"));
        assert_eq!(active_highlight(&state).as_deref(), Some("#fef08a"));
    }

    #[test]
    fn test_mark_active_over_range() {
        let state = EditorState::from_html("<p><em>ab</em>c</p>")
            .with_selection(Selection::new(1, 3));
        assert!(is_mark_active(&state, MarkType::Italic));

        let state = state.with_selection(Selection::new(1, 4));
        assert!(!is_mark_active(&state, MarkType::Italic));
    }

    #[test]
    fn test_mark_range_covers_run() {
        let doc = parse(r#"<p>x<a href="https://x.y">a<b>b</b></a>y</p>"#);
        let (from, to, mark) = mark_range(&doc, 3, MarkType::Link).unwrap();
        assert_eq!((from, to), (2, 4));
        assert_eq!(mark, Mark::link("https://x.y"));
    }

    #[test]
    fn test_block_active() {
        let state = EditorState::from_html("<ul><li><h2>x</h2></li></ul>");
        assert!(is_block_active(&state, BlockType::BulletList));
        assert!(is_block_active(&state, BlockType::Heading(2)));
        assert!(!is_block_active(&state, BlockType::Heading(1)));
        assert!(!is_block_active(&state, BlockType::Blockquote));
    }

    #[test]
    fn test_table_gating() {
        let state = EditorState::from_html("<p>x</p>");
        assert!(!selection_in_table(&state));
        assert!(!can(&state, &Command::AddRowAfter));

        let state = EditorState::from_html("<table><tr><td>a</td></tr></table>");
        assert!(selection_in_table(&state));
        assert!(can(&state, &Command::AddRowAfter));
    }
}
