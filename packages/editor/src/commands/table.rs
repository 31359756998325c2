//! Structural table edits. All of them need the caret inside a table cell.

use super::transform::finish;
use super::{CommandResult, Rejection};
use crate::selection::Selection;
use crate::state::EditorState;
use folio_schema::{Document, Node, NodeKind};
use serde::Serialize;

/// Where the caret sits inside a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableContext {
    pub table_path: Vec<usize>,
    /// Position directly before the table
    pub table_start: usize,
    pub row: usize,
    pub col: usize,
    pub rows: usize,
    pub cols: usize,
}

pub fn table_context(doc: &Document, pos: usize) -> Option<TableContext> {
    let cell = doc.find_ancestor(pos, |n| n.kind.is_table_cell())?;
    let depth = cell.path.len();
    if depth < 2 {
        return None;
    }

    let table_path = cell.path[..depth - 2].to_vec();
    let table = doc.node_at_path(&table_path)?;
    if table.kind != NodeKind::Table {
        return None;
    }

    Some(TableContext {
        table_start: doc.path_start(&table_path)?,
        row: cell.path[depth - 2],
        col: cell.path[depth - 1],
        rows: table.content.len(),
        cols: table.content.first().map_or(0, |r| r.content.len()),
        table_path,
    })
}

fn context(state: &EditorState) -> Result<TableContext, Rejection> {
    table_context(&state.doc, state.selection.head).ok_or(Rejection::NotInTable)
}

fn table_mut<'a>(doc: &'a mut Document, ctx: &TableContext) -> Result<&'a mut Node, Rejection> {
    doc.node_at_path_mut(&ctx.table_path)
        .ok_or(Rejection::NotInTable)
}

/// Where a cell of the old table ends up
struct CellTarget {
    row: usize,
    col: usize,
    /// Whether the caret's cell survived as is, so its offset still applies
    same: bool,
}

/// Carry the selection across a table edit. Positions before the table are
/// untouched, positions after it shift by the size change, positions inside
/// follow their cell.
fn remap(
    state: &EditorState,
    ctx: &TableContext,
    next: &Document,
    map_cell: impl Fn(usize, usize) -> CellTarget,
) -> Selection {
    let old_size = state
        .doc
        .node_at_path(&ctx.table_path)
        .map_or(0, Node::node_size);
    let new_size = next
        .node_at_path(&ctx.table_path)
        .map_or(0, Node::node_size);
    let old_end = ctx.table_start + old_size;

    state.selection.map(|pos| {
        if pos <= ctx.table_start {
            return pos;
        }
        if pos >= old_end {
            return (pos + new_size).saturating_sub(old_size);
        }

        let mapped = cell_offset(&state.doc, ctx, pos).and_then(|(row, col, offset)| {
            let target = map_cell(row, col);
            let mut path = ctx.table_path.clone();
            path.extend([target.row, target.col]);
            let start = next.content_start(&path)?;
            let size = next.node_at_path(&path)?.content_size();
            let offset = if target.same { offset.min(size) } else { 0 };
            Some(next.nearest_text_pos(start + offset))
        });
        mapped.unwrap_or_else(|| next.nearest_text_pos(ctx.table_start))
    })
}

/// Row, column and offset from the cell's content start
fn cell_offset(doc: &Document, ctx: &TableContext, pos: usize) -> Option<(usize, usize, usize)> {
    let cell = doc.find_ancestor(pos, |n| n.kind.is_table_cell())?;
    let depth = cell.path.len();
    if depth < 2 || cell.path[..depth - 2] != ctx.table_path[..] {
        return None;
    }
    Some((
        cell.path[depth - 2],
        cell.path[depth - 1],
        pos - cell.content_start(),
    ))
}

pub(super) fn add_row(state: &EditorState, after: bool) -> CommandResult {
    let ctx = context(state)?;
    let at = if after { ctx.row + 1 } else { ctx.row };

    let mut doc = state.doc.clone();
    let row = Node::element(
        NodeKind::TableRow,
        (0..ctx.cols)
            .map(|_| Node::empty_cell(NodeKind::TableCell))
            .collect(),
    );
    table_mut(&mut doc, &ctx)?.content.insert(at, row);

    let selection = remap(state, &ctx, &doc, |row, col| CellTarget {
        row: if row >= at { row + 1 } else { row },
        col,
        same: true,
    });
    Ok(finish(state, doc, selection))
}

/// Removing the last remaining row removes the table
pub(super) fn delete_row(state: &EditorState) -> CommandResult {
    let ctx = context(state)?;
    if ctx.rows <= 1 {
        return delete_table(state);
    }

    let mut doc = state.doc.clone();
    table_mut(&mut doc, &ctx)?.content.remove(ctx.row);

    let removed = ctx.row;
    let remaining = ctx.rows - 1;
    let selection = remap(state, &ctx, &doc, |row, col| match row.cmp(&removed) {
        std::cmp::Ordering::Less => CellTarget { row, col, same: true },
        std::cmp::Ordering::Equal => CellTarget {
            row: removed.min(remaining - 1),
            col,
            same: false,
        },
        std::cmp::Ordering::Greater => CellTarget {
            row: row - 1,
            col,
            same: true,
        },
    });
    Ok(finish(state, doc, selection))
}

/// New cells copy the kind of the caret column's cell in the same row, so
/// a header row stays a header row
pub(super) fn add_column(state: &EditorState, after: bool) -> CommandResult {
    let ctx = context(state)?;
    let at = if after { ctx.col + 1 } else { ctx.col };

    let mut doc = state.doc.clone();
    for row in table_mut(&mut doc, &ctx)?.content.iter_mut() {
        let kind = row
            .content
            .get(ctx.col)
            .map_or(NodeKind::TableCell, |cell| cell.kind);
        let at = at.min(row.content.len());
        row.content.insert(at, Node::empty_cell(kind));
    }

    let selection = remap(state, &ctx, &doc, |row, col| CellTarget {
        row,
        col: if col >= at { col + 1 } else { col },
        same: true,
    });
    Ok(finish(state, doc, selection))
}

/// Removing the last remaining column removes the table
pub(super) fn delete_column(state: &EditorState) -> CommandResult {
    let ctx = context(state)?;
    if ctx.cols <= 1 {
        return delete_table(state);
    }

    let mut doc = state.doc.clone();
    for row in table_mut(&mut doc, &ctx)?.content.iter_mut() {
        if ctx.col < row.content.len() {
            row.content.remove(ctx.col);
        }
    }

    let removed = ctx.col;
    let remaining = ctx.cols - 1;
    let selection = remap(state, &ctx, &doc, |row, col| match col.cmp(&removed) {
        std::cmp::Ordering::Less => CellTarget { row, col, same: true },
        std::cmp::Ordering::Equal => CellTarget {
            row,
            col: removed.min(remaining - 1),
            same: false,
        },
        std::cmp::Ordering::Greater => CellTarget {
            row,
            col: col - 1,
            same: true,
        },
    });
    Ok(finish(state, doc, selection))
}

/// Switch the first row between header and body cells
pub(super) fn toggle_header_row(state: &EditorState) -> CommandResult {
    let ctx = context(state)?;
    let mut doc = state.doc.clone();
    let table = table_mut(&mut doc, &ctx)?;
    let first = table.content.first_mut().ok_or(Rejection::NotInTable)?;

    let is_header = first
        .content
        .iter()
        .all(|c| c.kind == NodeKind::TableHeaderCell);
    let kind = if is_header {
        NodeKind::TableCell
    } else {
        NodeKind::TableHeaderCell
    };
    for cell in first.content.iter_mut() {
        cell.kind = kind;
    }

    Ok(finish(state, doc, state.selection))
}

pub(super) fn delete_table(state: &EditorState) -> CommandResult {
    let ctx = context(state)?;
    let (&index, parent_path) = ctx
        .table_path
        .split_last()
        .ok_or(Rejection::NotInTable)?;

    let mut doc = state.doc.clone();
    doc.node_at_path_mut(parent_path)
        .ok_or(Rejection::NotInTable)?
        .content
        .remove(index);
    doc.normalize();

    let caret = doc.nearest_text_pos(ctx.table_start.min(doc.content_size()));
    Ok(finish(state, doc, Selection::cursor(caret)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_BY_TWO: &str =
        "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>";

    /// Caret inside the cell holding `text`
    fn in_cell(html: &str, text: &str) -> EditorState {
        let state = EditorState::from_html(html);
        let blocks = state.doc.textblocks();
        let block = blocks
            .iter()
            .find(|b| {
                state
                    .doc
                    .node_at_path(&b.location.path)
                    .is_some_and(|n| n.text_content() == text)
            })
            .unwrap();
        state.with_selection(Selection::cursor(block.content_start()))
    }

    fn cell_text(state: &EditorState) -> String {
        let block = state.doc.textblock_at(state.selection.head).unwrap();
        state
            .doc
            .node_at_path(&block.location.path)
            .unwrap()
            .text_content()
    }

    #[test]
    fn test_context() {
        let state = in_cell(TWO_BY_TWO, "d");
        let ctx = table_context(&state.doc, state.selection.head).unwrap();
        assert_eq!((ctx.row, ctx.col, ctx.rows, ctx.cols), (1, 1, 2, 2));
        assert_eq!(ctx.table_start, 0);
    }

    #[test]
    fn test_add_row_before_keeps_caret_in_cell() {
        let state = in_cell(TWO_BY_TWO, "c");
        let next = add_row(&state, false).unwrap();
        let ctx = table_context(&next.doc, next.selection.head).unwrap();
        assert_eq!((ctx.rows, ctx.row), (3, 2));
        assert_eq!(cell_text(&next), "c");
    }

    #[test]
    fn test_add_column_after_copies_header_kind() {
        let html = "<table><tr><th>h</th></tr><tr><td>x</td></tr></table>";
        let state = in_cell(html, "x");
        let next = add_column(&state, true).unwrap();
        assert_eq!(
            next.html(),
            "<table><thead><tr><th><p>h</p></th><th><p></p></th></tr></thead>\
             <tbody><tr><td><p>x</p></td><td><p></p></td></tr></tbody></table>"
        );
        assert_eq!(cell_text(&next), "x");
    }

    #[test]
    fn test_delete_row_moves_caret() {
        let state = in_cell(TWO_BY_TWO, "d");
        let next = delete_row(&state).unwrap();
        assert_eq!(
            next.html(),
            "<table><tbody><tr><td><p>a</p></td><td><p>b</p></td></tr></tbody></table>"
        );
        assert_eq!(cell_text(&next), "b");
    }

    #[test]
    fn test_delete_column() {
        let state = in_cell(TWO_BY_TWO, "a");
        let next = delete_column(&state).unwrap();
        assert_eq!(
            next.html(),
            "<table><tbody><tr><td><p>b</p></td></tr><tr><td><p>d</p></td></tr></tbody></table>"
        );
        assert_eq!(cell_text(&next), "b");
    }

    #[test]
    fn test_deleting_last_row_deletes_table() {
        let state = in_cell("<p>x</p><table><tr><td>a</td></tr></table>", "a");
        let next = delete_row(&state).unwrap();
        assert_eq!(next.html(), "<p>x</p>");
        assert_eq!(next.selection, Selection::cursor(2));
    }

    #[test]
    fn test_toggle_header_row() {
        let state = in_cell(TWO_BY_TWO, "a");
        let next = toggle_header_row(&state).unwrap();
        assert!(next.html().starts_with("<table><thead><tr><th><p>a</p></th>"));
        let back = toggle_header_row(&next).unwrap();
        assert_eq!(back.html(), state.html());
    }

    #[test]
    fn test_table_commands_outside_table() {
        let state = EditorState::from_html("<p>x</p>");
        assert_eq!(add_row(&state, true), Err(Rejection::NotInTable));
        assert_eq!(delete_table(&state), Err(Rejection::NotInTable));
    }
}
