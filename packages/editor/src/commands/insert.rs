//! Inserting block nodes: images, embedded videos and tables.

use super::transform::{delete_range, finish, split_inline};
use super::{CommandResult, Rejection};
use crate::selection::Selection;
use crate::state::EditorState;
use folio_schema::{Document, Node, NodeKind};
use url::Url;

pub const DEFAULT_VIDEO_WIDTH: u32 = 640;
pub const DEFAULT_VIDEO_HEIGHT: u32 = 480;

/// Upper bound on rows and columns of an inserted table
pub const MAX_TABLE_DIMENSION: usize = 100;

/// Put a block node at the caret.
///
/// An empty textblock at the caret is replaced; a caret at either end of a
/// textblock inserts next to it; anywhere else the textblock is split.
/// A paragraph is appended when the node would otherwise end its container.
fn insert_block(state: &EditorState, node: Node) -> CommandResult {
    let selection = state.selection;
    let (mut doc, caret) = if selection.is_empty() {
        (state.doc.clone(), selection.head)
    } else {
        delete_range(&state.doc, selection.from(), selection.to())?
    };

    if node.kind == NodeKind::Table
        && doc
            .find_ancestor(caret, |n| n.kind.is_table_cell())
            .is_some()
    {
        return Err(Rejection::NestedTable);
    }

    let resolved = doc
        .resolve(caret)
        .ok_or(Rejection::InvalidPosition(caret))?;
    let parent = doc
        .node_at_path(&resolved.path)
        .ok_or(Rejection::InvalidPosition(caret))?;

    let (container_path, index) = if parent.is_textblock() {
        let (&block_index, container) = resolved
            .path
            .split_last()
            .ok_or(Rejection::InvalidPosition(caret))?;
        let container = container.to_vec();
        let offset = resolved.parent_offset();
        let size = parent.content_size();

        let target = doc
            .node_at_path_mut(&container)
            .ok_or(Rejection::InvalidPosition(caret))?;
        let index = if size == 0 {
            target.content.remove(block_index);
            block_index
        } else if offset == 0 {
            block_index
        } else if offset == size {
            block_index + 1
        } else {
            let textblock = target.content.remove(block_index);
            let (left, right) = split_inline(textblock.content.clone(), offset);
            let right = Node {
                content: right,
                ..textblock.clone()
            };
            let left = Node {
                content: left,
                ..textblock
            };
            target.content.splice(block_index..block_index, [left, right]);
            block_index + 1
        };
        (container, index)
    } else if parent.kind.is_block_container() {
        (resolved.path.clone(), resolved.index)
    } else {
        return Err(Rejection::InvalidPosition(caret));
    };

    let is_leaf = node.is_leaf();
    let target = doc
        .node_at_path_mut(&container_path)
        .ok_or(Rejection::InvalidPosition(caret))?;
    target.content.insert(index, node);
    if index + 1 == target.content.len() {
        target.content.push(Node::paragraph(Vec::new()));
    }

    let mut node_path = container_path;
    node_path.push(index);
    let caret = caret_after_insert(&doc, &node_path, is_leaf)
        .ok_or(Rejection::InvalidPosition(caret))?;
    Ok(finish(state, doc, Selection::cursor(caret)))
}

/// Leaves put the caret after themselves, containers into their first
/// textblock
fn caret_after_insert(doc: &Document, node_path: &[usize], is_leaf: bool) -> Option<usize> {
    let start = doc.path_start(node_path)?;
    let pos = if is_leaf { start + 1 } else { start };
    Some(doc.nearest_text_pos(pos))
}

pub(super) fn insert_image(
    state: &EditorState,
    src: &str,
    alt: Option<&str>,
    title: Option<&str>,
) -> CommandResult {
    let src = src.trim();
    if src.is_empty() {
        return Err(Rejection::invalid_argument("image src is empty"));
    }

    let mut image = Node::image(src);
    for (name, value) in [("alt", alt), ("title", title)] {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            image.attrs.insert(name.to_string(), value.to_string());
        }
    }
    insert_block(state, image)
}

/// Canonical embed URL for a YouTube or Vimeo link
pub fn embed_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    let host = host.strip_prefix("m.").unwrap_or(host);
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match host {
        "youtube.com" | "youtube-nocookie.com" => {
            let id = match segments.as_slice() {
                ["watch"] => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                ["embed", id] | ["shorts", id] | ["live", id] | ["v", id] => Some(id.to_string()),
                _ => None,
            }?;
            youtube_id(&id).then(|| format!("https://www.youtube.com/embed/{id}"))
        }
        "youtu.be" => {
            let id = segments.first()?;
            youtube_id(id).then(|| format!("https://www.youtube.com/embed/{id}"))
        }
        "vimeo.com" => {
            let id = segments.iter().rev().find(|s| vimeo_id(s))?;
            Some(format!("https://player.vimeo.com/video/{id}"))
        }
        "player.vimeo.com" => match segments.as_slice() {
            ["video", id] if vimeo_id(id) => Some(format!("https://player.vimeo.com/video/{id}")),
            _ => None,
        },
        _ => None,
    }
}

fn youtube_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn vimeo_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

pub(super) fn insert_video(
    state: &EditorState,
    url: &str,
    width: Option<u32>,
    height: Option<u32>,
) -> CommandResult {
    let src = embed_url(url).ok_or_else(|| Rejection::InvalidUrl(url.to_string()))?;
    let width = width.unwrap_or(DEFAULT_VIDEO_WIDTH);
    let height = height.unwrap_or(DEFAULT_VIDEO_HEIGHT);
    if width == 0 || height == 0 {
        return Err(Rejection::invalid_argument("video dimensions must be positive"));
    }

    let video = Node::new(NodeKind::EmbeddedVideo)
        .with_attr("src", src)
        .with_attr("width", width.to_string())
        .with_attr("height", height.to_string());
    insert_block(state, video)
}

pub(super) fn insert_table(
    state: &EditorState,
    rows: usize,
    cols: usize,
    with_header_row: bool,
) -> CommandResult {
    let valid = 1..=MAX_TABLE_DIMENSION;
    if !valid.contains(&rows) || !valid.contains(&cols) {
        return Err(Rejection::invalid_argument(format!(
            "table must be between 1x1 and {MAX_TABLE_DIMENSION}x{MAX_TABLE_DIMENSION}, got {rows}x{cols}"
        )));
    }

    let table_rows = (0..rows)
        .map(|r| {
            let kind = if with_header_row && r == 0 {
                NodeKind::TableHeaderCell
            } else {
                NodeKind::TableCell
            };
            Node::element(
                NodeKind::TableRow,
                (0..cols).map(|_| Node::empty_cell(kind)).collect(),
            )
        })
        .collect();
    insert_block(state, Node::element(NodeKind::Table, table_rows))
}
