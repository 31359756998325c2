//! # Position Addressing
//!
//! Flattened integer offsets over the tree. Position `0` is the start of the
//! root's content; entering or leaving a non-leaf node costs one position,
//! every character and every leaf node occupies one.
//!
//! ```text
//! <p> h i </p> <img> <p> </p>
//!  0 1 2 3    4     5   6    7
//! ```
//!
//! Positions are only meaningful for the document revision they were
//! computed from.

use crate::document::Document;
use crate::node::{Node, NodeId, NodeKind};

/// A position resolved against a specific document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPos {
    pub pos: usize,
    /// Child indices from the root to the innermost node containing `pos`
    pub path: Vec<usize>,
    /// Absolute position of the start of that node's content
    pub parent_start: usize,
    /// Index of the child at or after `pos` inside the parent
    pub index: usize,
    /// Character offset when `pos` falls strictly inside a text node
    pub text_offset: usize,
}

impl ResolvedPos {
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Offset of `pos` relative to the start of the parent's content
    pub fn parent_offset(&self) -> usize {
        self.pos - self.parent_start
    }
}

/// Location of a node: its path and the position directly before it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    pub path: Vec<usize>,
    pub start: usize,
}

impl NodeLocation {
    /// First position inside the node
    pub fn content_start(&self) -> usize {
        self.start + 1
    }
}

/// A textblock's placement in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextblockInfo {
    pub location: NodeLocation,
    pub content_size: usize,
}

impl TextblockInfo {
    pub fn content_start(&self) -> usize {
        self.location.content_start()
    }

    pub fn content_end(&self) -> usize {
        self.content_start() + self.content_size
    }

    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.content_start() && pos <= self.content_end()
    }
}

/// Revision-independent description of a caret: which textblock (by order)
/// and how far into it. Survives structural edits that keep textblock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextAnchor {
    pub ordinal: usize,
    pub offset: usize,
}

impl Document {
    /// Resolve a position; `None` when out of range
    pub fn resolve(&self, pos: usize) -> Option<ResolvedPos> {
        if pos > self.content_size() {
            return None;
        }

        let mut node = self.root();
        let mut path = Vec::new();
        let mut start = 0;

        'descend: loop {
            let mut offset = start;
            for (i, child) in node.content.iter().enumerate() {
                if pos == offset {
                    return Some(ResolvedPos {
                        pos,
                        path,
                        parent_start: start,
                        index: i,
                        text_offset: 0,
                    });
                }
                let end = offset + child.node_size();
                if pos < end {
                    if child.is_text() {
                        return Some(ResolvedPos {
                            pos,
                            path,
                            parent_start: start,
                            index: i,
                            text_offset: pos - offset,
                        });
                    }
                    path.push(i);
                    start = offset + 1;
                    node = child;
                    continue 'descend;
                }
                offset = end;
            }

            return Some(ResolvedPos {
                pos,
                path,
                parent_start: start,
                index: node.content.len(),
                text_offset: 0,
            });
        }
    }

    /// The node directly after `pos` (or the text node `pos` falls into)
    pub fn node_at(&self, pos: usize) -> Option<&Node> {
        let resolved = self.resolve(pos)?;
        self.node_at_path(&resolved.path)?.content.get(resolved.index)
    }

    pub fn node_at_path(&self, path: &[usize]) -> Option<&Node> {
        let mut node = self.root();
        for &i in path {
            node = node.content.get(i)?;
        }
        Some(node)
    }

    pub fn node_at_path_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self.root_mut();
        for &i in path {
            node = node.content.get_mut(i)?;
        }
        Some(node)
    }

    /// Position directly before the node at `path`; `0` for the root
    pub fn path_start(&self, path: &[usize]) -> Option<usize> {
        let mut node = self.root();
        let mut pos = 0;
        for (depth, &i) in path.iter().enumerate() {
            if i >= node.content.len() {
                return None;
            }
            pos += node.content[..i].iter().map(Node::node_size).sum::<usize>();
            node = &node.content[i];
            if depth + 1 < path.len() {
                pos += 1;
            }
        }
        Some(pos)
    }

    /// First position inside the node at `path`
    pub fn content_start(&self, path: &[usize]) -> Option<usize> {
        if path.is_empty() {
            return Some(0);
        }
        self.path_start(path).map(|p| p + 1)
    }

    /// Innermost ancestor of `pos` (the containing node included) matching `pred`
    pub fn find_ancestor(
        &self,
        pos: usize,
        pred: impl Fn(&Node) -> bool,
    ) -> Option<NodeLocation> {
        let resolved = self.resolve(pos)?;
        for depth in (1..=resolved.depth()).rev() {
            let path = &resolved.path[..depth];
            let node = self.node_at_path(path)?;
            if pred(node) {
                return Some(NodeLocation {
                    path: path.to_vec(),
                    start: self.path_start(path)?,
                });
            }
        }
        None
    }

    /// All textblocks in document order
    pub fn textblocks(&self) -> Vec<TextblockInfo> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        collect_textblocks(self.root(), 0, &mut path, &mut out);
        out
    }

    /// The textblock whose content contains `pos`
    pub fn textblock_at(&self, pos: usize) -> Option<TextblockInfo> {
        let resolved = self.resolve(pos)?;
        let parent = self.node_at_path(&resolved.path)?;
        if !parent.is_textblock() {
            return None;
        }
        Some(TextblockInfo {
            location: NodeLocation {
                path: resolved.path.clone(),
                start: resolved.parent_start - 1,
            },
            content_size: parent.content_size(),
        })
    }

    /// Anchor for a caret inside a textblock
    pub fn text_anchor(&self, pos: usize) -> Option<TextAnchor> {
        self.textblocks()
            .iter()
            .enumerate()
            .find(|(_, tb)| tb.contains(pos))
            .map(|(ordinal, tb)| TextAnchor {
                ordinal,
                offset: pos - tb.content_start(),
            })
    }

    /// Map an anchor back to a position, clamping to what exists
    pub fn pos_from_anchor(&self, anchor: TextAnchor) -> Option<usize> {
        let blocks = self.textblocks();
        let block = blocks.get(anchor.ordinal).or_else(|| blocks.last())?;
        Some(block.content_start() + anchor.offset.min(block.content_size))
    }

    /// Closest caret position inside a textblock, searching forward first
    pub fn nearest_text_pos(&self, pos: usize) -> usize {
        let blocks = self.textblocks();
        if let Some(block) = blocks.iter().find(|b| b.contains(pos)) {
            return pos.clamp(block.content_start(), block.content_end());
        }
        if let Some(block) = blocks.iter().find(|b| b.location.start >= pos) {
            return block.content_start();
        }
        match blocks.last() {
            Some(block) => block.content_end(),
            None => pos.min(self.content_size()),
        }
    }

    /// Text between two positions; textblock boundaries become `separator`
    pub fn text_between(&self, from: usize, to: usize, separator: &str) -> String {
        let mut parts = Vec::new();
        for block in self.textblocks() {
            if block.content_end() < from || block.content_start() > to {
                continue;
            }
            let Some(node) = self.node_at_path(&block.location.path) else {
                continue;
            };
            let lo = from.max(block.content_start()) - block.content_start();
            let hi = to.min(block.content_end()) - block.content_start();
            parts.push(inline_slice_text(&node.content, lo, hi));
        }
        parts.join(separator)
    }

    /// Give every media node that has no identity yet a fresh one, drawn
    /// from `next`. Returns how many were assigned.
    pub fn assign_media_ids(&mut self, next: &mut u64) -> usize {
        assign_ids(self.root_mut(), next)
    }

    /// Position of the node carrying `id`. `None` when no node has it, or
    /// when more than one does.
    pub fn position_of(&self, id: NodeId) -> Option<usize> {
        let mut found = Vec::new();
        collect_id_positions(self.root(), 0, id, &mut found);
        match found.as_slice() {
            [pos] => Some(*pos),
            _ => None,
        }
    }
}

fn assign_ids(node: &mut Node, next: &mut u64) -> usize {
    let mut assigned = 0;
    for child in &mut node.content {
        if child.kind.is_media() {
            if child.id.is_none() {
                child.id = Some(NodeId(*next));
                *next += 1;
                assigned += 1;
            }
        } else if !child.is_text() {
            assigned += assign_ids(child, next);
        }
    }
    assigned
}

fn collect_id_positions(node: &Node, content_start: usize, id: NodeId, out: &mut Vec<usize>) {
    let mut offset = content_start;
    for child in &node.content {
        if child.id == Some(id) {
            out.push(offset);
        }
        if !child.is_leaf() && !child.is_text() {
            collect_id_positions(child, offset + 1, id, out);
        }
        offset += child.node_size();
    }
}

fn collect_textblocks(
    node: &Node,
    content_start: usize,
    path: &mut Vec<usize>,
    out: &mut Vec<TextblockInfo>,
) {
    let mut offset = content_start;
    for (i, child) in node.content.iter().enumerate() {
        path.push(i);
        if child.is_textblock() {
            out.push(TextblockInfo {
                location: NodeLocation {
                    path: path.clone(),
                    start: offset,
                },
                content_size: child.content_size(),
            });
        } else if !child.is_leaf() && !child.is_text() {
            collect_textblocks(child, offset + 1, path, out);
        }
        path.pop();
        offset += child.node_size();
    }
}

fn inline_slice_text(content: &[Node], from: usize, to: usize) -> String {
    let mut out = String::new();
    let mut offset = 0;
    for node in content {
        let size = node.node_size();
        let (lo, hi) = (from.max(offset), to.min(offset + size));
        if lo < hi {
            match node.kind {
                NodeKind::Text => out.extend(node.text.chars().skip(lo - offset).take(hi - lo)),
                NodeKind::HardBreak => out.push('\n'),
                _ => {}
            }
        }
        offset += size;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        // <p>hi</p><img><p></p>
        Document::new(vec![
            Node::paragraph(vec![Node::plain_text("hi")]),
            Node::image("a.png"),
            Node::paragraph(vec![]),
        ])
    }

    #[test]
    fn test_resolve_inside_text() {
        let doc = sample();
        let resolved = doc.resolve(2).unwrap();
        assert_eq!(resolved.path, vec![0]);
        assert_eq!(resolved.parent_start, 1);
        assert_eq!(resolved.index, 0);
        assert_eq!(resolved.text_offset, 1);
    }

    #[test]
    fn test_resolve_between_blocks() {
        let doc = sample();
        let resolved = doc.resolve(4).unwrap();
        assert!(resolved.path.is_empty());
        assert_eq!(resolved.index, 1);
        assert_eq!(doc.node_at(4).unwrap().kind, NodeKind::Image);
    }

    #[test]
    fn test_resolve_out_of_range() {
        let doc = sample();
        assert_eq!(doc.content_size(), 7);
        assert!(doc.resolve(7).is_some());
        assert!(doc.resolve(8).is_none());
    }

    #[test]
    fn test_path_start_matches_resolution() {
        let doc = sample();
        assert_eq!(doc.path_start(&[1]), Some(4));
        assert_eq!(doc.path_start(&[2]), Some(5));
        assert_eq!(doc.content_start(&[2]), Some(6));
    }

    #[test]
    fn test_text_anchor_round_trip() {
        let doc = sample();
        let anchor = doc.text_anchor(6).unwrap();
        assert_eq!(anchor, TextAnchor { ordinal: 1, offset: 0 });
        assert_eq!(doc.pos_from_anchor(anchor), Some(6));
    }

    #[test]
    fn test_nearest_text_pos_skips_leaf() {
        let doc = sample();
        assert_eq!(doc.nearest_text_pos(4), 6);
        assert_eq!(doc.nearest_text_pos(2), 2);
    }

    #[test]
    fn test_text_between_spans_blocks() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::plain_text("abc")]),
            Node::paragraph(vec![Node::plain_text("def")]),
        ]);
        assert_eq!(doc.text_between(2, 8, "\n"), "bc\nde");
    }

    #[test]
    fn test_media_ids_follow_nodes() {
        let mut doc = sample();
        let mut next = 1;
        assert_eq!(doc.assign_media_ids(&mut next), 1);
        assert_eq!(doc.assign_media_ids(&mut next), 0);
        let id = doc.node_at(4).and_then(|node| node.id).unwrap();
        assert_eq!(doc.position_of(id), Some(4));

        // Identity is invisible to equality
        assert_eq!(doc, sample());

        let mut root = doc.clone().into_root();
        root.content.insert(0, Node::paragraph(vec![Node::plain_text("new")]));
        let moved = Document::new(root.content);
        assert_eq!(moved.position_of(id), Some(9));
    }

    #[test]
    fn test_duplicated_id_has_no_position() {
        let mut doc = sample();
        let mut next = 1;
        doc.assign_media_ids(&mut next);
        let image = doc.node_at(4).cloned().unwrap();
        let id = image.id.unwrap();

        let mut root = doc.into_root();
        root.content.push(image);
        let doubled = Document::new(root.content);
        assert_eq!(doubled.position_of(id), None);
        assert_eq!(doubled.position_of(NodeId(99)), None);
    }
}
