//! # Document
//!
//! A single `doc` root owning the whole tree. Construction always goes
//! through normalization so that every `Document` value is in canonical form:
//! adjacent text runs with identical marks are merged, empty containers hold
//! an empty paragraph and tables are rectangular.

use crate::error::{SchemaError, SchemaResult};
use crate::node::{Node, NodeKind};
use serde::{Deserialize, Serialize};

/// Block separator used for plain-text extraction
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Root of a structured document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Node", into = "Node")]
pub struct Document {
    root: Node,
}

impl Document {
    /// Build a normalized document from top-level blocks
    pub fn new(blocks: Vec<Node>) -> Self {
        let mut root = Node::element(NodeKind::Doc, blocks);
        normalize_node(&mut root);
        Self { root }
    }

    /// A document holding one empty paragraph
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Wrap an existing root node. The root must be of kind `doc`.
    pub fn from_root(root: Node) -> SchemaResult<Self> {
        if root.kind != NodeKind::Doc {
            return Err(SchemaError::InvalidRoot(root.kind));
        }
        let mut doc = Self { root };
        doc.normalize();
        Ok(doc)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Mutable access to the tree, for command implementations.
    /// Callers are expected to call [`Document::normalize`] afterwards.
    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// Top-level blocks
    pub fn blocks(&self) -> &[Node] {
        &self.root.content
    }

    /// Largest valid position
    pub fn content_size(&self) -> usize {
        self.root.content_size()
    }

    pub fn normalize(&mut self) {
        normalize_node(&mut self.root);
    }

    /// Plain text of the whole document, blocks separated by `separator`
    pub fn plain_text(&self, separator: &str) -> String {
        let mut blocks = Vec::new();
        collect_block_text(&self.root, &mut blocks);
        blocks.join(separator)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Node> for Document {
    type Error = SchemaError;

    fn try_from(root: Node) -> Result<Self, Self::Error> {
        Self::from_root(root)
    }
}

impl From<Document> for Node {
    fn from(doc: Document) -> Self {
        doc.root
    }
}

fn collect_block_text(node: &Node, out: &mut Vec<String>) {
    for child in &node.content {
        if child.is_textblock() {
            out.push(inline_text(&child.content));
        } else if child.kind == NodeKind::Image {
            if let Some(alt) = child.attr("alt").filter(|a| !a.is_empty()) {
                out.push(alt.to_string());
            }
        } else if !child.is_leaf() {
            collect_block_text(child, out);
        }
    }
}

/// Text of inline content; hard breaks become newlines
pub fn inline_text(content: &[Node]) -> String {
    let mut out = String::new();
    for node in content {
        match node.kind {
            NodeKind::Text => out.push_str(&node.text),
            NodeKind::HardBreak => out.push('\n'),
            _ => {}
        }
    }
    out
}

/// Bring a subtree into canonical form
pub(crate) fn normalize_node(node: &mut Node) {
    if node.is_text() || node.is_leaf() {
        return;
    }

    for child in node.content.iter_mut() {
        normalize_node(child);
    }

    match node.kind {
        NodeKind::Paragraph | NodeKind::Heading => {
            node.content.retain(|c| c.kind.is_inline());
            merge_text_runs(&mut node.content);
        }
        NodeKind::BulletList | NodeKind::OrderedList => {
            node.content.retain(|c| c.kind == NodeKind::ListItem);
            if node.kind == NodeKind::OrderedList && node.attr("start") == Some("1") {
                node.attrs.remove("start");
            }
        }
        NodeKind::TableRow => {
            node.content.retain(|c| c.kind.is_table_cell());
        }
        NodeKind::Table => {
            node.content
                .retain(|r| r.kind == NodeKind::TableRow && !r.content.is_empty());
            let width = node.content.iter().map(|r| r.content.len()).max().unwrap_or(0);
            for row in node.content.iter_mut() {
                while row.content.len() < width {
                    row.content.push(Node::empty_cell(NodeKind::TableCell));
                }
            }
        }
        _ => {}
    }

    if node.kind.is_block_container() {
        node.content.retain(|c| {
            c.kind.is_block() && !((c.kind.is_list() || c.kind == NodeKind::Table) && c.content.is_empty())
        });
        if node.content.is_empty() {
            node.content.push(Node::paragraph(Vec::new()));
        }
    }
}

/// Merge adjacent text nodes with identical marks and drop empty ones
fn merge_text_runs(content: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(content.len());
    for node in content.drain(..) {
        if node.is_text() {
            if node.text.is_empty() {
                continue;
            }
            if let Some(last) = merged.last_mut() {
                if last.is_text() && last.marks == node.marks {
                    last.text.push_str(&node.text);
                    continue;
                }
            }
        }
        merged.push(node);
    }
    *content = merged;
}
