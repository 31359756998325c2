//! # Nodes and Marks
//!
//! The typed building blocks of a document tree. A [`Node`] is a tagged
//! element with ordered attributes, ordered children and, for text nodes,
//! a string plus a [`MarkSet`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Type-specific attributes. Ordered so that serialization is canonical.
pub type Attrs = BTreeMap<String, String>;

/// Every node type the schema knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    Table,
    TableRow,
    TableCell,
    TableHeaderCell,
    Image,
    EmbeddedVideo,
    HardBreak,
    Text,
}

impl NodeKind {
    /// Schema name (camelCase, matches the serde representation)
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::BulletList => "bulletList",
            NodeKind::OrderedList => "orderedList",
            NodeKind::ListItem => "listItem",
            NodeKind::Blockquote => "blockquote",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableCell => "tableCell",
            NodeKind::TableHeaderCell => "tableHeaderCell",
            NodeKind::Image => "image",
            NodeKind::EmbeddedVideo => "embeddedVideo",
            NodeKind::HardBreak => "hardBreak",
            NodeKind::Text => "text",
        }
    }

    /// Blocks whose content is inline (text and hard breaks)
    pub fn is_textblock(self) -> bool {
        matches!(self, NodeKind::Paragraph | NodeKind::Heading)
    }

    /// Atomic nodes occupying exactly one position
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            NodeKind::Image | NodeKind::EmbeddedVideo | NodeKind::HardBreak
        )
    }

    /// Images and embedded videos
    pub fn is_media(self) -> bool {
        matches!(self, NodeKind::Image | NodeKind::EmbeddedVideo)
    }

    pub fn is_inline(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::HardBreak)
    }

    /// Nodes whose content is a sequence of blocks
    pub fn is_block_container(self) -> bool {
        matches!(
            self,
            NodeKind::Doc
                | NodeKind::Blockquote
                | NodeKind::ListItem
                | NodeKind::TableCell
                | NodeKind::TableHeaderCell
        )
    }

    /// Members of the `block` content group
    pub fn is_block(self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading
                | NodeKind::BulletList
                | NodeKind::OrderedList
                | NodeKind::Blockquote
                | NodeKind::Table
                | NodeKind::Image
                | NodeKind::EmbeddedVideo
        )
    }

    pub fn is_list(self) -> bool {
        matches!(self, NodeKind::BulletList | NodeKind::OrderedList)
    }

    pub fn is_table_cell(self) -> bool {
        matches!(self, NodeKind::TableCell | NodeKind::TableHeaderCell)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mark types, declared in nesting rank order (outermost first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkType {
    Link,
    Bold,
    Italic,
    Underline,
    Highlight,
}

impl MarkType {
    pub fn name(self) -> &'static str {
        match self {
            MarkType::Link => "link",
            MarkType::Bold => "bold",
            MarkType::Italic => "italic",
            MarkType::Underline => "underline",
            MarkType::Highlight => "highlight",
        }
    }

    /// Nesting rank; lower ranks wrap higher ones in serialized HTML
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A non-structural decoration on a text run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mark {
    Link { href: String },
    Bold,
    Italic,
    Underline,
    Highlight { color: String },
}

impl Mark {
    pub fn mark_type(&self) -> MarkType {
        match self {
            Mark::Link { .. } => MarkType::Link,
            Mark::Bold => MarkType::Bold,
            Mark::Italic => MarkType::Italic,
            Mark::Underline => MarkType::Underline,
            Mark::Highlight { .. } => MarkType::Highlight,
        }
    }

    pub fn link(href: impl Into<String>) -> Self {
        Mark::Link { href: href.into() }
    }

    pub fn highlight(color: impl Into<String>) -> Self {
        Mark::Highlight {
            color: color.into(),
        }
    }
}

/// Ordered set of marks: sorted by rank, at most one mark per type
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Mark>", into = "Vec<Mark>")]
pub struct MarkSet(Vec<Mark>);

impl MarkSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_marks(marks: impl IntoIterator<Item = Mark>) -> Self {
        let mut set = Self::new();
        for mark in marks {
            set.add(mark);
        }
        set
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Mark> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Mark] {
        &self.0
    }

    pub fn get(&self, mark_type: MarkType) -> Option<&Mark> {
        self.0.iter().find(|m| m.mark_type() == mark_type)
    }

    pub fn contains_type(&self, mark_type: MarkType) -> bool {
        self.get(mark_type).is_some()
    }

    /// Insert a mark, replacing any existing mark of the same type
    pub fn add(&mut self, mark: Mark) {
        let mark_type = mark.mark_type();
        match self.0.iter().position(|m| m.mark_type() >= mark_type) {
            Some(i) if self.0[i].mark_type() == mark_type => self.0[i] = mark,
            Some(i) => self.0.insert(i, mark),
            None => self.0.push(mark),
        }
    }

    /// Remove the mark of the given type; returns whether one was present
    pub fn remove(&mut self, mark_type: MarkType) -> bool {
        let before = self.0.len();
        self.0.retain(|m| m.mark_type() != mark_type);
        self.0.len() != before
    }

    pub fn with(&self, mark: Mark) -> Self {
        let mut set = self.clone();
        set.add(mark);
        set
    }

    pub fn without(&self, mark_type: MarkType) -> Self {
        let mut set = self.clone();
        set.remove(mark_type);
        set
    }
}

impl From<Vec<Mark>> for MarkSet {
    fn from(marks: Vec<Mark>) -> Self {
        Self::from_marks(marks)
    }
}

impl From<MarkSet> for Vec<Mark> {
    fn from(set: MarkSet) -> Self {
        set.0
    }
}

impl<'a> IntoIterator for &'a MarkSet {
    type Item = &'a Mark;
    type IntoIter = std::slice::Iter<'a, Mark>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Session-local identity of a media node. Not part of the content: it is
/// never serialized and node equality ignores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// A typed tree element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: Attrs,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,

    /// Character data (text nodes only)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    /// Decorations (text nodes only)
    #[serde(default, skip_serializing_if = "MarkSet::is_empty")]
    pub marks: MarkSet,

    #[serde(skip)]
    pub id: Option<NodeId>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.attrs == other.attrs
            && self.text == other.text
            && self.marks == other.marks
            && self.content == other.content
    }
}

impl Eq for Node {}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
            content: Vec::new(),
            text: String::new(),
            marks: MarkSet::new(),
            id: None,
        }
    }

    pub fn element(kind: NodeKind, content: Vec<Node>) -> Self {
        Self {
            content,
            ..Self::new(kind)
        }
    }

    pub fn text(text: impl Into<String>, marks: MarkSet) -> Self {
        Self {
            text: text.into(),
            marks,
            ..Self::new(NodeKind::Text)
        }
    }

    pub fn plain_text(text: impl Into<String>) -> Self {
        Self::text(text, MarkSet::new())
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::element(NodeKind::Paragraph, content)
    }

    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Self::element(NodeKind::Heading, content).with_attr("level", level.to_string())
    }

    pub fn hard_break() -> Self {
        Self::new(NodeKind::HardBreak)
    }

    pub fn image(src: impl Into<String>) -> Self {
        Self::new(NodeKind::Image).with_attr("src", src)
    }

    /// A table cell holding one empty paragraph
    pub fn empty_cell(kind: NodeKind) -> Self {
        Self::element(kind, vec![Self::paragraph(Vec::new())])
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Heading level, if this is a heading with a valid level attribute
    pub fn heading_level(&self) -> Option<u8> {
        if self.kind != NodeKind::Heading {
            return None;
        }
        self.attr("level").and_then(|l| l.parse().ok())
    }

    pub fn is_text(&self) -> bool {
        self.kind == NodeKind::Text
    }

    pub fn is_leaf(&self) -> bool {
        self.kind.is_leaf()
    }

    pub fn is_textblock(&self) -> bool {
        self.kind.is_textblock()
    }

    /// Number of characters in a text node
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Size of this node in the flattened position space
    pub fn node_size(&self) -> usize {
        if self.is_text() {
            self.char_len()
        } else if self.is_leaf() {
            1
        } else {
            2 + self.content_size()
        }
    }

    /// Size of this node's content (excludes the open/close tokens)
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Concatenated text of all descendant text nodes
    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.text.clone();
        }
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.content {
            if child.is_text() {
                out.push_str(&child.text);
            } else {
                child.collect_text(out);
            }
        }
    }
}

/// Split a string at a character offset
pub fn split_chars(text: &str, offset: usize) -> (&str, &str) {
    match text.char_indices().nth(offset) {
        Some((byte, _)) => text.split_at(byte),
        None => (text, ""),
    }
}
