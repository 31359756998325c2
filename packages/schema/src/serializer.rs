//! # Canonical HTML Serializer
//!
//! Every document has exactly one HTML form: fixed tag names, attributes in
//! manifest order, no formatting whitespace. Marks nest by rank and a run of
//! text nodes sharing outer marks keeps those marks open, so
//! `<strong>a<em>b</em></strong>` is emitted rather than
//! `<strong>a</strong><strong><em>b</em></strong>`.

use crate::document::Document;
use crate::node::{Mark, Node, NodeKind};
use crate::spec::{Schema, EMBED_VIDEO_ATTR, MAX_HEADING_LEVEL};
use crate::tokenizer::{escape_attr, escape_text};

/// Serializer converts a document tree into canonical HTML
pub struct Serializer {
    output: String,
}

impl Serializer {
    pub fn new() -> Self {
        Self {
            output: String::new(),
        }
    }

    /// Serialize a whole document
    pub fn serialize(&mut self, doc: &Document) -> String {
        self.output.clear();
        for block in doc.blocks() {
            self.serialize_block(block);
        }
        std::mem::take(&mut self.output)
    }

    /// Serialize a single node (and its subtree)
    pub fn serialize_node(&mut self, node: &Node) -> String {
        self.output.clear();
        if node.kind.is_inline() {
            self.serialize_inline(std::slice::from_ref(node));
        } else {
            self.serialize_block(node);
        }
        std::mem::take(&mut self.output)
    }

    fn serialize_block(&mut self, node: &Node) {
        match node.kind {
            NodeKind::Doc => self.serialize_blocks(&node.content),
            NodeKind::Paragraph => {
                self.output.push_str("<p>");
                self.serialize_inline(&node.content);
                self.output.push_str("</p>");
            }
            NodeKind::Heading => {
                let level = node
                    .heading_level()
                    .filter(|l| (1..=MAX_HEADING_LEVEL).contains(l))
                    .unwrap_or(1);
                self.output.push_str(&format!("<h{level}>"));
                self.serialize_inline(&node.content);
                self.output.push_str(&format!("</h{level}>"));
            }
            NodeKind::BulletList => self.wrap("ul", &node.content),
            NodeKind::OrderedList => {
                self.output.push_str("<ol");
                if let Some(start) = node.attr("start") {
                    self.push_attr("start", start);
                }
                self.output.push('>');
                self.serialize_blocks(&node.content);
                self.output.push_str("</ol>");
            }
            NodeKind::ListItem => self.wrap("li", &node.content),
            NodeKind::Blockquote => self.wrap("blockquote", &node.content),
            NodeKind::Table => self.serialize_table(node),
            NodeKind::TableRow => self.wrap("tr", &node.content),
            NodeKind::TableCell => self.wrap("td", &node.content),
            NodeKind::TableHeaderCell => self.wrap("th", &node.content),
            NodeKind::Image => {
                self.output.push_str("<img");
                self.push_node_attrs(node);
                self.output.push('>');
            }
            NodeKind::EmbeddedVideo => {
                self.output.push_str("<div ");
                self.output.push_str(EMBED_VIDEO_ATTR);
                self.output.push_str("=\"\"><iframe");
                self.push_node_attrs(node);
                self.output
                    .push_str(" frameborder=\"0\" allowfullscreen=\"true\"></iframe></div>");
            }
            NodeKind::HardBreak | NodeKind::Text => {
                self.serialize_inline(std::slice::from_ref(node))
            }
        }
    }

    fn serialize_blocks(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.serialize_block(node);
        }
    }

    fn wrap(&mut self, tag: &str, content: &[Node]) {
        self.output.push('<');
        self.output.push_str(tag);
        self.output.push('>');
        self.serialize_blocks(content);
        self.output.push_str("</");
        self.output.push_str(tag);
        self.output.push('>');
    }

    /// A leading row made only of header cells goes into `<thead>`
    fn serialize_table(&mut self, table: &Node) {
        self.output.push_str("<table>");
        let rows = table.content.as_slice();
        let header_rows = match rows.first() {
            Some(row) if is_header_row(row) => 1,
            _ => 0,
        };
        if header_rows > 0 {
            self.output.push_str("<thead>");
            self.serialize_blocks(&rows[..header_rows]);
            self.output.push_str("</thead>");
        }
        if rows.len() > header_rows {
            self.output.push_str("<tbody>");
            self.serialize_blocks(&rows[header_rows..]);
            self.output.push_str("</tbody>");
        }
        self.output.push_str("</table>");
    }

    fn push_node_attrs(&mut self, node: &Node) {
        for spec in Schema::manifest().node(node.kind).attrs {
            if let Some(value) = node.attr(spec.name) {
                self.push_attr(spec.html, value);
            }
        }
    }

    fn push_attr(&mut self, name: &str, value: &str) {
        self.output.push(' ');
        self.output.push_str(name);
        self.output.push_str("=\"");
        escape_attr(value, &mut self.output);
        self.output.push('"');
    }

    fn serialize_inline(&mut self, content: &[Node]) {
        let mut open: Vec<&Mark> = Vec::new();

        for node in content {
            let marks = node.marks.as_slice();
            let shared = open
                .iter()
                .zip(marks)
                .take_while(|(open, mark)| **open == *mark)
                .count();

            while open.len() > shared {
                if let Some(mark) = open.pop() {
                    self.close_mark(mark);
                }
            }
            for mark in &marks[shared..] {
                self.open_mark(mark);
                open.push(mark);
            }

            match node.kind {
                NodeKind::Text => escape_text(&node.text, &mut self.output),
                NodeKind::HardBreak => self.output.push_str("<br>"),
                _ => self.serialize_block(node),
            }
        }

        while let Some(mark) = open.pop() {
            self.close_mark(mark);
        }
    }

    fn open_mark(&mut self, mark: &Mark) {
        match mark {
            Mark::Link { href } => {
                self.output.push_str("<a");
                self.push_attr("href", href);
                self.output.push('>');
            }
            Mark::Bold => self.output.push_str("<strong>"),
            Mark::Italic => self.output.push_str("<em>"),
            Mark::Underline => self.output.push_str("<u>"),
            Mark::Highlight { color } => {
                self.output.push_str("<mark");
                self.push_attr("data-color", color);
                self.push_attr("style", &format!("background-color: {color}"));
                self.output.push('>');
            }
        }
    }

    fn close_mark(&mut self, mark: &Mark) {
        self.output.push_str(match mark {
            Mark::Link { .. } => "</a>",
            Mark::Bold => "</strong>",
            Mark::Italic => "</em>",
            Mark::Underline => "</u>",
            Mark::Highlight { .. } => "</mark>",
        });
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

fn is_header_row(row: &Node) -> bool {
    !row.content.is_empty()
        && row
            .content
            .iter()
            .all(|cell| cell.kind == NodeKind::TableHeaderCell)
}

/// Convenience function to serialize a document
pub fn serialize(doc: &Document) -> String {
    let mut serializer = Serializer::new();
    serializer.serialize(doc)
}
