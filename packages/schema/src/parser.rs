//! # HTML Parser
//!
//! Turns an HTML fragment into a normalized [`Document`]. Parsing never
//! fails: unknown elements are unwrapped so their text lands in the nearest
//! allowed ancestor, unsupported subtrees are dropped, and whatever was lost
//! along the way is listed in a [`ParseReport`].
//!
//! Parsing runs in two passes. The token stream is first assembled into a
//! loose element tree (implied end tags, void elements, dropped subtrees),
//! then that tree is converted into schema nodes.

use crate::document::Document;
use crate::node::{Mark, MarkSet, Node, NodeKind};
use crate::spec::{Schema, DEFAULT_HIGHLIGHT_COLOR, EMBED_VIDEO_ATTR};
use crate::tokenizer::{tokenize, Attribute, HtmlToken};
use serde::Serialize;
use tracing::debug;

/// What the parser had to throw away or repair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    /// Tag names that were dropped or unwrapped, in first-seen order
    pub dropped: Vec<String>,
    /// Whether structure was repaired (implied tags, stray content, normalization)
    pub repaired: bool,
}

impl ParseReport {
    /// True when the input mapped onto the schema without loss
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty() && !self.repaired
    }

    fn drop_tag(&mut self, name: &str) {
        if !self.dropped.iter().any(|d| d == name) {
            self.dropped.push(name.to_string());
        }
    }
}

/// Parse an HTML fragment into a document
pub fn parse(html: &str) -> Document {
    parse_with_report(html).0
}

/// Parse an HTML fragment, also reporting any degradation
pub fn parse_with_report(html: &str) -> (Document, ParseReport) {
    let mut report = ParseReport::default();
    let dom = build_dom(tokenize(html), &mut report);

    let mut converter = Converter {
        report: &mut report,
    };
    let blocks = converter.blocks(&dom.children, Context::default());

    let doc = Document::new(blocks.clone());
    if doc.blocks() != blocks.as_slice() {
        report.repaired = true;
    }

    if !report.is_clean() {
        debug!(dropped = ?report.dropped, repaired = report.repaired, "parsed degraded html");
    }

    (doc, report)
}

// -- Element tree ------------------------------------------------------------

/// Elements whose whole subtree is discarded
const DROPPED_SUBTREES: &[&str] = &["script", "style", "head", "title", "template", "noscript"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

#[derive(Debug, Clone)]
enum DomNode {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attrs: Vec<Attribute>,
    children: Vec<DomNode>,
}

impl Element {
    fn new(name: impl Into<String>, attrs: Vec<Attribute>) -> Self {
        Self {
            name: name.into(),
            attrs,
            children: Vec::new(),
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|a| a.name == name)
    }

    fn find_descendant(&self, name: &str) -> Option<&Element> {
        self.children.iter().find_map(|child| match child {
            DomNode::Element(el) if el.name == name => Some(el),
            DomNode::Element(el) => el.find_descendant(name),
            DomNode::Text(_) => None,
        })
    }
}

/// Opening `tag` implicitly closes the nearest open element named in the
/// first list, unless one of the boundary elements is reached first.
fn implied_close(tag: &str) -> Option<(&'static [&'static str], &'static [&'static str])> {
    const BLOCK_BOUNDARY: &[&str] = &["li", "td", "th", "blockquote", "div", "table", "ul", "ol"];
    match tag {
        "li" => Some((&["li"], &["ul", "ol", "table"])),
        "td" | "th" => Some((&["td", "th"], &["tr", "table"])),
        "tr" => Some((&["tr"], &["table", "thead", "tbody", "tfoot"])),
        "thead" | "tbody" | "tfoot" => Some((&["thead", "tbody", "tfoot"], &["table"])),
        "p" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol" | "blockquote" | "table" => {
            Some((&["p"], BLOCK_BOUNDARY))
        }
        _ => None,
    }
}

fn build_dom(tokens: Vec<HtmlToken>, report: &mut ParseReport) -> Element {
    let mut stack = vec![Element::new("#root", Vec::new())];
    let mut skipping: Option<(String, usize)> = None;

    for token in tokens {
        if let Some((skip_name, depth)) = &mut skipping {
            match &token {
                HtmlToken::StartTag {
                    name,
                    self_closing: false,
                    ..
                } if name == skip_name => *depth += 1,
                HtmlToken::EndTag { name } if name == skip_name => *depth -= 1,
                _ => {}
            }
            if *depth == 0 {
                skipping = None;
            }
            continue;
        }

        match token {
            HtmlToken::Text(text) => append(&mut stack, DomNode::Text(text)),
            HtmlToken::StartTag {
                name,
                attrs,
                self_closing,
            } => {
                if DROPPED_SUBTREES.contains(&name.as_str()) {
                    report.drop_tag(&name);
                    if !self_closing {
                        skipping = Some((name, 1));
                    }
                    continue;
                }

                if let Some((targets, boundaries)) = implied_close(&name) {
                    if let Some(index) = find_open(&stack, targets, boundaries) {
                        close_to(&mut stack, index);
                        report.repaired = true;
                    }
                }

                let element = Element::new(name, attrs);
                if self_closing || VOID_ELEMENTS.contains(&element.name.as_str()) {
                    append(&mut stack, DomNode::Element(element));
                } else {
                    stack.push(element);
                }
            }
            HtmlToken::EndTag { name } => {
                match stack.iter().skip(1).rposition(|el| el.name == name) {
                    Some(index) => close_to(&mut stack, index + 1),
                    None => report.repaired = true,
                }
            }
        }
    }

    if stack.len() > 1 {
        report.repaired = true;
        close_to(&mut stack, 1);
    }
    stack.pop().unwrap_or_else(|| Element::new("#root", Vec::new()))
}

fn append(stack: &mut [Element], node: DomNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Pop every element at or above `index` into its parent
fn close_to(stack: &mut Vec<Element>, index: usize) {
    while stack.len() > index.max(1) {
        if let Some(element) = stack.pop() {
            append(stack, DomNode::Element(element));
        }
    }
}

fn find_open(stack: &[Element], targets: &[&str], boundaries: &[&str]) -> Option<usize> {
    for (index, element) in stack.iter().enumerate().skip(1).rev() {
        if targets.contains(&element.name.as_str()) {
            return Some(index);
        }
        if boundaries.contains(&element.name.as_str()) {
            return None;
        }
    }
    None
}

// -- Conversion --------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
struct Context {
    in_table: bool,
}

/// Collects the blocks of one block container. Inline content is buffered
/// and flushed into the open textblock, or an implicit paragraph when none
/// is open.
#[derive(Default)]
struct BlockSink {
    blocks: Vec<Node>,
    inline: Vec<Node>,
    frame: Option<TextblockFrame>,
}

struct TextblockFrame {
    template: Node,
    /// Whether anything has been emitted for this textblock yet
    emitted: bool,
}

impl BlockSink {
    fn push_text(&mut self, raw: &str, marks: &MarkSet) {
        if raw.is_empty() {
            return;
        }
        let text: String = raw
            .chars()
            .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
            .collect();
        self.inline.push(Node::text(text, marks.clone()));
    }

    fn push_inline(&mut self, node: Node) {
        self.inline.push(node);
    }

    fn push_block(&mut self, node: Node) {
        self.flush_inline();
        self.blocks.push(node);
        self.mark_emitted();
    }

    fn mark_emitted(&mut self) {
        if let Some(frame) = &mut self.frame {
            frame.emitted = true;
        }
    }

    /// Emit buffered inline content; returns whether an implicit paragraph
    /// had to be created
    fn flush_inline(&mut self) -> bool {
        if self.inline.is_empty() {
            return false;
        }
        let content = std::mem::take(&mut self.inline);
        let blank = content.iter().all(is_blank_text);

        match &mut self.frame {
            Some(frame) => {
                if blank && frame.emitted {
                    return false;
                }
                let mut block = frame.template.clone();
                block.content = content;
                self.blocks.push(block);
                frame.emitted = true;
                false
            }
            None if blank => false,
            None => {
                self.blocks.push(Node::paragraph(content));
                true
            }
        }
    }

    fn open_textblock(&mut self, template: Node) -> (Option<TextblockFrame>, bool) {
        let wrapped = self.flush_inline();
        let previous = self.frame.replace(TextblockFrame {
            template,
            emitted: false,
        });
        (previous, wrapped)
    }

    fn close_textblock(&mut self, previous: Option<TextblockFrame>) {
        self.flush_inline();
        if let Some(frame) = self.frame.take() {
            if !frame.emitted {
                self.blocks.push(frame.template);
            }
        }
        self.frame = previous;
        self.mark_emitted();
    }

    fn finish(mut self) -> (Vec<Node>, bool) {
        let wrapped = self.flush_inline();
        (self.blocks, wrapped)
    }
}

fn is_blank_text(node: &Node) -> bool {
    node.is_text() && node.text.chars().all(|c| c.is_ascii_whitespace())
}

fn is_blank(node: &DomNode) -> bool {
    matches!(node, DomNode::Text(text) if text.chars().all(|c| c.is_ascii_whitespace()))
}

struct Converter<'a> {
    report: &'a mut ParseReport,
}

impl Converter<'_> {
    /// Convert the children of a block container
    fn blocks<'n>(
        &mut self,
        children: impl IntoIterator<Item = &'n DomNode>,
        ctx: Context,
    ) -> Vec<Node> {
        let mut sink = BlockSink::default();
        let marks = MarkSet::new();
        for child in children {
            self.node(child, &marks, ctx, &mut sink);
        }
        let (blocks, wrapped) = sink.finish();
        self.report.repaired |= wrapped;
        blocks
    }

    fn node(&mut self, node: &DomNode, marks: &MarkSet, ctx: Context, sink: &mut BlockSink) {
        match node {
            DomNode::Text(text) => sink.push_text(text, marks),
            DomNode::Element(el) => self.element(el, marks, ctx, sink),
        }
    }

    fn children(&mut self, el: &Element, marks: &MarkSet, ctx: Context, sink: &mut BlockSink) {
        for child in &el.children {
            self.node(child, marks, ctx, sink);
        }
    }

    fn element(&mut self, el: &Element, marks: &MarkSet, ctx: Context, sink: &mut BlockSink) {
        match el.name.as_str() {
            "p" => self.textblock(Node::paragraph(Vec::new()), el, marks, ctx, sink),
            "h1" | "h2" | "h3" | "h4" => {
                let level = el.name.as_bytes()[1] - b'0';
                self.textblock(Node::heading(level, Vec::new()), el, marks, ctx, sink)
            }

            "strong" | "b" => self.children(el, &marks.with(Mark::Bold), ctx, sink),
            "em" | "i" => self.children(el, &marks.with(Mark::Italic), ctx, sink),
            "u" => self.children(el, &marks.with(Mark::Underline), ctx, sink),
            "a" => match el.attr("href").filter(|href| !href.trim().is_empty()) {
                Some(href) => self.children(el, &marks.with(Mark::link(href.trim())), ctx, sink),
                None => self.children(el, marks, ctx, sink),
            },
            "mark" => {
                let color = highlight_color(el);
                self.children(el, &marks.with(Mark::highlight(color)), ctx, sink)
            }
            "br" => sink.push_inline(Node::hard_break()),

            "blockquote" => {
                let content = self.blocks(&el.children, ctx);
                sink.push_block(Node::element(NodeKind::Blockquote, content));
            }
            "ul" => {
                let list = self.list(el, NodeKind::BulletList, ctx);
                sink.push_block(list);
            }
            "ol" => {
                let mut list = self.list(el, NodeKind::OrderedList, ctx);
                let start = el
                    .attr("start")
                    .and_then(|s| s.trim().parse::<u32>().ok())
                    .filter(|&n| n != 1);
                if let Some(start) = start {
                    list.attrs.insert("start".to_string(), start.to_string());
                }
                sink.push_block(list);
            }
            "table" if ctx.in_table => {
                // nested tables are flattened into the enclosing cell
                self.report.drop_tag("table");
                self.children(el, marks, ctx, sink);
            }
            "table" => {
                let rows = self.table_rows(el);
                sink.push_block(Node::element(NodeKind::Table, rows));
            }
            "img" => match media_node(NodeKind::Image, el) {
                Some(image) => sink.push_block(image),
                None => self.report.drop_tag("img"),
            },
            "iframe" => match media_node(NodeKind::EmbeddedVideo, el) {
                Some(video) => sink.push_block(video),
                None => self.report.drop_tag("iframe"),
            },
            "div" if el.has_attr(EMBED_VIDEO_ATTR) => {
                match el
                    .find_descendant("iframe")
                    .and_then(|iframe| media_node(NodeKind::EmbeddedVideo, iframe))
                {
                    Some(video) => sink.push_block(video),
                    None => self.report.drop_tag("iframe"),
                }
            }

            "html" | "body" => self.children(el, marks, ctx, sink),
            "li" | "tr" | "td" | "th" | "thead" | "tbody" | "tfoot" => {
                // structural tags outside their container
                self.report.repaired = true;
                self.children(el, marks, ctx, sink);
            }
            name => {
                self.report.drop_tag(name);
                self.children(el, marks, ctx, sink);
            }
        }
    }

    fn textblock(
        &mut self,
        template: Node,
        el: &Element,
        marks: &MarkSet,
        ctx: Context,
        sink: &mut BlockSink,
    ) {
        let (previous, wrapped) = sink.open_textblock(template);
        self.report.repaired |= wrapped;
        self.children(el, marks, ctx, sink);
        sink.close_textblock(previous);
    }

    fn list(&mut self, el: &Element, kind: NodeKind, ctx: Context) -> Node {
        let mut items = Vec::new();
        let mut stray: Vec<&DomNode> = Vec::new();

        for child in &el.children {
            match child {
                DomNode::Element(item) if item.name == "li" => {
                    if !stray.is_empty() {
                        items.push(self.stray_item(&mut stray, ctx));
                    }
                    let content = self.blocks(&item.children, ctx);
                    items.push(Node::element(NodeKind::ListItem, content));
                }
                child if is_blank(child) => {}
                child => stray.push(child),
            }
        }
        if !stray.is_empty() {
            items.push(self.stray_item(&mut stray, ctx));
        }

        Node::element(kind, items)
    }

    /// Content found directly inside a list becomes its own list item
    fn stray_item(&mut self, stray: &mut Vec<&DomNode>, ctx: Context) -> Node {
        self.report.repaired = true;
        let content = self.blocks(stray.drain(..), ctx);
        Node::element(NodeKind::ListItem, content)
    }

    fn table_rows(&mut self, table: &Element) -> Vec<Node> {
        let mut rows = Vec::new();
        // cells found directly inside the table or a section share one row
        let mut loose: Vec<&DomNode> = Vec::new();

        for child in &table.children {
            match child {
                DomNode::Element(section)
                    if matches!(section.name.as_str(), "thead" | "tbody" | "tfoot") =>
                {
                    for grandchild in &section.children {
                        self.table_child(grandchild, &mut rows, &mut loose);
                    }
                }
                DomNode::Element(other) if other.name == "caption" || other.name == "colgroup" => {
                    self.report.drop_tag(&other.name);
                }
                child => self.table_child(child, &mut rows, &mut loose),
            }
        }
        if !loose.is_empty() {
            self.report.repaired = true;
            rows.push(self.table_row(loose.drain(..)));
        }
        rows
    }

    fn table_child<'n>(
        &mut self,
        child: &'n DomNode,
        rows: &mut Vec<Node>,
        loose: &mut Vec<&'n DomNode>,
    ) {
        match child {
            DomNode::Element(row) if row.name == "tr" => {
                if !loose.is_empty() {
                    self.report.repaired = true;
                    rows.push(self.table_row(loose.drain(..)));
                }
                rows.push(self.table_row(&row.children));
            }
            DomNode::Element(cell) if cell.name == "td" || cell.name == "th" => loose.push(child),
            other if is_blank(other) => {}
            _ => self.report.repaired = true,
        }
    }

    fn table_row<'n>(&mut self, children: impl IntoIterator<Item = &'n DomNode>) -> Node {
        let ctx = Context { in_table: true };
        let mut cells = Vec::new();
        for child in children {
            match child {
                DomNode::Element(cell) if cell.name == "td" || cell.name == "th" => {
                    let kind = if cell.name == "th" {
                        NodeKind::TableHeaderCell
                    } else {
                        NodeKind::TableCell
                    };
                    let content = self.blocks(&cell.children, ctx);
                    cells.push(Node::element(kind, content));
                }
                other if is_blank(other) => {}
                _ => self.report.repaired = true,
            }
        }
        Node::element(NodeKind::TableRow, cells)
    }
}

/// Build an image or video node from an element, mapping HTML attributes
/// through the manifest. `None` when the element has no usable `src`.
fn media_node(kind: NodeKind, el: &Element) -> Option<Node> {
    let src = el.attr("src").map(str::trim).filter(|s| !s.is_empty())?;
    let mut node = Node::new(kind).with_attr("src", src);
    for spec in Schema::manifest().node(kind).attrs {
        if spec.name == "src" {
            continue;
        }
        if let Some(value) = el.attr(spec.html) {
            node.attrs.insert(spec.name.to_string(), value.to_string());
        }
    }
    Some(node)
}

fn highlight_color(el: &Element) -> String {
    el.attr("data-color")
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .or_else(|| el.attr("style").and_then(style_background))
        .unwrap_or_else(|| DEFAULT_HIGHLIGHT_COLOR.to_string())
}

/// Extract `background-color` (or `background`) from an inline style
fn style_background(style: &str) -> Option<String> {
    style.split(';').find_map(|decl| {
        let (property, value) = decl.split_once(':')?;
        let property = property.trim().to_ascii_lowercase();
        let value = value.trim();
        ((property == "background-color" || property == "background") && !value.is_empty())
            .then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MarkType;

    #[test]
    fn test_parse_paragraph_with_marks() {
        let doc = parse("<p>a <strong>b<em>c</em></strong></p>");
        let paragraph = &doc.blocks()[0];

        assert_eq!(paragraph.content.len(), 3);
        assert_eq!(paragraph.content[0].text, "a ");
        assert!(paragraph.content[1].marks.contains_type(MarkType::Bold));
        assert_eq!(
            paragraph.content[2].marks.as_slice(),
            &[Mark::Bold, Mark::Italic]
        );
    }

    #[test]
    fn test_unknown_tags_are_unwrapped() {
        let (doc, report) = parse_with_report("<p>a<span>b</span><font>c</font></p>");

        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(doc.blocks()[0].text_content(), "abc");
        assert_eq!(report.dropped, vec!["span", "font"]);
    }

    #[test]
    fn test_small_headings_become_paragraphs() {
        let (doc, report) = parse_with_report("<h5>title</h5>");
        assert_eq!(doc.blocks()[0].kind, NodeKind::Paragraph);
        assert_eq!(doc.blocks()[0].text_content(), "title");
        assert_eq!(report.dropped, vec!["h5"]);
    }

    #[test]
    fn test_script_is_dropped_with_content() {
        let (doc, report) = parse_with_report("<p>x</p><script>alert('<p>')</script>");
        assert_eq!(doc.plain_text("\n"), "x");
        assert_eq!(report.dropped, vec!["script"]);
    }

    #[test]
    fn test_loose_text_is_wrapped() {
        let (doc, report) = parse_with_report("hello <b>world</b>");
        assert_eq!(doc.blocks()[0].kind, NodeKind::Paragraph);
        assert_eq!(doc.blocks()[0].text_content(), "hello world");
        assert!(report.repaired);
    }

    #[test]
    fn test_image_splits_paragraph() {
        let doc = parse(r#"<p>a<img src="x.png" alt="x" class="wide">b</p>"#);
        let kinds: Vec<_> = doc.blocks().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![NodeKind::Paragraph, NodeKind::Image, NodeKind::Paragraph]
        );
        assert_eq!(doc.blocks()[1].attr("cssClass"), Some("wide"));
    }

    #[test]
    fn test_image_without_src_dropped() {
        let (doc, report) = parse_with_report("<img alt=\"nothing\"><p>x</p>");
        assert_eq!(doc.blocks().len(), 1);
        assert_eq!(report.dropped, vec!["img"]);
    }

    #[test]
    fn test_mark_defaults_color() {
        let doc = parse("<p><mark>x</mark><mark style=\"background-color: red\">y</mark></p>");
        let content = &doc.blocks()[0].content;
        assert_eq!(
            content[0].marks.get(MarkType::Highlight),
            Some(&Mark::highlight(DEFAULT_HIGHLIGHT_COLOR))
        );
        assert_eq!(
            content[1].marks.get(MarkType::Highlight),
            Some(&Mark::highlight("red"))
        );
    }

    #[test]
    fn test_implied_list_item_close() {
        let doc = parse("<ul><li>one<li>two</ul>");
        let list = &doc.blocks()[0];
        assert_eq!(list.kind, NodeKind::BulletList);
        assert_eq!(list.content.len(), 2);
        assert_eq!(list.content[1].text_content(), "two");
    }

    #[test]
    fn test_table_sections() {
        let doc = parse(
            "<table><thead><tr><th>a</th><th>b</th></tr></thead>\
             <tbody><tr><td>1</td></tr></tbody></table>",
        );
        let table = &doc.blocks()[0];
        assert_eq!(table.content.len(), 2);
        assert_eq!(table.content[0].content[0].kind, NodeKind::TableHeaderCell);
        // ragged row padded
        assert_eq!(table.content[1].content.len(), 2);
    }

    #[test]
    fn test_embedded_video_wrapper() {
        let doc = parse(
            r#"<div data-embed-video=""><iframe src="https://www.youtube.com/embed/abc" width="640" height="480"></iframe></div>"#,
        );
        let video = &doc.blocks()[0];
        assert_eq!(video.kind, NodeKind::EmbeddedVideo);
        assert_eq!(video.attr("width"), Some("640"));
    }

    #[test]
    fn test_ordered_list_start() {
        let doc = parse("<ol start=\"3\"><li><p>x</p></li></ol><ol start=\"1\"><li>y</li></ol>");
        assert_eq!(doc.blocks()[0].attr("start"), Some("3"));
        assert_eq!(doc.blocks()[1].attr("start"), None);
    }

    #[test]
    fn test_empty_input() {
        let doc = parse("");
        assert_eq!(doc, Document::empty());
    }
}
