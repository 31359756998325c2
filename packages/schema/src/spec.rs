//! # Schema Manifest
//!
//! The frozen set of node and mark types, their attribute schemas and the
//! HTML tags they map to. The manifest is static data: nothing registers new
//! types at runtime.

use crate::node::{MarkType, NodeKind};
use serde::Serialize;

/// Highlight color used when incoming HTML carries a bare `<mark>`
pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#fef08a";

/// Heading levels supported by the vocabulary
pub const MAX_HEADING_LEVEL: u8 = 4;

/// Marker attribute on the embedded video wrapper `<div>`
pub const EMBED_VIDEO_ATTR: &str = "data-embed-video";

/// Content group a node belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeGroup {
    Root,
    Block,
    Inline,
    ListItem,
    TableRow,
    TableCell,
}

/// Attribute declaration
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttrSpec {
    pub name: &'static str,
    /// HTML attribute it serializes to
    pub html: &'static str,
    pub required: bool,
}

const fn attr(name: &'static str, html: &'static str, required: bool) -> AttrSpec {
    AttrSpec {
        name,
        html,
        required,
    }
}

/// Node type declaration
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpec {
    pub kind: NodeKind,
    pub group: NodeGroup,
    /// Content expression, in the usual `group+` notation
    pub content: &'static str,
    /// Tags recognized when parsing; the first one is emitted
    pub tags: &'static [&'static str],
    pub attrs: &'static [AttrSpec],
    pub leaf: bool,
}

/// Mark type declaration
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSpec {
    pub mark: MarkType,
    pub tags: &'static [&'static str],
    pub attrs: &'static [AttrSpec],
    pub rank: u8,
}

const IMAGE_ATTRS: &[AttrSpec] = &[
    attr("src", "src", true),
    attr("alt", "alt", false),
    attr("title", "title", false),
    attr("width", "width", false),
    attr("height", "height", false),
    attr("cssClass", "class", false),
];

const VIDEO_ATTRS: &[AttrSpec] = &[
    attr("src", "src", true),
    attr("width", "width", false),
    attr("height", "height", false),
];

const NODE_SPECS: &[NodeSpec] = &[
    NodeSpec {
        kind: NodeKind::Doc,
        group: NodeGroup::Root,
        content: "block+",
        tags: &[],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::Paragraph,
        group: NodeGroup::Block,
        content: "inline*",
        tags: &["p"],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::Heading,
        group: NodeGroup::Block,
        content: "inline*",
        tags: &["h1", "h2", "h3", "h4"],
        attrs: &[attr("level", "", true)],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::BulletList,
        group: NodeGroup::Block,
        content: "listItem+",
        tags: &["ul"],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::OrderedList,
        group: NodeGroup::Block,
        content: "listItem+",
        tags: &["ol"],
        attrs: &[attr("start", "start", false)],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::ListItem,
        group: NodeGroup::ListItem,
        content: "block+",
        tags: &["li"],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::Blockquote,
        group: NodeGroup::Block,
        content: "block+",
        tags: &["blockquote"],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::Table,
        group: NodeGroup::Block,
        content: "tableRow+",
        tags: &["table"],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::TableRow,
        group: NodeGroup::TableRow,
        content: "(tableCell | tableHeaderCell)+",
        tags: &["tr"],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::TableCell,
        group: NodeGroup::TableCell,
        content: "block+",
        tags: &["td"],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::TableHeaderCell,
        group: NodeGroup::TableCell,
        content: "block+",
        tags: &["th"],
        attrs: &[],
        leaf: false,
    },
    NodeSpec {
        kind: NodeKind::Image,
        group: NodeGroup::Block,
        content: "",
        tags: &["img"],
        attrs: IMAGE_ATTRS,
        leaf: true,
    },
    NodeSpec {
        kind: NodeKind::EmbeddedVideo,
        group: NodeGroup::Block,
        content: "",
        tags: &["div", "iframe"],
        attrs: VIDEO_ATTRS,
        leaf: true,
    },
    NodeSpec {
        kind: NodeKind::HardBreak,
        group: NodeGroup::Inline,
        content: "",
        tags: &["br"],
        attrs: &[],
        leaf: true,
    },
    NodeSpec {
        kind: NodeKind::Text,
        group: NodeGroup::Inline,
        content: "",
        tags: &[],
        attrs: &[],
        leaf: true,
    },
];

const MARK_SPECS: &[MarkSpec] = &[
    MarkSpec {
        mark: MarkType::Link,
        tags: &["a"],
        attrs: &[attr("href", "href", true)],
        rank: 0,
    },
    MarkSpec {
        mark: MarkType::Bold,
        tags: &["strong", "b"],
        attrs: &[],
        rank: 1,
    },
    MarkSpec {
        mark: MarkType::Italic,
        tags: &["em", "i"],
        attrs: &[],
        rank: 2,
    },
    MarkSpec {
        mark: MarkType::Underline,
        tags: &["u"],
        attrs: &[],
        rank: 3,
    },
    MarkSpec {
        mark: MarkType::Highlight,
        tags: &["mark"],
        attrs: &[attr("color", "data-color", true)],
        rank: 4,
    },
];

/// The schema registry
#[derive(Debug, Serialize)]
pub struct Schema {
    pub nodes: &'static [NodeSpec],
    pub marks: &'static [MarkSpec],
}

static SCHEMA: Schema = Schema {
    nodes: NODE_SPECS,
    marks: MARK_SPECS,
};

impl Schema {
    /// The frozen manifest
    pub fn manifest() -> &'static Schema {
        &SCHEMA
    }

    pub fn node(&self, kind: NodeKind) -> &'static NodeSpec {
        // NODE_SPECS is declared in NodeKind order
        &self.nodes[kind as usize]
    }

    pub fn mark(&self, mark: MarkType) -> &'static MarkSpec {
        &self.marks[mark as usize]
    }

    pub fn attr_spec(&self, kind: NodeKind, name: &str) -> Option<&'static AttrSpec> {
        self.node(kind).attrs.iter().find(|a| a.name == name)
    }

    pub fn allows_attr(&self, kind: NodeKind, name: &str) -> bool {
        self.attr_spec(kind, name).is_some()
    }

    /// Whether `child` may appear directly inside `parent`
    pub fn allows_child(&self, parent: NodeKind, child: NodeKind) -> bool {
        match parent {
            NodeKind::Doc
            | NodeKind::Blockquote
            | NodeKind::ListItem
            | NodeKind::TableCell
            | NodeKind::TableHeaderCell => child.is_block(),
            NodeKind::Paragraph | NodeKind::Heading => child.is_inline(),
            NodeKind::BulletList | NodeKind::OrderedList => child == NodeKind::ListItem,
            NodeKind::Table => child == NodeKind::TableRow,
            NodeKind::TableRow => child.is_table_cell(),
            NodeKind::Image | NodeKind::EmbeddedVideo | NodeKind::HardBreak | NodeKind::Text => {
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_specs_indexed_by_kind() {
        let schema = Schema::manifest();
        for spec in schema.nodes {
            assert_eq!(schema.node(spec.kind).kind, spec.kind);
        }
        for spec in schema.marks {
            assert_eq!(schema.mark(spec.mark).mark, spec.mark);
            assert_eq!(spec.rank, spec.mark.rank());
        }
    }

    #[test]
    fn test_image_attribute_schema() {
        let schema = Schema::manifest();
        assert!(schema.allows_attr(NodeKind::Image, "cssClass"));
        assert!(!schema.allows_attr(NodeKind::Image, "onclick"));
        assert!(schema.attr_spec(NodeKind::Image, "src").unwrap().required);
    }

    #[test]
    fn test_table_content_rules() {
        let schema = Schema::manifest();
        assert!(schema.allows_child(NodeKind::Table, NodeKind::TableRow));
        assert!(!schema.allows_child(NodeKind::Table, NodeKind::Paragraph));
        assert!(schema.allows_child(NodeKind::TableRow, NodeKind::TableHeaderCell));
        assert!(!schema.allows_child(NodeKind::TableRow, NodeKind::Paragraph));
    }

    #[test]
    fn test_manifest_serializes() {
        let json = serde_json::to_value(Schema::manifest()).unwrap();
        assert_eq!(json["nodes"][0]["kind"], "doc");
        assert_eq!(json["marks"][4]["tags"][0], "mark");
    }
}
