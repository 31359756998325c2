//! # Schema Validation
//!
//! Checks a document against every structural rule of the manifest. Commands
//! run this after each step so that nothing invalid ever reaches a host.

use crate::document::Document;
use crate::error::{SchemaError, SchemaResult};
use crate::node::{Mark, MarkType, Node, NodeKind};
use crate::spec::{Schema, MAX_HEADING_LEVEL};

/// Validate a whole document
pub fn validate(doc: &Document) -> SchemaResult<()> {
    let root = doc.root();
    if root.kind != NodeKind::Doc {
        return Err(SchemaError::InvalidRoot(root.kind));
    }
    let mut path = Vec::new();
    validate_node(root, &mut path)
}

fn validate_node(node: &Node, path: &mut Vec<usize>) -> SchemaResult<()> {
    let schema = Schema::manifest();

    if node.is_text() {
        if node.text.is_empty() {
            return Err(SchemaError::EmptyText { path: path.clone() });
        }
        for mark in &node.marks {
            validate_mark(mark)?;
        }
        return Ok(());
    }

    if !node.marks.is_empty() {
        return Err(SchemaError::MarksOnNonText {
            kind: node.kind,
            path: path.clone(),
        });
    }

    validate_attrs(node, path)?;

    let needs_content = !node.is_leaf() && !node.is_textblock();
    if needs_content && node.content.is_empty() {
        return Err(SchemaError::EmptyContainer {
            kind: node.kind,
            path: path.clone(),
        });
    }

    for (i, child) in node.content.iter().enumerate() {
        path.push(i);
        if !schema.allows_child(node.kind, child.kind) {
            return Err(SchemaError::invalid_child(node.kind, child.kind, path));
        }
        if i > 0 {
            let previous = &node.content[i - 1];
            if child.is_text() && previous.is_text() && child.marks == previous.marks {
                return Err(SchemaError::UnmergedText { path: path.clone() });
            }
        }
        validate_node(child, path)?;
        path.pop();
    }

    if node.kind == NodeKind::Table {
        let width = node.content.first().map(|row| row.content.len());
        if node.content.iter().any(|row| Some(row.content.len()) != width) {
            return Err(SchemaError::RaggedTable { path: path.clone() });
        }
    }

    Ok(())
}

fn validate_attrs(node: &Node, path: &[usize]) -> SchemaResult<()> {
    let schema = Schema::manifest();

    for name in node.attrs.keys() {
        if !schema.allows_attr(node.kind, name) {
            return Err(SchemaError::UnknownAttr {
                kind: node.kind,
                attr: name.clone(),
            });
        }
    }

    for spec in schema.node(node.kind).attrs.iter().filter(|a| a.required) {
        match node.attr(spec.name) {
            Some(value) if !value.trim().is_empty() => {}
            Some(value) => return Err(SchemaError::invalid_attr(node.kind, spec.name, value)),
            None => {
                return Err(SchemaError::MissingAttr {
                    kind: node.kind,
                    attr: spec.name.to_string(),
                    path: path.to_vec(),
                })
            }
        }
    }

    // Values must already be in the form the parser reads back
    for (name, value) in &node.attrs {
        if canonical_attr(node.kind, name, value).as_deref() != Some(value.as_str()) {
            return Err(SchemaError::invalid_attr(node.kind, name, value));
        }
    }

    Ok(())
}

/// The form an attribute value takes after a trip through HTML: heading
/// levels and list starts as plain integers, media sources trimmed. `None`
/// when the value has no valid form.
pub fn canonical_attr(kind: NodeKind, name: &str, value: &str) -> Option<String> {
    match (kind, name) {
        (NodeKind::Heading, "level") => value
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|l| (1..=MAX_HEADING_LEVEL).contains(l))
            .map(|l| l.to_string()),
        (NodeKind::OrderedList, "start") => value.trim().parse::<u32>().ok().map(|n| n.to_string()),
        (kind, "src") if kind.is_media() => {
            let src = value.trim();
            (!src.is_empty()).then(|| src.to_string())
        }
        _ => Some(value.to_string()),
    }
}

fn validate_mark(mark: &Mark) -> SchemaResult<()> {
    match mark {
        Mark::Link { href } if href.trim().is_empty() => Err(SchemaError::InvalidMark {
            mark: MarkType::Link,
            reason: "empty href".to_string(),
        }),
        Mark::Highlight { color } if color.trim().is_empty() => Err(SchemaError::InvalidMark {
            mark: MarkType::Highlight,
            reason: "empty color".to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MarkSet;
    use crate::parser::parse;

    #[test]
    fn test_parsed_documents_are_valid() {
        let doc = parse(
            "<h2>t</h2><ul><li><p>a</p></li></ul><table><tr><td>x</td><td>y</td></tr></table>",
        );
        assert_eq!(validate(&doc), Ok(()));
    }

    #[test]
    fn test_rejects_bad_heading_level() {
        let mut doc = Document::empty();
        doc.root_mut().content[0] = Node::heading(6, vec![]);
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::InvalidAttr { attr, .. }) if attr == "level"
        ));
    }

    #[test]
    fn test_rejects_non_canonical_values() {
        let mut doc = Document::empty();
        doc.root_mut().content[0] = Node::element(NodeKind::Heading, vec![]).with_attr("level", "01");
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::InvalidAttr { attr, .. }) if attr == "level"
        ));

        let mut doc = Document::empty();
        doc.root_mut().content.push(Node::image(" a.png"));
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::InvalidAttr { attr, .. }) if attr == "src"
        ));
    }

    #[test]
    fn test_canonical_attr() {
        assert_eq!(canonical_attr(NodeKind::Heading, "level", "02"), Some("2".to_string()));
        assert_eq!(canonical_attr(NodeKind::Heading, "level", "5"), None);
        assert_eq!(canonical_attr(NodeKind::OrderedList, "start", "+5"), Some("5".to_string()));
        assert_eq!(canonical_attr(NodeKind::OrderedList, "start", "-1"), None);
        assert_eq!(canonical_attr(NodeKind::Image, "src", " a.png "), Some("a.png".to_string()));
        assert_eq!(canonical_attr(NodeKind::Image, "alt", " A "), Some(" A ".to_string()));
    }

    #[test]
    fn test_rejects_missing_src() {
        let mut doc = Document::empty();
        doc.root_mut().content.push(Node::new(NodeKind::Image));
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::MissingAttr { kind: NodeKind::Image, .. })
        ));
    }

    #[test]
    fn test_rejects_block_inside_paragraph() {
        let mut doc = Document::empty();
        doc.root_mut().content[0]
            .content
            .push(Node::paragraph(vec![]));
        assert_eq!(
            validate(&doc),
            Err(SchemaError::invalid_child(
                NodeKind::Paragraph,
                NodeKind::Paragraph,
                &[0, 0]
            ))
        );
    }

    #[test]
    fn test_rejects_unmerged_text() {
        let mut doc = Document::empty();
        doc.root_mut().content[0].content = vec![Node::plain_text("a"), Node::plain_text("b")];
        assert_eq!(
            validate(&doc),
            Err(SchemaError::UnmergedText { path: vec![0, 1] })
        );
    }

    #[test]
    fn test_rejects_ragged_table() {
        let mut doc = parse("<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>");
        doc.root_mut().content[0].content[1].content.pop();
        assert_eq!(
            validate(&doc),
            Err(SchemaError::RaggedTable { path: vec![0] })
        );
    }

    #[test]
    fn test_rejects_empty_link() {
        let mut doc = Document::empty();
        doc.root_mut().content[0].content =
            vec![Node::text("x", MarkSet::from_marks(vec![Mark::link(" ")]))];
        assert!(matches!(
            validate(&doc),
            Err(SchemaError::InvalidMark { mark: MarkType::Link, .. })
        ));
    }
}
