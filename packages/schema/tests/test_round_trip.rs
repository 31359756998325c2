use folio_schema::{
    parse, parse_with_report, serialize, validate, Document, Mark, MarkSet, Node, NodeKind,
};

fn cell(kind: NodeKind, text: &str) -> Node {
    Node::element(kind, vec![Node::paragraph(vec![Node::plain_text(text)])])
}

fn row(cells: Vec<Node>) -> Node {
    Node::element(NodeKind::TableRow, cells)
}

fn assert_round_trip(doc: &Document) {
    let html = serialize(doc);
    let (reparsed, report) = parse_with_report(&html);
    assert_eq!(&reparsed, doc, "tree changed after round trip of {html}");
    assert!(report.is_clean(), "engine output degraded: {report:?} for {html}");
    assert_eq!(serialize(&reparsed), html);
}

#[test]
fn test_round_trip_every_node_kind() {
    let doc = Document::new(vec![
        Node::heading(1, vec![Node::plain_text("Title")]),
        Node::heading(4, vec![]),
        Node::paragraph(vec![
            Node::plain_text("line one"),
            Node::hard_break(),
            Node::plain_text("line two"),
        ]),
        Node::element(
            NodeKind::BulletList,
            vec![Node::element(
                NodeKind::ListItem,
                vec![
                    Node::paragraph(vec![Node::plain_text("outer")]),
                    Node::element(
                        NodeKind::OrderedList,
                        vec![Node::element(
                            NodeKind::ListItem,
                            vec![Node::paragraph(vec![Node::plain_text("inner")])],
                        )],
                    )
                    .with_attr("start", "4"),
                ],
            )],
        ),
        Node::element(
            NodeKind::Blockquote,
            vec![Node::paragraph(vec![Node::plain_text("quote")])],
        ),
        Node::image("https://cdn.example.com/a.png")
            .with_attr("alt", "An image")
            .with_attr("title", "Title")
            .with_attr("width", "320")
            .with_attr("height", "200")
            .with_attr("cssClass", "rounded"),
        Node::new(NodeKind::EmbeddedVideo)
            .with_attr("src", "https://www.youtube.com/embed/dQw4w9WgXcQ")
            .with_attr("width", "640")
            .with_attr("height", "480"),
        Node::element(
            NodeKind::Table,
            vec![
                row(vec![
                    cell(NodeKind::TableHeaderCell, "h1"),
                    cell(NodeKind::TableHeaderCell, "h2"),
                ]),
                row(vec![
                    cell(NodeKind::TableCell, "a"),
                    cell(NodeKind::TableCell, "b"),
                ]),
            ],
        ),
        Node::paragraph(vec![]),
    ]);

    assert_eq!(validate(&doc), Ok(()));
    assert_round_trip(&doc);
}

#[test]
fn test_round_trip_overlapping_marks() {
    let link = Mark::link("https://example.com/?a=1&b=2");
    let doc = Document::new(vec![Node::paragraph(vec![
        Node::text("plain ", MarkSet::new()),
        Node::text("bold ", MarkSet::from_marks(vec![Mark::Bold])),
        Node::text(
            "bold italic ",
            MarkSet::from_marks(vec![Mark::Bold, Mark::Italic]),
        ),
        Node::text(
            "linked",
            MarkSet::from_marks(vec![link.clone(), Mark::Underline]),
        ),
        Node::text(
            " hi",
            MarkSet::from_marks(vec![Mark::highlight("#fef08a"), Mark::Italic]),
        ),
        Node::text("<&>", MarkSet::new()),
    ])]);

    assert_round_trip(&doc);
}

#[test]
fn test_round_trip_table_without_header() {
    let doc = Document::new(vec![Node::element(
        NodeKind::Table,
        vec![
            row(vec![cell(NodeKind::TableCell, "a"), cell(NodeKind::TableHeaderCell, "b")]),
            row(vec![cell(NodeKind::TableCell, "c"), cell(NodeKind::TableCell, "d")]),
        ],
    )]);

    let html = serialize(&doc);
    assert!(!html.contains("<thead>"));
    assert_round_trip(&doc);
}

#[test]
fn test_round_trip_unicode_text() {
    let doc = Document::new(vec![Node::paragraph(vec![Node::plain_text(
        "naïve café – 日本語 \u{a0}nbsp",
    )])]);
    assert_round_trip(&doc);
}

#[test]
fn test_canonical_html_is_stable() {
    let html = concat!(
        "<h2>Heading</h2>",
        "<p>Text with <a href=\"https://x.y\"><strong>bold link</strong></a></p>",
        "<ol start=\"2\"><li><p>two</p></li><li><p>three</p></li></ol>",
    );
    assert_eq!(serialize(&parse(html)), html);
}
