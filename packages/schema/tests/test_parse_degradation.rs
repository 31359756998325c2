use folio_schema::{parse, parse_with_report, serialize, validate, NodeKind};

#[test]
fn test_arbitrary_html_always_parses_to_valid_document() {
    let inputs = [
        "",
        "plain text",
        "<div><div><span>deep</span></div></div>",
        "<p>unterminated <b>bold",
        "</p></div>stray closers",
        "<table><td>loose cell</td></table>",
        "<ul>text in list<li>item</li></ul>",
        "<p><ul><li>list in paragraph</li></ul></p>",
        "<h6>small</h6><hr><p>after rule</p>",
        "<img><iframe></iframe><div data-embed-video></div>",
        "<a>no href</a><mark>no color</mark>",
        "<table><tr><td><table><tr><td>nested</td></tr></table></td></tr></table>",
        "< not a tag <<>> <p",
        "<!-- only a comment -->",
    ];

    for input in inputs {
        let doc = parse(input);
        assert_eq!(validate(&doc), Ok(()), "invalid document for {input:?}");
        // serialize is total and its output is a fixed point
        let html = serialize(&doc);
        assert_eq!(serialize(&parse(&html)), html, "unstable output for {input:?}");
    }
}

#[test]
fn test_unknown_elements_keep_their_text() {
    let (doc, report) = parse_with_report("<section><article>Kept <custom-tag>text</custom-tag></article></section>");

    assert_eq!(doc.plain_text("\n"), "Kept text");
    assert_eq!(report.dropped, vec!["section", "article", "custom-tag"]);
}

#[test]
fn test_style_and_head_are_discarded() {
    let (doc, report) = parse_with_report(
        "<html><head><title>t</title><style>p{color:red}</style></head><body><p>body</p></body></html>",
    );

    assert_eq!(serialize(&doc), "<p>body</p>");
    assert_eq!(report.dropped, vec!["head"]);
}

#[test]
fn test_list_inside_paragraph_splits_it() {
    let doc = parse("<p>before<ul><li>item</li></ul>after</p>");
    let kinds: Vec<_> = doc.blocks().iter().map(|b| b.kind).collect();

    assert_eq!(
        kinds,
        vec![NodeKind::Paragraph, NodeKind::BulletList, NodeKind::Paragraph]
    );
}

#[test]
fn test_nested_table_is_flattened() {
    let (doc, report) = parse_with_report(
        "<table><tr><td><table><tr><td>inner</td></tr></table></td></tr></table>",
    );

    let outer = &doc.blocks()[0];
    assert_eq!(outer.kind, NodeKind::Table);
    let cell = &outer.content[0].content[0];
    assert!(cell.content.iter().all(|b| b.kind != NodeKind::Table));
    assert_eq!(cell.text_content(), "inner");
    assert!(report.dropped.contains(&"table".to_string()));
}

#[test]
fn test_whitespace_between_blocks_is_ignored() {
    let doc = parse("<p>a</p>\n   \n<p>b\tc\nd</p>");
    assert_eq!(doc.blocks().len(), 2);
    assert_eq!(doc.blocks()[1].text_content(), "b c d");
}

#[test]
fn test_entities_are_decoded() {
    let doc = parse("<p>Tom &amp; Jerry &lt;3 &#x263A;</p>");
    assert_eq!(doc.plain_text("\n"), "Tom & Jerry <3 \u{263a}");
    assert_eq!(serialize(&doc), "<p>Tom &amp; Jerry &lt;3 \u{263a}</p>");
}
