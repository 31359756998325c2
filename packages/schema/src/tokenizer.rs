//! # HTML Tokenizer
//!
//! A small HTML lexer built on `logos`. It recognizes start
//! tags, end tags, comments, declarations and text; anything it cannot make
//! sense of (a stray `<`, an unterminated tag) comes back as text so the
//! parser never has to fail.

use logos::{Lexer, Logos};

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
enum RawToken {
    #[regex(r#"<[a-zA-Z][a-zA-Z0-9-]*([^>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    #[regex(r"</[a-zA-Z][a-zA-Z0-9-]*[^>]*>")]
    EndTag,

    #[token("<!--", skip_comment)]
    Comment,

    #[regex(r"<![a-zA-Z\[][^>]*>")]
    Declaration,

    #[regex(r"[^<]+")]
    Text,

    #[token("<")]
    Lt,
}

/// Consume everything up to and including the closing `-->`
fn skip_comment(lex: &mut Lexer<RawToken>) -> bool {
    match lex.remainder().find("-->") {
        Some(end) => lex.bump(end + 3),
        None => lex.bump(lex.remainder().len()),
    }
    true
}

/// A single HTML attribute, value already entity-decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Tokens handed to the tree builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlToken {
    StartTag {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    Text(String),
}

/// Tokenize an HTML fragment. Comments and declarations are dropped,
/// tag names are lowercased and entities decoded.
pub fn tokenize(source: &str) -> Vec<HtmlToken> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(source);

    while let Some(result) = lexer.next() {
        let slice = lexer.slice();
        match result {
            Ok(RawToken::StartTag) => tokens.push(parse_start_tag(slice)),
            Ok(RawToken::EndTag) => tokens.push(HtmlToken::EndTag {
                name: tag_name(&slice[2..]),
            }),
            Ok(RawToken::Comment) | Ok(RawToken::Declaration) => {}
            Ok(RawToken::Text) | Ok(RawToken::Lt) | Err(()) => push_text(&mut tokens, slice),
        }
    }

    tokens
}

fn push_text(tokens: &mut Vec<HtmlToken>, raw: &str) {
    let decoded = decode_entities(raw);
    if let Some(HtmlToken::Text(prev)) = tokens.last_mut() {
        prev.push_str(&decoded);
    } else {
        tokens.push(HtmlToken::Text(decoded));
    }
}

fn tag_name(source: &str) -> String {
    source
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn parse_start_tag(slice: &str) -> HtmlToken {
    // strip `<` and `>`
    let inner = &slice[1..slice.len() - 1];
    let name = tag_name(inner);
    let mut rest = inner[name.len()..].trim_end();
    let self_closing = rest.ends_with('/');
    if self_closing {
        rest = &rest[..rest.len() - 1];
    }

    HtmlToken::StartTag {
        name,
        attrs: parse_attributes(rest),
        self_closing,
    }
}

/// Scan `name`, `name=value`, `name="value"` and `name='value'` pairs.
/// Later duplicates are ignored.
fn parse_attributes(source: &str) -> Vec<Attribute> {
    let mut attrs: Vec<Attribute> = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        let name_start = i;
        while i < bytes.len()
            && !bytes[i].is_ascii_whitespace()
            && bytes[i] != b'='
            && bytes[i] != b'/'
        {
            i += 1;
        }
        if name_start == i {
            // lone `=` with no name
            i += 1;
            continue;
        }
        let name = source[name_start..i].to_ascii_lowercase();

        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let mut value = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                let value_start = i + 1;
                i = value_start;
                while i < bytes.len() && bytes[i] != quote {
                    i += 1;
                }
                value = decode_entities(&source[value_start..i]);
                i += 1;
            } else {
                let value_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = decode_entities(&source[value_start..i]);
            }
        }

        if !attrs.iter().any(|a| a.name == name) {
            attrs.push(Attribute { name, value });
        }
    }

    attrs
}

const NAMED_ENTITIES: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("nbsp", '\u{a0}'),
];

/// Longest entity body we look at before giving up
const MAX_ENTITY_LEN: usize = 10;

/// Decode the small fixed entity set plus numeric references.
/// Unknown or malformed entities pass through unchanged.
pub fn decode_entities(source: &str) -> String {
    if !source.contains('&') {
        return source.to_string();
    }

    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&end| end > 0 && end <= MAX_ENTITY_LEN)
            .and_then(|end| decode_entity(&rest[1..=end]).map(|c| (c, end + 2)));

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(|c: char| c == 'x' || c == 'X') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).filter(|c| *c != '\0');
    }
    NAMED_ENTITIES
        .iter()
        .find(|(name, _)| *name == body)
        .map(|(_, c)| *c)
}

/// Escape character data
pub fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Escape a double-quoted attribute value
pub fn escape_attr(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start(name: &str, attrs: &[(&str, &str)]) -> HtmlToken {
        HtmlToken::StartTag {
            name: name.to_string(),
            attrs: attrs
                .iter()
                .map(|(n, v)| Attribute {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            self_closing: false,
        }
    }

    #[test]
    fn test_tags_and_text() {
        let tokens = tokenize("<P>hi</p>");
        assert_eq!(
            tokens,
            vec![
                start("p", &[]),
                HtmlToken::Text("hi".to_string()),
                HtmlToken::EndTag {
                    name: "p".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_attribute_forms() {
        let tokens = tokenize(r#"<img src="a.png" alt='a > b' width=10 hidden>"#);
        assert_eq!(
            tokens,
            vec![start(
                "img",
                &[("src", "a.png"), ("alt", "a > b"), ("width", "10"), ("hidden", "")]
            )]
        );
    }

    #[test]
    fn test_self_closing() {
        let tokens = tokenize("<br/>");
        assert!(matches!(
            &tokens[0],
            HtmlToken::StartTag { name, self_closing: true, .. } if name == "br"
        ));
    }

    #[test]
    fn test_comments_and_doctype_dropped() {
        let tokens = tokenize("<!DOCTYPE html><!-- note --><p>x</p>");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], start("p", &[]));
    }

    #[test]
    fn test_stray_angle_is_text() {
        let tokens = tokenize("a < b");
        assert_eq!(tokens, vec![HtmlToken::Text("a < b".to_string())]);
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#39;&#x41;&nbsp;"), "'A\u{a0}");
        assert_eq!(decode_entities("&bogus; & &amp"), "&bogus; & &amp");
    }

    #[test]
    fn test_escape() {
        let mut out = String::new();
        escape_attr(r#"a"b<&"#, &mut out);
        assert_eq!(out, "a&quot;b&lt;&amp;");
    }
}
