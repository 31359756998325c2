//! Inline formatting. Over a range the marks change on the text itself; on a
//! collapsed caret they go into the stored marks for the next typed text,
//! except for links which extend over the link run the caret sits in.

use super::transform::{finish, map_marks_in_range};
use super::{CommandResult, Rejection};
use crate::query::{current_marks, is_mark_active, mark_range};
use crate::state::EditorState;
use folio_schema::{Mark, MarkSet, MarkType};
use url::Url;

const BLOCKED_SCHEMES: &[&str] = &["javascript", "vbscript", "data"];

/// Check and trim a link target. Relative references are accepted as is,
/// absolute ones must parse and must not use a script-capable scheme.
pub fn validate_href(href: &str) -> Result<String, Rejection> {
    let href = href.trim();
    let invalid = || Rejection::InvalidUrl(href.to_string());

    if href.is_empty() || href.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid());
    }
    if href.starts_with(|c: char| matches!(c, '/' | '#' | '?' | '.')) {
        return Ok(href.to_string());
    }

    let url = Url::parse(href).map_err(|_| invalid())?;
    if BLOCKED_SCHEMES.contains(&url.scheme()) {
        return Err(invalid());
    }
    Ok(href.to_string())
}

/// Rewrite the marks of every character in the selection
fn map_selection(state: &EditorState, f: impl Fn(&mut MarkSet)) -> CommandResult {
    let mut doc = state.doc.clone();
    map_marks_in_range(&mut doc, state.selection.from(), state.selection.to(), f);
    Ok(finish(state, doc, state.selection))
}

fn map_stored(state: &EditorState, f: impl FnOnce(&mut MarkSet)) -> CommandResult {
    let mut marks = current_marks(state);
    f(&mut marks);
    Ok(state.with_stored_marks(marks))
}

pub(super) fn toggle_mark(state: &EditorState, mark_type: MarkType) -> CommandResult {
    let mark = match mark_type {
        MarkType::Bold => Mark::Bold,
        MarkType::Italic => Mark::Italic,
        MarkType::Underline => Mark::Underline,
        other => {
            return Err(Rejection::invalid_argument(format!(
                "{other} carries a value and cannot be toggled"
            )))
        }
    };

    let active = is_mark_active(state, mark_type);
    let update = move |marks: &mut MarkSet| {
        if active {
            marks.remove(mark_type);
        } else {
            marks.add(mark.clone());
        }
    };

    if state.selection.is_empty() {
        map_stored(state, update)
    } else {
        map_selection(state, update)
    }
}

pub(super) fn set_highlight(state: &EditorState, color: &str) -> CommandResult {
    let color = color.trim();
    if color.is_empty() {
        return Err(Rejection::invalid_argument("highlight color is empty"));
    }
    let mark = Mark::highlight(color);

    if state.selection.is_empty() {
        map_stored(state, |marks| marks.add(mark))
    } else {
        map_selection(state, |marks| marks.add(mark.clone()))
    }
}

pub(super) fn unset_highlight(state: &EditorState) -> CommandResult {
    let update = |marks: &mut MarkSet| {
        marks.remove(MarkType::Highlight);
    };
    if state.selection.is_empty() {
        map_stored(state, update)
    } else {
        map_selection(state, update)
    }
}

/// Apply `f` to the link run under a collapsed caret
fn map_link_run(state: &EditorState, f: impl Fn(&mut MarkSet)) -> Option<CommandResult> {
    let (from, to, _) = mark_range(&state.doc, state.selection.head, MarkType::Link)?;
    let mut doc = state.doc.clone();
    map_marks_in_range(&mut doc, from, to, f);
    Some(Ok(finish(state, doc, state.selection)))
}

pub(super) fn set_link(state: &EditorState, href: &str) -> CommandResult {
    let mark = Mark::link(validate_href(href)?);

    if !state.selection.is_empty() {
        return map_selection(state, |marks| marks.add(mark.clone()));
    }
    let update = |marks: &mut MarkSet| marks.add(mark.clone());
    map_link_run(state, update).unwrap_or_else(|| map_stored(state, |marks| marks.add(mark.clone())))
}

pub(super) fn unset_link(state: &EditorState) -> CommandResult {
    let update = |marks: &mut MarkSet| {
        marks.remove(MarkType::Link);
    };

    if !state.selection.is_empty() {
        return map_selection(state, update);
    }
    map_link_run(state, update).unwrap_or_else(|| map_stored(state, update))
}

pub(super) fn clear_formatting(state: &EditorState) -> CommandResult {
    if state.selection.is_empty() {
        return Ok(state.with_stored_marks(MarkSet::new()));
    }
    map_selection(state, |marks| *marks = MarkSet::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Selection;

    fn at(html: &str, anchor: usize, head: usize) -> EditorState {
        EditorState::from_html(html).with_selection(Selection::new(anchor, head))
    }

    #[test]
    fn test_toggle_bold_over_range() {
        let state = at("<p>hello</p>", 1, 3);
        let bold = toggle_mark(&state, MarkType::Bold).unwrap();
        assert_eq!(bold.html(), "<p><strong>he</strong>llo</p>");

        let plain = toggle_mark(&bold, MarkType::Bold).unwrap();
        assert_eq!(plain.html(), "<p>hello</p>");
    }

    #[test]
    fn test_toggle_partially_marked_range_adds() {
        let state = at("<p><em>ab</em>cd</p>", 1, 5);
        let next = toggle_mark(&state, MarkType::Italic).unwrap();
        assert_eq!(next.html(), "<p><em>abcd</em></p>");
    }

    #[test]
    fn test_toggle_on_caret_stores_marks() {
        let state = at("<p>ab</p>", 2, 2);
        let next = toggle_mark(&state, MarkType::Underline).unwrap();
        assert_eq!(next.doc, state.doc);
        assert!(next
            .stored_marks
            .as_ref()
            .is_some_and(|m| m.contains_type(MarkType::Underline)));
    }

    #[test]
    fn test_toggle_link_is_rejected() {
        let state = at("<p>ab</p>", 1, 2);
        assert!(matches!(
            toggle_mark(&state, MarkType::Link),
            Err(Rejection::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_highlight_replaces_color() {
        let state = at(r#"<p><mark data-color="red">ab</mark></p>"#, 1, 3);
        let next = set_highlight(&state, "blue").unwrap();
        assert_eq!(
            next.html(),
            r#"<p><mark data-color="blue" style="background-color: blue">ab</mark></p>"#
        );
        let cleared = unset_highlight(&next).unwrap();
        assert_eq!(cleared.html(), "<p>ab</p>");
    }

    #[test]
    fn test_set_link_extends_run_under_caret() {
        let state = at(r#"<p>x<a href="https://a.b">link</a>y</p>"#, 4, 4);
        let next = set_link(&state, "https://c.d").unwrap();
        assert_eq!(next.html(), r#"<p>x<a href="https://c.d">link</a>y</p>"#);

        let removed = unset_link(&next).unwrap();
        assert_eq!(removed.html(), "<p>xlinky</p>");
    }

    #[test]
    fn test_validate_href() {
        assert_eq!(validate_href(" https://a.b "), Ok("https://a.b".to_string()));
        assert_eq!(validate_href("/docs"), Ok("/docs".to_string()));
        assert!(validate_href("javascript:alert(1)").is_err());
        assert!(validate_href("has space").is_err());
        assert!(validate_href("").is_err());
    }

    #[test]
    fn test_clear_formatting() {
        let state = at(r#"<p><strong><a href="https://a.b">ab</a></strong>c</p>"#, 1, 4);
        let next = clear_formatting(&state).unwrap();
        assert_eq!(next.html(), "<p>abc</p>");
    }
}
