//! # Editor State
//!
//! An immutable snapshot: document, selection, stored marks and the revision
//! counter the session bumps on every document change. Commands take a state
//! and return a new one; nothing mutates a state in place.

use crate::selection::Selection;
use folio_schema::{parse, serialize, Document, MarkSet};

#[derive(Debug, Clone, PartialEq)]
pub struct EditorState {
    pub doc: Document,
    pub selection: Selection,
    /// Marks applied to the next inserted text, overriding the marks at the cursor
    pub stored_marks: Option<MarkSet>,
    pub revision: u64,
}

impl EditorState {
    /// State with the caret at the first text position
    pub fn new(doc: Document) -> Self {
        let selection = Selection::cursor(doc.nearest_text_pos(0));
        Self {
            doc,
            selection,
            stored_marks: None,
            revision: 0,
        }
    }

    pub fn from_html(html: &str) -> Self {
        Self::new(parse(html))
    }

    /// Canonical HTML of the document
    pub fn html(&self) -> String {
        serialize(&self.doc)
    }

    /// Replace document and selection, keeping the revision.
    /// Stored marks are dropped since they only apply at the old caret.
    pub fn with_doc(&self, doc: Document, selection: Selection) -> Self {
        let selection = selection.clamp(doc.content_size());
        Self {
            doc,
            selection,
            stored_marks: None,
            revision: self.revision,
        }
    }

    pub fn with_selection(&self, selection: Selection) -> Self {
        Self {
            selection: selection.clamp(self.doc.content_size()),
            stored_marks: None,
            ..self.clone()
        }
    }

    pub fn with_stored_marks(&self, marks: MarkSet) -> Self {
        Self {
            stored_marks: Some(marks),
            ..self.clone()
        }
    }
}

impl Default for EditorState {
    fn default() -> Self {
        Self::new(Document::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_caret_inside_first_textblock() {
        let state = EditorState::from_html(r#"<img src="a.png"><p>text</p>"#);
        // image occupies 0, paragraph opens at 1
        assert_eq!(state.selection, Selection::cursor(2));
    }

    #[test]
    fn test_with_doc_clamps_selection() {
        let state = EditorState::from_html("<p>hello</p>");
        let next = state.with_doc(Document::empty(), Selection::new(1, 6));
        assert_eq!(next.selection, Selection::new(1, 2));
    }
}
