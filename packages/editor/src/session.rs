//! # Editing Session
//!
//! One mounted editor. The session exclusively owns the [`EditorState`] and
//! is the only mutator: every change arrives as a [`Chain`], from the host
//! via [`EditorSession::set_external_content`], or from undo/redo.
//!
//! ## Change flow
//!
//! ```text
//! dispatch(chain) ──▶ Chain::run ──▶ post-effects ──▶ revision += 1
//!                                                      │
//!                                     history.record ◀─┤
//!                                                      ▼
//!                                              on_change(html)  (once)
//! ```
//!
//! Selection-only changes and stored-mark toggles never reach `on_change`.
//! Content pushed by the host is recorded in history but not echoed back.
//!
//! Media nodes receive a session-local [`folio_schema::NodeId`] when they
//! enter the document. Commands carry it along as they move nodes, so a
//! captured image can be found again after unrelated edits.

use crate::commands::transform::remap_by_anchor;
use crate::commands::{Chain, Command, Rejection};
use crate::config::EditorConfig;
use crate::plugin::{ClickOutcome, InteractionLayer, InteractionPlugin, Point, PositionMapper};
use crate::post_effects::PostEffectEngine;
use crate::selection::Selection;
use crate::state::EditorState;
use crate::sync::SyncBridge;
use crate::undo_stack::{Snapshot, UndoStack};
use folio_schema::{parse_with_report, Document};
use tracing::{debug, info};

/// What a successful dispatch changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub doc_changed: bool,
    pub selection_changed: bool,
    pub revision: u64,
}

#[derive(Debug)]
pub struct EditorSession {
    config: EditorConfig,
    state: EditorState,
    history: UndoStack,
    bridge: SyncBridge,
    effects: PostEffectEngine,
    interactions: InteractionLayer,
    next_node_id: u64,
}

impl EditorSession {
    /// Mount an editor on `initial_html`. Malformed input is repaired, never
    /// refused.
    pub fn create(config: EditorConfig, initial_html: &str) -> Self {
        let (doc, report) = parse_with_report(initial_html);
        if !report.is_clean() {
            debug!(dropped = ?report.dropped, repaired = report.repaired, "initial content repaired");
        }

        let effects = PostEffectEngine::new(&config);
        let (mut doc, _) = effects.apply(doc);
        let mut next_node_id = 1;
        doc.assign_media_ids(&mut next_node_id);
        let state = EditorState::new(doc);

        info!(
            blocks = state.doc.blocks().len(),
            size = state.doc.content_size(),
            "editor session created"
        );

        Self {
            history: UndoStack::with_max_levels(config.history_depth),
            config,
            state,
            bridge: SyncBridge::new(),
            effects,
            interactions: InteractionLayer::new(),
            next_node_id,
        }
    }

    /// Unmount. Listeners are dropped with the session.
    pub fn destroy(self) {
        info!(
            revision = self.state.revision,
            emitted = self.bridge.emit_count(),
            "editor session destroyed"
        );
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn doc(&self) -> &Document {
        &self.state.doc
    }

    pub fn selection(&self) -> Selection {
        self.state.selection
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }

    /// Canonical HTML of the current document
    pub fn html(&self) -> String {
        self.state.html()
    }

    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut UndoStack {
        &mut self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Register an onChange listener
    pub fn on_change(&mut self, listener: impl FnMut(&str) + 'static) {
        self.bridge.on_change(listener);
    }

    pub fn emit_count(&self) -> u64 {
        self.bridge.emit_count()
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn InteractionPlugin>) {
        self.interactions.register(plugin);
    }

    /// Run a chain atomically. A rejection leaves the session untouched.
    pub fn dispatch(&mut self, chain: &Chain) -> Result<DispatchOutcome, Rejection> {
        let next = chain.run(&self.state)?;
        let description = chain.describe();
        Ok(self.commit(next, Some(&description), true))
    }

    /// Run a single command
    pub fn apply(&mut self, command: Command) -> Result<DispatchOutcome, Rejection> {
        self.dispatch(&Chain::single(command))
    }

    fn commit(&mut self, next: EditorState, description: Option<&str>, emit: bool) -> DispatchOutcome {
        let selection_changed = next.selection != self.state.selection;

        if next.doc == self.state.doc {
            self.state = next;
            return DispatchOutcome {
                doc_changed: false,
                selection_changed,
                revision: self.state.revision,
            };
        }

        let EditorState {
            doc,
            selection,
            stored_marks,
            ..
        } = next;
        let (mut doc, applied) = self.effects.apply(doc);
        if !applied.is_empty() {
            debug!(effects = ?applied, "post-effects applied");
        }
        doc.assign_media_ids(&mut self.next_node_id);
        let selection = selection.clamp(doc.content_size());

        let before = Snapshot::new(self.state.doc.clone(), self.state.selection);
        let after = Snapshot::new(doc.clone(), selection);
        self.history.record(before, after, description);

        self.state = EditorState {
            doc,
            selection,
            stored_marks,
            revision: self.state.revision + 1,
        };

        if emit {
            self.bridge.emit(self.state.html());
        }

        DispatchOutcome {
            doc_changed: true,
            selection_changed,
            revision: self.state.revision,
        }
    }

    /// Replace the content from the host. Returns `false` when `html` is the
    /// document already shown, in which case nothing changes at all.
    pub fn set_external_content(&mut self, html: &str) -> bool {
        let (incoming, report) = parse_with_report(html);
        if !report.is_clean() {
            debug!(dropped = ?report.dropped, "external content repaired");
        }
        let (incoming, _) = self.effects.apply(incoming);

        if SyncBridge::is_echo(&self.state.doc, &incoming) {
            debug!("external content matches current document");
            return false;
        }

        let selection = remap_by_anchor(&self.state.doc, &incoming, self.state.selection);
        let next = self.state.with_doc(incoming, selection);
        self.commit(next, Some("externalContent"), false);
        info!(revision = self.state.revision, "external content applied");
        true
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        let selection = snapshot.selection.clamp(snapshot.doc.content_size());
        self.state = EditorState {
            doc: snapshot.doc,
            selection,
            stored_marks: None,
            revision: self.state.revision + 1,
        };
        self.bridge.emit(self.state.html());
    }

    /// Route a click through the interaction plugins. Unhandled clicks
    /// collapse the selection at the nearest caret position.
    pub fn handle_click(&mut self, mapper: &dyn PositionMapper, point: Point) -> ClickOutcome {
        let outcome = self.interactions.click(&self.state.doc, mapper, point);
        if let ClickOutcome::Caret(pos) = outcome {
            let caret = self.state.doc.nearest_text_pos(pos);
            self.state = self.state.with_selection(Selection::cursor(caret));
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_schema::MarkType;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording(session: &mut EditorSession) -> Rc<RefCell<Vec<String>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        session.on_change(move |html| sink.borrow_mut().push(html.to_string()));
        seen
    }

    #[test]
    fn test_create_applies_post_effects() {
        let session = EditorSession::create(EditorConfig::default(), r#"<img src="a.png">"#);
        assert_eq!(session.html(), r#"<img src="a.png"><p></p>"#);
        assert_eq!(session.revision(), 0);
    }

    #[test]
    fn test_dispatch_emits_once_per_chain() {
        let mut session = EditorSession::create(EditorConfig::default(), "<p>hello</p>");
        let seen = recording(&mut session);

        let chain = Chain::new()
            .then(Command::SetSelection { anchor: 1, head: 6 })
            .then(Command::ToggleMark {
                mark: MarkType::Bold,
            })
            .then(Command::ToggleMark {
                mark: MarkType::Italic,
            });
        let outcome = session.dispatch(&chain).unwrap();

        assert!(outcome.doc_changed);
        assert_eq!(outcome.revision, 1);
        assert_eq!(
            *seen.borrow(),
            vec!["<p><strong><em>hello</em></strong></p>"]
        );
    }

    #[test]
    fn test_selection_change_is_silent() {
        let mut session = EditorSession::create(EditorConfig::default(), "<p>hello</p>");
        let seen = recording(&mut session);

        let outcome = session
            .apply(Command::SetSelection { anchor: 2, head: 4 })
            .unwrap();
        assert!(!outcome.doc_changed);
        assert!(outcome.selection_changed);
        assert!(seen.borrow().is_empty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_rejection_leaves_session_untouched() {
        let mut session = EditorSession::create(EditorConfig::default(), "<p>hello</p>");
        let seen = recording(&mut session);
        let before = session.state().clone();

        let chain = Chain::new()
            .then(Command::InsertText {
                text: "x".to_string(),
            })
            .then(Command::DeleteRow);
        assert_eq!(session.dispatch(&chain), Err(Rejection::NotInTable));
        assert_eq!(session.state(), &before);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_media_ids_survive_edits() {
        let mut session = EditorSession::create(
            EditorConfig::default(),
            r#"<p>a</p><img src="a.png"><img src="a.png">"#,
        );
        let first = session.doc().node_at(3).and_then(|node| node.id).unwrap();
        let second = session.doc().node_at(4).and_then(|node| node.id).unwrap();
        assert_ne!(first, second);

        session
            .apply(Command::SetSelection { anchor: 2, head: 2 })
            .unwrap();
        session
            .apply(Command::InsertText {
                text: "bc".to_string(),
            })
            .unwrap();
        assert_eq!(session.doc().position_of(first), Some(5));
        assert_eq!(session.doc().position_of(second), Some(6));

        session
            .apply(Command::InsertImage {
                src: "b.png".to_string(),
                alt: None,
                title: None,
            })
            .unwrap();
        assert!(session.doc().position_of(first).is_some());

        assert!(session.set_external_content(r#"<p>abc</p><img src="a.png">"#));
        assert_eq!(session.doc().position_of(first), None);
        assert!(session.doc().node_at(5).and_then(|node| node.id).is_some());
    }

    #[test]
    fn test_external_echo_is_ignored() {
        let mut session = EditorSession::create(EditorConfig::default(), "<p>hello</p>");
        let seen = recording(&mut session);
        session
            .apply(Command::SetSelection { anchor: 3, head: 3 })
            .unwrap();

        assert!(!session.set_external_content("<p>hello</p>"));
        assert!(!session.set_external_content("  <p>hello</p>\n"));
        assert_eq!(session.selection(), Selection::cursor(3));
        assert_eq!(session.revision(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_external_content_is_undoable_and_silent() {
        let mut session = EditorSession::create(EditorConfig::default(), "<p>hello</p>");
        let seen = recording(&mut session);

        assert!(session.set_external_content("<p>hello world</p>"));
        assert_eq!(session.revision(), 1);
        assert!(seen.borrow().is_empty());

        assert!(session.undo());
        assert_eq!(session.html(), "<p>hello</p>");
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn test_undo_redo() {
        let mut session = EditorSession::create(EditorConfig::default(), "<p>a</p>");
        session
            .apply(Command::SetSelection { anchor: 2, head: 2 })
            .unwrap();
        session
            .apply(Command::InsertText {
                text: "b".to_string(),
            })
            .unwrap();
        assert_eq!(session.html(), "<p>ab</p>");
        assert_eq!(session.history().undo_description(), Some("insertText"));

        assert!(session.undo());
        assert_eq!(session.html(), "<p>a</p>");
        assert_eq!(session.selection(), Selection::cursor(2));
        assert!(session.redo());
        assert_eq!(session.html(), "<p>ab</p>");
        assert!(!session.redo());
    }

    #[test]
    fn test_history_depth_from_config() {
        let config = EditorConfig {
            history_depth: 2,
            ..EditorConfig::default()
        };
        let mut session = EditorSession::create(config, "<p></p>");
        for _ in 0..4 {
            session
                .apply(Command::InsertText {
                    text: "x".to_string(),
                })
                .unwrap();
        }
        assert_eq!(session.history().undo_levels(), 2);
    }
}
