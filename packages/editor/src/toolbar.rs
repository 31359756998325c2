//! # Toolbar Façade
//!
//! Translates toolbar buttons into command chains, one chain per action, and
//! reflects the selection's formatting back onto the controls. Reading the
//! toolbar state is a pure query and never dispatches anything.

use crate::commands::{Chain, Command, Rejection};
use crate::config::EditorConfig;
use crate::query::{
    active_highlight, active_link, can, is_block_active, is_highlight_active, is_mark_active,
    selection_in_table, BlockType,
};
use crate::session::EditorSession;
use crate::state::EditorState;
use folio_schema::{MarkType, BLOCK_SEPARATOR, MAX_HEADING_LEVEL};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Every action the toolbar offers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ToolbarAction {
    Bold,
    Italic,
    Underline,
    /// Toggle a highlight; `None` uses the configured default color
    Highlight { color: Option<String> },
    UnsetHighlight,
    /// Set a link, or remove it with `None`
    Link { url: Option<String> },
    Heading { level: u8 },
    Paragraph,
    BulletList,
    OrderedList,
    Blockquote,
    ClearFormatting,
    InsertImage { src: String, alt: Option<String> },
    InsertEmbeddedVideo { url: String },
    InsertTable { rows: usize, cols: usize },
    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    ToggleHeaderRow,
    DeleteTable,
    Undo,
    Redo,
    CopyPlainText,
    CopyHtml,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolbarOutcome {
    /// The state changed
    Applied,
    /// Accepted, but nothing changed
    Unchanged,
    /// The action does not apply here; the document is untouched
    Rejected(Rejection),
    /// Text for the clipboard
    Copied(String),
}

#[derive(Debug, Clone)]
pub struct Toolbar {
    config: EditorConfig,
}

impl Toolbar {
    pub fn new(config: EditorConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self, session: &mut EditorSession, action: &ToolbarAction) -> ToolbarOutcome {
        match action {
            ToolbarAction::Undo => return changed(session.undo()),
            ToolbarAction::Redo => return changed(session.redo()),
            ToolbarAction::CopyPlainText => {
                return ToolbarOutcome::Copied(session.doc().plain_text(BLOCK_SEPARATOR))
            }
            ToolbarAction::CopyHtml => return ToolbarOutcome::Copied(session.html()),
            _ => {}
        }

        let chain = match self.chain_for(session.state(), action) {
            Ok(chain) => chain,
            Err(reason) => return ToolbarOutcome::Rejected(reason),
        };

        let before = (
            session.revision(),
            session.selection(),
            session.state().stored_marks.clone(),
        );
        match session.dispatch(&chain) {
            Ok(_) => {
                let after = (
                    session.revision(),
                    session.selection(),
                    session.state().stored_marks.clone(),
                );
                changed(before != after)
            }
            Err(reason) => {
                debug!(?action, %reason, "toolbar action rejected");
                ToolbarOutcome::Rejected(reason)
            }
        }
    }

    /// The chain an action dispatches in `state`
    pub fn chain_for(&self, state: &EditorState, action: &ToolbarAction) -> Result<Chain, Rejection> {
        let command = match action {
            ToolbarAction::Bold => Command::ToggleMark {
                mark: MarkType::Bold,
            },
            ToolbarAction::Italic => Command::ToggleMark {
                mark: MarkType::Italic,
            },
            ToolbarAction::Underline => Command::ToggleMark {
                mark: MarkType::Underline,
            },
            ToolbarAction::Highlight { color } => {
                let color = color
                    .as_deref()
                    .unwrap_or(&self.config.default_highlight_color);
                if is_highlight_active(state, color) {
                    Command::UnsetHighlight
                } else {
                    Command::SetHighlight {
                        color: color.to_string(),
                    }
                }
            }
            ToolbarAction::UnsetHighlight => Command::UnsetHighlight,
            ToolbarAction::Link { url } => match url.as_deref().map(str::trim) {
                None | Some("") => Command::UnsetLink,
                Some(url) => Command::SetLink {
                    href: self.normalize_link(url)?,
                },
            },
            ToolbarAction::Heading { level } => Command::ToggleHeading { level: *level },
            ToolbarAction::Paragraph => Command::SetParagraph,
            ToolbarAction::BulletList => Command::ToggleBulletList,
            ToolbarAction::OrderedList => Command::ToggleOrderedList,
            ToolbarAction::Blockquote => Command::ToggleBlockquote,
            ToolbarAction::ClearFormatting => Command::ClearFormatting,
            ToolbarAction::InsertImage { src, alt } => Command::InsertImage {
                src: src.clone(),
                alt: alt.clone(),
                title: None,
            },
            ToolbarAction::InsertEmbeddedVideo { url } => Command::InsertEmbeddedVideo {
                url: url.clone(),
                width: Some(self.config.video_width),
                height: Some(self.config.video_height),
            },
            ToolbarAction::InsertTable { rows, cols } => Command::InsertTable {
                rows: *rows,
                cols: *cols,
                with_header_row: true,
            },
            ToolbarAction::AddRowBefore => Command::AddRowBefore,
            ToolbarAction::AddRowAfter => Command::AddRowAfter,
            ToolbarAction::DeleteRow => Command::DeleteRow,
            ToolbarAction::AddColumnBefore => Command::AddColumnBefore,
            ToolbarAction::AddColumnAfter => Command::AddColumnAfter,
            ToolbarAction::DeleteColumn => Command::DeleteColumn,
            ToolbarAction::ToggleHeaderRow => Command::ToggleHeaderRow,
            ToolbarAction::DeleteTable => Command::DeleteTable,
            ToolbarAction::Undo
            | ToolbarAction::Redo
            | ToolbarAction::CopyPlainText
            | ToolbarAction::CopyHtml => {
                return Err(Rejection::invalid_argument("action has no command"))
            }
        };
        Ok(Chain::single(command))
    }

    /// Add `https://` to bare hosts and check the scheme against the
    /// configured protocols. Relative references pass through.
    pub fn normalize_link(&self, url: &str) -> Result<String, Rejection> {
        let url = url.trim();
        if url.starts_with(|c: char| matches!(c, '/' | '#' | '?' | '.')) {
            return Ok(url.to_string());
        }

        let href = if has_scheme(url) {
            url.to_string()
        } else {
            format!("https://{url}")
        };
        let parsed = Url::parse(&href).map_err(|_| Rejection::InvalidUrl(url.to_string()))?;
        if !self.config.allows_protocol(parsed.scheme()) {
            return Err(Rejection::InvalidUrl(url.to_string()));
        }
        Ok(href)
    }
}

fn changed(changed: bool) -> ToolbarOutcome {
    if changed {
        ToolbarOutcome::Applied
    } else {
        ToolbarOutcome::Unchanged
    }
}

/// `scheme:` prefix per RFC 3986, but `host:port` is not a scheme
fn has_scheme(url: &str) -> bool {
    let Some((scheme, rest)) = url.split_once(':') else {
        return false;
    };
    let valid = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid && !rest.starts_with(|c: char| c.is_ascii_digit())
}

/// Which table controls are enabled at the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableControls {
    pub add_row_before: bool,
    pub add_row_after: bool,
    pub delete_row: bool,
    pub add_column_before: bool,
    pub add_column_after: bool,
    pub delete_column: bool,
    pub toggle_header_row: bool,
    pub delete_table: bool,
}

impl TableControls {
    fn from_state(state: &EditorState) -> Self {
        let enabled = |command: Command| can(state, &command);
        Self {
            add_row_before: enabled(Command::AddRowBefore),
            add_row_after: enabled(Command::AddRowAfter),
            delete_row: enabled(Command::DeleteRow),
            add_column_before: enabled(Command::AddColumnBefore),
            add_column_after: enabled(Command::AddColumnAfter),
            delete_column: enabled(Command::DeleteColumn),
            toggle_header_row: enabled(Command::ToggleHeaderRow),
            delete_table: enabled(Command::DeleteTable),
        }
    }
}

/// What the toolbar shows for the current selection
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarState {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub highlight: Option<String>,
    pub link: Option<String>,
    pub block_type: Option<BlockType>,
    pub heading_level: Option<u8>,
    pub bullet_list: bool,
    pub ordered_list: bool,
    pub blockquote: bool,
    pub in_table: bool,
    /// Present only while the selection is inside a table
    pub table: Option<TableControls>,
    pub can_undo: bool,
    pub can_redo: bool,
}

impl ToolbarState {
    pub fn from_state(state: &EditorState) -> Self {
        let heading_level =
            (1..=MAX_HEADING_LEVEL).find(|level| is_block_active(state, BlockType::Heading(*level)));
        let bullet_list = is_block_active(state, BlockType::BulletList);
        let ordered_list = is_block_active(state, BlockType::OrderedList);
        let blockquote = is_block_active(state, BlockType::Blockquote);

        let block_type = if let Some(level) = heading_level {
            Some(BlockType::Heading(level))
        } else if bullet_list {
            Some(BlockType::BulletList)
        } else if ordered_list {
            Some(BlockType::OrderedList)
        } else if blockquote {
            Some(BlockType::Blockquote)
        } else if is_block_active(state, BlockType::Paragraph) {
            Some(BlockType::Paragraph)
        } else {
            None
        };

        let in_table = selection_in_table(state);

        Self {
            bold: is_mark_active(state, MarkType::Bold),
            italic: is_mark_active(state, MarkType::Italic),
            underline: is_mark_active(state, MarkType::Underline),
            highlight: active_highlight(state),
            link: active_link(state),
            block_type,
            heading_level,
            bullet_list,
            ordered_list,
            blockquote,
            in_table,
            table: in_table.then(|| TableControls::from_state(state)),
            can_undo: false,
            can_redo: false,
        }
    }

    pub fn from_session(session: &EditorSession) -> Self {
        Self {
            can_undo: session.can_undo(),
            can_redo: session.can_redo(),
            ..Self::from_state(session.state())
        }
    }
}
