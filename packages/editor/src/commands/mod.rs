//! # Commands
//!
//! Every change to a document goes through a [`Command`]. A command is a
//! pure function from one [`EditorState`] to the next; it either produces a
//! new state or a [`Rejection`], never a partial edit.
//!
//! ## Chains
//!
//! Commands compose into a [`Chain`]. Each command runs against the result
//! of the previous one and the chain is atomic: the first rejection rejects
//! the whole chain and the caller keeps its original state. After every step
//! the document is validated against the schema, so a chain can never hand
//! back an invalid document.
//!
//! ```rust
//! use folio_editor::{Chain, Command, EditorState};
//! use folio_schema::MarkType;
//!
//! let state = EditorState::from_html("<p>hello</p>");
//! let next = Chain::new()
//!     .then(Command::SetSelection { anchor: 1, head: 6 })
//!     .then(Command::ToggleMark { mark: MarkType::Bold })
//!     .run(&state)
//!     .unwrap();
//! assert_eq!(next.html(), "<p><strong>hello</strong></p>");
//! ```

mod blocks;
mod insert;
mod marks;
mod nodes;
mod table;
mod text;
pub(crate) mod transform;

use crate::state::EditorState;
use folio_schema::{validate, MarkType, NodeKind, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

pub use blocks::{block_range, BlockRange};
pub use insert::{embed_url, DEFAULT_VIDEO_HEIGHT, DEFAULT_VIDEO_WIDTH, MAX_TABLE_DIMENSION};
pub use marks::validate_href;
pub use table::{table_context, TableContext};

pub type CommandResult = Result<EditorState, Rejection>;

/// Why a command refused to run. Rejections are expected outcomes, not
/// faults: the document is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Rejection {
    #[error("Selection is not inside a table")]
    NotInTable,

    #[error("Tables cannot be nested")]
    NestedTable,

    #[error("Position {0} is out of range")]
    InvalidPosition(usize),

    #[error("Expected {expected} at position {position}, found {found}")]
    NodeMismatch {
        position: usize,
        expected: NodeKind,
        found: String,
    },

    #[error("No textblock at the selection")]
    NoTextblock,

    #[error("Selection is empty")]
    EmptySelection,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Schema violation: {0}")]
    SchemaViolation(#[from] SchemaError),
}

impl Rejection {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Rejection::InvalidArgument(message.into())
    }
}

fn default_true() -> bool {
    true
}

/// A single atomic edit. Serializable so hosts can script edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    SetSelection {
        anchor: usize,
        head: usize,
    },
    SelectAll,

    /// Replace the selection with text; `\n` becomes a hard break
    InsertText {
        text: String,
    },
    DeleteSelection,
    SplitBlock,

    /// Toggle bold, italic or underline
    ToggleMark {
        mark: MarkType,
    },
    SetHighlight {
        color: String,
    },
    UnsetHighlight,
    SetLink {
        href: String,
    },
    UnsetLink,
    /// Remove every mark from the selection
    ClearFormatting,

    SetParagraph,
    ToggleHeading {
        level: u8,
    },
    ToggleBlockquote,
    ToggleBulletList,
    ToggleOrderedList,

    InsertImage {
        src: String,
        #[serde(default)]
        alt: Option<String>,
        #[serde(default)]
        title: Option<String>,
    },
    InsertEmbeddedVideo {
        url: String,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    InsertTable {
        rows: usize,
        cols: usize,
        #[serde(default = "default_true")]
        with_header_row: bool,
    },

    AddRowBefore,
    AddRowAfter,
    DeleteRow,
    AddColumnBefore,
    AddColumnAfter,
    DeleteColumn,
    ToggleHeaderRow,
    DeleteTable,

    /// Set (`Some`) or remove (`None`) attributes on the node at `position`,
    /// provided it is still of kind `expect`
    PatchAttrs {
        position: usize,
        expect: NodeKind,
        attrs: BTreeMap<String, Option<String>>,
    },
    /// Remove the node at `position`, provided it is still of kind `expect`
    DeleteNodeAt {
        position: usize,
        expect: NodeKind,
    },
}

impl Command {
    /// Apply this command to a state
    pub fn apply(&self, state: &EditorState) -> CommandResult {
        match self {
            Command::SetSelection { anchor, head } => text::set_selection(state, *anchor, *head),
            Command::SelectAll => text::select_all(state),
            Command::InsertText { text } => text::insert_text(state, text),
            Command::DeleteSelection => text::delete_selection(state),
            Command::SplitBlock => text::split_block(state),

            Command::ToggleMark { mark } => marks::toggle_mark(state, *mark),
            Command::SetHighlight { color } => marks::set_highlight(state, color),
            Command::UnsetHighlight => marks::unset_highlight(state),
            Command::SetLink { href } => marks::set_link(state, href),
            Command::UnsetLink => marks::unset_link(state),
            Command::ClearFormatting => marks::clear_formatting(state),

            Command::SetParagraph => blocks::set_paragraph(state),
            Command::ToggleHeading { level } => blocks::toggle_heading(state, *level),
            Command::ToggleBlockquote => blocks::toggle_blockquote(state),
            Command::ToggleBulletList => blocks::toggle_list(state, NodeKind::BulletList),
            Command::ToggleOrderedList => blocks::toggle_list(state, NodeKind::OrderedList),

            Command::InsertImage { src, alt, title } => {
                insert::insert_image(state, src, alt.as_deref(), title.as_deref())
            }
            Command::InsertEmbeddedVideo { url, width, height } => {
                insert::insert_video(state, url, *width, *height)
            }
            Command::InsertTable {
                rows,
                cols,
                with_header_row,
            } => insert::insert_table(state, *rows, *cols, *with_header_row),

            Command::AddRowBefore => table::add_row(state, false),
            Command::AddRowAfter => table::add_row(state, true),
            Command::DeleteRow => table::delete_row(state),
            Command::AddColumnBefore => table::add_column(state, false),
            Command::AddColumnAfter => table::add_column(state, true),
            Command::DeleteColumn => table::delete_column(state),
            Command::ToggleHeaderRow => table::toggle_header_row(state),
            Command::DeleteTable => table::delete_table(state),

            Command::PatchAttrs {
                position,
                expect,
                attrs,
            } => nodes::patch_attrs(state, *position, *expect, attrs),
            Command::DeleteNodeAt { position, expect } => {
                nodes::delete_node_at(state, *position, *expect)
            }
        }
    }

    /// Short name used in logs and history descriptions
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetSelection { .. } => "setSelection",
            Command::SelectAll => "selectAll",
            Command::InsertText { .. } => "insertText",
            Command::DeleteSelection => "deleteSelection",
            Command::SplitBlock => "splitBlock",
            Command::ToggleMark { .. } => "toggleMark",
            Command::SetHighlight { .. } => "setHighlight",
            Command::UnsetHighlight => "unsetHighlight",
            Command::SetLink { .. } => "setLink",
            Command::UnsetLink => "unsetLink",
            Command::ClearFormatting => "clearFormatting",
            Command::SetParagraph => "setParagraph",
            Command::ToggleHeading { .. } => "toggleHeading",
            Command::ToggleBlockquote => "toggleBlockquote",
            Command::ToggleBulletList => "toggleBulletList",
            Command::ToggleOrderedList => "toggleOrderedList",
            Command::InsertImage { .. } => "insertImage",
            Command::InsertEmbeddedVideo { .. } => "insertEmbeddedVideo",
            Command::InsertTable { .. } => "insertTable",
            Command::AddRowBefore => "addRowBefore",
            Command::AddRowAfter => "addRowAfter",
            Command::DeleteRow => "deleteRow",
            Command::AddColumnBefore => "addColumnBefore",
            Command::AddColumnAfter => "addColumnAfter",
            Command::DeleteColumn => "deleteColumn",
            Command::ToggleHeaderRow => "toggleHeaderRow",
            Command::DeleteTable => "deleteTable",
            Command::PatchAttrs { .. } => "patchAttrs",
            Command::DeleteNodeAt { .. } => "deleteNodeAt",
        }
    }

    /// Whether this is one of the structural table edits
    pub fn requires_table(&self) -> bool {
        matches!(
            self,
            Command::AddRowBefore
                | Command::AddRowAfter
                | Command::DeleteRow
                | Command::AddColumnBefore
                | Command::AddColumnAfter
                | Command::DeleteColumn
                | Command::ToggleHeaderRow
                | Command::DeleteTable
        )
    }
}

/// An ordered, all-or-nothing sequence of commands
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain {
    commands: Vec<Command>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(command: Command) -> Self {
        Self {
            commands: vec![command],
        }
    }

    /// Append a command (builder style)
    pub fn then(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn push(&mut self, command: Command) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Human readable summary, used as the undo description
    pub fn describe(&self) -> String {
        self.commands
            .iter()
            .map(Command::name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Run every command in order. On the first rejection the whole chain is
    /// rejected and `state` is untouched.
    pub fn run(&self, state: &EditorState) -> CommandResult {
        let mut current = state.clone();

        for (index, command) in self.commands.iter().enumerate() {
            let step = command.apply(&current).and_then(|next| {
                validate(&next.doc)?;
                Ok(next)
            });

            current = match step {
                Ok(next) => next,
                Err(reason) => {
                    debug!(index, command = command.name(), %reason, "chain rejected");
                    return Err(reason);
                }
            };
        }

        Ok(current)
    }
}

impl From<Vec<Command>> for Chain {
    fn from(commands: Vec<Command>) -> Self {
        Self { commands }
    }
}

impl FromIterator<Command> for Chain {
    fn from_iter<I: IntoIterator<Item = Command>>(iter: I) -> Self {
        Self {
            commands: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serde_shape() {
        let json = r#"{"command":"insertTable","rows":2,"cols":3}"#;
        let command: Command = serde_json::from_str(json).unwrap();
        assert_eq!(
            command,
            Command::InsertTable {
                rows: 2,
                cols: 3,
                with_header_row: true
            }
        );

        let json = serde_json::to_string(&Command::ToggleMark {
            mark: MarkType::Italic,
        })
        .unwrap();
        assert_eq!(json, r#"{"command":"toggleMark","mark":"italic"}"#);
    }

    #[test]
    fn test_chain_is_atomic() {
        let state = EditorState::from_html("<p>hello</p>");
        let chain = Chain::new()
            .then(Command::SetSelection { anchor: 1, head: 6 })
            .then(Command::ToggleMark {
                mark: MarkType::Bold,
            })
            .then(Command::AddRowAfter);

        assert_eq!(chain.run(&state), Err(Rejection::NotInTable));
        assert_eq!(state.html(), "<p>hello</p>");
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let state = EditorState::from_html("<p>x</p>");
        assert_eq!(Chain::new().run(&state), Ok(state));
    }

    #[test]
    fn test_describe() {
        let chain = Chain::from(vec![Command::SelectAll, Command::ClearFormatting]);
        assert_eq!(chain.describe(), "selectAll, clearFormatting");
    }
}
