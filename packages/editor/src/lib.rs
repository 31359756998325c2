//! # Folio Editor
//!
//! Editing engine on top of [`folio_schema`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ toolbar / interaction plugins / media dialog│
//! │  - Translate UI events into command chains  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: the single mutator                 │
//! │  - Run chains atomically                    │
//! │  - Post-effects, undo history, revisions    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ sync: canonical HTML out, host content in   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Commands are the only mutation path**: states are immutable values
//! 2. **Chains are atomic**: a rejected step rejects the whole chain
//! 3. **Only valid documents leave the engine**: every step is validated
//! 4. **Captured positions are revalidated**: stale media targets are never written
//!
//! ## Usage
//!
//! ```rust
//! use folio_editor::{Chain, Command, EditorConfig, EditorSession};
//!
//! let mut session = EditorSession::create(EditorConfig::default(), "<p>Hello</p>");
//! session.on_change(|html| println!("{html}"));
//!
//! session
//!     .dispatch(
//!         &Chain::new()
//!             .then(Command::SelectAll)
//!             .then(Command::ToggleHeading { level: 1 }),
//!     )
//!     .unwrap();
//! assert_eq!(session.html(), "<h1>Hello</h1><p></p>");
//! ```

pub mod commands;
mod config;
mod errors;
pub mod media;
pub mod plugin;
mod post_effects;
pub mod query;
mod selection;
mod session;
mod state;
mod sync;
pub mod toolbar;
mod undo_stack;

pub use commands::{Chain, Command, CommandResult, Rejection};
pub use config::EditorConfig;
pub use errors::{EditorError, EditorResult};
pub use media::{
    AssetError, AssetFile, AssetStore, CompletedUpload, MediaController, MediaDialog, MediaError,
    MediaOutcome, MediaTarget, StoredAsset, UploadTicket,
};
pub use plugin::{
    ClickOutcome, InteractionLayer, InteractionPlugin, LayoutBoxes, NodeClickPlugin, Point,
    PositionHit, PositionMapper, Rect,
};
pub use post_effects::{PostEffect, PostEffectEngine, TrailingParagraph};
pub use query::BlockType;
pub use selection::Selection;
pub use session::{DispatchOutcome, EditorSession};
pub use state::EditorState;
pub use sync::{ChangeListener, SyncBridge};
pub use toolbar::{TableControls, Toolbar, ToolbarAction, ToolbarOutcome, ToolbarState};
pub use undo_stack::{HistoryEntry, Snapshot, UndoStack};
