//! # Undo/Redo Stack
//!
//! Tracks document history as snapshot pairs.
//!
//! ## Design
//!
//! - Each recorded step keeps the snapshot before and after the change
//! - Undo restores the `before` snapshot and moves the step to the redo stack
//! - Redo restores the `after` snapshot
//! - New steps clear the redo stack
//! - Batches group several steps into one undo step
//!
//! ## Example
//!
//! ```rust
//! use folio_editor::{Selection, Snapshot, UndoStack};
//! use folio_schema::parse;
//!
//! let mut stack = UndoStack::new();
//! let before = Snapshot::new(parse("<p>a</p>"), Selection::cursor(1));
//! let after = Snapshot::new(parse("<p>ab</p>"), Selection::cursor(2));
//!
//! stack.record(before.clone(), after, Some("insertText"));
//! assert_eq!(stack.undo(), Some(before));
//! ```

use crate::selection::Selection;
use folio_schema::Document;

/// Document and selection at one point in history
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub doc: Document,
    pub selection: Selection,
}

impl Snapshot {
    pub fn new(doc: Document, selection: Selection) -> Self {
        Self { doc, selection }
    }
}

/// One undoable step (possibly several recorded changes)
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub before: Snapshot,
    pub after: Snapshot,

    /// Optional description of this step
    pub description: Option<String>,
}

#[derive(Debug, Default)]
struct PendingBatch {
    before: Option<Snapshot>,
    after: Option<Snapshot>,
    description: Option<String>,
}

/// Undo/redo stack for an editing session
#[derive(Debug)]
pub struct UndoStack {
    /// Applied steps (most recent last)
    undo_stack: Vec<HistoryEntry>,

    /// Undone steps (most recent last)
    redo_stack: Vec<HistoryEntry>,

    /// Maximum number of undo levels (0 = unlimited)
    max_levels: usize,

    /// Currently building a batch
    current_batch: Option<PendingBatch>,
}

impl UndoStack {
    /// Create a new undo stack with default max levels (100)
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
        }
    }

    /// Record a change. Inside a batch the change extends the batch.
    pub fn record(&mut self, before: Snapshot, after: Snapshot, description: Option<&str>) {
        if let Some(batch) = &mut self.current_batch {
            if batch.before.is_none() {
                batch.before = Some(before);
            }
            batch.after = Some(after);
            if batch.description.is_none() {
                batch.description = description.map(str::to_string);
            }
            return;
        }

        self.push_entry(HistoryEntry {
            before,
            after,
            description: description.map(str::to_string),
        });
    }

    /// Start a batch of changes (undone/redone together)
    pub fn begin_batch(&mut self) {
        self.current_batch = Some(PendingBatch::default());
    }

    /// End the current batch and push it to the undo stack
    pub fn end_batch(&mut self) {
        if let Some(PendingBatch {
            before: Some(before),
            after: Some(after),
            description,
        }) = self.current_batch.take()
        {
            self.push_entry(HistoryEntry {
                before,
                after,
                description,
            });
        }
    }

    pub fn is_batching(&self) -> bool {
        self.current_batch.is_some()
    }

    /// Set description for current batch (if batching)
    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if let Some(batch) = &mut self.current_batch {
            batch.description = Some(description.into());
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // a new change invalidates the undone future
        self.redo_stack.clear();
    }

    /// Pop the most recent step; returns the snapshot to restore
    pub fn undo(&mut self) -> Option<Snapshot> {
        self.end_batch();
        let entry = self.undo_stack.pop()?;
        let snapshot = entry.before.clone();
        self.redo_stack.push(entry);
        Some(snapshot)
    }

    /// Reapply the most recently undone step; returns the snapshot to restore
    pub fn redo(&mut self) -> Option<Snapshot> {
        self.end_batch();
        let entry = self.redo_stack.pop()?;
        let snapshot = entry.after.clone();
        self.undo_stack.push(entry);
        Some(snapshot)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    /// Clear all undo/redo history
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
    }

    /// Description of the next undo step
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }

    /// Description of the next redo step
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|entry| entry.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}
