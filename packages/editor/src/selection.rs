//! # Selection
//!
//! A pair of positions. `anchor` stays put while the user extends the
//! selection, `head` moves. The selection is collapsed (a caret) when both
//! are equal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    /// A collapsed selection
    pub fn cursor(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Apply `f` to both ends, keeping the direction
    pub fn map(self, mut f: impl FnMut(usize) -> usize) -> Self {
        Self::new(f(self.anchor), f(self.head))
    }

    /// Clamp both ends to `0..=max`
    pub fn clamp(self, max: usize) -> Self {
        self.map(|pos| pos.min(max))
    }
}

impl Default for Selection {
    fn default() -> Self {
        Self::cursor(0)
    }
}
