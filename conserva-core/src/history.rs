//! # Undo / Redo
//!
//! Linear history over full layer-array snapshots.
//!
//! ```text
//! snapshot(current) : undo.push(clone(current)), redo.clear()
//! undo(current)     : entry = undo.pop(); redo.push(current); install(entry)
//! redo(current)     : entry = redo.pop(); undo.push(current); install(entry)
//! ```
//!
//! Snapshots are never taken automatically; callers record the state they
//! are about to change.

use std::collections::VecDeque;

use crate::layer::Layer;

/// Default maximum number of undo levels to keep.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Bounded undo/redo stacks of layer snapshots.
#[derive(Debug, Clone)]
pub struct History {
    /// Older states, most recent at the back.
    undo: VecDeque<Vec<Layer>>,
    /// States undone from, most recent at the back.
    redo: VecDeque<Vec<Layer>>,
    /// Maximum depth of each stack (oldest entries dropped when exceeded).
    limit: usize,
}

impl History {
    /// Create an empty history with the default limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create an empty history holding at most `limit` entries per stack.
    ///
    /// A limit of zero is raised to one.
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    /// Maximum depth of each stack.
    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Record `current` as an undo point and clear the redo stack.
    pub fn snapshot(&mut self, current: &[Layer]) {
        push_bounded(&mut self.undo, current.to_vec(), self.limit);
        self.redo.clear();
        tracing::trace!(depth = self.undo.len(), "History snapshot");
    }

    /// Step back one entry.
    ///
    /// Returns the layers to install, or `None` when there is nothing to undo.
    pub fn undo(&mut self, current: &[Layer]) -> Option<Vec<Layer>> {
        let entry = self.undo.pop_back()?;
        push_bounded(&mut self.redo, current.to_vec(), self.limit);
        tracing::debug!(undo = self.undo.len(), redo = self.redo.len(), "Undo");
        Some(entry)
    }

    /// Step forward one entry.
    ///
    /// Returns the layers to install, or `None` when there is nothing to redo.
    pub fn redo(&mut self, current: &[Layer]) -> Option<Vec<Layer>> {
        let entry = self.redo.pop_back()?;
        push_bounded(&mut self.undo, current.to_vec(), self.limit);
        tracing::debug!(undo = self.undo.len(), redo = self.redo.len(), "Redo");
        Some(entry)
    }

    /// Whether `undo` would do anything.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether `redo` would do anything.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo entries.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    /// Number of redo entries.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Drop both stacks.
    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

fn push_bounded(stack: &mut VecDeque<Vec<Layer>>, entry: Vec<Layer>, limit: usize) {
    if stack.len() >= limit {
        stack.pop_front();
    }
    stack.push_back(entry);
}
