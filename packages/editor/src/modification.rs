//! Dirty tracking relative to the last clean point.
//!
//! The count moves by one per recorded history entry: +1 on a new entry or
//! redo, −1 on undo. Zero means the document matches the clean point, unless
//! that point was on a redo branch that has since been discarded.

use tracing::debug;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModificationTracker {
    count: i64,
    clean_lost: bool,
}

impl ModificationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn is_dirty(&self) -> bool {
        self.count != 0 || self.clean_lost
    }

    /// Shift the count. Returns the new dirty state if it flipped.
    pub fn record(&mut self, delta: i64) -> Option<bool> {
        self.transition(|t| t.count += delta)
    }

    /// The current state becomes the clean point
    pub fn mark_clean(&mut self) -> Option<bool> {
        self.transition(|t| {
            t.count = 0;
            t.clean_lost = false;
        })
    }

    /// The clean point was discarded with the redo stack and can no longer
    /// be reached
    pub fn lose_clean_point(&mut self) -> Option<bool> {
        self.transition(|t| t.clean_lost = true)
    }

    fn transition(&mut self, change: impl FnOnce(&mut Self)) -> Option<bool> {
        let before = self.is_dirty();
        change(self);
        let after = self.is_dirty();
        if before == after {
            return None;
        }
        debug!(dirty = after, count = self.count, "document state changed");
        Some(after)
    }
}
