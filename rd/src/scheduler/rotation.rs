//! Rotation state for the scheduler

use std::time::Duration;

use keywordstore::TrackedKeyword;

/// Ordered snapshot of tracked keywords plus the next-check cursor.
///
/// The snapshot is replaced wholesale on refresh, never edited in place, so
/// the cursor can only drift out of bounds at a replace boundary - where it
/// is reset. Invariant: when the snapshot is non-empty the cursor is always
/// in `[0, len)`.
#[derive(Debug, Default)]
pub struct Rotation {
    keywords: Vec<TrackedKeyword>,
    cursor: usize,
}

impl Rotation {
    /// Replace the snapshot. The cursor is preserved when still in bounds
    /// (so a refresh mid-rotation does not restart the cycle) and reset to 0
    /// when the new snapshot is shorter than the cursor position.
    pub fn replace(&mut self, keywords: Vec<TrackedKeyword>) {
        self.keywords = keywords;
        if self.cursor >= self.keywords.len() {
            self.cursor = 0;
        }
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// The keyword the next tick will check
    pub fn current(&self) -> Option<&TrackedKeyword> {
        self.keywords.get(self.cursor)
    }

    /// Advance past the keyword just checked.
    ///
    /// `len_at_selection` is the rotation length as refreshed at the start
    /// of the tick that is now completing; using it keeps the advance
    /// consistent with the selection even if the snapshot was replaced while
    /// the check was in flight. The bounds re-check restores the invariant
    /// when that replacement shrank the snapshot.
    pub fn advance(&mut self, len_at_selection: usize) {
        if len_at_selection == 0 {
            return;
        }
        self.cursor = (self.cursor + 1) % len_at_selection;
        if self.cursor >= self.keywords.len() {
            self.cursor = 0;
        }
    }

    /// Pending work order: the stored order rotated so the next keyword to
    /// be checked comes first. Does not move the cursor.
    pub fn queue(&self) -> Vec<TrackedKeyword> {
        if self.keywords.is_empty() {
            return Vec::new();
        }
        let mut queue = Vec::with_capacity(self.keywords.len());
        queue.extend_from_slice(&self.keywords[self.cursor..]);
        queue.extend_from_slice(&self.keywords[..self.cursor]);
        queue
    }

    #[cfg(test)]
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }
}

/// Snapshot of the scheduler's configuration for the control surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerState {
    pub interval: Duration,
    pub running: bool,
}
