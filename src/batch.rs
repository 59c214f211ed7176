//! Per-frame coalescing.
//!
//! Pointer input can arrive many times per frame. The controller parks the
//! latest sample (and the changes it produced) in a [`PendingBatch`] and
//! processes it once on the next frame tick.

use crate::changes::ChangeSet;

/// Single-slot queue: at most one value waits for the next flush.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBatch<T> {
    slot: Option<T>,
}

impl<T> Default for PendingBatch<T> {
    fn default() -> Self {
        Self { slot: None }
    }
}

impl<T> PendingBatch<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `value`, replacing whatever was waiting.
    ///
    /// Returns `true` if the slot was empty, i.e. a frame must be requested.
    pub fn replace(&mut self, value: T) -> bool {
        self.slot.replace(value).is_none()
    }

    /// Folds `value` into the waiting value with `merge`, or parks it.
    pub fn merge_with(&mut self, value: T, merge: impl FnOnce(&mut T, T)) -> bool {
        match self.slot.as_mut() {
            Some(existing) => {
                merge(existing, value);
                false
            }
            None => {
                self.slot = Some(value);
                true
            }
        }
    }

    pub fn take(&mut self) -> Option<T> {
        self.slot.take()
    }

    pub fn is_pending(&self) -> bool {
        self.slot.is_some()
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }
}

impl PendingBatch<ChangeSet> {
    /// Appends `changes` to the waiting change-set, keeping event order.
    pub fn push_changes(&mut self, changes: ChangeSet) -> bool {
        if changes.is_empty() {
            return false;
        }
        self.merge_with(changes, |existing, next| existing.extend(next))
    }
}
