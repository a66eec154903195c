//! Bounded undo/redo snapshot stacks.
//!
//! # Invariants
//! - Two adjacent entries on one stack are never content-identical.
//! - Each stack holds at most its configured limit; oldest entries go first.
//! - Recording a new forward edit clears the redo stack.

use crate::model::snapshot::Snapshot;
use serde::{Deserialize, Serialize};

pub const DEFAULT_UNDO_LIMIT: usize = 50;
pub const DEFAULT_REDO_LIMIT: usize = 50;

/// In-memory depth limits of the history stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryLimits {
    pub max_undo: usize,
    pub max_redo: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            max_undo: DEFAULT_UNDO_LIMIT,
            max_redo: DEFAULT_REDO_LIMIT,
        }
    }
}

/// Undo/redo stacks, most recent entry last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryStacks {
    undo: Vec<Snapshot>,
    redo: Vec<Snapshot>,
    limits: HistoryLimits,
}

impl HistoryStacks {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limits,
        }
    }

    /// Rebuilds stacks from persisted entries, re-applying dedup and caps.
    pub fn from_parts(undo: Vec<Snapshot>, redo: Vec<Snapshot>, limits: HistoryLimits) -> Self {
        Self {
            undo: retain_recent(undo, limits.max_undo),
            redo: retain_recent(redo, limits.max_redo),
            limits,
        }
    }

    /// Records the state before a forward edit.
    ///
    /// Returns `false` when `snapshot` equals the current top and was
    /// dropped. The redo stack is cleared either way.
    pub fn record(&mut self, snapshot: Snapshot) -> bool {
        self.redo.clear();
        push_capped(&mut self.undo, snapshot, self.limits.max_undo)
    }

    /// Steps back: returns the state to restore and parks `current` on redo.
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let previous = self.undo.pop()?;
        push_capped(&mut self.redo, current, self.limits.max_redo);
        Some(previous)
    }

    /// Steps forward: returns the state to restore and parks `current` on undo.
    pub fn redo(&mut self, current: Snapshot) -> Option<Snapshot> {
        let next = self.redo.pop()?;
        push_capped(&mut self.undo, current, self.limits.max_undo);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Undo entries, oldest first.
    pub fn undo_entries(&self) -> &[Snapshot] {
        &self.undo
    }

    /// Redo entries, oldest first.
    pub fn redo_entries(&self) -> &[Snapshot] {
        &self.redo
    }

    pub fn limits(&self) -> HistoryLimits {
        self.limits
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

fn push_capped(stack: &mut Vec<Snapshot>, snapshot: Snapshot, limit: usize) -> bool {
    if stack.last().is_some_and(|top| top.same_content(&snapshot)) {
        return false;
    }
    stack.push(snapshot);
    if stack.len() > limit {
        let overflow = stack.len() - limit;
        stack.drain(..overflow);
    }
    true
}

/// Drops entries equal to their predecessor, then keeps the newest `limit`.
pub fn retain_recent(entries: Vec<Snapshot>, limit: usize) -> Vec<Snapshot> {
    let mut deduped: Vec<Snapshot> = Vec::with_capacity(entries.len());
    for entry in entries {
        if deduped.last().is_some_and(|last| last.same_content(&entry)) {
            continue;
        }
        deduped.push(entry);
    }
    let overflow = deduped.len().saturating_sub(limit);
    deduped.drain(..overflow);
    deduped
}
