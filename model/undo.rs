/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Snapshot-based undo history.
//!
//! A checkpoint commits the state handed in *after* a mutation completed.
//! `undo` returns the state of the previous checkpoint; changes made since
//! the last checkpoint are discarded by it.

pub(crate) const DEFAULT_MAX_UNDO_STEPS: usize = 128;

pub(crate) struct UndoLog<S> {
    /// State as of the most recent checkpoint.
    committed: S,
    undo_stack: Vec<S>,
    redo_stack: Vec<S>,
    max_steps: usize,
    checkpoints: u64,
}

impl<S: Clone> UndoLog<S> {
    pub(crate) fn new(initial: S, max_steps: usize) -> Self {
        Self {
            committed: initial,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_steps,
            checkpoints: 0,
        }
    }

    /// Record `current` as one undoable unit.
    pub(crate) fn checkpoint(&mut self, current: S) {
        let previous = std::mem::replace(&mut self.committed, current);
        self.undo_stack.push(previous);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_steps {
            let excess = self.undo_stack.len() - self.max_steps;
            self.undo_stack.drain(0..excess);
        }
        self.checkpoints = self.checkpoints.saturating_add(1);
    }

    /// Step back one checkpoint; returns the state to restore.
    pub(crate) fn undo(&mut self) -> Option<S> {
        let previous = self.undo_stack.pop()?;
        let current = std::mem::replace(&mut self.committed, previous.clone());
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Re-apply one undone checkpoint; returns the state to restore.
    pub(crate) fn redo(&mut self) -> Option<S> {
        let next = self.redo_stack.pop()?;
        let current = std::mem::replace(&mut self.committed, next.clone());
        self.undo_stack.push(current);
        Some(next)
    }

    pub(crate) fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub(crate) fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// Total checkpoints recorded since creation, including trimmed ones.
    pub(crate) fn checkpoint_count(&self) -> u64 {
        self.checkpoints
    }
}
