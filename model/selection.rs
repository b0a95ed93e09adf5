/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Spot/link selection with pausable change notification.

use std::collections::HashSet;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::model::RemovedKeys;
use crate::model::graph::{LinkKey, SpotGraph, SpotKey};

/// Observer for selection changes.
///
/// Called with the selection lock held: implementations must not call back
/// into the `Model` selection API.
pub trait SelectionListener: Send + Sync {
    fn selection_changed(&self, selection: &Selection);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionUpdateMode {
    Replace,
    Add,
    Toggle,
}

/// Set of selected spots and links.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    spots: HashSet<SpotKey>,
    links: HashSet<LinkKey>,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.spots.is_empty() && self.links.is_empty()
    }

    pub fn spots(&self) -> &HashSet<SpotKey> {
        &self.spots
    }

    pub fn links(&self) -> &HashSet<LinkKey> {
        &self.links
    }

    pub fn contains_spot(&self, key: SpotKey) -> bool {
        self.spots.contains(&key)
    }

    pub fn contains_link(&self, key: LinkKey) -> bool {
        self.links.contains(&key)
    }
}

/// Canonical selection state.
///
/// Every change bumps `revision` and notifies listeners, unless listeners are
/// paused: then a single notification is emitted when the outermost pause
/// ends, and only if something changed in between.
#[derive(Default)]
pub(crate) struct SelectionModel {
    current: Selection,
    revision: u64,
    pause_depth: u32,
    changed_while_paused: bool,
    listeners: Vec<Arc<dyn SelectionListener>>,
}

impl SelectionModel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn current(&self) -> &Selection {
        &self.current
    }

    /// Monotonic revision incremented whenever the selection changes.
    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn add_listener(&mut self, listener: Arc<dyn SelectionListener>) {
        self.listeners.push(listener);
    }

    pub(crate) fn update_spots(&mut self, keys: Vec<SpotKey>, mode: SelectionUpdateMode) {
        let changed = update_set(&mut self.current.spots, keys, mode);
        if changed {
            self.mark_changed();
        }
    }

    pub(crate) fn update_links(&mut self, keys: Vec<LinkKey>, mode: SelectionUpdateMode) {
        let changed = update_set(&mut self.current.links, keys, mode);
        if changed {
            self.mark_changed();
        }
    }

    pub(crate) fn clear(&mut self) {
        if self.current.is_empty() {
            return;
        }
        self.current.spots.clear();
        self.current.links.clear();
        self.mark_changed();
    }

    /// Replace the whole selection, e.g. when restoring an undo snapshot.
    pub(crate) fn replace(&mut self, selection: Selection) {
        if self.current == selection {
            return;
        }
        self.current = selection;
        self.mark_changed();
    }

    /// Drop keys removed during the last edit batch, even when a later
    /// insertion reused the index, then keys with no object in `graph`.
    pub(crate) fn prune(&mut self, graph: &SpotGraph, removed: &RemovedKeys) {
        let spots_before = self.current.spots.len();
        let links_before = self.current.links.len();
        for key in &removed.spots {
            self.current.spots.remove(key);
        }
        for key in &removed.links {
            self.current.links.remove(key);
        }
        self.current.spots.retain(|key| graph.contains_spot(*key));
        self.current.links.retain(|key| graph.contains_link(*key));
        if self.current.spots.len() != spots_before || self.current.links.len() != links_before {
            self.mark_changed();
        }
    }

    pub(crate) fn pause_listeners(&mut self) {
        self.pause_depth = self.pause_depth.saturating_add(1);
    }

    pub(crate) fn resume_listeners(&mut self) {
        self.pause_depth = self.pause_depth.saturating_sub(1);
        if self.pause_depth == 0 && self.changed_while_paused {
            self.changed_while_paused = false;
            self.notify();
        }
    }

    fn mark_changed(&mut self) {
        self.revision = self.revision.saturating_add(1);
        if self.pause_depth > 0 {
            self.changed_while_paused = true;
        } else {
            self.notify();
        }
    }

    fn notify(&self) {
        for listener in &self.listeners {
            listener.selection_changed(&self.current);
        }
    }
}

fn update_set<K: Copy + Eq + std::hash::Hash>(
    set: &mut HashSet<K>,
    keys: Vec<K>,
    mode: SelectionUpdateMode,
) -> bool {
    match mode {
        SelectionUpdateMode::Replace => {
            let replacement: HashSet<K> = keys.into_iter().collect();
            if *set == replacement {
                return false;
            }
            *set = replacement;
            true
        }
        SelectionUpdateMode::Add => {
            let mut changed = false;
            for key in keys {
                changed |= set.insert(key);
            }
            changed
        }
        SelectionUpdateMode::Toggle => {
            let before = set.clone();
            for key in keys {
                if !set.remove(&key) {
                    set.insert(key);
                }
            }
            *set != before
        }
    }
}

/// Scoped listener pause.
///
/// Pauses selection notifications on construction and resumes them on drop,
/// which also covers early returns and unwinding.
pub(crate) struct ListenerPause<'a> {
    selection: &'a mut SelectionModel,
}

impl<'a> ListenerPause<'a> {
    pub(crate) fn new(selection: &'a mut SelectionModel) -> Self {
        selection.pause_listeners();
        Self { selection }
    }
}

impl Deref for ListenerPause<'_> {
    type Target = SelectionModel;

    fn deref(&self) -> &Self::Target {
        self.selection
    }
}

impl DerefMut for ListenerPause<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.selection
    }
}

impl Drop for ListenerPause<'_> {
    fn drop(&mut self) {
        self.selection.resume_listeners();
    }
}
