/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Shared tracking model: spot graph, tags, selection and undo history.
//!
//! Locking: graph and tags live behind one reader/writer lock. The selection
//! and the undo log each have their own mutex. Lock order is always
//! data → selection → undo.

pub mod graph;
pub mod selection;
pub mod tags;
pub mod transaction;
pub(crate) mod undo;

use std::fmt::Write as _;
use std::sync::Arc;

use log::info;
use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use rand::Rng;

use crate::model::graph::{LinkKey, Spot, SpotGraph, SpotKey};
use crate::model::selection::{Selection, SelectionListener, SelectionModel, SelectionUpdateMode};
use crate::model::tags::{TagError, TagSetId, TagSetModel};
use crate::model::undo::{DEFAULT_MAX_UNDO_STEPS, UndoLog};

/// Observer for structural graph changes.
///
/// Called once per completed mutation batch, with the write lock still held
/// and a view of the mutated graph. Implementations must not call back into
/// the `Model` locking API.
pub trait GraphListener: Send + Sync {
    fn graph_changed(&self, graph: &SpotGraph);
}

/// Keys removed from the graph since the last edit batch was committed.
///
/// StableGraph hands freed indices to later insertions, so a removed key
/// can name a different object by the time the batch ends.
#[derive(Debug, Clone, Default)]
pub(crate) struct RemovedKeys {
    pub(crate) spots: Vec<SpotKey>,
    pub(crate) links: Vec<LinkKey>,
}

/// Graph and tag state guarded by the model lock.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    graph: SpotGraph,
    tags: TagSetModel,
    removed: RemovedKeys,
}

impl ModelData {
    pub fn graph(&self) -> &SpotGraph {
        &self.graph
    }

    pub fn tags(&self) -> &TagSetModel {
        &self.tags
    }

    pub fn add_spot(&mut self, frame: u32, position: [f64; 3], radius: f64) -> SpotKey {
        self.graph.add_spot(frame, position, radius)
    }

    pub fn add_link(&mut self, source: SpotKey, target: SpotKey, cost: f64) -> Option<LinkKey> {
        self.graph.add_link(source, target, cost)
    }

    pub fn spot_mut(&mut self, key: SpotKey) -> Option<&mut Spot> {
        self.graph.get_spot_mut(key)
    }

    /// Remove a link and its tag assignments.
    pub fn remove_link(&mut self, key: LinkKey) -> bool {
        if !self.graph.remove_link(key) {
            return false;
        }
        self.tags.forget_link(key);
        self.removed.links.push(key);
        true
    }

    /// Remove a spot, its incident links and all their tag assignments.
    ///
    /// Returns the incident links removed along with the spot.
    pub fn remove_spot(&mut self, key: SpotKey) -> Option<Vec<LinkKey>> {
        let incident = self.graph.remove_spot(key)?;
        for link in &incident {
            self.tags.forget_link(*link);
        }
        self.tags.forget_spot(key);
        self.removed.spots.push(key);
        self.removed.links.extend_from_slice(&incident);
        Some(incident)
    }

    pub(crate) fn take_removed(&mut self) -> RemovedKeys {
        std::mem::take(&mut self.removed)
    }

    /// Plain-text listing of spots (ordered by frame) and links.
    ///
    /// `max_lines` limits each of the two tables.
    pub fn dump(&self, max_lines: usize) -> String {
        let mut spots: Vec<(SpotKey, &Spot)> = self.graph.spots().collect();
        spots.sort_by_key(|(key, spot)| (spot.frame, *key));

        let mut out = String::new();
        let _ = writeln!(out, "Spots ({}):", self.graph.spot_count());
        let _ = writeln!(
            out,
            "{:>8} {:>6} {:>10} {:>10} {:>10} {:>8}  Label",
            "Key", "Frame", "X", "Y", "Z", "Radius"
        );
        for (key, spot) in spots.iter().take(max_lines) {
            let _ = writeln!(
                out,
                "{:>8} {:>6} {:>10.2} {:>10.2} {:>10.2} {:>8.2}  {}",
                key.index(),
                spot.frame,
                spot.position[0],
                spot.position[1],
                spot.position[2],
                spot.radius,
                spot.label
            );
        }
        if spots.len() > max_lines {
            let _ = writeln!(out, "... {} more", spots.len() - max_lines);
        }

        let link_count = self.graph.link_count();
        let _ = writeln!(out, "Links ({link_count}):");
        let _ = writeln!(out, "{:>8} {:>8} {:>8} {:>10}", "Key", "Source", "Target", "Cost");
        for link in self.graph.links().take(max_lines) {
            let _ = writeln!(
                out,
                "{:>8} {:>8} {:>8} {:>10.3}",
                link.key.index(),
                link.source.index(),
                link.target.index(),
                link.cost
            );
        }
        if link_count > max_lines {
            let _ = writeln!(out, "... {} more", link_count - max_lines);
        }
        out
    }
}

/// Object counts reported by `Model::summary`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSummary {
    pub spots: usize,
    pub links: usize,
    pub tracks: usize,
}

impl std::fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "objects: {} spots, {} links and {} tracks.",
            self.spots, self.links, self.tracks
        )
    }
}

#[derive(Clone)]
struct ModelSnapshot {
    data: ModelData,
    selection: Selection,
}

pub struct Model {
    data: RwLock<ModelData>,
    selection: Mutex<SelectionModel>,
    undo: Mutex<UndoLog<ModelSnapshot>>,
    graph_listeners: RwLock<Vec<Arc<dyn GraphListener>>>,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    pub fn new() -> Self {
        Self::with_max_undo_steps(DEFAULT_MAX_UNDO_STEPS)
    }

    pub fn with_max_undo_steps(max_undo_steps: usize) -> Self {
        let initial = ModelSnapshot {
            data: ModelData::default(),
            selection: Selection::default(),
        };
        Self {
            data: RwLock::new(ModelData::default()),
            selection: Mutex::new(SelectionModel::new()),
            undo: Mutex::new(UndoLog::new(initial, max_undo_steps)),
            graph_listeners: RwLock::new(Vec::new()),
        }
    }

    /// Shared read access for traversals. Readers run concurrently with each
    /// other but never alongside a writer.
    pub fn read(&self) -> RwLockReadGuard<'_, ModelData> {
        self.data.read()
    }

    /// Apply one structural edit under the write lock.
    ///
    /// Selection entries for objects removed by `edit` are dropped, then
    /// graph listeners are notified exactly once. No undo checkpoint is
    /// recorded; call `set_undo_point` when the edit should be undoable.
    pub fn edit_graph<R>(&self, edit: impl FnOnce(&mut ModelData) -> R) -> R {
        let mut data = self.data.write();
        let result = edit(&mut *data);
        let removed = data.take_removed();
        self.selection.lock().prune(&data.graph, &removed);
        self.notify_graph_changed(&data.graph);
        result
    }

    pub fn add_graph_listener(&self, listener: Arc<dyn GraphListener>) {
        self.graph_listeners.write().push(listener);
    }

    pub fn add_selection_listener(&self, listener: Arc<dyn SelectionListener>) {
        self.selection.lock().add_listener(listener);
    }

    /// Snapshot of the current selection.
    pub fn selection(&self) -> Selection {
        self.selection.lock().current().clone()
    }

    pub fn selection_revision(&self) -> u64 {
        self.selection.lock().revision()
    }

    /// Update the spot selection. Keys of spots that do not exist are ignored.
    pub fn select_spots(&self, keys: impl IntoIterator<Item = SpotKey>, mode: SelectionUpdateMode) {
        let data = self.data.read();
        let live = keys
            .into_iter()
            .filter(|key| data.graph.contains_spot(*key))
            .collect();
        self.selection.lock().update_spots(live, mode);
    }

    /// Update the link selection. Keys of links that do not exist are ignored.
    pub fn select_links(&self, keys: impl IntoIterator<Item = LinkKey>, mode: SelectionUpdateMode) {
        let data = self.data.read();
        let live = keys
            .into_iter()
            .filter(|key| data.graph.contains_link(*key))
            .collect();
        self.selection.lock().update_links(live, mode);
    }

    /// Create a tag set with one tag per label. Tag colours are random and
    /// opaque. Records an undo point.
    pub fn create_tag_set(&self, name: &str, labels: &[&str]) -> TagSetId {
        let mut data = self.data.write();
        let mut rng = rand::thread_rng();
        let id = data
            .tags
            .create_tag_set(name, labels, || rng.r#gen::<u32>() | 0xFF00_0000);
        let selection = self.selection.lock();
        self.record_checkpoint(&data, selection.current());
        id
    }

    /// Change a tag colour. Records an undo point on success only.
    pub fn set_tag_color(&self, tag_set: &str, label: &str, r: u8, g: u8, b: u8) -> Result<(), TagError> {
        let mut data = self.data.write();
        let color = 0xFF00_0000 | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b);
        if let Err(err) = data.tags.set_color(tag_set, label, color) {
            log::error!("{err}");
            return Err(err);
        }
        let selection = self.selection.lock();
        self.record_checkpoint(&data, selection.current());
        Ok(())
    }

    pub fn describe_tags(&self) -> String {
        self.data.read().tags.describe()
    }

    /// Record the current state as one undoable unit.
    pub fn set_undo_point(&self) {
        let data = self.data.read();
        let selection = self.selection.lock();
        self.record_checkpoint(&data, selection.current());
    }

    /// Restore the state of the previous undo point. Returns `false` when
    /// there is nothing to undo.
    pub fn undo(&self) -> bool {
        self.restore_with(|log| log.undo())
    }

    /// Re-apply the last undone undo point. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&self) -> bool {
        self.restore_with(|log| log.redo())
    }

    /// Total undo points recorded since the model was created.
    pub fn checkpoint_count(&self) -> u64 {
        self.undo.lock().checkpoint_count()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.lock().undo_len()
    }

    pub fn redo_depth(&self) -> usize {
        self.undo.lock().redo_len()
    }

    /// Remove every spot and link, then record an undo point.
    pub fn clear(&self) {
        info!("Clearing model.");
        let mut data = self.data.write();
        data.graph = SpotGraph::new();
        data.tags.forget_all_assignments();
        let removed = data.take_removed();
        let mut selection = self.selection.lock();
        selection.prune(&data.graph, &removed);
        self.notify_graph_changed(&data.graph);
        self.record_checkpoint(&data, selection.current());
    }

    pub fn summary(&self) -> ModelSummary {
        let data = self.data.read();
        ModelSummary {
            spots: data.graph.spot_count(),
            links: data.graph.link_count(),
            tracks: data.graph.roots().len(),
        }
    }

    pub fn dump(&self, max_lines: usize) -> String {
        self.data.read().dump(max_lines)
    }

    fn record_checkpoint(&self, data: &ModelData, selection: &Selection) {
        self.undo.lock().checkpoint(ModelSnapshot {
            data: data.clone(),
            selection: selection.clone(),
        });
    }

    fn notify_graph_changed(&self, graph: &SpotGraph) {
        for listener in self.graph_listeners.read().iter() {
            listener.graph_changed(graph);
        }
    }

    fn restore_with(
        &self,
        step: impl FnOnce(&mut UndoLog<ModelSnapshot>) -> Option<ModelSnapshot>,
    ) -> bool {
        let mut data = self.data.write();
        let mut selection = self.selection.lock();
        let Some(snapshot) = step(&mut *self.undo.lock()) else {
            return false;
        };
        *data = snapshot.data;
        selection.replace(snapshot.selection);
        self.notify_graph_changed(&data.graph);
        true
    }
}
