/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Batch mutations over the model's current selection.
//!
//! `delete_selection` runs under the model write lock with selection
//! notifications paused, records exactly one undo point and notifies graph
//! listeners exactly once. Observers never see a half-deleted graph.

use log::{error, info};

use crate::model::Model;
use crate::model::graph::{LinkKey, SpotKey};
use crate::model::selection::ListenerPause;
use crate::model::tags::TagError;

/// Counts reported by `SelectionTransaction::delete_selection`.
///
/// `links_removed` counts explicitly selected links plus the links that went
/// away with removed spots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionReport {
    pub spots_removed: usize,
    pub links_removed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaggingReport {
    pub spots_tagged: usize,
    pub links_tagged: usize,
}

pub struct SelectionTransaction<'a> {
    model: &'a Model,
}

impl<'a> SelectionTransaction<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    /// Delete every selected link, then every selected spot.
    ///
    /// An empty selection is a no-op: no lock, no undo point, no
    /// notification.
    pub fn delete_selection(&self) -> DeletionReport {
        if self.model.selection.lock().current().is_empty() {
            return DeletionReport::default();
        }

        let mut data = self.model.data.write();
        let mut selection = self.model.selection.lock();
        if selection.current().is_empty() {
            return DeletionReport::default();
        }

        let links: Vec<LinkKey> = selection.current().links().iter().copied().collect();
        let spots: Vec<SpotKey> = selection.current().spots().iter().copied().collect();

        let mut paused = ListenerPause::new(&mut *selection);
        let mut report = DeletionReport::default();

        // Selected links go first so a link that is both selected and
        // incident to a selected spot is counted once.
        for key in links {
            if data.remove_link(key) {
                report.links_removed += 1;
            }
        }
        for key in spots {
            if let Some(incident) = data.remove_spot(key) {
                report.links_removed += incident.len();
                report.spots_removed += 1;
            }
        }
        let removed = data.take_removed();
        paused.prune(&data.graph, &removed);

        self.model.record_checkpoint(&data, paused.current());
        self.model.notify_graph_changed(&data.graph);
        drop(paused);
        drop(selection);
        drop(data);

        info!(
            "Removed {} spots and {} links.",
            report.spots_removed, report.links_removed
        );
        report
    }

    /// Assign `label` from `tag_set` to every selected spot and link.
    ///
    /// Both names are matched exactly; if either is missing nothing is
    /// tagged. Tagging records no undo point.
    pub fn tag_selection_with(&self, tag_set: &str, label: &str) -> Result<TaggingReport, TagError> {
        let mut data = self.model.data.write();
        let tag = data.tags.resolve(tag_set, label).inspect_err(|err| {
            error!("{err}");
        })?;

        let selection = self.model.selection.lock();
        let mut report = TaggingReport::default();
        for key in selection.current().spots() {
            if data.graph.contains_spot(*key) {
                data.tags.assign_spot(tag, *key);
                report.spots_tagged += 1;
            }
        }
        for key in selection.current().links() {
            if data.graph.contains_link(*key) {
                data.tags.assign_link(tag, *key);
                report.links_tagged += 1;
            }
        }
        Ok(report)
    }

    /// Empty both the spot and the link selection.
    pub fn clear_selection(&self) {
        self.model.selection.lock().clear();
    }
}
