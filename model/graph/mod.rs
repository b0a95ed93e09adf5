/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Spot/link graph for the tracking model.
//!
//! Core structures:
//! - `SpotGraph`: main graph container backed by petgraph::StableGraph
//! - `Spot`: one detected object at one timepoint
//! - `Link`: directed association from a spot to a spot in a later timepoint
//!
//! Boundary: topology mutators are `pub(crate)`. Outside callers edit through
//! `ModelData` inside `Model::edit_graph`, so every write happens under the
//! model's write lock and keeps tag assignments in sync.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::{Directed, Direction};
use std::collections::HashMap;
use uuid::Uuid;

/// Stable spot handle (petgraph NodeIndex, survives other deletions)
pub type SpotKey = NodeIndex;

/// Stable link handle (petgraph EdgeIndex)
pub type LinkKey = EdgeIndex;

/// A detected object in the graph
#[derive(Debug, Clone, PartialEq)]
pub struct Spot {
    /// Stable spot identity.
    pub id: Uuid,

    /// Timepoint the spot was detected in.
    pub frame: u32,

    /// Position in physical units.
    pub position: [f64; 3],

    /// Estimated radius in physical units.
    pub radius: f64,

    /// Free-form label, empty by default.
    pub label: String,
}

/// Association between two spots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    /// Cost reported by the linker that created the link.
    pub cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkView {
    pub key: LinkKey,
    pub source: SpotKey,
    pub target: SpotKey,
    pub cost: f64,
}

/// Main graph structure backed by petgraph::StableGraph
#[derive(Debug, Clone, Default)]
pub struct SpotGraph {
    /// The underlying petgraph stable graph
    pub(crate) inner: StableGraph<Spot, Link, Directed>,

    /// Stable UUID to spot mapping.
    id_to_spot: HashMap<Uuid, SpotKey>,
}

impl SpotGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new spot to the graph
    pub(crate) fn add_spot(&mut self, frame: u32, position: [f64; 3], radius: f64) -> SpotKey {
        self.add_spot_with_id(Uuid::new_v4(), frame, position, radius)
    }

    /// Add a spot with a pre-existing UUID.
    pub(crate) fn add_spot_with_id(
        &mut self,
        id: Uuid,
        frame: u32,
        position: [f64; 3],
        radius: f64,
    ) -> SpotKey {
        let key = self.inner.add_node(Spot {
            id,
            frame,
            position,
            radius,
            label: String::new(),
        });
        self.id_to_spot.insert(id, key);
        key
    }

    /// Add a link between two live spots.
    ///
    /// Returns `None` when either endpoint is missing or both endpoints are the
    /// same spot.
    pub(crate) fn add_link(&mut self, source: SpotKey, target: SpotKey, cost: f64) -> Option<LinkKey> {
        if source == target || !self.contains_spot(source) || !self.contains_spot(target) {
            return None;
        }
        Some(self.inner.add_edge(source, target, Link { cost }))
    }

    /// Remove a single link. Returns whether it existed.
    pub(crate) fn remove_link(&mut self, key: LinkKey) -> bool {
        self.inner.remove_edge(key).is_some()
    }

    /// Remove a spot and all its incident links.
    ///
    /// Returns the keys of the incident links that were removed along with
    /// the spot, or `None` if the spot does not exist.
    pub(crate) fn remove_spot(&mut self, key: SpotKey) -> Option<Vec<LinkKey>> {
        if !self.contains_spot(key) {
            return None;
        }
        let incident = self.incident_links(key);
        let spot = self.inner.remove_node(key)?;
        self.id_to_spot.remove(&spot.id);
        Some(incident)
    }

    /// Keys of every link that starts or ends at `key`.
    pub fn incident_links(&self, key: SpotKey) -> Vec<LinkKey> {
        self.inner
            .edges_directed(key, Direction::Outgoing)
            .chain(self.inner.edges_directed(key, Direction::Incoming))
            .map(|edge| edge.id())
            .collect()
    }

    /// Get a spot by key
    pub fn get_spot(&self, key: SpotKey) -> Option<&Spot> {
        self.inner.node_weight(key)
    }

    /// Get a mutable spot by key
    pub(crate) fn get_spot_mut(&mut self, key: SpotKey) -> Option<&mut Spot> {
        self.inner.node_weight_mut(key)
    }

    /// Get a spot and its key by UUID.
    pub fn get_spot_by_id(&self, id: Uuid) -> Option<(SpotKey, &Spot)> {
        let key = *self.id_to_spot.get(&id)?;
        Some((key, self.inner.node_weight(key)?))
    }

    pub fn get_link(&self, key: LinkKey) -> Option<&Link> {
        self.inner.edge_weight(key)
    }

    /// Source and target of a link.
    pub fn link_endpoints(&self, key: LinkKey) -> Option<(SpotKey, SpotKey)> {
        self.inner.edge_endpoints(key)
    }

    pub fn contains_spot(&self, key: SpotKey) -> bool {
        self.inner.contains_node(key)
    }

    pub fn contains_link(&self, key: LinkKey) -> bool {
        self.inner.edge_weight(key).is_some()
    }

    /// Iterate over all spots as (key, spot) pairs
    pub fn spots(&self) -> impl Iterator<Item = (SpotKey, &Spot)> + '_ {
        self.inner
            .node_indices()
            .map(move |idx| (idx, &self.inner[idx]))
    }

    /// Iterate over all links
    pub fn links(&self) -> impl Iterator<Item = LinkView> + '_ {
        self.inner.edge_references().map(|edge| LinkView {
            key: edge.id(),
            source: edge.source(),
            target: edge.target(),
            cost: edge.weight().cost,
        })
    }

    /// Spots that start a track: no incoming link.
    pub fn roots(&self) -> Vec<SpotKey> {
        self.inner
            .node_indices()
            .filter(|key| {
                self.inner
                    .edges_directed(*key, Direction::Incoming)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Count of spots in the graph
    pub fn spot_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Count of links in the graph
    pub fn link_count(&self) -> usize {
        self.inner.edge_count()
    }
}
