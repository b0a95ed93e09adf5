/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Tag-set structure and per-tag-set assignment maps.
//!
//! A tag set is a named, ordered list of tags. Within one tag set a spot or
//! link carries at most one tag. Name lookups are exact and the first match
//! wins when several tag sets share a name.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::model::graph::{LinkKey, SpotKey};

pub type TagSetId = u32;
pub type TagId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    TagSetNotFound(String),
    TagNotFound { tag_set: String, label: String },
}

impl std::fmt::Display for TagError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagError::TagSetNotFound(name) => {
                write!(f, "Could not find a tag-set with the name: '{name}'")
            }
            TagError::TagNotFound { tag_set, label } => write!(
                f,
                "Could not find a tag with label: '{label}' in the tag-set '{tag_set}'"
            ),
        }
    }
}

impl std::error::Error for TagError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    pub label: String,
    /// Packed ARGB colour.
    pub color: u32,
}

impl Tag {
    pub fn rgb(&self) -> (u8, u8, u8) {
        (
            ((self.color >> 16) & 0xFF) as u8,
            ((self.color >> 8) & 0xFF) as u8,
            (self.color & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSet {
    pub id: TagSetId,
    pub name: String,
    pub tags: Vec<Tag>,
}

/// Resolved `(tag set, tag)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRef {
    pub tag_set: TagSetId,
    pub tag: TagId,
}

#[derive(Debug, Clone, Default)]
pub struct TagSetModel {
    sets: Vec<TagSet>,
    next_id: u32,
    spot_tags: HashMap<TagSetId, HashMap<SpotKey, TagId>>,
    link_tags: HashMap<TagSetId, HashMap<LinkKey, TagId>>,
}

impl TagSetModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag_sets(&self) -> &[TagSet] {
        &self.sets
    }

    /// Append a tag set with one tag per label, colours drawn from `next_color`.
    pub(crate) fn create_tag_set(
        &mut self,
        name: &str,
        labels: &[&str],
        mut next_color: impl FnMut() -> u32,
    ) -> TagSetId {
        let set_id = self.allocate_id();
        let tags = labels
            .iter()
            .map(|label| Tag {
                id: self.allocate_id(),
                label: (*label).to_string(),
                color: next_color(),
            })
            .collect();
        self.sets.push(TagSet {
            id: set_id,
            name: name.to_string(),
            tags,
        });
        set_id
    }

    /// Resolve a tag set name and tag label. Exact, case-sensitive.
    pub fn resolve(&self, tag_set: &str, label: &str) -> Result<TagRef, TagError> {
        let set = self
            .sets
            .iter()
            .find(|set| set.name == tag_set)
            .ok_or_else(|| TagError::TagSetNotFound(tag_set.to_string()))?;
        let tag = set
            .tags
            .iter()
            .find(|tag| tag.label == label)
            .ok_or_else(|| TagError::TagNotFound {
                tag_set: tag_set.to_string(),
                label: label.to_string(),
            })?;
        Ok(TagRef {
            tag_set: set.id,
            tag: tag.id,
        })
    }

    pub(crate) fn set_color(&mut self, tag_set: &str, label: &str, color: u32) -> Result<(), TagError> {
        let resolved = self.resolve(tag_set, label)?;
        if let Some(tag) = self.tag_mut(resolved) {
            tag.color = color;
        }
        Ok(())
    }

    pub(crate) fn assign_spot(&mut self, tag: TagRef, key: SpotKey) {
        self.spot_tags
            .entry(tag.tag_set)
            .or_default()
            .insert(key, tag.tag);
    }

    pub(crate) fn assign_link(&mut self, tag: TagRef, key: LinkKey) {
        self.link_tags
            .entry(tag.tag_set)
            .or_default()
            .insert(key, tag.tag);
    }

    /// Tag carried by `key` in the named tag set.
    pub fn spot_tag(&self, tag_set: &str, key: SpotKey) -> Option<&Tag> {
        let set = self.sets.iter().find(|set| set.name == tag_set)?;
        let tag_id = self.spot_tags.get(&set.id)?.get(&key)?;
        set.tags.iter().find(|tag| tag.id == *tag_id)
    }

    /// Tag carried by `key` in the named tag set.
    pub fn link_tag(&self, tag_set: &str, key: LinkKey) -> Option<&Tag> {
        let set = self.sets.iter().find(|set| set.name == tag_set)?;
        let tag_id = self.link_tags.get(&set.id)?.get(&key)?;
        set.tags.iter().find(|tag| tag.id == *tag_id)
    }

    /// Number of spot and link assignments across all tag sets.
    pub fn assignment_count(&self) -> usize {
        self.spot_tags.values().map(HashMap::len).sum::<usize>()
            + self.link_tags.values().map(HashMap::len).sum::<usize>()
    }

    pub(crate) fn forget_spot(&mut self, key: SpotKey) {
        for assignments in self.spot_tags.values_mut() {
            assignments.remove(&key);
        }
    }

    pub(crate) fn forget_link(&mut self, key: LinkKey) {
        for assignments in self.link_tags.values_mut() {
            assignments.remove(&key);
        }
    }

    pub(crate) fn forget_all_assignments(&mut self) {
        self.spot_tags.clear();
        self.link_tags.clear();
    }

    /// Human-readable table of tag sets and tag colours.
    pub fn describe(&self) -> String {
        if self.sets.is_empty() {
            return "No tags are currently defined.\n".to_string();
        }

        let mut out = String::new();
        let _ = writeln!(out, "{:<49} R    G    B", "Tags currently defined:");
        for set in &self.sets {
            let _ = writeln!(out, " - {}:", set.name);
            if set.tags.is_empty() {
                out.push_str("    - empty\n");
                continue;
            }
            for tag in &set.tags {
                let (r, g, b) = tag.rgb();
                let _ = writeln!(out, "    - {:<40} [ {r:>3}, {g:>3}, {b:>3} ]", tag.label);
            }
        }
        out
    }

    fn tag_mut(&mut self, tag: TagRef) -> Option<&mut Tag> {
        self.sets
            .iter_mut()
            .find(|set| set.id == tag.tag_set)?
            .tags
            .iter_mut()
            .find(|candidate| candidate.id == tag.tag)
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.saturating_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::stable_graph::NodeIndex;

    fn fixed_color() -> u32 {
        0xFF10_2030
    }

    fn model_with_fate() -> TagSetModel {
        let mut model = TagSetModel::new();
        model.create_tag_set("Fate", &["Divides", "Dies"], fixed_color);
        model
    }

    #[test]
    fn resolve_is_exact_and_case_sensitive() {
        let model = model_with_fate();
        assert!(model.resolve("Fate", "Dies").is_ok());
        assert_eq!(
            model.resolve("fate", "Dies"),
            Err(TagError::TagSetNotFound("fate".to_string()))
        );
        assert_eq!(
            model.resolve("Fate", "dies"),
            Err(TagError::TagNotFound {
                tag_set: "Fate".to_string(),
                label: "dies".to_string()
            })
        );
    }

    #[test]
    fn reassigning_within_a_tag_set_replaces_the_tag() {
        let mut model = model_with_fate();
        let key = NodeIndex::new(7);
        model.assign_spot(model.resolve("Fate", "Divides").unwrap(), key);
        model.assign_spot(model.resolve("Fate", "Dies").unwrap(), key);

        assert_eq!(model.spot_tag("Fate", key).unwrap().label, "Dies");
        assert_eq!(model.assignment_count(), 1);
    }

    #[test]
    fn forget_spot_drops_assignments() {
        let mut model = model_with_fate();
        let key = NodeIndex::new(1);
        model.assign_spot(model.resolve("Fate", "Dies").unwrap(), key);
        model.forget_spot(key);
        assert!(model.spot_tag("Fate", key).is_none());
    }

    #[test]
    fn set_color_updates_rgb() {
        let mut model = model_with_fate();
        model
            .set_color("Fate", "Dies", 0xFF00_0000 | (200 << 16) | (100 << 8) | 50)
            .unwrap();
        let tag = &model.tag_sets()[0].tags[1];
        assert_eq!(tag.rgb(), (200, 100, 50));
    }

    #[test]
    fn describe_lists_sets_and_empty_marker() {
        let mut model = model_with_fate();
        model.create_tag_set("Empty", &[], fixed_color);

        let text = model.describe();
        assert!(text.starts_with("Tags currently defined:"));
        assert!(text.contains(" - Fate:\n"));
        assert!(text.contains("[  16,  32,  48 ]"));
        assert!(text.contains(" - Empty:\n    - empty\n"));
    }

    #[test]
    fn describe_without_tag_sets() {
        assert_eq!(
            TagSetModel::new().describe(),
            "No tags are currently defined.\n"
        );
    }
}
