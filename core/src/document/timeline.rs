//! Ordered modeling history with a rollback marker.

use crate::topo::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A body-level change recorded by a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureEdit {
    Created(EntityId),
    Consumed(EntityId),
}

/// One undoable unit of modeling history.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: EntityId,
    pub name: String,
    pub edits: Vec<FeatureEdit>,
    /// Persisted records keyed by group name.
    pub attributes: BTreeMap<String, String>,
}

impl Feature {
    pub fn attribute(&self, group: &str) -> Option<&str> {
        self.attributes.get(group).map(String::as_str)
    }

    pub fn created_bodies(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.edits.iter().filter_map(|edit| match edit {
            FeatureEdit::Created(id) => Some(*id),
            FeatureEdit::Consumed(_) => None,
        })
    }
}

/// Features in history order. Features before the marker are applied to
/// the document; the rest are rolled back.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    features: Vec<Feature>,
    marker: usize,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn feature(&self, id: EntityId) -> Option<&Feature> {
        self.features.iter().find(|f| f.id == id)
    }

    /// Position of a feature in history order.
    pub fn feature_index(&self, id: EntityId) -> Option<usize> {
        self.features.iter().position(|f| f.id == id)
    }

    /// Number of applied features; new features are inserted here.
    pub fn marker(&self) -> usize {
        self.marker
    }

    pub fn is_rolled_back(&self, id: EntityId) -> bool {
        self.feature_index(id).is_some_and(|idx| idx >= self.marker)
    }

    /// Features after the marker.
    pub fn rolled_back_features(&self) -> Vec<EntityId> {
        self.features[self.marker..].iter().map(|f| f.id).collect()
    }

    pub(crate) fn insert_at_marker(&mut self, feature: Feature) {
        self.features.insert(self.marker, feature);
        self.marker += 1;
    }

    pub(crate) fn set_marker(&mut self, marker: usize) {
        self.marker = marker.min(self.features.len());
    }

    pub(crate) fn remove(&mut self, index: usize) -> Feature {
        if index < self.marker {
            self.marker -= 1;
        }
        self.features.remove(index)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
