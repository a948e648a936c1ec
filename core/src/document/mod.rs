//! Bodies, transactions and the feature timeline the infill commands edit.
//!
//! A [`Document`] owns every body and the [`Timeline`]. Body changes made by
//! commands go through a [`Transaction`], which applies its staged edits in
//! one step and records them as a single timeline feature.

mod timeline;

pub use timeline::{Feature, FeatureEdit, Timeline};

use crate::kernel::GeometryKernel;
use crate::topo::{EntityId, IdGenerator, RevisionId};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DocumentError {
    #[error("Body {0} not found")]
    BodyNotFound(EntityId),

    #[error("Body {0} is not live")]
    BodyNotLive(EntityId),

    #[error("Feature {0} not found")]
    FeatureNotFound(EntityId),

    #[error("Feature {0} is still applied; roll back before deleting it")]
    FeatureApplied(EntityId),
}

/// Whether a body is part of the current model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    Live,
    /// Replaced by the output of a feature.
    Consumed(EntityId),
    /// Created by a feature that is rolled back.
    Suppressed(EntityId),
}

#[derive(Debug, Clone)]
pub struct Body<S> {
    pub id: EntityId,
    pub name: String,
    pub solid: S,
    pub revision: RevisionId,
    pub state: BodyState,
}

impl<S> Body<S> {
    pub fn is_live(&self) -> bool {
        self.state == BodyState::Live
    }
}

/// Body store plus modeling history.
#[derive(Debug, Clone)]
pub struct Document<S> {
    bodies: Vec<Body<S>>,
    timeline: Timeline,
    ids: IdGenerator,
    revision: u64,
}

impl<S> Document<S> {
    /// Empty document. Ids are derived from `seed`.
    pub fn new(seed: &str) -> Self {
        Self {
            bodies: Vec::new(),
            timeline: Timeline::new(),
            ids: IdGenerator::new(seed),
            revision: 0,
        }
    }

    fn next_revision(&mut self) -> RevisionId {
        self.revision += 1;
        RevisionId(self.revision)
    }

    /// Add a base body outside of any feature.
    pub fn add_body(&mut self, name: impl Into<String>, solid: S) -> EntityId {
        let id = self.ids.next_id();
        let revision = self.next_revision();
        self.bodies.push(Body {
            id,
            name: name.into(),
            solid,
            revision,
            state: BodyState::Live,
        });
        id
    }

    /// Replace a body's solid, as an upstream edit would. Consumed bodies
    /// may be edited too.
    pub fn modify_body(&mut self, id: EntityId, solid: S) -> Result<RevisionId, DocumentError> {
        let revision = self.next_revision();
        let body = self.body_mut(id)?;
        body.solid = solid;
        body.revision = revision;
        Ok(revision)
    }

    pub fn remove_body(&mut self, id: EntityId) -> Result<Body<S>, DocumentError> {
        let idx = self
            .bodies
            .iter()
            .position(|b| b.id == id)
            .ok_or(DocumentError::BodyNotFound(id))?;
        Ok(self.bodies.remove(idx))
    }

    pub fn body(&self, id: EntityId) -> Option<&Body<S>> {
        self.bodies.iter().find(|b| b.id == id)
    }

    fn body_mut(&mut self, id: EntityId) -> Result<&mut Body<S>, DocumentError> {
        self.bodies
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(DocumentError::BodyNotFound(id))
    }

    /// A body that is part of the current model.
    pub fn live_body(&self, id: EntityId) -> Result<&Body<S>, DocumentError> {
        let body = self.body(id).ok_or(DocumentError::BodyNotFound(id))?;
        if body.is_live() {
            Ok(body)
        } else {
            Err(DocumentError::BodyNotLive(id))
        }
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body<S>> {
        self.bodies.iter()
    }

    pub fn live_bodies(&self) -> impl Iterator<Item = &Body<S>> {
        self.bodies.iter().filter(|b| b.is_live())
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Open a transaction. It borrows the document mutably, so transactions
    /// cannot overlap.
    pub fn transaction(&mut self, name: &str) -> Transaction<'_, S> {
        let feature = self.ids.next_id();
        let revision = self.next_revision();
        Transaction {
            doc: self,
            feature,
            name: name.to_string(),
            revision,
            created: Vec::new(),
            consumed: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Move the marker just before `feature`, reverting it and every later
    /// applied feature.
    pub fn roll_back_before(&mut self, feature: EntityId) -> Result<(), DocumentError> {
        let target = self
            .timeline
            .feature_index(feature)
            .ok_or(DocumentError::FeatureNotFound(feature))?;
        for idx in (target..self.timeline.marker()).rev() {
            let f = &self.timeline.features()[idx];
            let (id, edits) = (f.id, f.edits.clone());
            for edit in edits.iter().rev() {
                match *edit {
                    FeatureEdit::Created(body) => self.set_state(body, BodyState::Suppressed(id)),
                    FeatureEdit::Consumed(body) => self.set_state(body, BodyState::Live),
                }
            }
        }
        self.timeline.set_marker(target.min(self.timeline.marker()));
        Ok(())
    }

    /// Re-apply every rolled-back feature in order.
    pub fn roll_to_end(&mut self) {
        for idx in self.timeline.marker()..self.timeline.len() {
            let f = &self.timeline.features()[idx];
            let (id, edits) = (f.id, f.edits.clone());
            for edit in edits {
                match edit {
                    FeatureEdit::Created(body) => self.set_state(body, BodyState::Live),
                    FeatureEdit::Consumed(body) => self.set_state(body, BodyState::Consumed(id)),
                }
            }
        }
        self.timeline.set_marker(self.timeline.len());
    }

    /// Delete a rolled-back feature along with the bodies it created.
    pub fn delete_feature(&mut self, feature: EntityId) -> Result<Feature, DocumentError> {
        let idx = self
            .timeline
            .feature_index(feature)
            .ok_or(DocumentError::FeatureNotFound(feature))?;
        if idx < self.timeline.marker() {
            return Err(DocumentError::FeatureApplied(feature));
        }
        let removed = self.timeline.remove(idx);
        let created: Vec<EntityId> = removed.created_bodies().collect();
        self.bodies.retain(|b| !created.contains(&b.id));
        Ok(removed)
    }

    fn set_state(&mut self, id: EntityId, state: BodyState) {
        match self.body_mut(id) {
            Ok(body) => body.state = state,
            // The body was removed after the feature was recorded.
            Err(_) => warn!(body = %id, "timeline edit refers to a removed body"),
        }
    }
}

/// Staged body edits that become one timeline feature on [`finish`].
/// Dropping an unfinished transaction discards every staged edit.
///
/// [`finish`]: Transaction::finish
pub struct Transaction<'a, S> {
    doc: &'a mut Document<S>,
    feature: EntityId,
    name: String,
    revision: RevisionId,
    created: Vec<Body<S>>,
    consumed: Vec<EntityId>,
    attributes: BTreeMap<String, String>,
}

impl<S> Transaction<'_, S> {
    /// Id the feature will have once finished.
    pub fn feature_id(&self) -> EntityId {
        self.feature
    }

    /// Revision stamped on every body this transaction creates.
    pub fn revision(&self) -> RevisionId {
        self.revision
    }

    pub fn create_body(&mut self, name: impl Into<String>, solid: S) -> EntityId {
        let id = self.doc.ids.next_id();
        self.created.push(Body {
            id,
            name: name.into(),
            solid,
            revision: self.revision,
            state: BodyState::Live,
        });
        id
    }

    /// Mark a live body as replaced by this feature.
    pub fn consume_body(&mut self, id: EntityId) -> Result<(), DocumentError> {
        self.doc.live_body(id)?;
        if self.consumed.contains(&id) {
            return Err(DocumentError::BodyNotLive(id));
        }
        self.consumed.push(id);
        Ok(())
    }

    pub fn set_attribute(&mut self, group: &str, value: String) {
        self.attributes.insert(group.to_string(), value);
    }

    /// Apply the staged edits and insert the feature at the marker.
    pub fn finish(self) -> EntityId {
        let Transaction {
            doc,
            feature,
            name,
            created,
            consumed,
            attributes,
            ..
        } = self;

        let mut edits = Vec::with_capacity(created.len() + consumed.len());
        for id in consumed {
            doc.set_state(id, BodyState::Consumed(feature));
            edits.push(FeatureEdit::Consumed(id));
        }
        for body in created {
            edits.push(FeatureEdit::Created(body.id));
            doc.bodies.push(body);
        }

        doc.timeline.insert_at_marker(Feature {
            id: feature,
            name,
            edits,
            attributes,
        });
        feature
    }
}

/// Kernel plus document: the context every command runs against.
pub struct ModelingSession<K: GeometryKernel> {
    pub kernel: K,
    pub document: Document<K::Solid>,
}

impl<K: GeometryKernel> ModelingSession<K> {
    pub fn new(kernel: K, seed: &str) -> Self {
        Self {
            kernel,
            document: Document::new(seed),
        }
    }
}
