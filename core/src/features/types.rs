use crate::document::Document;
use crate::infill::{BodyType, InfillError, InfillParams, InfillStyle};
use crate::topo::{EntityId, RevisionId};
use serde::{Deserialize, Serialize};

/// Attribute group a descriptor is stored under on its timeline feature.
pub const DESCRIPTOR_GROUP: &str = "infill";

/// Everything needed to regenerate one infill feature, stored as a flat
/// JSON record on the feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDescriptor {
    pub style: InfillStyle,
    pub body_type: BodyType,
    pub size: f64,
    pub shell_thickness: f64,
    pub rib_thickness: f64,
    pub source_body_id: EntityId,
    pub result_body_id: EntityId,
    pub feature_id: EntityId,
    /// Revision of the result body when it was generated.
    pub revision_id: RevisionId,
    /// Revision of the source body the result was generated from.
    pub source_revision_id: RevisionId,
}

/// Lifecycle of a generated feature relative to its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureState {
    /// Result matches the stored revisions.
    Fresh,
    /// Source or result changed since generation.
    Stale,
    /// Regenerated by the last update.
    Rebuilt,
}

impl FeatureDescriptor {
    pub fn params(&self) -> InfillParams {
        InfillParams {
            style: self.style,
            body_type: self.body_type,
            size: self.size,
            shell_thickness: self.shell_thickness,
            rib_thickness: self.rib_thickness,
        }
    }

    pub fn encode(&self) -> Result<String, InfillError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(record: &str) -> Result<Self, InfillError> {
        Ok(serde_json::from_str(record)?)
    }

    /// Every descriptor in the document, in timeline order, keyed by the
    /// feature that carries it.
    pub fn collect<S>(document: &Document<S>) -> Vec<(EntityId, Result<Self, InfillError>)> {
        document
            .timeline()
            .features()
            .iter()
            .filter_map(|feature| {
                feature
                    .attribute(DESCRIPTOR_GROUP)
                    .map(|record| (feature.id, Self::decode(record)))
            })
            .collect()
    }

    /// Compare the stored revisions with the document.
    pub fn check_state<S>(&self, document: &Document<S>) -> Result<FeatureState, InfillError> {
        let source = document
            .body(self.source_body_id)
            .ok_or(InfillError::MissingSource(self.source_body_id))?;
        if source.revision != self.source_revision_id {
            return Ok(FeatureState::Stale);
        }
        match document.body(self.result_body_id) {
            Some(result) if result.revision == self.revision_id => Ok(FeatureState::Fresh),
            _ => Ok(FeatureState::Stale),
        }
    }
}
