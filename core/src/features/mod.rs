//! Persisted infill features and their regeneration.

pub mod types;
pub mod update;

pub use types::{FeatureDescriptor, FeatureState, DESCRIPTOR_GROUP};
pub use update::{update, UpdateOutcome, UpdateReport};
