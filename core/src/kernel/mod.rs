//! Kernel abstraction layer for CAD geometry operations.
//!
//! The infill pipeline only talks to this trait, so the B-rep backend
//! (Truck) and the sampled backend (voxels) are interchangeable.

pub mod types;
mod truck;
mod voxel;

#[cfg(test)]
mod tests_boolean;

pub use truck::TruckKernel;
pub use types::*;
pub use voxel::{VoxelKernel, VoxelSolid};

use crate::geometry::{Aabb, Point3, Vector3};
use thiserror::Error;

/// Errors that can occur during kernel operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KernelOpError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelOpError>;

/// Abstract interface for the geometry kernel the infill pipeline drives.
///
/// Solids are values: every operation returns a new solid and leaves its
/// inputs untouched, and copying a solid is `Clone`.
pub trait GeometryKernel: Send + Sync {
    /// The kernel's internal solid representation.
    type Solid: Clone + Send;

    /// Create an axis-aligned box solid spanning `min..max`.
    fn create_box(&self, min: Point3, max: Point3) -> KernelResult<Self::Solid>;

    /// Extrude a profile symmetrically about its plane, spanning
    /// `[-height/2, +height/2]` along the plane normal.
    fn extrude_symmetric(&self, profile: &Profile2D, height: f64) -> KernelResult<Self::Solid>;

    /// Copy of `solid` moved by `offset`.
    fn translate(&self, solid: &Self::Solid, offset: Vector3) -> KernelResult<Self::Solid>;

    // === Boolean Operations ===

    /// Compute the union of two solids (A ∪ B).
    fn boolean_union(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid>;

    /// Compute the difference of two solids (A - B).
    fn boolean_subtract(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid>;

    /// Hollow `solid` into a wall of `inside_thickness`, offsetting inward.
    fn shell(&self, solid: &Self::Solid, inside_thickness: f64) -> KernelResult<Self::Solid>;

    // === Queries ===

    fn bounding_box(&self, solid: &Self::Solid) -> KernelResult<Aabb>;

    fn volume(&self, solid: &Self::Solid) -> KernelResult<f64>;
}
