//! Folding the lattice into the source solid.

use super::{BodyType, CancellationToken, InfillError, LatticePattern, ProgressSink};
use crate::kernel::GeometryKernel;
use tracing::debug;

/// Result of combining a lattice with a source solid.
#[derive(Debug, Clone)]
pub struct CombineOutcome<S> {
    pub solid: S,
    pub start_volume: f64,
    pub final_volume: f64,
    pub applied: usize,
    pub total: usize,
    pub cancelled: bool,
}

impl<S> CombineOutcome<S> {
    /// Remaining material as a percentage of the source volume.
    pub fn infill_percentage(&self) -> f64 {
        if self.start_volume > 0.0 {
            100.0 * self.final_volume / self.start_volume
        } else {
            0.0
        }
    }
}

/// Cut every tool of `pattern` out of a copy of `source`.
///
/// In [`BodyType::CreateShell`] mode the wall is computed from `source`
/// first, the lattice is cut into the core, and the two are joined. The
/// caller's `source` is never modified.
pub fn combine<K: GeometryKernel>(
    kernel: &K,
    source: &K::Solid,
    body_type: BodyType,
    shell_thickness: f64,
    pattern: LatticePattern<'_, K>,
    cancel: &CancellationToken,
    progress: &mut dyn ProgressSink,
) -> Result<CombineOutcome<K::Solid>, InfillError> {
    let start_volume = kernel.volume(source)?;

    let wall = match body_type {
        BodyType::CreateShell => Some(kernel.shell(source, shell_thickness)?),
        BodyType::DirectCut => None,
    };

    let mut core = source.clone();
    let lattice = pattern.run(cancel, progress, |tool| {
        core = kernel.boolean_subtract(&core, &tool.solid)?;
        Ok(())
    })?;
    debug!(applied = lattice.applied, total = lattice.total, "lattice cut");

    let solid = match wall {
        Some(wall) => kernel.boolean_union(&wall, &core)?,
        None => core,
    };
    let final_volume = kernel.volume(&solid)?;

    Ok(CombineOutcome {
        solid,
        start_volume,
        final_volume,
        applied: lattice.applied,
        total: lattice.total,
        cancelled: lattice.cancelled,
    })
}
