#![allow(dead_code)]

use infill_core::document::ModelingSession;
use infill_core::geometry::{Aabb, Point3, Vector3};
use infill_core::infill::CancellationToken;
use infill_core::kernel::{GeometryKernel, KernelOpError, KernelResult, Profile2D, VoxelKernel, VoxelSolid};
use infill_core::topo::EntityId;
use std::sync::atomic::{AtomicIsize, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct Counters {
    pub subtractions: AtomicUsize,
    /// Tool solids (extrusions and their translated copies) still alive.
    pub live_tools: AtomicIsize,
}

impl Counters {
    pub fn subtractions(&self) -> usize {
        self.subtractions.load(Ordering::SeqCst)
    }

    pub fn live_tools(&self) -> isize {
        self.live_tools.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct ToolGuard(Arc<Counters>);

impl ToolGuard {
    fn new(counters: &Arc<Counters>) -> Self {
        counters.live_tools.fetch_add(1, Ordering::SeqCst);
        Self(counters.clone())
    }
}

impl Clone for ToolGuard {
    fn clone(&self) -> Self {
        Self::new(&self.0)
    }
}

impl Drop for ToolGuard {
    fn drop(&mut self) {
        self.0.live_tools.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct TrackedSolid {
    pub inner: VoxelSolid,
    tool: Option<ToolGuard>,
}

/// Voxel kernel that counts subtractions, tracks live tool solids, and can
/// cancel or fail at a chosen subtraction.
pub struct CountingKernel {
    pub inner: VoxelKernel,
    pub counters: Arc<Counters>,
    /// Cancel this token once this many subtractions have run.
    pub cancel_after: Option<(usize, CancellationToken)>,
    /// The n-th subtraction (1-based) fails.
    pub fail_at: Option<usize>,
}

impl CountingKernel {
    pub fn new(voxel_size: f64) -> Self {
        Self {
            inner: VoxelKernel::new(voxel_size),
            counters: Arc::new(Counters::default()),
            cancel_after: None,
            fail_at: None,
        }
    }

    fn plain(&self, inner: VoxelSolid) -> TrackedSolid {
        TrackedSolid { inner, tool: None }
    }

    fn tool(&self, inner: VoxelSolid) -> TrackedSolid {
        TrackedSolid {
            inner,
            tool: Some(ToolGuard::new(&self.counters)),
        }
    }
}

impl GeometryKernel for CountingKernel {
    type Solid = TrackedSolid;

    fn create_box(&self, min: Point3, max: Point3) -> KernelResult<Self::Solid> {
        Ok(self.plain(self.inner.create_box(min, max)?))
    }

    fn extrude_symmetric(&self, profile: &Profile2D, height: f64) -> KernelResult<Self::Solid> {
        Ok(self.tool(self.inner.extrude_symmetric(profile, height)?))
    }

    fn translate(&self, solid: &Self::Solid, offset: Vector3) -> KernelResult<Self::Solid> {
        Ok(self.tool(self.inner.translate(&solid.inner, offset)?))
    }

    fn boolean_union(&self, a: &Self::Solid, b: &Self::Solid) -> KernelResult<Self::Solid> {
        Ok(self.plain(self.inner.boolean_union(&a.inner, &b.inner)?))
    }

    fn boolean_subtract(&self, a: &Self::Solid, b: &Self::Solid) -> KernelResult<Self::Solid> {
        let n = self.counters.subtractions.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_at == Some(n) {
            return Err(KernelOpError::OperationFailed(format!("injected failure at {}", n)));
        }
        let out = self.plain(self.inner.boolean_subtract(&a.inner, &b.inner)?);
        if let Some((k, token)) = &self.cancel_after {
            if n >= *k {
                token.cancel();
            }
        }
        Ok(out)
    }

    fn shell(&self, solid: &Self::Solid, inside_thickness: f64) -> KernelResult<Self::Solid> {
        Ok(self.plain(self.inner.shell(&solid.inner, inside_thickness)?))
    }

    fn bounding_box(&self, solid: &Self::Solid) -> KernelResult<Aabb> {
        self.inner.bounding_box(&solid.inner)
    }

    fn volume(&self, solid: &Self::Solid) -> KernelResult<f64> {
        self.inner.volume(&solid.inner)
    }
}

/// Session holding one axis-aligned cube body from the origin.
pub fn session_with_cube<K: GeometryKernel>(kernel: K, size: f64) -> (ModelingSession<K>, EntityId) {
    let mut session = ModelingSession::new(kernel, "infill-tests");
    let cube = session
        .kernel
        .create_box(Point3::origin(), Point3::new(size, size, size))
        .expect("cube");
    let id = session.document.add_body("Body1", cube);
    (session, id)
}
