//! Sampled implementation of the geometry kernel.
//!
//! Solids live on one global cubic lattice with spacing `voxel_size`. Voxel
//! `(i, j, k)` covers `[i*s, (i+1)*s)` on each axis and is inside the solid
//! when its center is. A solid only stores the bits of its own index box,
//! x varying fastest, so booleans touch just the overlap of two boxes.

use super::types::*;
use super::{GeometryKernel, KernelOpError, KernelResult};
use crate::geometry::{Aabb, Point3, Vector3, EPSILON};

const WORD_BITS: usize = 64;

/// Voxel-lattice kernel. Exact for anything aligned to the lattice, within
/// half a voxel otherwise; translations snap to whole voxels.
#[derive(Debug, Clone)]
pub struct VoxelKernel {
    /// Edge length of one voxel (mm).
    pub voxel_size: f64,
}

impl VoxelKernel {
    pub fn new(voxel_size: f64) -> Self {
        Self { voxel_size }
    }

    fn voxel_center(&self, g: [i64; 3]) -> Point3 {
        let s = self.voxel_size;
        Point3::new(
            (g[0] as f64 + 0.5) * s,
            (g[1] as f64 + 0.5) * s,
            (g[2] as f64 + 0.5) * s,
        )
    }

    /// Voxel index box covering `bb`, as (inclusive min, exclusive max).
    fn index_box(&self, bb: &Aabb) -> ([i64; 3], [i64; 3]) {
        let s = self.voxel_size;
        (
            [
                (bb.min.x / s).floor() as i64,
                (bb.min.y / s).floor() as i64,
                (bb.min.z / s).floor() as i64,
            ],
            [
                (bb.max.x / s).ceil() as i64,
                (bb.max.y / s).ceil() as i64,
                (bb.max.z / s).ceil() as i64,
            ],
        )
    }

    /// Fill every voxel of `bb` whose center satisfies `inside`.
    fn rasterize(&self, bb: &Aabb, inside: impl Fn(&Point3) -> bool) -> VoxelSolid {
        let (lo, hi) = self.index_box(bb);
        let dims = [
            (hi[0] - lo[0]).max(0) as usize,
            (hi[1] - lo[1]).max(0) as usize,
            (hi[2] - lo[2]).max(0) as usize,
        ];
        let mut solid = VoxelSolid::empty(lo, dims);
        let mut idx = 0;
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let g = [lo[0] + x as i64, lo[1] + y as i64, lo[2] + z as i64];
                    if inside(&self.voxel_center(g)) {
                        solid.set(idx);
                    }
                    idx += 1;
                }
            }
        }
        solid
    }

    fn validate_profile(profile: &Profile2D) -> KernelResult<()> {
        match &profile.outline {
            ProfileOutline::Polygon(vertices) if vertices.len() < 3 => {
                return Err(KernelOpError::InvalidGeometry(
                    "Polygon must have at least 3 vertices".into(),
                ));
            }
            ProfileOutline::Circle { radius } if !(*radius > 0.0) => {
                return Err(KernelOpError::InvalidGeometry(format!(
                    "Circle radius must be positive, got {}",
                    radius
                )));
            }
            _ => {}
        }
        if !(profile.area() > EPSILON) {
            return Err(KernelOpError::InvalidGeometry("Profile encloses no area".into()));
        }
        Ok(())
    }
}

impl Default for VoxelKernel {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// A solid sampled on the voxel lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelSolid {
    /// Lattice index of the first voxel in the box.
    min: [i64; 3],
    dims: [usize; 3],
    words: Vec<u64>,
}

impl VoxelSolid {
    fn empty(min: [i64; 3], dims: [usize; 3]) -> Self {
        let len = dims[0] * dims[1] * dims[2];
        Self {
            min,
            dims,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    fn max_exclusive(&self) -> [i64; 3] {
        [
            self.min[0] + self.dims[0] as i64,
            self.min[1] + self.dims[1] as i64,
            self.min[2] + self.dims[2] as i64,
        ]
    }

    /// Local bit index of lattice voxel `g`, if it lies in this box.
    fn local(&self, g: [i64; 3]) -> Option<usize> {
        let mut offs = [0usize; 3];
        for axis in 0..3 {
            let d = g[axis] - self.min[axis];
            if d < 0 || d >= self.dims[axis] as i64 {
                return None;
            }
            offs[axis] = d as usize;
        }
        Some(offs[0] + self.dims[0] * (offs[1] + self.dims[1] * offs[2]))
    }

    fn test(&self, idx: usize) -> bool {
        self.words[idx / WORD_BITS] & (1 << (idx % WORD_BITS)) != 0
    }

    fn set(&mut self, idx: usize) {
        self.words[idx / WORD_BITS] |= 1 << (idx % WORD_BITS);
    }

    fn clear(&mut self, idx: usize) {
        self.words[idx / WORD_BITS] &= !(1 << (idx % WORD_BITS));
    }

    fn contains_voxel(&self, g: [i64; 3]) -> bool {
        self.local(g).is_some_and(|idx| self.test(idx))
    }

    /// Number of filled voxels.
    pub fn voxel_count(&self) -> u64 {
        self.words.iter().map(|w| u64::from(w.count_ones())).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Common index box of two solids, `None` when they cannot overlap.
    fn overlap(&self, other: &VoxelSolid) -> Option<([i64; 3], [i64; 3])> {
        let (a_hi, b_hi) = (self.max_exclusive(), other.max_exclusive());
        let mut lo = [0i64; 3];
        let mut hi = [0i64; 3];
        for axis in 0..3 {
            lo[axis] = self.min[axis].max(other.min[axis]);
            hi[axis] = a_hi[axis].min(b_hi[axis]);
            if lo[axis] >= hi[axis] {
                return None;
            }
        }
        Some((lo, hi))
    }

    /// Morphological erosion along one axis: a voxel survives when every
    /// voxel within `radius` steps on that axis is filled. Voxels outside
    /// the box count as empty.
    fn erode_axis(&self, axis: usize, radius: usize) -> VoxelSolid {
        let strides = [1, self.dims[0], self.dims[0] * self.dims[1]];
        let (u, v) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let n = self.dims[axis];
        let window = 2 * radius + 1;
        let mut out = VoxelSolid::empty(self.min, self.dims);
        let mut prefix = vec![0usize; n + 1];

        for b in 0..self.dims[v] {
            for a in 0..self.dims[u] {
                let base = a * strides[u] + b * strides[v];
                for k in 0..n {
                    prefix[k + 1] = prefix[k] + usize::from(self.test(base + k * strides[axis]));
                }
                for k in radius..n.saturating_sub(radius) {
                    if prefix[k + radius + 1] - prefix[k - radius] == window {
                        out.set(base + k * strides[axis]);
                    }
                }
            }
        }
        out
    }
}

impl GeometryKernel for VoxelKernel {
    type Solid = VoxelSolid;

    fn create_box(&self, min: Point3, max: Point3) -> KernelResult<Self::Solid> {
        if !(max.x > min.x && max.y > min.y && max.z > min.z) {
            return Err(KernelOpError::InvalidGeometry(format!(
                "Box max {:?} must exceed min {:?} on every axis",
                max, min
            )));
        }
        let bb = Aabb::new(min, max);
        Ok(self.rasterize(&bb, |p| bb.contains(p)))
    }

    fn extrude_symmetric(&self, profile: &Profile2D, height: f64) -> KernelResult<Self::Solid> {
        Self::validate_profile(profile)?;
        if !(height > 0.0) || !height.is_finite() {
            return Err(KernelOpError::InvalidGeometry(format!(
                "Extrusion height must be positive, got {}",
                height
            )));
        }

        let half = height / 2.0;
        let plane = &profile.plane;
        let (lo, hi) = profile.bounds_2d();
        let mut bb = Aabb::empty();
        for corner in [
            Point2D::new(lo.x, lo.y),
            Point2D::new(hi.x, lo.y),
            Point2D::new(hi.x, hi.y),
            Point2D::new(lo.x, hi.y),
        ] {
            let p = plane.to_world(corner);
            bb.extend(&(p + plane.normal * half));
            bb.extend(&(p - plane.normal * half));
        }

        Ok(self.rasterize(&bb, |p| {
            let (local, w) = plane.to_local(p);
            w.abs() <= half && profile.contains(local)
        }))
    }

    fn translate(&self, solid: &Self::Solid, offset: Vector3) -> KernelResult<Self::Solid> {
        let s = self.voxel_size;
        let mut moved = solid.clone();
        moved.min[0] += (offset.x / s).round() as i64;
        moved.min[1] += (offset.y / s).round() as i64;
        moved.min[2] += (offset.z / s).round() as i64;
        Ok(moved)
    }

    fn boolean_union(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid> {
        let (a_hi, b_hi) = (solid_a.max_exclusive(), solid_b.max_exclusive());
        let mut lo = [0i64; 3];
        let mut dims = [0usize; 3];
        for axis in 0..3 {
            lo[axis] = solid_a.min[axis].min(solid_b.min[axis]);
            dims[axis] = (a_hi[axis].max(b_hi[axis]) - lo[axis]) as usize;
        }

        let mut out = VoxelSolid::empty(lo, dims);
        let mut idx = 0;
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    let g = [lo[0] + x as i64, lo[1] + y as i64, lo[2] + z as i64];
                    if solid_a.contains_voxel(g) || solid_b.contains_voxel(g) {
                        out.set(idx);
                    }
                    idx += 1;
                }
            }
        }
        Ok(out)
    }

    fn boolean_subtract(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid> {
        let mut out = solid_a.clone();
        if let Some((lo, hi)) = solid_a.overlap(solid_b) {
            for z in lo[2]..hi[2] {
                for y in lo[1]..hi[1] {
                    for x in lo[0]..hi[0] {
                        let g = [x, y, z];
                        if !solid_b.contains_voxel(g) {
                            continue;
                        }
                        if let Some(idx) = out.local(g) {
                            out.clear(idx);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    fn shell(&self, solid: &Self::Solid, inside_thickness: f64) -> KernelResult<Self::Solid> {
        if !(inside_thickness > 0.0) {
            return Err(KernelOpError::InvalidGeometry(format!(
                "Shell thickness must be positive, got {}",
                inside_thickness
            )));
        }
        let layers = ((inside_thickness / self.voxel_size).round() as usize).max(1);

        let core = solid
            .erode_axis(0, layers)
            .erode_axis(1, layers)
            .erode_axis(2, layers);
        if core.is_empty() {
            return Err(KernelOpError::OperationFailed(format!(
                "Shell thickness {} consumes the whole body",
                inside_thickness
            )));
        }

        let mut wall = solid.clone();
        for (w, c) in wall.words.iter_mut().zip(&core.words) {
            *w &= !c;
        }
        Ok(wall)
    }

    fn bounding_box(&self, solid: &Self::Solid) -> KernelResult<Aabb> {
        let mut lo = [i64::MAX; 3];
        let mut hi = [i64::MIN; 3];
        let dims = solid.dims;
        let mut idx = 0;
        for z in 0..dims[2] {
            for y in 0..dims[1] {
                for x in 0..dims[0] {
                    if solid.test(idx) {
                        let g = [x as i64, y as i64, z as i64];
                        for axis in 0..3 {
                            lo[axis] = lo[axis].min(g[axis]);
                            hi[axis] = hi[axis].max(g[axis]);
                        }
                    }
                    idx += 1;
                }
            }
        }
        if lo[0] > hi[0] {
            return Err(KernelOpError::InvalidGeometry("Empty solid has no bounding box".into()));
        }

        let s = self.voxel_size;
        let corner = |g: [i64; 3], step: i64| {
            Point3::new(
                (solid.min[0] + g[0] + step) as f64 * s,
                (solid.min[1] + g[1] + step) as f64 * s,
                (solid.min[2] + g[2] + step) as f64 * s,
            )
        };
        Ok(Aabb::new(corner(lo, 0), corner(hi, 1)))
    }

    fn volume(&self, solid: &Self::Solid) -> KernelResult<f64> {
        Ok(solid.voxel_count() as f64 * self.voxel_size.powi(3))
    }
}
