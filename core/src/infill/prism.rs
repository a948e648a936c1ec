//! Cutting tools: style profiles extruded through the body.

use super::shape::style_profile;
use super::{InfillError, InfillParams, TileGridSpec};
use crate::geometry::Aabb;
use crate::kernel::{GeometryKernel, Point2D, Profile2D, SketchPlane};

/// Tools overshoot the body by this factor along the extrusion axis.
pub const HEIGHT_MARGIN: f64 = 1.1;

pub fn prism_height(bounds: &Aabb) -> f64 {
    bounds.extent().z * HEIGHT_MARGIN
}

/// Extrude `profile` symmetrically about its plane.
pub fn build_prism<K: GeometryKernel>(
    kernel: &K,
    profile: &Profile2D,
    height: f64,
) -> Result<K::Solid, InfillError> {
    Ok(kernel.extrude_symmetric(profile, height)?)
}

/// One tool per unit-cell profile, placed at the grid origin.
pub fn build_base_tools<K: GeometryKernel>(
    kernel: &K,
    params: &InfillParams,
    grid: &TileGridSpec,
    bounds: &Aabb,
) -> Result<Vec<K::Solid>, InfillError> {
    let plane = SketchPlane::xy_at(grid.origin.z);
    let height = prism_height(bounds);

    params
        .style
        .unit_cell(grid.spacing)
        .iter()
        .map(|slot| {
            let center = Point2D::new(grid.origin.x + slot.offset.x, grid.origin.y + slot.offset.y);
            let profile = style_profile(
                params.style,
                params.size,
                params.rib_thickness,
                plane,
                center,
                slot.rotation_deg,
            );
            build_prism(kernel, &profile, height)
        })
        .collect()
}
