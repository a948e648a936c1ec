//! Truck-based implementation of the geometry kernel.
//!
//! Exact B-rep solids from the Truck library (Apache-2.0). Booleans go
//! through `truck-shapeops`; volume and bounds are measured on a
//! triangulation at `tolerance`.

use super::types::*;
use super::{GeometryKernel, KernelOpError, KernelResult};
use crate::geometry::{Aabb, Point3 as GeoPoint3, Vector3 as GeoVector3, EPSILON};

use truck_meshalgo::tessellation::{MeshableShape, MeshedShape};
use truck_modeling::{builder, Point3, Rad, Solid, Vector3, Vertex, Wire};
use truck_polymesh::PolygonMesh;

/// Truck-based CAD kernel implementation.
#[derive(Debug, Clone)]
pub struct TruckKernel {
    /// Tessellation and boolean tolerance.
    pub tolerance: f64,
}

impl TruckKernel {
    pub fn new() -> Self {
        Self {
            tolerance: 0.01, // 0.01mm precision
        }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    fn mesh(&self, solid: &Solid) -> PolygonMesh {
        solid.triangulation(self.tolerance).to_polygon()
    }

    /// Whether the bounds of `a` and `b` share more than a tolerance-thin
    /// slab. Shapeops needs a real intersection to split faces.
    fn bounds_overlap(&self, a: &Solid, b: &Solid) -> KernelResult<bool> {
        let overlap = self.bounding_box(a)?.intersection(&self.bounding_box(b)?);
        Ok(overlap.is_some_and(|bb| {
            let e = bb.extent();
            e.x > self.tolerance && e.y > self.tolerance && e.z > self.tolerance
        }))
    }

    /// Closed wire of the profile outline, lowered by `offset` along the
    /// plane normal.
    fn build_outline_wire(&self, profile: &Profile2D, offset: f64) -> KernelResult<Wire> {
        let plane = &profile.plane;
        let lift = plane.normal * -offset;
        let place = |p: Point2D| to_truck_point(&(plane.to_world(p) + lift));

        match &profile.outline {
            ProfileOutline::Polygon(points) => {
                if points.len() < 3 {
                    return Err(KernelOpError::InvalidGeometry(
                        "Polygon must have at least 3 vertices".into(),
                    ));
                }
                let mut vertices: Vec<Vertex> =
                    points.iter().map(|p| builder::vertex(place(*p))).collect();
                // Close the loop
                vertices.push(vertices[0].clone());

                let edges = vertices.windows(2).map(|pair| builder::line(&pair[0], &pair[1]));
                Ok(Wire::from_iter(edges))
            }
            ProfileOutline::Circle { radius } => {
                if !(*radius > 0.0) {
                    return Err(KernelOpError::InvalidGeometry(format!(
                        "Circle radius must be positive, got {}",
                        radius
                    )));
                }
                let start = Point2D::new(profile.center.x + radius, profile.center.y);
                let v: Vertex = builder::vertex(place(start));
                // Truck closes the sweep only for angles beyond 2π.
                Ok(builder::rsweep(
                    &v,
                    place(profile.center),
                    to_truck_vector(&plane.normal),
                    Rad(7.0),
                ))
            }
        }
    }
}

impl Default for TruckKernel {
    fn default() -> Self {
        Self::new()
    }
}

fn non_empty(solid: Solid, op: &str) -> KernelResult<Solid> {
    if solid.boundaries().is_empty() {
        return Err(KernelOpError::OperationFailed(format!("Boolean {} left no shells", op)));
    }
    Ok(solid)
}

fn to_truck_point(p: &GeoPoint3) -> Point3 {
    Point3::new(p.x, p.y, p.z)
}

fn to_truck_vector(v: &GeoVector3) -> Vector3 {
    Vector3::new(v.x, v.y, v.z)
}

impl GeometryKernel for TruckKernel {
    type Solid = Solid;

    fn create_box(&self, min: GeoPoint3, max: GeoPoint3) -> KernelResult<Self::Solid> {
        let size = max - min;
        if !(size.x > 0.0 && size.y > 0.0 && size.z > 0.0) {
            return Err(KernelOpError::InvalidGeometry(format!(
                "Box max {:?} must exceed min {:?} on every axis",
                max, min
            )));
        }
        let v = builder::vertex(to_truck_point(&min));
        let edge0 = builder::tsweep(&v, Vector3::new(size.x, 0.0, 0.0));
        let face0 = builder::tsweep(&edge0, Vector3::new(0.0, size.y, 0.0));
        Ok(builder::tsweep(&face0, Vector3::new(0.0, 0.0, size.z)))
    }

    fn extrude_symmetric(&self, profile: &Profile2D, height: f64) -> KernelResult<Self::Solid> {
        if !(height > 0.0) || !height.is_finite() {
            return Err(KernelOpError::InvalidGeometry(format!(
                "Extrusion height must be positive, got {}",
                height
            )));
        }
        if !(profile.area() > EPSILON) {
            return Err(KernelOpError::InvalidGeometry("Profile encloses no area".into()));
        }

        let wire = self.build_outline_wire(profile, height / 2.0)?;
        let face = builder::try_attach_plane(&[wire])
            .map_err(|e| KernelOpError::OperationFailed(format!("Failed to create face: {:?}", e)))?;
        let sweep = to_truck_vector(&(profile.plane.normal * height));
        Ok(builder::tsweep(&face, sweep))
    }

    fn translate(&self, solid: &Self::Solid, offset: GeoVector3) -> KernelResult<Self::Solid> {
        Ok(builder::translated(solid, to_truck_vector(&offset)))
    }

    // === Boolean Operations ===

    fn boolean_union(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid> {
        if !self.bounds_overlap(solid_a, solid_b)? {
            // Disjoint: keep both boundaries side by side.
            let shells = solid_a.boundaries().iter().chain(solid_b.boundaries()).cloned().collect();
            return Solid::try_new(shells)
                .map_err(|e| KernelOpError::OperationFailed(format!("Boolean union failed: {:?}", e)));
        }
        let result = truck_shapeops::or(solid_a, solid_b, self.tolerance)
            .ok_or_else(|| KernelOpError::OperationFailed("Boolean union failed".into()))?;
        non_empty(result, "union")
    }

    fn boolean_subtract(&self, solid_a: &Self::Solid, solid_b: &Self::Solid) -> KernelResult<Self::Solid> {
        // Shapeops drops every shell when the operands do not meet.
        if !self.bounds_overlap(solid_a, solid_b)? {
            return Ok(solid_a.clone());
        }
        // A - B = A AND (NOT B); not() mutates in place
        let mut complement_b = solid_b.clone();
        complement_b.not();
        let result = truck_shapeops::and(solid_a, &complement_b, self.tolerance)
            .ok_or_else(|| KernelOpError::OperationFailed("Boolean subtraction failed".into()))?;
        non_empty(result, "subtraction")
    }

    fn shell(&self, _solid: &Self::Solid, _inside_thickness: f64) -> KernelResult<Self::Solid> {
        Err(KernelOpError::NotImplemented(
            "Inward shell offset is not supported by the Truck kernel".into(),
        ))
    }

    // === Queries ===

    fn bounding_box(&self, solid: &Self::Solid) -> KernelResult<Aabb> {
        let mesh = self.mesh(solid);
        let mut bb = Aabb::empty();
        for p in mesh.positions() {
            bb.extend(&GeoPoint3::new(p.x, p.y, p.z));
        }
        if bb.is_empty() {
            return Err(KernelOpError::InvalidGeometry("Empty solid has no bounding box".into()));
        }
        Ok(bb)
    }

    fn volume(&self, solid: &Self::Solid) -> KernelResult<f64> {
        // Divergence theorem over the closed triangulation.
        let mesh = self.mesh(solid);
        let positions = mesh.positions();
        let signed: f64 = mesh
            .tri_faces()
            .iter()
            .map(|tri| {
                let a = positions[tri[0].pos];
                let b = positions[tri[1].pos];
                let c = positions[tri[2].pos];
                a.x * (b.y * c.z - b.z * c.y) - a.y * (b.x * c.z - b.z * c.x)
                    + a.z * (b.x * c.y - b.y * c.x)
            })
            .sum();
        Ok(signed.abs() / 6.0)
    }
}
