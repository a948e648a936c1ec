//! Common geometry types for the kernel abstraction layer.
//!
//! These types are kernel-agnostic and used to communicate between
//! the infill pipeline and the kernel implementation.

use crate::geometry::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 2D point in sketch space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Point at `radius` from `self` in direction `angle_deg`.
    pub fn polar_offset(&self, radius: f64, angle_deg: f64) -> Self {
        let a = angle_deg.to_radians();
        Self::new(self.x + radius * a.cos(), self.y + radius * a.sin())
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<[f64; 2]> for Point2D {
    fn from(arr: [f64; 2]) -> Self {
        Self::new(arr[0], arr[1])
    }
}

/// A sketch plane definition for transforming 2D <-> 3D.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SketchPlane {
    pub origin: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub normal: Vector3,
}

impl SketchPlane {
    /// XY plane at origin.
    pub fn xy() -> Self {
        Self::xy_at(0.0)
    }

    /// XY plane lifted to height `z`.
    pub fn xy_at(z: f64) -> Self {
        Self {
            origin: Point3::new(0.0, 0.0, z),
            x_axis: Vector3::x(),
            y_axis: Vector3::y(),
            normal: Vector3::z(),
        }
    }

    /// Transform a 2D point to 3D world coordinates.
    pub fn to_world(&self, p: Point2D) -> Point3 {
        self.origin + self.x_axis * p.x + self.y_axis * p.y
    }

    /// Project a world point into plane coordinates.
    /// Returns the in-plane point and the signed distance along the normal.
    pub fn to_local(&self, p: &Point3) -> (Point2D, f64) {
        let v = p - self.origin;
        (
            Point2D::new(v.dot(&self.x_axis), v.dot(&self.y_axis)),
            v.dot(&self.normal),
        )
    }
}

impl Default for SketchPlane {
    fn default() -> Self {
        Self::xy()
    }
}

/// Boundary of a closed profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProfileOutline {
    /// Closed vertex loop, counter-clockwise, in plane coordinates.
    Polygon(Vec<Point2D>),
    /// Circle around the profile center.
    Circle { radius: f64 },
}

/// A closed 2D profile lying on a sketch plane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile2D {
    pub plane: SketchPlane,
    /// Center of the profile in plane coordinates.
    pub center: Point2D,
    pub outline: ProfileOutline,
}

impl Profile2D {
    pub fn polygon(plane: SketchPlane, center: Point2D, vertices: Vec<Point2D>) -> Self {
        Self {
            plane,
            center,
            outline: ProfileOutline::Polygon(vertices),
        }
    }

    pub fn circle(plane: SketchPlane, center: Point2D, radius: f64) -> Self {
        Self {
            plane,
            center,
            outline: ProfileOutline::Circle { radius },
        }
    }

    /// Number of polygon sides, `None` for circles.
    pub fn side_count(&self) -> Option<usize> {
        match &self.outline {
            ProfileOutline::Polygon(vertices) => Some(vertices.len()),
            ProfileOutline::Circle { .. } => None,
        }
    }

    /// Largest distance from the center to the boundary.
    pub fn max_radius(&self) -> f64 {
        match &self.outline {
            ProfileOutline::Polygon(vertices) => vertices
                .iter()
                .map(|v| v.distance(&self.center))
                .fold(0.0, f64::max),
            ProfileOutline::Circle { radius } => *radius,
        }
    }

    /// Enclosed area (shoelace formula for polygons).
    pub fn area(&self) -> f64 {
        match &self.outline {
            ProfileOutline::Polygon(vertices) => {
                let n = vertices.len();
                let twice: f64 = (0..n)
                    .map(|i| {
                        let a = vertices[i];
                        let b = vertices[(i + 1) % n];
                        a.x * b.y - b.x * a.y
                    })
                    .sum();
                twice.abs() / 2.0
            }
            ProfileOutline::Circle { radius } => std::f64::consts::PI * radius * radius,
        }
    }

    /// In-plane inclusion test (even-odd rule for polygons).
    pub fn contains(&self, p: Point2D) -> bool {
        match &self.outline {
            ProfileOutline::Polygon(vertices) => {
                let mut inside = false;
                let n = vertices.len();
                let mut j = n.wrapping_sub(1);
                for i in 0..n {
                    let (a, b) = (vertices[i], vertices[j]);
                    if (a.y > p.y) != (b.y > p.y)
                        && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
                    {
                        inside = !inside;
                    }
                    j = i;
                }
                inside
            }
            ProfileOutline::Circle { radius } => p.distance(&self.center) <= *radius,
        }
    }

    /// In-plane bounds as (min, max).
    pub fn bounds_2d(&self) -> (Point2D, Point2D) {
        match &self.outline {
            ProfileOutline::Polygon(vertices) => {
                let mut min = Point2D::new(f64::INFINITY, f64::INFINITY);
                let mut max = Point2D::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
                for v in vertices {
                    min.x = min.x.min(v.x);
                    min.y = min.y.min(v.y);
                    max.x = max.x.max(v.x);
                    max.y = max.y.max(v.y);
                }
                (min, max)
            }
            ProfileOutline::Circle { radius } => (
                Point2D::new(self.center.x - radius, self.center.y - radius),
                Point2D::new(self.center.x + radius, self.center.y + radius),
            ),
        }
    }
}
