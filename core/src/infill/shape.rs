//! Per-style 2D profiles.

use super::{InfillStyle, StyleOutline};
use crate::kernel::{Point2D, Profile2D, SketchPlane};

/// Profile of one cell of `style`, centred at `center` on `plane`.
///
/// Polygon vertex `i` sits at angle `(360 / sides) * i - offset + rotation`
/// and radius `size / 2 - gap(rib)`.
pub fn style_profile(
    style: InfillStyle,
    size: f64,
    rib: f64,
    plane: SketchPlane,
    center: Point2D,
    rotation_deg: f64,
) -> Profile2D {
    let radius = style.profile_radius(size, rib);
    match style.outline() {
        StyleOutline::Polygon { sides, offset_deg } => {
            let step = 360.0 / sides as f64;
            let vertices = (0..sides)
                .map(|i| center.polar_offset(radius, step * i as f64 - offset_deg + rotation_deg))
                .collect();
            Profile2D::polygon(plane, center, vertices)
        }
        StyleOutline::Circle => Profile2D::circle(plane, center, radius),
    }
}
