//! Infill styles, their per-style constants, and the body mode.

use super::InfillError;
use crate::kernel::Point2D;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// Unit-cell shape of an infill lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InfillStyle {
    #[default]
    Hex,
    Square,
    Triangle,
    Circle,
}

/// Outline family of a style.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StyleOutline {
    /// Regular polygon whose first vertex sits at `-offset_deg`.
    Polygon { sides: usize, offset_deg: f64 },
    Circle,
}

/// One base profile of a unit cell, relative to the cell origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSlot {
    pub offset: Point2D,
    /// Added to the style's own angular offset.
    pub rotation_deg: f64,
}

impl CellSlot {
    fn at(x: f64, y: f64, rotation_deg: f64) -> Self {
        Self {
            offset: Point2D::new(x, y),
            rotation_deg,
        }
    }
}

impl InfillStyle {
    pub const ALL: [InfillStyle; 4] = [
        InfillStyle::Hex,
        InfillStyle::Square,
        InfillStyle::Triangle,
        InfillStyle::Circle,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            InfillStyle::Hex => "hex",
            InfillStyle::Square => "square",
            InfillStyle::Triangle => "triangle",
            InfillStyle::Circle => "circle",
        }
    }

    pub fn outline(&self) -> StyleOutline {
        match self {
            InfillStyle::Hex => StyleOutline::Polygon { sides: 6, offset_deg: 30.0 },
            InfillStyle::Square => StyleOutline::Polygon { sides: 4, offset_deg: 0.0 },
            InfillStyle::Triangle => StyleOutline::Polygon { sides: 3, offset_deg: 60.0 },
            InfillStyle::Circle => StyleOutline::Circle,
        }
    }

    /// Declared polygon side count, `None` for circles.
    pub fn side_count(&self) -> Option<usize> {
        match self.outline() {
            StyleOutline::Polygon { sides, .. } => Some(sides),
            StyleOutline::Circle => None,
        }
    }

    /// Reduction of the profile radius that leaves `rib` of wall between
    /// neighbouring cells.
    pub fn gap(&self, rib: f64) -> f64 {
        match self {
            InfillStyle::Hex => rib / SQRT_3,
            InfillStyle::Square => rib * std::f64::consts::SQRT_2 / 2.0,
            InfillStyle::Triangle => rib,
            InfillStyle::Circle => rib / 2.0,
        }
    }

    /// Profile radius (center to vertex, or circle radius).
    pub fn profile_radius(&self, size: f64, rib: f64) -> f64 {
        size / 2.0 - self.gap(rib)
    }

    /// Unit-cell spacing `(dx, dy)` for a cell of characteristic `size`.
    pub fn spacing(&self, size: f64) -> (f64, f64) {
        match self {
            InfillStyle::Hex => (SQRT_3 * size / 4.0, 3.0 * size / 4.0),
            InfillStyle::Square => (size / 2.0, size / 2.0),
            InfillStyle::Triangle => (size / 4.0, SQRT_3 * size / 4.0),
            InfillStyle::Circle => (size / 2.0, SQRT_3 * size / 2.0),
        }
    }

    /// Base profiles making up one unit cell, for spacing `(dx, dy)`.
    pub fn unit_cell(&self, (dx, dy): (f64, f64)) -> Vec<CellSlot> {
        match self {
            InfillStyle::Triangle => vec![
                CellSlot::at(dx, 0.0, 0.0),
                CellSlot::at(0.0, dy, 60.0),
                CellSlot::at(3.0 * dx, 0.0, 60.0),
                CellSlot::at(4.0 * dx, dy, 0.0),
            ],
            InfillStyle::Hex | InfillStyle::Square | InfillStyle::Circle => {
                vec![CellSlot::at(0.0, 0.0, 0.0), CellSlot::at(dx, dy, 0.0)]
            }
        }
    }
}

impl fmt::Display for InfillStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for InfillStyle {
    type Err = InfillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        InfillStyle::ALL
            .into_iter()
            .find(|style| style.token().eq_ignore_ascii_case(token))
            .ok_or_else(|| InfillError::InvalidStyle(s.to_string()))
    }
}

/// How the lattice is combined with the source body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BodyType {
    /// Hollow the body to a wall, cut the lattice into the core, and join
    /// the two.
    #[default]
    CreateShell,
    /// Cut the lattice straight through the body.
    DirectCut,
}

impl BodyType {
    pub fn token(&self) -> &'static str {
        match self {
            BodyType::CreateShell => "create_shell",
            BodyType::DirectCut => "direct_cut",
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for BodyType {
    type Err = InfillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [BodyType::CreateShell, BodyType::DirectCut]
            .into_iter()
            .find(|body| body.token().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| InfillError::InvalidBodyType(s.to_string()))
    }
}
