//! Tile grid planning over a body's footprint.

use super::{InfillError, InfillStyle};
use crate::geometry::{Aabb, Point3, Vector3};

/// Extra cells per axis beyond the body extent.
pub const COVERAGE_MARGIN: usize = 4;

/// Upper bound on the tool copies of one lattice.
pub const MAX_LATTICE_TOOLS: usize = 1_000_000;

/// Cells per axis needed to cover `extent` at `spacing`, margin included.
///
/// Saturates at `usize::MAX` for degenerate ratios.
pub fn tile_count(extent: f64, spacing: f64) -> usize {
    ((extent.max(0.0) / (2.0 * spacing)).ceil() as usize).saturating_add(COVERAGE_MARGIN)
}

/// Placement of unit cells over the pattern plane.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGridSpec {
    /// Body centre; tools are laid out on the plane through it.
    pub origin: Point3,
    pub spacing: (f64, f64),
    /// Coverage counts `(nx, ny)`.
    pub counts: (usize, usize),
    /// Distance between neighbouring unit cells.
    pub pitch: (f64, f64),
    pub columns: usize,
    pub rows: usize,
}

/// One unit-cell position of the grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridCell {
    pub i: usize,
    pub j: usize,
    /// Offset from the base tools to this cell.
    pub translation: Vector3,
}

impl TileGridSpec {
    pub fn plan(style: InfillStyle, size: f64, bounds: &Aabb) -> Self {
        let spacing = style.spacing(size);
        let extent = bounds.extent();
        let nx = tile_count(extent.x, spacing.0);
        let ny = tile_count(extent.y, spacing.1);

        // The four-profile triangle cell is three spacings wide, so half as
        // many columns at 1.5x the pitch cover the same width.
        let (columns, pitch_x) = match style {
            InfillStyle::Triangle => (nx.div_ceil(2).saturating_mul(2), 6.0 * spacing.0),
            InfillStyle::Hex | InfillStyle::Square | InfillStyle::Circle => (nx.saturating_mul(2), 2.0 * spacing.0),
        };

        Self {
            origin: bounds.center(),
            spacing,
            counts: (nx, ny),
            pitch: (pitch_x, 2.0 * spacing.1),
            columns,
            rows: ny.saturating_mul(2),
        }
    }

    /// Saturating; see [`TileGridSpec::tool_count`] for the checked total.
    pub fn cell_count(&self) -> usize {
        self.columns.saturating_mul(self.rows)
    }

    /// Tool copies for `bases` profiles per cell, rejecting grids beyond
    /// [`MAX_LATTICE_TOOLS`].
    pub fn tool_count(&self, bases: usize) -> Result<usize, InfillError> {
        self.columns
            .checked_mul(self.rows)
            .and_then(|cells| cells.checked_mul(bases))
            .filter(|&total| total <= MAX_LATTICE_TOOLS)
            .ok_or_else(|| {
                InfillError::InvalidParameter(format!(
                    "Infill grid of {} x {} cells exceeds {} tools; increase the size",
                    self.columns, self.rows, MAX_LATTICE_TOOLS
                ))
            })
    }

    /// Cell `index` in row-major order.
    pub fn cell(&self, index: usize) -> Option<GridCell> {
        if index >= self.cell_count() {
            return None;
        }
        let (i, j) = (index % self.columns, index / self.columns);
        let x = (i as f64 - (self.columns / 2) as f64) * self.pitch.0;
        let y = (j as f64 - (self.rows / 2) as f64) * self.pitch.1;
        Some(GridCell {
            i,
            j,
            translation: Vector3::new(x, y, 0.0),
        })
    }

    /// Lazily enumerate every cell.
    pub fn cells(&self) -> impl Iterator<Item = GridCell> + '_ {
        (0..self.cell_count()).filter_map(move |index| self.cell(index))
    }
}
