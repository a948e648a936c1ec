//! Lattice infill generation.
//!
//! Data flows shape -> prism -> pattern -> combine; [`generate`] runs the
//! whole chain against a [`ModelingSession`](crate::document::ModelingSession).

mod combine;
mod error;
mod layout;
mod params;
mod pattern;
mod pipeline;
mod prism;
mod shape;
mod style;

pub use combine::{combine, CombineOutcome};
pub use error::InfillError;
pub use layout::{tile_count, GridCell, TileGridSpec, COVERAGE_MARGIN, MAX_LATTICE_TOOLS};
pub use params::InfillParams;
pub use pattern::{
    format_progress, CancellationToken, LatticePattern, LogProgress, NullProgress, PatternOutcome, ProgressSink,
    ToolCopy,
};
pub use pipeline::{generate, regenerate, InfillReport};
pub use prism::{build_base_tools, build_prism, prism_height, HEIGHT_MARGIN};
pub use shape::style_profile;
pub use style::{BodyType, CellSlot, InfillStyle, StyleOutline};
