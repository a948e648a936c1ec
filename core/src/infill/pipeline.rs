//! End-to-end infill generation against a modeling session.

use super::{
    build_base_tools, combine, CancellationToken, InfillError, InfillParams, LatticePattern, ProgressSink,
    TileGridSpec,
};
use crate::document::{DocumentError, ModelingSession};
use crate::features::{FeatureDescriptor, DESCRIPTOR_GROUP};
use crate::kernel::GeometryKernel;
use crate::topo::EntityId;
use tracing::{debug, info, instrument};

/// Outcome of one generation.
#[derive(Debug, Clone)]
pub struct InfillReport {
    pub descriptor: FeatureDescriptor,
    pub percentage: f64,
    pub start_volume: f64,
    pub final_volume: f64,
    pub applied: usize,
    pub total: usize,
    pub cancelled: bool,
}

impl InfillReport {
    /// The user-visible result message.
    pub fn summary(&self) -> String {
        format!("The final percentage infill is: {:.0}%", self.percentage)
    }
}

/// Generate an infill for the live body `source` and commit it as one
/// timeline feature.
///
/// Nothing is written to the document unless the lattice completes or is
/// cancelled; a kernel failure leaves the document untouched.
#[instrument(skip_all, fields(source = %source, style = %params.style, body_type = %params.body_type))]
pub fn generate<K: GeometryKernel>(
    session: &mut ModelingSession<K>,
    source: EntityId,
    params: &InfillParams,
    cancel: &CancellationToken,
    progress: &mut dyn ProgressSink,
) -> Result<InfillReport, InfillError> {
    params.validate()?;

    let kernel = &session.kernel;
    let document = &mut session.document;

    let body = document.body(source).ok_or(InfillError::MissingSource(source))?;
    if !body.is_live() {
        return Err(DocumentError::BodyNotLive(source).into());
    }
    let source_revision = body.revision;
    let result_name = format!("{} infill", body.name);

    let bounds = kernel.bounding_box(&body.solid)?;
    let grid = TileGridSpec::plan(params.style, params.size, &bounds);
    debug!(
        nx = grid.counts.0,
        ny = grid.counts.1,
        columns = grid.columns,
        rows = grid.rows,
        "planned tile grid"
    );
    grid.tool_count(params.style.unit_cell(grid.spacing).len())?;

    let tools = build_base_tools(kernel, params, &grid, &bounds)?;
    let pattern = LatticePattern::new(kernel, &tools, &grid);
    let outcome = combine(
        kernel,
        &body.solid,
        params.body_type,
        params.shell_thickness,
        pattern,
        cancel,
        progress,
    )?;
    let percentage = outcome.infill_percentage();

    let mut tx = document.transaction("Infill");
    tx.consume_body(source)?;
    let result = tx.create_body(result_name, outcome.solid);
    let descriptor = FeatureDescriptor {
        style: params.style,
        body_type: params.body_type,
        size: params.size,
        shell_thickness: params.shell_thickness,
        rib_thickness: params.rib_thickness,
        source_body_id: source,
        result_body_id: result,
        feature_id: tx.feature_id(),
        revision_id: tx.revision(),
        source_revision_id: source_revision,
    };
    tx.set_attribute(DESCRIPTOR_GROUP, descriptor.encode()?);
    tx.finish();

    info!(
        feature = %descriptor.feature_id,
        applied = outcome.applied,
        total = outcome.total,
        cancelled = outcome.cancelled,
        percentage,
        "infill generated"
    );

    Ok(InfillReport {
        descriptor,
        percentage,
        start_volume: outcome.start_volume,
        final_volume: outcome.final_volume,
        applied: outcome.applied,
        total: outcome.total,
        cancelled: outcome.cancelled,
    })
}

/// Regenerate from a stored descriptor's parameters.
pub fn regenerate<K: GeometryKernel>(
    session: &mut ModelingSession<K>,
    descriptor: &FeatureDescriptor,
    cancel: &CancellationToken,
    progress: &mut dyn ProgressSink,
) -> Result<InfillReport, InfillError> {
    generate(session, descriptor.source_body_id, &descriptor.params(), cancel, progress)
}
