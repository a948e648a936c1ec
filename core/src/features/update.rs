//! Change-driven regeneration of infill features.

use super::{FeatureDescriptor, FeatureState};
use crate::document::ModelingSession;
use crate::infill::{regenerate, CancellationToken, InfillError, ProgressSink};
use crate::kernel::GeometryKernel;
use crate::topo::EntityId;
use tracing::{debug, info, instrument, warn};

/// What happened to one feature during an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    UpToDate,
    /// Replaced by a regenerated feature.
    Rebuilt { old: EntityId, new: EntityId },
    /// The stored source body no longer exists; the feature was skipped.
    MissingSource(EntityId),
    /// Regeneration failed; the old feature is kept.
    Failed(String),
    /// The update was cancelled before this stale feature was rebuilt; the
    /// old feature is kept.
    Cancelled,
}

impl UpdateOutcome {
    /// Feature state after the update, `None` when it was skipped.
    pub fn state(&self) -> Option<FeatureState> {
        match self {
            UpdateOutcome::UpToDate => Some(FeatureState::Fresh),
            UpdateOutcome::Rebuilt { .. } => Some(FeatureState::Rebuilt),
            UpdateOutcome::Failed(_) | UpdateOutcome::Cancelled => Some(FeatureState::Stale),
            UpdateOutcome::MissingSource(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    /// Per feature, in timeline order.
    pub outcomes: Vec<(EntityId, UpdateOutcome)>,
}

impl UpdateReport {
    pub fn rebuilt(&self) -> impl Iterator<Item = (EntityId, EntityId)> + '_ {
        self.outcomes.iter().filter_map(|(_, outcome)| match outcome {
            UpdateOutcome::Rebuilt { old, new } => Some((*old, *new)),
            _ => None,
        })
    }

    pub fn is_up_to_date(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| *outcome == UpdateOutcome::UpToDate)
    }
}

/// Regenerate every stale infill feature in the document.
///
/// Features are handled independently: a missing source or a failed
/// rebuild is recorded and the batch moves on. Once `cancel` fires, no
/// further feature is rebuilt and a partially cut rebuild is discarded.
#[instrument(skip_all)]
pub fn update<K: GeometryKernel>(
    session: &mut ModelingSession<K>,
    cancel: &CancellationToken,
    progress: &mut dyn ProgressSink,
) -> UpdateReport {
    let mut report = UpdateReport::default();

    for (feature, descriptor) in FeatureDescriptor::collect(&session.document) {
        let outcome = match descriptor {
            Ok(descriptor) => update_feature(session, feature, &descriptor, cancel, progress),
            Err(e) => {
                warn!(%feature, error = %e, "unreadable infill descriptor");
                UpdateOutcome::Failed(e.to_string())
            }
        };
        report.outcomes.push((feature, outcome));
    }

    info!(
        features = report.outcomes.len(),
        rebuilt = report.rebuilt().count(),
        "infill update finished"
    );
    report
}

fn update_feature<K: GeometryKernel>(
    session: &mut ModelingSession<K>,
    feature: EntityId,
    descriptor: &FeatureDescriptor,
    cancel: &CancellationToken,
    progress: &mut dyn ProgressSink,
) -> UpdateOutcome {
    match descriptor.check_state(&session.document) {
        Ok(FeatureState::Fresh) => UpdateOutcome::UpToDate,
        Ok(_) if cancel.is_cancelled() => UpdateOutcome::Cancelled,
        Ok(_) => match rebuild(session, feature, descriptor, cancel, progress) {
            Ok(Some(new)) => {
                debug!(old = %feature, %new, "infill feature rebuilt");
                UpdateOutcome::Rebuilt { old: feature, new }
            }
            Ok(None) => {
                info!(%feature, "infill rebuild cancelled, keeping the old feature");
                UpdateOutcome::Cancelled
            }
            Err(e) => {
                session.document.roll_to_end();
                warn!(%feature, error = %e, "infill rebuild failed");
                UpdateOutcome::Failed(e.to_string())
            }
        },
        Err(InfillError::MissingSource(source)) => {
            warn!(%feature, %source, "infill source is gone, skipping");
            UpdateOutcome::MissingSource(source)
        }
        Err(e) => UpdateOutcome::Failed(e.to_string()),
    }
}

/// Replace `feature` in place with a freshly generated one.
///
/// Returns `None` when the lattice was cancelled; the partial result is
/// deleted and `feature` is re-applied.
fn rebuild<K: GeometryKernel>(
    session: &mut ModelingSession<K>,
    feature: EntityId,
    descriptor: &FeatureDescriptor,
    cancel: &CancellationToken,
    progress: &mut dyn ProgressSink,
) -> Result<Option<EntityId>, InfillError> {
    session.document.roll_back_before(feature)?;
    let report = regenerate(session, descriptor, cancel, progress)?;
    let new = report.descriptor.feature_id;

    if report.cancelled {
        session.document.roll_back_before(new)?;
        session.document.delete_feature(new)?;
        session.document.roll_to_end();
        return Ok(None);
    }

    session.document.delete_feature(feature)?;
    session.document.roll_to_end();
    Ok(Some(new))
}
