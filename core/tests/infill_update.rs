mod common;

use common::{session_with_cube, CountingKernel};
use infill_core::document::{BodyState, ModelingSession};
use infill_core::features::{update, FeatureDescriptor, FeatureState, UpdateOutcome};
use infill_core::geometry::Point3;
use infill_core::infill::{generate, BodyType, CancellationToken, InfillParams, InfillStyle, NullProgress};
use infill_core::kernel::{GeometryKernel, VoxelKernel};
use infill_core::topo::EntityId;

fn params() -> InfillParams {
    InfillParams {
        style: InfillStyle::Square,
        body_type: BodyType::CreateShell,
        size: 6.0,
        shell_thickness: 3.0,
        rib_thickness: 1.0,
    }
}

fn generated() -> (ModelingSession<VoxelKernel>, EntityId, FeatureDescriptor) {
    let (mut session, source) = session_with_cube(VoxelKernel::new(1.0), 20.0);
    let report = generate(&mut session, source, &params(), &CancellationToken::new(), &mut NullProgress).unwrap();
    (session, source, report.descriptor)
}

fn run_update(session: &mut ModelingSession<VoxelKernel>) -> infill_core::features::UpdateReport {
    update(session, &CancellationToken::new(), &mut NullProgress)
}

fn only_descriptor(session: &ModelingSession<VoxelKernel>) -> FeatureDescriptor {
    let mut all = FeatureDescriptor::collect(&session.document);
    assert_eq!(all.len(), 1);
    all.remove(0).1.unwrap()
}

#[test]
fn test_update_without_changes_is_a_no_op() {
    let (mut session, _, descriptor) = generated();
    assert_eq!(descriptor.check_state(&session.document).unwrap(), FeatureState::Fresh);

    let report = run_update(&mut session);
    assert!(report.is_up_to_date());
    assert_eq!(report.outcomes, vec![(descriptor.feature_id, UpdateOutcome::UpToDate)]);
    assert_eq!(only_descriptor(&session), descriptor);
    assert!(session.document.live_body(descriptor.result_body_id).is_ok());
}

#[test]
fn test_source_edit_triggers_exactly_one_rebuild() {
    let (mut session, source, old) = generated();
    let bigger = session
        .kernel
        .create_box(Point3::origin(), Point3::new(24.0, 20.0, 20.0))
        .unwrap();
    let new_revision = session.document.modify_body(source, bigger).unwrap();
    assert_eq!(old.check_state(&session.document).unwrap(), FeatureState::Stale);

    let report = run_update(&mut session);
    let rebuilt: Vec<_> = report.rebuilt().collect();
    assert_eq!(rebuilt.len(), 1);
    assert_eq!(rebuilt[0].0, old.feature_id);
    assert_eq!(report.outcomes[0].1.state(), Some(FeatureState::Rebuilt));

    let new = only_descriptor(&session);
    assert_eq!(new.feature_id, rebuilt[0].1);
    assert_ne!(new.result_body_id, old.result_body_id);
    assert_eq!(new.source_revision_id, new_revision);
    assert_eq!(new.params(), old.params());

    let doc = &session.document;
    assert!(doc.body(old.result_body_id).is_none());
    assert!(doc.live_body(new.result_body_id).is_ok());
    assert_eq!(doc.body(source).unwrap().state, BodyState::Consumed(new.feature_id));
    assert!(doc.timeline().rolled_back_features().is_empty());

    // A second update finds nothing to do.
    assert!(run_update(&mut session).is_up_to_date());
}

#[test]
fn test_rebuild_reproduces_unchanged_geometry() {
    let (mut session, source, old) = generated();
    let old_volume = {
        let result = session.document.body(old.result_body_id).unwrap();
        session.kernel.volume(&result.solid).unwrap()
    };

    // Same shape, new revision.
    let same = session.document.body(source).unwrap().solid.clone();
    session.document.modify_body(source, same).unwrap();
    run_update(&mut session);

    let new = only_descriptor(&session);
    let result = session.document.body(new.result_body_id).unwrap();
    assert_eq!(session.kernel.volume(&result.solid).unwrap(), old_volume);
}

#[test]
fn test_missing_source_is_skipped_and_batch_continues() {
    let (mut session, gone, first) = generated();
    let other = session
        .kernel
        .create_box(Point3::new(40.0, 0.0, 0.0), Point3::new(60.0, 20.0, 20.0))
        .unwrap();
    let kept = session.document.add_body("Body2", other);
    let second = generate(&mut session, kept, &params(), &CancellationToken::new(), &mut NullProgress)
        .unwrap()
        .descriptor;

    session.document.remove_body(gone).unwrap();
    let resized = session
        .kernel
        .create_box(Point3::new(40.0, 0.0, 0.0), Point3::new(60.0, 25.0, 20.0))
        .unwrap();
    session.document.modify_body(kept, resized).unwrap();

    let report = run_update(&mut session);
    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.outcomes[0], (first.feature_id, UpdateOutcome::MissingSource(gone)));
    assert!(matches!(
        report.outcomes[1].1,
        UpdateOutcome::Rebuilt { old, .. } if old == second.feature_id
    ));
}

#[test]
fn test_failed_rebuild_keeps_old_feature() {
    let (mut session, source, old) = generated();
    // Too small for a 3 mm shell.
    let tiny = session
        .kernel
        .create_box(Point3::origin(), Point3::new(4.0, 4.0, 4.0))
        .unwrap();
    session.document.modify_body(source, tiny).unwrap();

    let report = run_update(&mut session);
    assert!(matches!(report.outcomes[0].1, UpdateOutcome::Failed(_)));
    assert_eq!(report.outcomes[0].1.state(), Some(FeatureState::Stale));

    let doc = &session.document;
    assert_eq!(only_descriptor(&session), old);
    assert!(doc.live_body(old.result_body_id).is_ok());
    assert_eq!(doc.body(source).unwrap().state, BodyState::Consumed(old.feature_id));
    assert!(doc.timeline().rolled_back_features().is_empty());
}

#[test]
fn test_cancelled_update_leaves_stale_features_untouched() {
    let (mut session, first_source, first) = generated();
    let other = session
        .kernel
        .create_box(Point3::new(40.0, 0.0, 0.0), Point3::new(60.0, 20.0, 20.0))
        .unwrap();
    let second_source = session.document.add_body("Body2", other);
    let second = generate(&mut session, second_source, &params(), &CancellationToken::new(), &mut NullProgress)
        .unwrap()
        .descriptor;
    for source in [first_source, second_source] {
        let same = session.document.body(source).unwrap().solid.clone();
        session.document.modify_body(source, same).unwrap();
    }

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = update(&mut session, &cancel, &mut NullProgress);
    assert_eq!(
        report.outcomes,
        vec![
            (first.feature_id, UpdateOutcome::Cancelled),
            (second.feature_id, UpdateOutcome::Cancelled),
        ]
    );
    assert_eq!(report.outcomes[0].1.state(), Some(FeatureState::Stale));

    // Nothing was regenerated, so both features are still stale and a
    // later update restores them.
    for descriptor in [&first, &second] {
        assert_eq!(descriptor.check_state(&session.document).unwrap(), FeatureState::Stale);
        assert!(session.document.live_body(descriptor.result_body_id).is_ok());
    }
    let report = run_update(&mut session);
    assert_eq!(report.rebuilt().count(), 2);
    assert!(run_update(&mut session).is_up_to_date());
}

#[test]
fn test_rebuild_cancelled_mid_lattice_keeps_old_feature() {
    let (mut session, source) = session_with_cube(CountingKernel::new(1.0), 20.0);
    let old = generate(&mut session, source, &params(), &CancellationToken::new(), &mut NullProgress)
        .unwrap()
        .descriptor;
    let old_result = session.document.body(old.result_body_id).unwrap().solid.inner.clone();

    let same = session.document.body(source).unwrap().solid.clone();
    session.document.modify_body(source, same).unwrap();

    let cancel = CancellationToken::new();
    let done = session.kernel.counters.subtractions();
    session.kernel.cancel_after = Some((done + 3, cancel.clone()));
    let report = update(&mut session, &cancel, &mut NullProgress);
    assert_eq!(report.outcomes, vec![(old.feature_id, UpdateOutcome::Cancelled)]);

    let doc = &session.document;
    assert_eq!(doc.timeline().len(), 1);
    assert!(doc.timeline().rolled_back_features().is_empty());
    assert_eq!(doc.bodies().count(), 2);
    assert_eq!(doc.body(source).unwrap().state, BodyState::Consumed(old.feature_id));
    assert_eq!(doc.live_body(old.result_body_id).unwrap().solid.inner, old_result);

    let mut all = FeatureDescriptor::collect(doc);
    assert_eq!(all.remove(0).1.unwrap(), old);
    assert_eq!(old.check_state(doc).unwrap(), FeatureState::Stale);

    session.kernel.cancel_after = None;
    let report = update(&mut session, &CancellationToken::new(), &mut NullProgress);
    assert_eq!(report.rebuilt().count(), 1);
}
