mod common;

use common::{session_with_cube, CountingKernel};
use infill_core::document::{BodyState, DocumentError};
use infill_core::features::{FeatureDescriptor, DESCRIPTOR_GROUP};
use infill_core::geometry::{Aabb, Point3};
use infill_core::infill::{
    build_base_tools, generate, BodyType, CancellationToken, InfillError, InfillParams, InfillStyle,
    LatticePattern, LogProgress, NullProgress, TileGridSpec,
};
use infill_core::kernel::{GeometryKernel, VoxelKernel};
use infill_core::topo::EntityId;

fn half_inch_hex() -> InfillParams {
    InfillParams {
        style: InfillStyle::Hex,
        body_type: BodyType::CreateShell,
        size: 12.7,
        shell_thickness: 7.62,
        rib_thickness: 2.54,
    }
}

#[test]
fn test_hex_shell_on_50mm_cube() {
    let (mut session, source) = session_with_cube(VoxelKernel::new(0.5), 50.0);
    let params = half_inch_hex();

    let mut progress = LogProgress::default();
    let report = generate(&mut session, source, &params, &CancellationToken::new(), &mut progress).unwrap();

    // 18 x 14 cells of two hexagons each
    let cube = Aabb::new(Point3::origin(), Point3::new(50.0, 50.0, 50.0));
    let grid = TileGridSpec::plan(InfillStyle::Hex, 12.7, &cube);
    assert_eq!(grid.counts, (9, 7));
    assert_eq!(report.total, grid.cell_count() * 2);
    assert_eq!(report.applied, report.total);
    assert!(!report.cancelled);

    println!("{}", report.summary());
    assert!(report.percentage > 0.0 && report.percentage < 100.0);
    assert!((report.start_volume - 125_000.0).abs() < 1e-6);
    assert!(report.summary().starts_with("The final percentage infill is: "));

    // The source is replaced by the result inside one feature.
    let doc = &session.document;
    let d = &report.descriptor;
    assert_eq!(doc.timeline().len(), 1);
    assert_eq!(doc.body(source).unwrap().state, BodyState::Consumed(d.feature_id));
    let result = doc.live_body(d.result_body_id).unwrap();
    assert_eq!(result.revision, d.revision_id);
    assert_eq!(d.source_body_id, source);

    let stored = doc.timeline().features()[0].attribute(DESCRIPTOR_GROUP).unwrap();
    assert_eq!(&FeatureDescriptor::decode(stored).unwrap(), d);
}

#[test]
fn test_every_style_direct_cut_reduces_volume() {
    for style in InfillStyle::ALL {
        let (mut session, source) = session_with_cube(VoxelKernel::new(0.5), 20.0);
        let params = InfillParams {
            style,
            body_type: BodyType::DirectCut,
            size: 6.0,
            rib_thickness: 1.0,
            ..Default::default()
        };
        let report = generate(&mut session, source, &params, &CancellationToken::new(), &mut NullProgress).unwrap();
        assert!(report.final_volume <= report.start_volume, "{}", style);
        assert!(report.final_volume > 0.0, "{}", style);
    }
}

#[test]
fn test_cancel_after_k_subtractions() {
    let k = 10;
    let cancel = CancellationToken::new();
    let mut kernel = CountingKernel::new(1.0);
    kernel.cancel_after = Some((k, cancel.clone()));
    let counters = kernel.counters.clone();
    let (mut session, source) = session_with_cube(kernel, 20.0);
    let params = InfillParams {
        body_type: BodyType::DirectCut,
        size: 6.0,
        rib_thickness: 1.0,
        ..Default::default()
    };

    let report = generate(&mut session, source, &params, &cancel, &mut NullProgress).unwrap();
    assert!(report.cancelled);
    assert_eq!(report.applied, k);
    assert!(report.total > k);
    assert_eq!(counters.subtractions(), k);
    assert_eq!(counters.live_tools(), 0, "tool solids leaked");

    // The transaction was finalized with the partial cut.
    let doc = &session.document;
    assert_eq!(doc.timeline().len(), 1);
    let result = doc.live_body(report.descriptor.result_body_id).unwrap();

    // Same body with exactly the first k tools removed.
    let plain = VoxelKernel::new(1.0);
    let cube = plain.create_box(Point3::origin(), Point3::new(20.0, 20.0, 20.0)).unwrap();
    let bounds = plain.bounding_box(&cube).unwrap();
    let grid = TileGridSpec::plan(params.style, params.size, &bounds);
    let tools = build_base_tools(&plain, &params, &grid, &bounds).unwrap();
    let expected = LatticePattern::new(&plain, &tools, &grid)
        .take(k)
        .fold(cube, |acc, copy| plain.boolean_subtract(&acc, &copy.unwrap().solid).unwrap());
    assert_eq!(result.solid.inner, expected);
}

#[test]
fn test_kernel_failure_leaves_document_unchanged() {
    let mut kernel = CountingKernel::new(1.0);
    kernel.fail_at = Some(5);
    let counters = kernel.counters.clone();
    let (mut session, source) = session_with_cube(kernel, 20.0);
    let params = InfillParams {
        size: 6.0,
        shell_thickness: 2.0,
        rib_thickness: 1.0,
        ..Default::default()
    };

    let err = generate(&mut session, source, &params, &CancellationToken::new(), &mut NullProgress).unwrap_err();
    assert!(matches!(err, InfillError::LatticeFailed { applied: 4, .. }), "{}", err);
    assert_eq!(counters.live_tools(), 0);

    let doc = &session.document;
    assert!(doc.timeline().is_empty());
    assert_eq!(doc.bodies().count(), 1);
    assert!(doc.body(source).unwrap().is_live());
}

#[test]
fn test_invalid_requests_fail_before_kernel_work() {
    let kernel = CountingKernel::new(1.0);
    let counters = kernel.counters.clone();
    let (mut session, source) = session_with_cube(kernel, 10.0);
    let cancel = CancellationToken::new();

    let bad = InfillParams {
        rib_thickness: -1.0,
        ..Default::default()
    };
    assert!(matches!(
        generate(&mut session, source, &bad, &cancel, &mut NullProgress),
        Err(InfillError::InvalidParameter(_))
    ));

    let unknown = EntityId::new();
    assert!(matches!(
        generate(&mut session, unknown, &InfillParams::default(), &cancel, &mut NullProgress),
        Err(InfillError::MissingSource(id)) if id == unknown
    ));

    // Valid lengths, but a grid far beyond the tool limit.
    let microscopic = InfillParams {
        size: 1e-9,
        rib_thickness: 1e-10,
        ..Default::default()
    };
    assert!(microscopic.validate().is_ok());
    assert!(matches!(
        generate(&mut session, source, &microscopic, &cancel, &mut NullProgress),
        Err(InfillError::InvalidParameter(_))
    ));
    assert_eq!(counters.live_tools(), 0);
    assert_eq!(counters.subtractions(), 0);
    assert!(session.document.timeline().is_empty());
}

#[test]
fn test_consumed_source_cannot_be_filled_twice() {
    let (mut session, source) = session_with_cube(VoxelKernel::new(1.0), 20.0);
    let params = InfillParams {
        body_type: BodyType::DirectCut,
        size: 6.0,
        rib_thickness: 1.0,
        ..Default::default()
    };
    let cancel = CancellationToken::new();
    generate(&mut session, source, &params, &cancel, &mut NullProgress).unwrap();

    assert!(matches!(
        generate(&mut session, source, &params, &cancel, &mut NullProgress),
        Err(InfillError::Document(DocumentError::BodyNotLive(_)))
    ));
}
