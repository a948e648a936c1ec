// Boolean and measurement checks for the Truck kernel, driven through the
// GeometryKernel trait the infill pipeline uses.

use super::*;
use crate::geometry::{Point3, Vector3};

fn cube(kernel: &TruckKernel, size: f64) -> <TruckKernel as GeometryKernel>::Solid {
    kernel
        .create_box(Point3::origin(), Point3::new(size, size, size))
        .expect("Failed to create cube")
}

fn hexagon(center: Point2D, radius: f64) -> Profile2D {
    let vertices = (0..6)
        .map(|i| center.polar_offset(radius, 60.0 * i as f64 - 30.0))
        .collect();
    Profile2D::polygon(SketchPlane::xy_at(5.0), center, vertices)
}

#[test]
fn test_truck_box_volume_and_bounds() {
    let kernel = TruckKernel::new();
    let solid = kernel
        .create_box(Point3::new(-1.0, 0.0, 2.0), Point3::new(3.0, 2.0, 3.0))
        .unwrap();

    let volume = kernel.volume(&solid).unwrap();
    println!("Box volume: {:.4}", volume);
    assert!((volume - 8.0).abs() < 1e-6);

    let bb = kernel.bounding_box(&solid).unwrap();
    assert!((bb.min.x + 1.0).abs() < 1e-6);
    assert!((bb.max.z - 3.0).abs() < 1e-6);
}

#[test]
fn test_truck_symmetric_prism_is_centered_on_plane() {
    let kernel = TruckKernel::new();
    let profile = hexagon(Point2D::new(0.0, 0.0), 2.0);
    let prism = kernel.extrude_symmetric(&profile, 4.0).unwrap();

    let bb = kernel.bounding_box(&prism).unwrap();
    println!("Prism bounds: {:?} .. {:?}", bb.min, bb.max);
    assert!((bb.min.z - 3.0).abs() < 1e-6);
    assert!((bb.max.z - 7.0).abs() < 1e-6);

    let volume = kernel.volume(&prism).unwrap();
    assert!((volume - profile.area() * 4.0).abs() < 1e-3);
}

#[test]
fn test_truck_subtract_cylinder_through_cube() {
    let kernel = TruckKernel::new();
    let body = cube(&kernel, 10.0);

    let disk = Profile2D::circle(SketchPlane::xy_at(5.0), Point2D::new(5.0, 5.0), 1.5);
    let cylinder = kernel.extrude_symmetric(&disk, 14.0).unwrap();

    let cut = kernel.boolean_subtract(&body, &cylinder).expect("SUBTRACT operation should succeed");
    let volume = kernel.volume(&cut).unwrap();
    let expected = 1000.0 - std::f64::consts::PI * 1.5 * 1.5 * 10.0;
    println!("Cut volume: {:.3}, expected about {:.3}", volume, expected);
    assert!(volume < 1000.0);
    assert!((volume - expected).abs() < 2.0);
}

#[test]
fn test_truck_translate_then_union() {
    let kernel = TruckKernel::new();
    let a = cube(&kernel, 2.0);
    let b = kernel.translate(&a, Vector3::new(1.0, 0.5, 0.5)).unwrap();

    let bb = kernel.bounding_box(&b).unwrap();
    assert!((bb.min.x - 1.0).abs() < 1e-6);
    assert!((bb.min.y - 0.5).abs() < 1e-6);

    let union = kernel.boolean_union(&a, &b).expect("OR operation should succeed");
    let volume = kernel.volume(&union).unwrap();
    println!("Union volume: {:.4}", volume);
    // 8 + 8 - overlap 1 x 1.5 x 1.5, no coplanar faces
    assert!((volume - 13.75).abs() < 1e-3);
}

#[test]
fn test_truck_disjoint_subtract_keeps_body() {
    let kernel = TruckKernel::new();
    let body = cube(&kernel, 10.0);

    let far = Profile2D::circle(SketchPlane::xy_at(5.0), Point2D::new(40.0, 40.0), 1.5);
    let far_tool = kernel.extrude_symmetric(&far, 14.0).unwrap();
    let kept = kernel.boolean_subtract(&body, &far_tool).expect("disjoint subtract should succeed");
    assert_eq!(kept.boundaries().len(), 1);
    assert!((kernel.volume(&kept).unwrap() - 1000.0).abs() < 1e-6);

    // The kept body is still a valid operand.
    let near = Profile2D::circle(SketchPlane::xy_at(5.0), Point2D::new(5.0, 5.0), 1.5);
    let near_tool = kernel.extrude_symmetric(&near, 14.0).unwrap();
    let cut = kernel.boolean_subtract(&kept, &near_tool).expect("second subtract should succeed");
    let volume = kernel.volume(&cut).unwrap();
    println!("Cut after disjoint subtract: {:.3}", volume);
    assert!(volume < 1000.0 && volume > 900.0);
}

#[test]
fn test_truck_disjoint_union_keeps_both_shells() {
    let kernel = TruckKernel::new();
    let a = cube(&kernel, 2.0);
    let b = kernel.translate(&a, Vector3::new(5.0, 0.0, 0.0)).unwrap();

    let union = kernel.boolean_union(&a, &b).unwrap();
    assert_eq!(union.boundaries().len(), 2);
    assert!((kernel.volume(&union).unwrap() - 16.0).abs() < 1e-6);
}

#[test]
fn test_truck_shell_reports_not_implemented() {
    let kernel = TruckKernel::new();
    let body = cube(&kernel, 10.0);
    assert!(matches!(kernel.shell(&body, 1.0), Err(KernelOpError::NotImplemented(_))));
}

#[test]
fn test_truck_rejects_degenerate_input() {
    let kernel = TruckKernel::new();
    assert!(kernel
        .create_box(Point3::origin(), Point3::new(1.0, 0.0, 1.0))
        .is_err());

    let sliver = Profile2D::polygon(
        SketchPlane::xy(),
        Point2D::new(0.0, 0.0),
        vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)],
    );
    assert!(matches!(
        kernel.extrude_symmetric(&sliver, 1.0),
        Err(KernelOpError::InvalidGeometry(_))
    ));
}
