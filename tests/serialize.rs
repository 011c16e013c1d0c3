#![cfg(feature = "serde")]

use std::f64::consts::PI;

use approx::assert_relative_eq;
use curvenet::prelude::*;
use nalgebra::{Point3, Vector3};

fn half_arc() -> NurbsCurve3D<f64> {
    Ellipse3D::try_new(
        Point3::new(1., 2., 3.),
        Vector3::x(),
        Vector3::z(),
        2.,
        1.,
        false,
    )
    .unwrap()
    .try_with_param_bounds(0., PI)
    .unwrap()
    .try_to_nurbs()
    .unwrap()
}

#[test]
fn curve_round_trip_preserves_evaluation() {
    let curve = half_arc();
    let json = serde_json::to_string(&curve).unwrap();
    let restored: NurbsCurve3D<f64> = serde_json::from_str(&json).unwrap();

    let (start, end) = curve.knots_domain();
    for i in 0..=16 {
        let t = start + (end - start) * i as f64 / 16.;
        assert_relative_eq!(curve.point_at(t), restored.point_at(t), epsilon = 1e-14);
    }
}

#[test]
fn surface_round_trip_preserves_evaluation() {
    let arcs: Vec<_> = (0..3)
        .map(|i| {
            let z = i as f64;
            Ellipse3D::try_new(
                Point3::new(0., 0., z),
                Vector3::x(),
                Vector3::z(),
                1. + z,
                1. + z,
                false,
            )
            .unwrap()
            .try_with_param_bounds(0., PI)
            .unwrap()
            .try_to_nurbs()
            .unwrap()
        })
        .collect();
    let surface = try_loft(&arcs, LoftMode::HermitePositive).unwrap();

    let json = serde_json::to_string(&surface).unwrap();
    let restored: NurbsSurface3D<f64> = serde_json::from_str(&json).unwrap();

    let (u0, u1) = surface.u_knots_domain();
    let (v0, v1) = surface.v_knots_domain();
    for i in 0..=8 {
        for j in 0..=8 {
            let u = u0 + (u1 - u0) * i as f64 / 8.;
            let v = v0 + (v1 - v0) * j as f64 / 8.;
            assert_relative_eq!(
                surface.point_at(u, v),
                restored.point_at(u, v),
                epsilon = 1e-14
            );
        }
    }
}
