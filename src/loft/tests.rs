use std::f64::consts::FRAC_PI_2;

use approx::assert_relative_eq;
use nalgebra::{Point3, Point4, Vector3};

use crate::prelude::*;

fn line(from: Point3<f64>, to: Point3<f64>) -> NurbsCurve3D<f64> {
    NurbsCurve3D::try_new(
        1,
        vec![
            Point4::new(from.x, from.y, from.z, 1.),
            Point4::new(to.x, to.y, to.z, 1.),
        ],
        vec![0., 0., 1., 1.],
    )
    .unwrap()
}

fn quarter_arc(radius: f64, z: f64) -> NurbsCurve3D<f64> {
    Ellipse3D::try_new(
        Point3::new(0., 0., z),
        Vector3::x(),
        Vector3::z(),
        radius,
        radius,
        false,
    )
    .unwrap()
    .try_with_param_bounds(0., FRAC_PI_2)
    .unwrap()
    .try_to_nurbs()
    .unwrap()
}

#[test]
fn unify_mixed_degrees_and_domains() {
    let straight = line(Point3::new(0., 0., 0.), Point3::new(1., 0., 0.));
    let arc = quarter_arc(1., 1.);
    assert_eq!(straight.degree(), 1);
    assert_eq!(arc.degree(), 2);

    let unified = try_unify_curves(&[straight.clone(), arc.clone()]).unwrap();
    assert_eq!(unified.len(), 2);
    assert_eq!(unified[0].degree(), 2);
    assert_eq!(unified[1].degree(), 2);
    assert_eq!(unified[0].knots().to_vec(), unified[1].knots().to_vec());

    // the first curve keeps its domain, and both keep their traced geometry
    let (d0, d1) = unified[0].knots_domain();
    assert_relative_eq!(d0, 0.);
    assert_relative_eq!(d1, 1.);
    for i in 0..=8 {
        let t = i as f64 / 8.;
        assert_relative_eq!(
            unified[0].point_at(t),
            straight.point_at(t),
            epsilon = 1e-10
        );
    }
    assert_relative_eq!(unified[1].point_at(d0), arc.point_at(0.), epsilon = 1e-10);
    assert_relative_eq!(
        unified[1].point_at(d1),
        arc.point_at(FRAC_PI_2),
        epsilon = 1e-10
    );
}

#[test]
fn unification_is_idempotent() {
    let curves = [
        line(Point3::new(0., 0., 0.), Point3::new(1., 0., 0.)),
        quarter_arc(1., 1.),
        quarter_arc(2., 2.),
    ];
    let unified = try_unify_curves(&curves).unwrap();
    let again = try_unify_curves(&unified).unwrap();

    for (a, b) in unified.iter().zip(again.iter()) {
        assert_eq!(a.degree(), b.degree());
        assert_eq!(a.knots().to_vec(), b.knots().to_vec());
        assert_eq!(a.is_rational(), b.is_rational());
        assert_eq!(a.control_points().len(), b.control_points().len());
    }
}

#[test]
fn unify_rejects_an_empty_set() {
    assert!(try_unify_curves::<f64, nalgebra::Const<4>>(&[]).is_err());
}

#[test]
fn loft_parameters_follow_geometric_separation() {
    // three parallel lines with gaps 1 and 2
    let curves = [
        line(Point3::new(0., 0., 0.), Point3::new(1., 0., 0.)),
        line(Point3::new(0., 0., 1.), Point3::new(1., 0., 1.)),
        line(Point3::new(0., 0., 3.), Point3::new(1., 0., 3.)),
    ];

    let length = 2.5;
    let params = try_loft_parameters(&curves, length).unwrap();
    assert_eq!(params.len(), 3);
    assert_eq!(params[0], 0.);
    assert_eq!(params[2], length);
    assert_relative_eq!(params[1], length / 3., epsilon = 1e-12);
    assert!(params.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn loft_parameters_reject_coincident_curves() {
    let a = line(Point3::new(0., 0., 0.), Point3::new(1., 0., 0.));
    let curves = [a.clone(), a];
    assert!(try_loft_parameters(&curves, 1.).is_err());
}

#[test]
fn loft_parameters_reject_non_unified_families() {
    let curves = [
        line(Point3::new(0., 0., 0.), Point3::new(1., 0., 0.)),
        quarter_arc(1., 1.),
    ];
    assert!(try_loft_parameters(&curves, 1.).is_err());
}

#[test]
fn plain_loft_interpolates_every_section() {
    let curves = [quarter_arc(1., 0.), quarter_arc(2., 1.), quarter_arc(3., 2.)];
    let params = [0., 0.4, 1.];
    let surface = try_loft_unified(&curves, &params, LoftMode::Plain).unwrap();

    for (curve, p) in curves.iter().zip(params.iter()) {
        for i in 0..=8 {
            let u = FRAC_PI_2 * i as f64 / 8.;
            assert_relative_eq!(surface.point_at(u, *p), curve.point_at(u), epsilon = 1e-9);
        }
    }
}

#[test]
fn hermite_loft_interpolates_every_section() {
    let curves = [quarter_arc(1., 0.), quarter_arc(2., 1.), quarter_arc(3., 2.)];
    let params = [0., 0.4, 1.];
    let surface = try_loft_unified(&curves, &params, LoftMode::HermitePositive).unwrap();

    for (curve, p) in curves.iter().zip(params.iter()) {
        for i in 0..=8 {
            let u = FRAC_PI_2 * i as f64 / 8.;
            assert_relative_eq!(surface.point_at(u, *p), curve.point_at(u), epsilon = 1e-9);
        }
    }
}

#[test]
fn hermite_loft_keeps_rational_weights_positive() {
    let curves = [quarter_arc(1., 0.), quarter_arc(2., 1.), quarter_arc(3., 2.)];
    assert!(curves.iter().all(|c| c.is_rational()));

    let params = [0., 0.25, 1.];
    let surface = try_loft_unified(&curves, &params, LoftMode::HermitePositive).unwrap();
    assert!(surface.is_rational());
    assert!(surface.weights().iter().flatten().all(|w| *w > 0.));
}

#[test]
fn loft_rejects_malformed_input() {
    let curves = [quarter_arc(1., 0.), quarter_arc(2., 1.)];

    // parameter count mismatch
    assert!(try_loft_unified(&curves, &[0.], LoftMode::Plain).is_err());
    // non-increasing parameters
    assert!(try_loft_unified(&curves, &[1., 0.], LoftMode::Plain).is_err());

    // a family that is not unified
    let mixed = [
        line(Point3::new(0., 0., 0.), Point3::new(1., 0., 0.)),
        quarter_arc(1., 1.),
    ];
    assert!(try_loft_unified(&mixed, &[0., 1.], LoftMode::Plain).is_err());
}

#[test]
fn loft_pipeline_interpolates_the_outer_sections() {
    let curves = [
        line(Point3::new(0., 0., 0.), Point3::new(1., 0., 0.)),
        line(Point3::new(0., 0., 1.), Point3::new(1., 1., 1.)),
        line(Point3::new(0., 0., 3.), Point3::new(1., 0., 3.)),
    ];
    let surface = try_loft(&curves, LoftMode::Plain).unwrap();

    let (v0, v1) = surface.v_knots_domain();
    assert_relative_eq!(
        surface.point_at(0., v0),
        Point3::new(0., 0., 0.),
        epsilon = 1e-9
    );
    assert_relative_eq!(
        surface.point_at(1., v0),
        Point3::new(1., 0., 0.),
        epsilon = 1e-9
    );
    assert_relative_eq!(
        surface.point_at(0., v1),
        Point3::new(0., 0., 3.),
        epsilon = 1e-9
    );
    assert_relative_eq!(
        surface.point_at(1., v1),
        Point3::new(1., 0., 3.),
        epsilon = 1e-9
    );
}
