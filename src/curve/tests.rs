use approx::assert_relative_eq;
use nalgebra::{Point2, Point3};

use crate::prelude::*;

fn quadratic_bezier() -> NurbsCurve2D<f64> {
    NurbsCurve2D::try_new(
        2,
        vec![
            Point3::new(0., 0., 1.),
            Point3::new(1., 2., 1.),
            Point3::new(3., 1., 1.),
        ],
        vec![0., 0., 0., 1., 1., 1.],
    )
    .unwrap()
}

#[test]
fn invalid_construction_is_rejected() {
    // too few control points
    assert!(NurbsCurve2D::<f64>::try_new(
        2,
        vec![Point3::new(0., 0., 1.), Point3::new(1., 0., 1.)],
        vec![0., 0., 1., 1.],
    )
    .is_err());

    // decreasing knot vector
    assert!(NurbsCurve2D::<f64>::try_new(
        1,
        vec![Point3::new(0., 0., 1.), Point3::new(1., 0., 1.)],
        vec![1., 0., 1., 0.],
    )
    .is_err());

    // non-positive weight
    assert!(NurbsCurve2D::<f64>::try_new(
        1,
        vec![Point3::new(0., 0., 1.), Point3::new(1., 0., -1.)],
        vec![0., 0., 1., 1.],
    )
    .is_err());
}

#[test]
fn elevate_degree_preserves_geometry() {
    let curve = quadratic_bezier();
    let elevated = curve.try_elevate_degree(4).unwrap();
    assert_eq!(elevated.degree(), 4);
    assert_eq!(
        elevated.knots().len(),
        elevated.control_points().len() + 4 + 1
    );

    for i in 0..=20 {
        let t = i as f64 / 20.;
        assert_relative_eq!(curve.point_at(t), elevated.point_at(t), epsilon = 1e-10);
    }
}

#[test]
fn refine_knot_preserves_geometry() {
    let mut refined = quadratic_bezier();
    refined.try_refine_knot(vec![0.25, 0.5, 0.5]).unwrap();
    let curve = quadratic_bezier();

    assert_eq!(
        refined.knots().len(),
        refined.control_points().len() + 2 + 1
    );
    for i in 0..=20 {
        let t = i as f64 / 20.;
        assert_relative_eq!(curve.point_at(t), refined.point_at(t), epsilon = 1e-10);
    }
}

#[test]
fn sub_curve_keeps_parameterization() {
    let curve = quadratic_bezier();
    let sub = curve.try_sub_curve(0.25, 0.75).unwrap();
    assert_relative_eq!(sub.knots_domain().0, 0.25);
    assert_relative_eq!(sub.knots_domain().1, 0.75);

    for i in 0..=10 {
        let t = 0.25 + 0.05 * i as f64;
        assert_relative_eq!(curve.point_at(t), sub.point_at(t), epsilon = 1e-10);
    }
}

#[test]
fn sub_curve_rejects_bad_intervals() {
    let curve = quadratic_bezier();
    assert!(curve.try_sub_curve(0.75, 0.25).is_err());
    assert!(curve.try_sub_curve(-0.5, 0.5).is_err());
}

#[test]
fn rescale_domain_is_affine() {
    let curve = quadratic_bezier();
    let mut rescaled = curve.clone();
    rescaled.try_rescale_domain(2., 3.).unwrap();

    assert_relative_eq!(rescaled.point_at(2.), curve.point_at(0.));
    assert_relative_eq!(rescaled.point_at(2.5), curve.point_at(0.5));
    assert_relative_eq!(rescaled.point_at(3.), curve.point_at(1.));
}

#[test]
fn invert_reverses_direction() {
    let curve = quadratic_bezier();
    let reversed = curve.inverse();
    let (start, end) = reversed.knots_domain();
    assert_relative_eq!(reversed.point_at(start), curve.point_at(1.));
    assert_relative_eq!(reversed.point_at(end), curve.point_at(0.));
}

#[test]
fn closest_point_on_a_line() {
    let line = NurbsCurve2D::try_new(
        1,
        vec![Point3::new(0., 0., 1.), Point3::new(10., 0., 1.)],
        vec![0., 0., 1., 1.],
    )
    .unwrap();

    let closest = line
        .closest_point(&Point2::new(3., 4.), None, None, None)
        .unwrap();
    assert_relative_eq!(closest.parameter(), 0.3, epsilon = 1e-6);
    assert_relative_eq!(*closest.point(), Point2::new(3., 0.), epsilon = 1e-6);
    assert_relative_eq!(closest.distance(), 4., epsilon = 1e-6);
}

#[test]
fn rationality_is_derived_from_weights() {
    assert!(!quadratic_bezier().is_rational());

    let rational = NurbsCurve2D::try_new(
        1,
        vec![Point3::new(0., 0., 1.), Point3::new(1., 0., 0.5)],
        vec![0., 0., 1., 1.],
    )
    .unwrap();
    assert!(rational.is_rational());
}
