use std::f64::consts::{FRAC_PI_2, PI, TAU};

use approx::assert_relative_eq;
use nalgebra::{Point2, Point3, Vector2, Vector3};

use crate::prelude::*;

fn tilted_ellipse() -> Ellipse3D<f64> {
    Ellipse3D::try_new(
        Point3::new(1., 2., 3.),
        Vector3::new(1., 0.3, 0.),
        Vector3::z(),
        2.,
        1.,
        false,
    )
    .unwrap()
}

#[test]
fn spanning_vectors_form_an_orthonormal_frame() {
    let ellipse = tilted_ellipse();
    assert_relative_eq!(ellipse.xaxis().norm(), 1., epsilon = 1e-12);
    assert_relative_eq!(ellipse.yaxis().norm(), 1., epsilon = 1e-12);
    assert_relative_eq!(ellipse.xaxis().dot(ellipse.yaxis()), 0., epsilon = 1e-12);
    assert_relative_eq!(
        ellipse.xaxis().cross(ellipse.yaxis()),
        Vector3::z(),
        epsilon = 1e-12
    );
}

#[test]
fn round_trip_on_quarter_aligned_intervals() {
    let arc = tilted_ellipse().try_with_param_bounds(0., PI).unwrap();
    let curve = arc.try_to_nurbs().unwrap();

    for t in [0., FRAC_PI_2, PI] {
        assert_relative_eq!(curve.point_at(t), arc.point_at(t), epsilon = 1e-9);
    }

    let arc = tilted_ellipse()
        .try_with_param_bounds(-FRAC_PI_2, FRAC_PI_2)
        .unwrap();
    let curve = arc.try_to_nurbs().unwrap();
    for t in [-FRAC_PI_2, 0., FRAC_PI_2] {
        assert_relative_eq!(curve.point_at(t), arc.point_at(t), epsilon = 1e-9);
    }
}

#[test]
fn round_trip_on_a_generic_interval() {
    let arc = tilted_ellipse().try_with_param_bounds(0.3, 2.1).unwrap();
    let curve = arc.try_to_nurbs().unwrap();

    // the bounds are matched exactly
    assert_relative_eq!(curve.point_at(0.3), arc.point_at(0.3), epsilon = 1e-9);
    assert_relative_eq!(curve.point_at(2.1), arc.point_at(2.1), epsilon = 1e-9);

    // in between, the converted curve traces the analytic arc exactly even
    // where the rational parameterization deviates from the angle
    for i in 1..10 {
        let t = 0.3 + (2.1 - 0.3) * i as f64 / 10.;
        let on_curve = curve.point_at(t);
        let projected = arc.closest_point(&on_curve, 0.3, 2.1, None);
        assert!(projected.distance() < 1e-9);
    }
}

#[test]
fn round_trip_on_a_full_period() {
    let ellipse = tilted_ellipse();
    let curve = ellipse.try_to_nurbs().unwrap();

    assert!(ellipse.is_closed());
    assert_relative_eq!(curve.point_at(0.), curve.point_at(TAU), epsilon = 1e-9);
    for t in [0., FRAC_PI_2, PI, 3. * FRAC_PI_2, TAU] {
        assert_relative_eq!(curve.point_at(t), ellipse.point_at(t), epsilon = 1e-9);
    }
}

#[test]
fn round_trip_honors_the_reversed_flag() {
    let arc = Ellipse3D::try_new(
        Point3::new(1., 2., 3.),
        Vector3::new(1., 0.3, 0.),
        Vector3::z(),
        2.,
        1.,
        true,
    )
    .unwrap()
    .try_with_param_bounds(0., PI)
    .unwrap();
    let curve = arc.try_to_nurbs().unwrap();

    for t in [0., FRAC_PI_2, PI] {
        assert_relative_eq!(curve.point_at(t), arc.point_at(t), epsilon = 1e-9);
    }
}

#[test]
fn round_trip_in_two_dimensions() {
    let arc = Ellipse2D::try_new(Point2::new(-1., 4.), Vector2::x(), 3., 1.5, false)
        .unwrap()
        .try_with_param_bounds(0., FRAC_PI_2)
        .unwrap();
    let curve = arc.try_to_nurbs().unwrap();

    for t in [0., FRAC_PI_2 / 2., FRAC_PI_2] {
        assert_relative_eq!(curve.point_at(t), arc.point_at(t), epsilon = 1e-9);
    }
}

#[test]
fn degenerate_definitions_are_rejected() {
    // zero radius
    assert!(Ellipse3D::try_new(
        Point3::origin(),
        Vector3::x(),
        Vector3::z(),
        0.,
        1.,
        false
    )
    .is_err());

    // spanning direction parallel to the normal
    assert!(Ellipse3D::try_new(
        Point3::origin(),
        Vector3::z(),
        Vector3::z(),
        1.,
        1.,
        false
    )
    .is_err());

    // zero-length direction in 2d
    assert!(Ellipse2D::try_new(Point2::origin(), Vector2::zeros(), 1., 1., false).is_err());
}

#[test]
fn malformed_param_bounds_are_rejected() {
    let ellipse = tilted_ellipse();
    // start not strictly below end
    assert!(ellipse.try_with_param_bounds(2., 1.).is_err());
    // outside [-2pi, 2pi]
    assert!(ellipse.try_with_param_bounds(-7., 0.).is_err());
    assert!(ellipse.try_with_param_bounds(0., 7.).is_err());
    // span exceeding 2pi
    assert!(ellipse.try_with_param_bounds(-3., 3.5).is_err());
}

#[test]
fn param_bounds_snap_within_fuzz() {
    let arc = tilted_ellipse()
        .try_with_param_bounds(1e-13, TAU - 1e-13)
        .unwrap();
    assert_eq!(arc.startparam(), 0.);
    assert_eq!(arc.endparam(), TAU);
    assert!(arc.is_closed());
}

#[test]
fn seeded_closest_point_stays_on_the_seeded_minimum() {
    let circle = Ellipse3D::try_new(
        Point3::origin(),
        Vector3::x(),
        Vector3::z(),
        1.,
        1.,
        false,
    )
    .unwrap();

    let theta = 1.0;
    let eps = 0.05;
    let query = circle.point_at(theta + eps);

    let closest = circle.closest_point(&query, 0., TAU, Some(theta));
    assert_relative_eq!(closest.parameter(), theta + eps, epsilon = 1e-6);
    assert!(closest.distance() < 1e-9);
}

#[test]
fn circle_seeding_finds_the_near_side() {
    let circle = Ellipse3D::try_new(
        Point3::origin(),
        Vector3::x(),
        Vector3::z(),
        1.,
        1.,
        false,
    )
    .unwrap();

    // query off the curve, at angle atan2(4, 3)
    let query = Point3::new(3., 4., 0.);
    let closest = circle.closest_point(&query, 0., TAU, None);
    assert_relative_eq!(closest.parameter(), 4.0_f64.atan2(3.), epsilon = 1e-6);
    assert_relative_eq!(closest.distance(), 4., epsilon = 1e-6);
}

#[test]
fn seeded_projection_on_the_converted_curve() {
    let circle = Ellipse3D::try_new(
        Point3::origin(),
        Vector3::x(),
        Vector3::z(),
        1.,
        1.,
        false,
    )
    .unwrap();
    let curve = circle.try_to_nurbs().unwrap();

    let theta = 1.0_f64;
    let query = circle.point_at(theta + 0.05);
    let closest = curve
        .closest_point(&query, None, Some(theta), None)
        .unwrap();

    // converges to the nearby minimum, not the antipodal one
    assert!(closest.distance() < 1e-9);
    assert!((closest.parameter() - theta).abs() < 0.5);
}
