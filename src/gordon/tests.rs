use approx::assert_relative_eq;
use nalgebra::{Point3, Point4};

use crate::prelude::*;

fn bilinear_z(u: f64, v: f64) -> f64 {
    1. + 2. * u + 3. * v - 1.5 * u * v
}

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

/// A 3x3 net of straight lines on the bilinear surface
/// (u, v) -> (u, v, bilinear_z(u, v)).
fn bilinear_net() -> (Vec<NurbsCurve3D<f64>>, Vec<NurbsCurve3D<f64>>, Vec<f64>) {
    let stations = vec![0., 0.5, 1.];
    let u_curves = stations
        .iter()
        .map(|v| {
            line(
                Point3::new(0., *v, bilinear_z(0., *v)),
                Point3::new(1., *v, bilinear_z(1., *v)),
            )
        })
        .collect();
    let v_curves = stations
        .iter()
        .map(|u| {
            line(
                Point3::new(*u, 0., bilinear_z(*u, 0.)),
                Point3::new(*u, 1., bilinear_z(*u, 1.)),
            )
        })
        .collect();
    (u_curves, v_curves, stations)
}

#[test]
fn gordon_surface_reproduces_a_bilinear_net_everywhere() {
    let (u_curves, v_curves, stations) = bilinear_net();
    let surface = try_gordon_surface(&u_curves, &v_curves, &stations, &stations).unwrap();

    for i in 0..=6 {
        for j in 0..=6 {
            let u = i as f64 / 6.;
            let v = j as f64 / 6.;
            assert_relative_eq!(
                surface.point_at(u, v),
                Point3::new(u, v, bilinear_z(u, v)),
                epsilon = 1e-9
            );
        }
    }
}

#[test]
fn gordon_surface_interpolates_every_curve_along_its_iso_line() {
    let (u_curves, v_curves, stations) = bilinear_net();
    let surface = try_gordon_surface(&u_curves, &v_curves, &stations, &stations).unwrap();

    for (curve, v) in u_curves.iter().zip(stations.iter()) {
        let iso = surface.try_iso_curve(*v, UVDirection::V).unwrap();
        for i in 0..=8 {
            let u = i as f64 / 8.;
            assert_relative_eq!(iso.point_at(u), curve.point_at(u), epsilon = 1e-9);
        }
    }

    for (curve, u) in v_curves.iter().zip(stations.iter()) {
        let iso = surface.try_iso_curve(*u, UVDirection::U).unwrap();
        for j in 0..=8 {
            let v = j as f64 / 8.;
            assert_relative_eq!(iso.point_at(v), curve.point_at(v), epsilon = 1e-9);
        }
    }
}

#[test]
fn gordon_rejects_a_grid_count_mismatch() {
    let (u_curves, v_curves, stations) = bilinear_net();
    assert!(try_gordon_surface(&u_curves, &v_curves, &[0., 1.], &stations).is_err());
    assert!(try_gordon_surface(&u_curves, &v_curves, &stations, &[0., 0.5]).is_err());
}

#[test]
fn gordon_rejects_positions_off_the_domain_boundary() {
    let (u_curves, v_curves, stations) = bilinear_net();
    assert!(try_gordon_surface(&u_curves, &v_curves, &stations, &[0., 0.4, 0.9]).is_err());
}

#[test]
fn gordon_rejects_unordered_positions() {
    let (u_curves, v_curves, stations) = bilinear_net();
    assert!(try_gordon_surface(&u_curves, &v_curves, &stations, &[0., 1., 0.5]).is_err());
}

#[test]
fn gordon_needs_two_curves_per_direction() {
    let (u_curves, v_curves, _) = bilinear_net();
    assert!(try_gordon_surface(&u_curves[..1], &v_curves, &[0.], &[0., 0.5, 1.]).is_err());
}
