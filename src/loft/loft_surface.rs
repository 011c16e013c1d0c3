use itertools::Itertools;
use nalgebra::{
    allocator::Allocator, DVector, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, U1,
};

use crate::curve::NurbsCurve;
use crate::interpolation::ParameterInterpolation;
use crate::knot::KnotVector;
use crate::misc::FloatingPoint;
use crate::surface::NurbsSurface;

use super::unify_curves::ensure_unified;
use super::{try_loft_parameters, try_unify_curves};

/// How the transversal direction of a loft is interpolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoftMode {
    /// Interpolate every homogeneous control-point row globally, weights
    /// included. Rational input may produce non-positive denominators; the
    /// caller must validate the result.
    Plain,
    /// Interpolate every row by piecewise-cubic Hermite with zero weight
    /// tangents. The denominator stays strictly positive for rational input
    /// at the cost of a reduced cross-direction continuity order.
    HermitePositive,
}

/// Loft a surface through an ordered curve family.
///
/// The curves are unified, iso-parameters over [0, 1] are assigned from the
/// geometric separation of neighbouring curves, and the family is
/// interpolated in the transversal direction according to `mode`.
pub fn try_loft<T, D>(
    curves: &[NurbsCurve<T, D>],
    mode: LoftMode,
) -> anyhow::Result<NurbsSurface<T, D>>
where
    T: FloatingPoint,
    D: DimName,
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let unified = try_unify_curves(curves)?;
    let params = try_loft_parameters(&unified, T::one())?;
    try_loft_unified(&unified, &params, mode)
}

/// Loft a surface through an already-unified curve family, interpolating
/// each curve exactly at its assigned parameter.
///
/// # Failures
/// - fewer than two curves
/// - a parameter count differing from the curve count
/// - parameters that are not strictly increasing
/// - a family that is not unified
pub fn try_loft_unified<T, D>(
    curves: &[NurbsCurve<T, D>],
    params: &[T],
    mode: LoftMode,
) -> anyhow::Result<NurbsSurface<T, D>>
where
    T: FloatingPoint,
    D: DimName,
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    anyhow::ensure!(
        curves.len() >= 2,
        "At least two curves are needed for a loft"
    );
    anyhow::ensure!(
        params.len() == curves.len(),
        "Expected {} loft parameters, got {}",
        curves.len(),
        params.len()
    );
    anyhow::ensure!(
        params.windows(2).all(|w| w[0] < w[1]),
        "Loft parameters must be strictly increasing"
    );
    ensure_unified(curves)?;

    let u_degree = curves[0].degree();
    let u_knots = curves[0].knots().clone();
    let rows = curves[0].control_points().len();

    let (v_degree, v_knots, control_points) = match mode {
        LoftMode::Plain => {
            let v_degree = (curves.len() - 1).min(3);
            let interpolation = ParameterInterpolation::try_new(params, v_degree)?;

            let mut grid = Vec::with_capacity(rows);
            for i in 0..rows {
                let row = curves
                    .iter()
                    .map(|c| {
                        DVector::from_iterator(
                            D::dim(),
                            c.control_points()[i].coords.iter().copied(),
                        )
                    })
                    .collect_vec();
                let solved = interpolation.try_solve(&row)?;
                grid.push(
                    solved
                        .iter()
                        .map(|v| OPoint::from_slice(v.as_slice()))
                        .collect_vec(),
                );
            }

            (v_degree, interpolation.knots().clone(), grid)
        }
        LoftMode::HermitePositive => {
            let knots = hermite_knots(params);
            let mut grid = Vec::with_capacity(rows);
            for i in 0..rows {
                let row = curves
                    .iter()
                    .map(|c| {
                        DVector::from_iterator(
                            D::dim(),
                            c.control_points()[i].coords.iter().copied(),
                        )
                    })
                    .collect_vec();
                let bezier_rows = hermite_rows(&row, params);
                grid.push(
                    bezier_rows
                        .iter()
                        .map(|v| OPoint::from_slice(v.as_slice()))
                        .collect_vec(),
                );
            }

            (3, knots, grid)
        }
    };

    Ok(NurbsSurface::new(
        u_degree,
        v_degree,
        u_knots.to_vec(),
        v_knots.to_vec(),
        control_points,
    ))
}

/// Cubic knot vector of the Hermite loft: clamped ends, interior parameters
/// doubled so every section is a Bezier joint with C1 continuity.
fn hermite_knots<T: FloatingPoint>(params: &[T]) -> KnotVector<T> {
    let n = params.len();
    let mut knots = vec![params[0]; 4];
    for p in params.iter().take(n - 1).skip(1) {
        knots.push(*p);
        knots.push(*p);
    }
    knots.extend(std::iter::repeat_n(params[n - 1], 4));
    KnotVector::new(knots)
}

/// Bezier control rows of the piecewise-cubic Hermite interpolant through
/// the homogeneous points at the given parameters.
///
/// Tangents are Bessel (three-point parabolic) estimates with the weight
/// component forced to zero, which keeps every denominator row equal to a
/// section weight and hence positive.
fn hermite_rows<T: FloatingPoint>(points: &[DVector<T>], params: &[T]) -> Vec<DVector<T>> {
    let n = points.len();
    let dim = points[0].len();
    let third = T::from_f64(1.0 / 3.0).unwrap();
    let two = T::from_f64(2.0).unwrap();

    let spans: Vec<T> = params.windows(2).map(|w| w[1] - w[0]).collect();
    let slopes: Vec<DVector<T>> = points
        .windows(2)
        .zip(spans.iter())
        .map(|(pair, h)| (&pair[1] - &pair[0]) / *h)
        .collect();

    let mut tangents: Vec<DVector<T>> = Vec::with_capacity(n);
    if n == 2 {
        tangents.push(slopes[0].clone());
        tangents.push(slopes[0].clone());
    } else {
        // interior Bessel estimates first, then one-sided end conditions
        let mut interior = Vec::with_capacity(n - 2);
        for j in 1..(n - 1) {
            let alpha = spans[j] / (spans[j - 1] + spans[j]);
            interior.push(&slopes[j - 1] * alpha + &slopes[j] * (T::one() - alpha));
        }
        tangents.push(&slopes[0] * two - &interior[0]);
        tangents.extend(interior.iter().cloned());
        tangents.push(&slopes[n - 2] * two - &interior[n - 3]);
    }
    for tangent in tangents.iter_mut() {
        tangent[dim - 1] = T::zero();
    }

    let mut rows = Vec::with_capacity(2 * n);
    rows.push(points[0].clone());
    rows.push(&points[0] + &tangents[0] * (spans[0] * third));
    for j in 1..(n - 1) {
        rows.push(&points[j] - &tangents[j] * (spans[j - 1] * third));
        rows.push(&points[j] + &tangents[j] * (spans[j] * third));
    }
    rows.push(&points[n - 1] - &tangents[n - 1] * (spans[n - 2] * third));
    rows.push(points[n - 1].clone());

    rows
}
