use nalgebra::{allocator::Allocator, DefaultAllocator, DimName};

use crate::curve::NurbsCurve;
use crate::knot::{sorted_difference, sorted_union};
use crate::misc::FloatingPoint;

/// Reduce an ordered curve set to copies sharing one knot vector and degree
/// without changing the traced geometry.
///
/// Lower-degree curves are elevated to the maximum input degree, every knot
/// vector is affinely reparameterized onto the first curve's knot range, and
/// the union of all knots is inserted into each curve. Curves that already
/// share a basis come back unchanged. Rational and non-rational curves mix
/// freely; weights ride along as the last homogeneous coordinate.
///
/// # Failures
/// - an empty curve set
/// - a curve with a degenerate knot range
pub fn try_unify_curves<T, D>(curves: &[NurbsCurve<T, D>]) -> anyhow::Result<Vec<NurbsCurve<T, D>>>
where
    T: FloatingPoint,
    D: DimName,
    DefaultAllocator: Allocator<D>,
{
    anyhow::ensure!(!curves.is_empty(), "Cannot unify an empty curve set");

    let max_degree = curves.iter().fold(0, |d, c| d.max(c.degree()));

    // elevate all curves to the same degree
    let mut unified = curves
        .iter()
        .map(|c| c.try_elevate_degree(max_degree))
        .collect::<anyhow::Result<Vec<NurbsCurve<T, D>>>>()?;

    // reparameterize every curve onto the first curve's knot range, so
    // families that already share a domain keep their parameter values
    let start = unified[0].knots().first();
    let end = unified[0].knots().last();
    for curve in unified.iter_mut() {
        let span = curve.knots().last() - curve.knots().first();
        anyhow::ensure!(
            span > T::default_epsilon(),
            "Cannot unify a curve with a degenerate knot range"
        );
        curve.knots_mut().rescale(start, end);
    }

    // merge all of the knot vectors
    let merged = unified
        .iter()
        .fold(vec![], |acc, c| sorted_union(c.knots().as_slice(), &acc));

    // knot refinement on each curve
    for curve in unified.iter_mut() {
        let missing = sorted_difference(&merged, curve.knots().as_slice());
        if !missing.is_empty() {
            curve.try_refine_knot(missing)?;
        }
    }

    Ok(unified)
}

/// Check that the curves form a unified family: one degree, one knot vector.
pub(crate) fn ensure_unified<T, D>(curves: &[NurbsCurve<T, D>]) -> anyhow::Result<()>
where
    T: FloatingPoint,
    D: DimName,
    DefaultAllocator: Allocator<D>,
{
    let first = &curves[0];
    let eps = T::default_epsilon().sqrt();
    for curve in curves.iter().skip(1) {
        anyhow::ensure!(
            curve.degree() == first.degree(),
            "Curve family is not unified: mixed degrees"
        );
        anyhow::ensure!(
            curve.knots().len() == first.knots().len()
                && curve
                    .knots()
                    .iter()
                    .zip(first.knots().iter())
                    .all(|(a, b)| (*a - *b).abs() < eps),
            "Curve family is not unified: mixed knot vectors"
        );
    }
    Ok(())
}
