use itertools::Itertools;
use nalgebra::{
    allocator::Allocator, DefaultAllocator, DimName, DimNameDiff, DimNameSub, U1,
};

use crate::curve::NurbsCurve;
use crate::misc::FloatingPoint;

use super::unify_curves::ensure_unified;

/// Compute strictly increasing iso-parameters for an already-unified,
/// ordered curve family.
///
/// The parameter gap between two neighbouring curves is proportional to the
/// quadratic mean of the distances between their corresponding control
/// points, and the gaps are rescaled so the final parameter equals
/// `param_length`. Geometric separation, not index position, drives the
/// spacing.
///
/// # Failures
/// - fewer than two curves
/// - a non-positive parameter length
/// - curves with mismatched control-point counts (not unified)
/// - coincident neighbouring curves (a zero gap cannot stay strictly increasing)
pub fn try_loft_parameters<T, D>(
    curves: &[NurbsCurve<T, D>],
    param_length: T,
) -> anyhow::Result<Vec<T>>
where
    T: FloatingPoint,
    D: DimName,
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    anyhow::ensure!(
        curves.len() >= 2,
        "At least two curves are needed to assign loft parameters"
    );
    anyhow::ensure!(
        param_length > T::zero(),
        "Parameter length must be positive"
    );
    ensure_unified(curves)?;

    let count = T::from_usize(curves[0].control_points().len()).unwrap();
    let mut gaps = Vec::with_capacity(curves.len() - 1);
    for (first, second) in curves.iter().tuple_windows() {
        let a = first.dehomogenized_control_points();
        let b = second.dehomogenized_control_points();
        let sum = a
            .iter()
            .zip(b.iter())
            .fold(T::zero(), |acc, (p, q)| acc + (q - p).norm_squared());
        let quadratic_mean = (sum / count).sqrt();
        anyhow::ensure!(
            quadratic_mean > T::default_epsilon(),
            "Coincident neighbouring curves cannot be assigned distinct parameters"
        );
        gaps.push(quadratic_mean);
    }

    let total = gaps.iter().fold(T::zero(), |acc, g| acc + *g);
    let mut params = Vec::with_capacity(curves.len());
    params.push(T::zero());
    let mut accumulated = T::zero();
    for gap in gaps.iter() {
        accumulated += *gap;
        params.push(accumulated / total * param_length);
    }
    // guard the last parameter against accumulation error
    params[curves.len() - 1] = param_length;

    Ok(params)
}
