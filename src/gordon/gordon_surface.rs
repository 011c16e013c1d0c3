use nalgebra::{
    allocator::Allocator, DVector, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, U1,
};

use crate::curve::NurbsCurve;
use crate::interpolation::ParameterInterpolation;
use crate::knot::{sorted_difference, sorted_union};
use crate::loft::{try_loft_unified, try_unify_curves, LoftMode};
use crate::misc::FloatingPoint;
use crate::surface::{NurbsSurface, UVDirection};

/// Assemble a Gordon surface from two transversal curve families and their
/// implicit intersection grid.
///
/// `u_curves[i]` runs along u and lies at `v = v_positions[i]`;
/// `v_curves[j]` runs along v and lies at `u = u_positions[j]`. The grid
/// point (i, j) is the u-curve evaluated at `u_positions[j]`; that it
/// coincides with the v-curve evaluated at `v_positions[i]` is an assumed
/// precondition of a consistent net, not verified here.
///
/// The Boolean sum `S = Loft_u + Loft_v - TensorInterpolant` is combined on
/// one common basis per direction; the subtraction cancels the grid
/// contribution counted by both lofts, so the result interpolates every
/// curve of the net exactly.
///
/// # Failures
/// - fewer than two curves in a family
/// - a position count differing from the curve count of its family
/// - positions that are not strictly increasing
/// - outermost positions that do not span the transversal family's domain
pub fn try_gordon_surface<T, D>(
    u_curves: &[NurbsCurve<T, D>],
    v_curves: &[NurbsCurve<T, D>],
    v_positions: &[T],
    u_positions: &[T],
) -> anyhow::Result<NurbsSurface<T, D>>
where
    T: FloatingPoint,
    D: DimName,
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    anyhow::ensure!(
        u_curves.len() >= 2 && v_curves.len() >= 2,
        "A Gordon net needs at least two curves per direction"
    );
    anyhow::ensure!(
        v_positions.len() == u_curves.len(),
        "Curve net grid mismatch: {} u-curves but {} v-positions",
        u_curves.len(),
        v_positions.len()
    );
    anyhow::ensure!(
        u_positions.len() == v_curves.len(),
        "Curve net grid mismatch: {} v-curves but {} u-positions",
        v_curves.len(),
        u_positions.len()
    );
    anyhow::ensure!(
        v_positions.windows(2).all(|w| w[0] < w[1])
            && u_positions.windows(2).all(|w| w[0] < w[1]),
        "Curve net positions must be strictly increasing"
    );

    let u_family = try_unify_curves(u_curves)?;
    let v_family = try_unify_curves(v_curves)?;

    let (ua, ub) = u_family[0].knots_domain();
    let (va, vb) = v_family[0].knots_domain();
    let eps = T::from_f64(1e-8).unwrap();
    anyhow::ensure!(
        (u_positions[0] - ua).abs() < eps && (u_positions[u_positions.len() - 1] - ub).abs() < eps,
        "Outermost v-curves must lie on the boundary of the u-curve domain"
    );
    anyhow::ensure!(
        (v_positions[0] - va).abs() < eps && (v_positions[v_positions.len() - 1] - vb).abs() < eps,
        "Outermost u-curves must lie on the boundary of the v-curve domain"
    );

    // the two lofts; the v-curve loft comes out with swapped roles and is
    // transposed into (u, v) orientation
    let loft_u = try_loft_unified(&u_family, v_positions, LoftMode::Plain)?;
    let loft_v = try_loft_unified(&v_family, u_positions, LoftMode::Plain)?.transposed();

    // tensor-product interpolant of the intersection grid alone, built with
    // the same degrees and averaged knot vectors as the lofts so all three
    // surfaces share their bases by construction
    let n = u_family.len();
    let m = v_family.len();
    let u_interpolation = ParameterInterpolation::try_new(u_positions, (m - 1).min(3))?;
    let v_interpolation = ParameterInterpolation::try_new(v_positions, (n - 1).min(3))?;

    let mut interpolated_rows = Vec::with_capacity(n);
    for curve in u_family.iter() {
        let grid_row: Vec<DVector<T>> = u_positions
            .iter()
            .map(|u| {
                let p = curve.point(*u);
                DVector::from_iterator(D::dim(), p.coords.iter().copied())
            })
            .collect();
        interpolated_rows.push(u_interpolation.try_solve(&grid_row)?);
    }

    let mut tensor_grid = vec![vec![OPoint::<T, D>::origin(); n]; m];
    for k in 0..m {
        let column: Vec<DVector<T>> = interpolated_rows.iter().map(|row| row[k].clone()).collect();
        let solved = v_interpolation.try_solve(&column)?;
        for (j, v) in solved.iter().enumerate() {
            tensor_grid[k][j] = OPoint::from_slice(v.as_slice());
        }
    }
    let tensor = NurbsSurface::new(
        (m - 1).min(3),
        (n - 1).min(3),
        u_interpolation.knots().to_vec(),
        v_interpolation.knots().to_vec(),
        tensor_grid,
    );

    // re-express all three surfaces on a common basis in both directions
    let surfaces = unify_surface_bases(vec![loft_u, loft_v, tensor])?;

    // boolean sum: S = Loft_u + Loft_v - TensorInterpolant
    let rows = surfaces[0].control_points().len();
    let cols = surfaces[0].control_points()[0].len();
    let mut combined = vec![vec![OPoint::<T, D>::origin(); cols]; rows];
    for i in 0..rows {
        for j in 0..cols {
            let lu = &surfaces[0].control_points()[i][j];
            let lv = &surfaces[1].control_points()[i][j];
            let t = &surfaces[2].control_points()[i][j];
            combined[i][j].coords = &lu.coords + &lv.coords - &t.coords;
        }
    }

    Ok(NurbsSurface::new(
        surfaces[0].u_degree(),
        surfaces[0].v_degree(),
        surfaces[0].u_knots().to_vec(),
        surfaces[0].v_knots().to_vec(),
        combined,
    ))
}

/// Bring a set of surfaces onto identical bases in both directions by
/// degree elevation to the maximum degree and knot-union refinement.
fn unify_surface_bases<T, D>(
    surfaces: Vec<NurbsSurface<T, D>>,
) -> anyhow::Result<Vec<NurbsSurface<T, D>>>
where
    T: FloatingPoint,
    D: DimName,
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let u_target = surfaces.iter().fold(0, |d, s| d.max(s.u_degree()));
    let v_target = surfaces.iter().fold(0, |d, s| d.max(s.v_degree()));

    let mut elevated = surfaces
        .into_iter()
        .map(|s| {
            s.try_elevate_degree(UVDirection::U, u_target)?
                .try_elevate_degree(UVDirection::V, v_target)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    for direction in [UVDirection::U, UVDirection::V] {
        let union = elevated.iter().fold(vec![], |acc, s| {
            let knots = match direction {
                UVDirection::U => s.u_knots(),
                UVDirection::V => s.v_knots(),
            };
            sorted_union(knots.as_slice(), &acc)
        });
        for surface in elevated.iter_mut() {
            let knots = match direction {
                UVDirection::U => surface.u_knots(),
                UVDirection::V => surface.v_knots(),
            };
            let missing = sorted_difference(&union, knots.as_slice());
            if !missing.is_empty() {
                *surface = surface.try_refine_knot(direction, missing)?;
            }
        }
    }

    let rows = elevated[0].control_points().len();
    let cols = elevated[0].control_points()[0].len();
    for surface in elevated.iter().skip(1) {
        anyhow::ensure!(
            surface.control_points().len() == rows
                && surface.control_points()[0].len() == cols,
            "Gordon constituents ended up on different bases"
        );
    }

    Ok(elevated)
}
