use nalgebra::{
    allocator::Allocator, Const, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, U1,
};
use simba::scalar::SupersetOf;

use crate::curve::nurbs_curve::{dehomogenize, NurbsCurve};
use crate::misc::FloatingPoint;
use crate::prelude::KnotVector;

use super::UVDirection;

/// NURBS surface representation
/// by generics, it can be used for 2D or 3D surfaces with f32 or f64 scalar types
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(
        serialize = "T: serde::Serialize, OPoint<T, D>: serde::Serialize",
        deserialize = "T: serde::Deserialize<'de>, OPoint<T, D>: serde::Deserialize<'de>"
    ))
)]
pub struct NurbsSurface<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points with homogeneous coordinates
    /// the last element of the point is the `weight`
    /// the outer vector runs along the u direction, the inner along v
    control_points: Vec<Vec<OPoint<T, D>>>,
    u_degree: usize,
    v_degree: usize,
    u_knots: KnotVector<T>,
    v_knots: KnotVector<T>,
}

/// 2D NURBS surface alias
pub type NurbsSurface2D<T> = NurbsSurface<T, Const<3>>;
/// 3D NURBS surface alias
pub type NurbsSurface3D<T> = NurbsSurface<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsSurface<T, D>
where
    DefaultAllocator: Allocator<D>,
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    pub fn new(
        u_degree: usize,
        v_degree: usize,
        u_knots: Vec<T>,
        v_knots: Vec<T>,
        control_points: Vec<Vec<OPoint<T, D>>>,
    ) -> Self {
        Self {
            u_degree,
            v_degree,
            u_knots: KnotVector::new(u_knots),
            v_knots: KnotVector::new(v_knots),
            control_points,
        }
    }

    pub fn u_degree(&self) -> usize {
        self.u_degree
    }

    pub fn v_degree(&self) -> usize {
        self.v_degree
    }

    pub fn u_knots(&self) -> &KnotVector<T> {
        &self.u_knots
    }

    pub fn v_knots(&self) -> &KnotVector<T> {
        &self.v_knots
    }

    pub fn control_points(&self) -> &Vec<Vec<OPoint<T, D>>> {
        &self.control_points
    }

    /// Get the u domain of the knot vector by degree
    pub fn u_knots_domain(&self) -> (T, T) {
        self.u_knots.domain(self.u_degree)
    }

    /// Get the v domain of the knot vector by degree
    pub fn v_knots_domain(&self) -> (T, T) {
        self.v_knots.domain(self.v_degree)
    }

    pub fn weights(&self) -> Vec<Vec<T>> {
        self.control_points
            .iter()
            .map(|row| row.iter().map(|p| p[D::dim() - 1]).collect())
            .collect()
    }

    /// A surface is rational when any weight deviates from one.
    pub fn is_rational(&self) -> bool {
        self.control_points
            .iter()
            .any(|row| row.iter().any(|p| (p[D::dim() - 1] - T::one()).abs() > T::default_epsilon()))
    }

    /// Evaluate the surface at the given u, v parameters to get a dehomogenized point
    pub fn point_at(&self, u: T, v: T) -> OPoint<T, DimNameDiff<D, U1>> {
        let p = self.point(u, v);
        dehomogenize(&p).unwrap()
    }

    /// Evaluate the surface at the given u, v parameters to get a homogeneous point
    pub(crate) fn point(&self, u: T, v: T) -> OPoint<T, D> {
        let n = self.u_knots.len() - self.u_degree - 2;
        let m = self.v_knots.len() - self.v_degree - 2;

        let knot_span_index_u = self.u_knots.find_knot_span_index(n, self.u_degree, u);
        let knot_span_index_v = self.v_knots.find_knot_span_index(m, self.v_degree, v);
        let u_basis_vals = self
            .u_knots
            .basis_functions(knot_span_index_u, u, self.u_degree);
        let v_basis_vals = self
            .v_knots
            .basis_functions(knot_span_index_v, v, self.v_degree);
        let uind = knot_span_index_u - self.u_degree;

        let mut position = OPoint::<T, D>::origin();
        for l in 0..=self.v_degree {
            let mut temp = OPoint::<T, D>::origin();
            let vind = knot_span_index_v - self.v_degree + l;

            // sample u isoline
            for k in 0..=self.u_degree {
                temp.coords += &self.control_points[uind + k][vind].coords * u_basis_vals[k];
            }

            // add point from u isoline
            position.coords += temp.coords * v_basis_vals[l];
        }

        position
    }

    /// Extract the iso-curve at a fixed parameter.
    /// `direction` names the parameter held fixed: fixing u yields a curve
    /// running along v and vice versa. The extraction is exact, the curve
    /// lies on the surface.
    pub fn try_iso_curve(&self, t: T, direction: UVDirection) -> anyhow::Result<NurbsCurve<T, D>> {
        match direction {
            UVDirection::U => {
                let (d0, d1) = self.u_knots_domain();
                anyhow::ensure!(
                    d0 <= t && t <= d1,
                    "Iso-curve parameter outside the u domain"
                );

                let n = self.u_knots.len() - self.u_degree - 2;
                let span = self.u_knots.find_knot_span_index(n, self.u_degree, t);
                let basis = self.u_knots.basis_functions(span, t, self.u_degree);

                let cols = self.control_points[0].len();
                let mut points = vec![OPoint::<T, D>::origin(); cols];
                for (j, point) in points.iter_mut().enumerate() {
                    for k in 0..=self.u_degree {
                        point.coords +=
                            &self.control_points[span - self.u_degree + k][j].coords * basis[k];
                    }
                }

                NurbsCurve::try_new(self.v_degree, points, self.v_knots.to_vec())
            }
            UVDirection::V => {
                let (d0, d1) = self.v_knots_domain();
                anyhow::ensure!(
                    d0 <= t && t <= d1,
                    "Iso-curve parameter outside the v domain"
                );

                let m = self.v_knots.len() - self.v_degree - 2;
                let span = self.v_knots.find_knot_span_index(m, self.v_degree, t);
                let basis = self.v_knots.basis_functions(span, t, self.v_degree);

                let rows = self.control_points.len();
                let mut points = vec![OPoint::<T, D>::origin(); rows];
                for (i, point) in points.iter_mut().enumerate() {
                    for k in 0..=self.v_degree {
                        point.coords +=
                            &self.control_points[i][span - self.v_degree + k].coords * basis[k];
                    }
                }

                NurbsCurve::try_new(self.u_degree, points, self.u_knots.to_vec())
            }
        }
    }

    /// Swap the u and v parameterizations of the surface.
    pub fn transposed(&self) -> Self {
        let rows = self.control_points.len();
        let cols = self.control_points[0].len();
        let mut grid = vec![vec![OPoint::<T, D>::origin(); rows]; cols];
        for i in 0..rows {
            for j in 0..cols {
                grid[j][i] = self.control_points[i][j].clone();
            }
        }

        Self {
            control_points: grid,
            u_degree: self.v_degree,
            v_degree: self.u_degree,
            u_knots: self.v_knots.clone(),
            v_knots: self.u_knots.clone(),
        }
    }

    /// Elevate the surface degree in one parametric direction by running the
    /// curve degree elevation over every control point row or column.
    pub fn try_elevate_degree(
        &self,
        direction: UVDirection,
        target_degree: usize,
    ) -> anyhow::Result<Self> {
        match direction {
            UVDirection::U => {
                if target_degree <= self.u_degree {
                    return Ok(self.clone());
                }
                let cols = self.control_points[0].len();
                let mut elevated = vec![];
                for j in 0..cols {
                    let points: Vec<_> = self
                        .control_points
                        .iter()
                        .map(|row| row[j].clone())
                        .collect();
                    let curve =
                        NurbsCurve::new_unchecked(self.u_degree, points, self.u_knots.clone());
                    elevated.push(curve.try_elevate_degree(target_degree)?);
                }

                let rows = elevated[0].control_points().len();
                let mut grid = vec![vec![OPoint::<T, D>::origin(); cols]; rows];
                for (j, curve) in elevated.iter().enumerate() {
                    for (i, p) in curve.control_points().iter().enumerate() {
                        grid[i][j] = p.clone();
                    }
                }

                Ok(Self {
                    control_points: grid,
                    u_degree: target_degree,
                    v_degree: self.v_degree,
                    u_knots: elevated[0].knots().clone(),
                    v_knots: self.v_knots.clone(),
                })
            }
            UVDirection::V => {
                if target_degree <= self.v_degree {
                    return Ok(self.clone());
                }
                let mut elevated = vec![];
                for row in self.control_points.iter() {
                    let curve =
                        NurbsCurve::new_unchecked(self.v_degree, row.clone(), self.v_knots.clone());
                    elevated.push(curve.try_elevate_degree(target_degree)?);
                }

                Ok(Self {
                    control_points: elevated
                        .iter()
                        .map(|c| c.control_points().clone())
                        .collect(),
                    u_degree: self.u_degree,
                    v_degree: target_degree,
                    u_knots: self.u_knots.clone(),
                    v_knots: elevated[0].knots().clone(),
                })
            }
        }
    }

    /// Refine the surface by inserting knots in one parametric direction.
    pub fn try_refine_knot(
        &self,
        direction: UVDirection,
        knots_to_insert: Vec<T>,
    ) -> anyhow::Result<Self> {
        if knots_to_insert.is_empty() {
            return Ok(self.clone());
        }

        match direction {
            UVDirection::U => {
                let cols = self.control_points[0].len();
                let mut refined = vec![];
                for j in 0..cols {
                    let points: Vec<_> = self
                        .control_points
                        .iter()
                        .map(|row| row[j].clone())
                        .collect();
                    let mut curve =
                        NurbsCurve::new_unchecked(self.u_degree, points, self.u_knots.clone());
                    curve.try_refine_knot(knots_to_insert.clone())?;
                    refined.push(curve);
                }

                let rows = refined[0].control_points().len();
                let mut grid = vec![vec![OPoint::<T, D>::origin(); cols]; rows];
                for (j, curve) in refined.iter().enumerate() {
                    for (i, p) in curve.control_points().iter().enumerate() {
                        grid[i][j] = p.clone();
                    }
                }

                Ok(Self {
                    control_points: grid,
                    u_degree: self.u_degree,
                    v_degree: self.v_degree,
                    u_knots: refined[0].knots().clone(),
                    v_knots: self.v_knots.clone(),
                })
            }
            UVDirection::V => {
                let mut refined = vec![];
                for row in self.control_points.iter() {
                    let mut curve =
                        NurbsCurve::new_unchecked(self.v_degree, row.clone(), self.v_knots.clone());
                    curve.try_refine_knot(knots_to_insert.clone())?;
                    refined.push(curve);
                }

                Ok(Self {
                    control_points: refined
                        .iter()
                        .map(|c| c.control_points().clone())
                        .collect(),
                    u_degree: self.u_degree,
                    v_degree: self.v_degree,
                    u_knots: self.u_knots.clone(),
                    v_knots: refined[0].knots().clone(),
                })
            }
        }
    }

    /// Cast the surface to a surface with another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> NurbsSurface<F, D>
    where
        DefaultAllocator: Allocator<D>,
    {
        NurbsSurface {
            control_points: self
                .control_points
                .iter()
                .map(|row| row.iter().map(|p| p.clone().cast()).collect())
                .collect(),
            u_degree: self.u_degree,
            v_degree: self.v_degree,
            u_knots: self.u_knots.cast(),
            v_knots: self.v_knots.cast(),
        }
    }
}
