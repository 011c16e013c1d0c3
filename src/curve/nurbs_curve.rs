use argmin::core::{ArgminFloat, Executor, State};
use argmin_math::ArgminScaledSub;
use nalgebra::allocator::Allocator;
use nalgebra::{
    Const, DefaultAllocator, DimName, DimNameDiff, DimNameSub, OPoint, OVector, U1,
};
use simba::scalar::SupersetOf;

use crate::closest_parameter::{
    ClosestParameterNewton, ClosestParameterProblem, ClosestPoint, ClosestPointOptions,
};
use crate::misc::binomial::Binomial;
use crate::misc::trigonometry::segment_closest_point;
use crate::misc::FloatingPoint;
use crate::prelude::{Invertible, KnotVector};

/// NURBS curve representation
/// By generics, it can be used for 2D or 3D curves with f32 or f64 scalar types
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(
        serialize = "T: serde::Serialize, OPoint<T, D>: serde::Serialize",
        deserialize = "T: serde::Deserialize<'de>, OPoint<T, D>: serde::Deserialize<'de>"
    ))
)]
pub struct NurbsCurve<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    /// control points with homogeneous coordinates
    /// the last element of the point is the `weight`
    control_points: Vec<OPoint<T, D>>,
    degree: usize,
    /// knot vector for the NURBS curve
    /// the length of the knot vector is equal to the `# of control points + degree + 1`
    knots: KnotVector<T>,
}

/// 2D NURBS curve alias
pub type NurbsCurve2D<T> = NurbsCurve<T, Const<3>>;

/// 3D NURBS curve alias
pub type NurbsCurve3D<T> = NurbsCurve<T, Const<4>>;

impl<T: FloatingPoint, D: DimName> NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Create a new NURBS curve
    /// # Failures
    /// - if the number of control points is less than or equal to the degree
    /// - if the number of knots is not equal to the number of control points + the degree + 1
    /// - if the knot vector is not non-decreasing
    /// - if a weight is not positive
    ///
    /// # Example
    /// ```
    /// use curvenet::prelude::*;
    /// use nalgebra::Point3;
    ///
    /// let w = 1.; // weight for each control point
    /// let control_points: Vec<Point3<f64>> = vec![
    ///     Point3::new(50., 50., w),
    ///     Point3::new(30., 370., w),
    ///     Point3::new(180., 350., w),
    ///     Point3::new(150., 100., w),
    /// ];
    /// let degree = 3;
    /// let m = control_points.len() + degree + 1;
    /// let knots = (0..m).map(|i| i as f64).collect();
    /// let nurbs = NurbsCurve::try_new(degree, control_points, knots);
    /// assert!(nurbs.is_ok());
    /// ```
    pub fn try_new(
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
        knots: Vec<T>,
    ) -> anyhow::Result<Self> {
        anyhow::ensure!(
            control_points.len() > degree,
            "Too few control points for curve"
        );
        anyhow::ensure!(
            knots.len() == control_points.len() + degree + 1,
            "Invalid number of knots, got {}, expected {}",
            knots.len(),
            control_points.len() + degree + 1
        );
        anyhow::ensure!(
            knots.windows(2).all(|w| w[0] <= w[1]),
            "Knot vector must be non-decreasing"
        );
        anyhow::ensure!(
            control_points.iter().all(|p| p[D::dim() - 1] > T::zero()),
            "Control point weights must be positive"
        );

        Ok(Self {
            degree,
            control_points,
            knots: KnotVector::new(knots),
        })
    }

    /// Create a new NURBS curve without validation
    pub fn new_unchecked(
        degree: usize,
        control_points: Vec<OPoint<T, D>>,
        knots: KnotVector<T>,
    ) -> Self {
        Self {
            degree,
            control_points,
            knots,
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    pub(crate) fn knots_mut(&mut self) -> &mut KnotVector<T> {
        &mut self.knots
    }

    pub fn control_points(&self) -> &Vec<OPoint<T, D>> {
        &self.control_points
    }

    pub fn knots_domain(&self) -> (T, T) {
        self.knots.domain(self.degree)
    }

    pub fn weights(&self) -> Vec<T> {
        self.control_points
            .iter()
            .map(|p| p[D::dim() - 1])
            .collect()
    }

    /// A curve is rational when any weight deviates from one.
    pub fn is_rational(&self) -> bool {
        self.control_points
            .iter()
            .any(|p| (p[D::dim() - 1] - T::one()).abs() > T::default_epsilon())
    }

    /// Whether the curve starts and ends at the same homogeneous control point.
    pub fn is_closed(&self) -> bool {
        let first = &self.control_points[0];
        let last = &self.control_points[self.control_points.len() - 1];
        (first - last).norm() < T::default_epsilon()
    }

    /// Return the dehomogenized control points
    pub fn dehomogenized_control_points(&self) -> Vec<OPoint<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        self.control_points
            .iter()
            .map(|p| dehomogenize(p).unwrap())
            .collect()
    }

    /// Evaluate the curve at a given parameter to get a dehomogenized point
    pub fn point_at(&self, t: T) -> OPoint<T, DimNameDiff<D, U1>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let p = self.point(t);
        dehomogenize(&p).unwrap()
    }

    /// Evaluate the curve at a given parameter to get a homogeneous point
    pub(crate) fn point(&self, t: T) -> OPoint<T, D> {
        let n = self.knots.len() - self.degree - 2;
        let knot_span_index = self.knots.find_knot_span_index(n, self.degree, t);
        let basis = self.knots.basis_functions(knot_span_index, t, self.degree);
        let mut position = OPoint::<T, D>::origin();
        for i in 0..=self.degree {
            position.coords +=
                &self.control_points[knot_span_index - self.degree + i].coords * basis[i];
        }
        position
    }

    /// Evaluate the curve at a given parameter to get a tangent vector
    pub fn tangent_at(&self, u: T) -> OVector<T, DimNameDiff<D, U1>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let deriv = self.rational_derivatives(u, 1);
        deriv[1].clone()
    }

    /// Evaluate the rational derivatives at a given parameter
    pub(crate) fn rational_derivatives(
        &self,
        u: T,
        derivs: usize,
    ) -> Vec<OVector<T, DimNameDiff<D, U1>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let ders = self.derivatives(u, derivs);
        let a_ders: Vec<_> = ders
            .iter()
            .map(|d| {
                let mut a_ders = vec![];
                for i in 0..D::dim() - 1 {
                    a_ders.push(d[i]);
                }
                OVector::<T, DimNameDiff<D, U1>>::from_vec(a_ders)
            })
            .collect();
        let w_ders: Vec<_> = ders.iter().map(|d| d[D::dim() - 1]).collect();

        let mut ck = vec![];
        let mut binom = Binomial::<T>::new();
        for k in 0..=derivs {
            let mut v = a_ders[k].clone();

            for i in 1..=k {
                let coef = binom.get(k, i) * w_ders[i];
                v -= &ck[k - i] * coef;
            }

            let dehom = v / w_ders[0];
            ck.push(dehom);
        }
        ck
    }

    /// Evaluate the derivatives of the homogeneous curve at a given parameter
    fn derivatives(&self, u: T, derivs: usize) -> Vec<OVector<T, D>> {
        let n = self.knots.len() - self.degree - 2;

        let du = derivs.min(self.degree);
        let mut derivatives = vec![OVector::<T, D>::zeros(); derivs + 1];

        let knot_span_index = self.knots.find_knot_span_index(n, self.degree, u);
        let nders = self
            .knots
            .derivative_basis_functions(knot_span_index, u, self.degree, du);
        for k in 0..=du {
            for j in 0..=self.degree {
                let w = &self.control_points[knot_span_index - self.degree + j] * nders[k][j];
                let column = derivatives.get_mut(k).unwrap();
                w.coords.iter().enumerate().for_each(|(i, v)| {
                    column[i] += *v;
                });
            }
        }

        derivatives
    }

    /// Sample the curve at a given number of points between the start and end
    /// Return the vector of tuples of parameter and point
    #[allow(clippy::type_complexity)]
    fn sample_regular_range_with_parameter(
        &self,
        start: T,
        end: T,
        samples: usize,
    ) -> Vec<(T, OPoint<T, DimNameDiff<D, U1>>)>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
    {
        let mut points = vec![];
        let us = T::from_usize(samples).unwrap();
        let step = (end - start) / (us - T::one());
        for i in 0..samples {
            let t = start + T::from_usize(i).unwrap() * step;
            points.push((t, self.point_at(t)));
        }
        points
    }

    /// Try to elevate the degree of the curve (Piegl & Tiller A5.9)
    pub fn try_elevate_degree(&self, target_degree: usize) -> anyhow::Result<Self> {
        if target_degree <= self.degree {
            return Ok(self.clone());
        }

        let n = self.knots.len() - self.degree - 2;
        let degree = self.degree;
        let knots = &self.knots;
        let control_points = &self.control_points;
        let degree_inc = target_degree - self.degree;

        // intermediate values
        let mut bezalfs = vec![vec![T::zero(); degree + 1]; degree + degree_inc + 1];
        let capacity = control_points.len() + degree_inc + 3;
        let mut bpts = vec![OPoint::origin(); capacity];
        let mut e_bpts = vec![OPoint::origin(); capacity];
        let mut next_bpts = vec![OPoint::origin(); capacity];

        let m = n + degree + 1;
        let ph = target_degree;
        let ph2 = ph / 2;

        let mut q_w = vec![OPoint::origin(); capacity];
        let mut u_h = vec![T::zero(); capacity + target_degree + 1];

        bezalfs[0][0] = T::one();
        bezalfs[ph][degree] = T::one();

        let mut binom = Binomial::new();

        for i in 1..=ph2 {
            let inv = T::one() / binom.get(ph, i);
            let mpi = degree.min(i);
            for j in i.saturating_sub(degree_inc)..=mpi {
                bezalfs[i][j] = inv * binom.get(degree, j) * binom.get(degree_inc, i - j);
            }
        }

        for i in (ph2 + 1)..ph {
            let mpi = degree.min(i);
            for j in i.saturating_sub(degree_inc)..=mpi {
                bezalfs[i][j] = bezalfs[ph - i][degree - j];
            }
        }

        let mut kind = ph + 1;
        let mut r: isize = -1;
        let mut a = degree;
        let mut b = degree + 1;
        let mut cind = 1;
        let mut ua = knots[0];
        q_w[0] = control_points[0].clone();
        for i in 0..=ph {
            u_h[i] = ua;
        }

        bpts[..(degree + 1)].clone_from_slice(&control_points[..(degree + 1)]);

        while b < m {
            let i = b;
            while b < m && knots[b] == knots[b + 1] {
                b += 1;
            }
            let mul = b - i + 1;
            let ub = knots[b];
            let oldr = r;
            r = degree as isize - mul as isize;
            let lbz = if oldr > 0 { ((oldr + 2) / 2) as usize } else { 1 };
            let rbz = if r > 0 { ph - ((r + 1) / 2) as usize } else { ph };
            if r > 0 {
                // insert knot to get a bezier segment
                let numer = ub - ua;
                let mut alfs = vec![T::zero(); degree];
                let mut k = degree;
                while k > mul {
                    alfs[k - mul - 1] = numer / (knots[a + k] - ua);
                    k -= 1;
                }
                for j in 1..=(r as usize) {
                    let save = (r as usize) - j;
                    let s = mul + j;
                    let mut k = degree;
                    while k >= s {
                        bpts[k] = bpts[k].lerp(&bpts[k - 1], T::one() - alfs[k - s]);
                        k -= 1;
                    }
                    next_bpts[save] = bpts[degree].clone();
                }
            }

            // degree elevate the bezier segment
            for i in lbz..=ph {
                e_bpts[i] = OPoint::origin();
                let mpi = degree.min(i);
                for j in i.saturating_sub(degree_inc)..=mpi {
                    e_bpts[i].coords = &e_bpts[i].coords + &bpts[j].coords * bezalfs[i][j];
                }
            }

            if oldr > 1 {
                // remove the knot u = knots[a] oldr times
                let mut first = kind - 2;
                let mut last = kind;
                let den = ub - ua;
                let bet = (ub - u_h[kind - 1]) / den;
                for tr in 1..oldr {
                    let mut i = first;
                    let mut j = last;
                    let mut kj = j - kind + 1;
                    let utr = tr as usize;
                    while (j as isize - i as isize) > tr {
                        if i < cind {
                            let alf = (ub - u_h[i]) / (ua - u_h[i]);
                            q_w[i] = q_w[i].lerp(&q_w[i - 1], T::one() - alf);
                        }
                        if j >= lbz {
                            if (j as isize) - tr <= (kind as isize - ph as isize + oldr) {
                                let gam = (ub - u_h[j - utr]) / den;
                                e_bpts[kj] = e_bpts[kj].lerp(&e_bpts[kj + 1], T::one() - gam);
                            }
                        } else {
                            e_bpts[kj] = e_bpts[kj].lerp(&e_bpts[kj + 1], T::one() - bet);
                        }
                        i += 1;
                        j -= 1;
                        kj -= 1;
                    }
                    first -= 1;
                    last += 1;
                }
            }

            if a != degree {
                // load the knot ua
                for _ in 0..(ph as isize - oldr) {
                    u_h[kind] = ua;
                    kind += 1;
                }
            }

            // load the control points into q_w
            for j in lbz..=rbz {
                q_w[cind] = e_bpts[j].clone();
                cind += 1;
            }

            if b < m {
                // set up for the next pass through the loop
                let ur = r as usize;
                bpts[..ur].clone_from_slice(&next_bpts[..ur]);
                for j in ur..=degree {
                    bpts[j] = control_points[b - degree + j].clone();
                }
                a = b;
                b += 1;
                ua = ub;
            } else {
                // end knot
                for i in 0..=ph {
                    u_h[kind + i] = ub;
                }
                kind += ph + 1;
            }
        }

        u_h.truncate(kind);
        q_w.truncate(kind - ph - 1);

        Ok(Self {
            degree: target_degree,
            control_points: q_w,
            knots: KnotVector::new(u_h),
        })
    }

    /// Check if the curve is clamped
    pub fn is_clamped(&self) -> bool {
        self.knots.is_clamped(self.degree)
    }

    /// Try to refine the curve by inserting knots (Piegl & Tiller A5.4)
    pub fn try_refine_knot(&mut self, knots_to_insert: Vec<T>) -> anyhow::Result<()> {
        anyhow::ensure!(self.is_clamped(), "Curve must be clamped to refine knots");

        if knots_to_insert.is_empty() {
            return Ok(());
        }

        let degree = self.degree;
        let control_points = &self.control_points;

        let n = control_points.len() - 1;
        let m = n + degree + 1;
        let r = knots_to_insert.len() - 1;
        let a = self
            .knots
            .find_knot_span_index(n, degree, knots_to_insert[0]);
        let b = self
            .knots
            .find_knot_span_index(n, degree, knots_to_insert[r])
            + 1;

        let mut control_points_post = vec![OPoint::<T, D>::origin(); n + r + 2];
        let mut knots_post = vec![T::zero(); m + 1 + r + 1];

        control_points_post[..((a - degree) + 1)]
            .clone_from_slice(&control_points[..((a - degree) + 1)]);
        for i in (b - 1)..=n {
            control_points_post[i + r + 1] = control_points[i].clone();
        }

        for i in 0..=a {
            knots_post[i] = self.knots[i];
        }
        for i in (b + degree)..=m {
            knots_post[i + r + 1] = self.knots[i];
        }

        let mut i = b + degree - 1;
        let mut k = b + degree + r;

        for j in (0..=r).rev() {
            while knots_to_insert[j] <= self.knots[i] && i > a {
                control_points_post[k - degree - 1] = control_points[i - degree - 1].clone();
                knots_post[k] = self.knots[i];
                k -= 1;
                i -= 1;
            }
            control_points_post[k - degree - 1] = control_points_post[k - degree].clone();
            for l in 1..=degree {
                let ind = k - degree + l;
                let alpha = knots_post[k + l] - knots_to_insert[j];
                if alpha.abs() < T::default_epsilon() {
                    control_points_post[ind - 1] = control_points_post[ind].clone();
                } else {
                    let denom = knots_post[k + l] - self.knots[i - degree + l];
                    let weight = if denom != T::zero() {
                        alpha / denom
                    } else {
                        T::zero()
                    };
                    control_points_post[ind - 1] = control_points_post[ind - 1]
                        .lerp(&control_points_post[ind], T::one() - weight);
                }
            }
            knots_post[k] = knots_to_insert[j];
            k -= 1;
        }

        self.knots = KnotVector::new(knots_post);
        self.control_points = control_points_post;

        Ok(())
    }

    /// Extract the part of the curve between two parameters as a new
    /// clamped curve with an unchanged parameterization.
    pub fn try_sub_curve(&self, start: T, end: T) -> anyhow::Result<Self> {
        let (d0, d1) = self.knots_domain();
        anyhow::ensure!(
            start < end,
            "Sub-curve interval start must be strictly less than its end"
        );
        anyhow::ensure!(
            start >= d0 - T::default_epsilon() && end <= d1 + T::default_epsilon(),
            "Sub-curve interval lies outside the curve domain"
        );

        let degree = self.degree;
        let eps = T::default_epsilon();

        let mut cloned = self.clone();
        for u in [start, end] {
            if u > d0 + eps && u < d1 - eps {
                let mult = cloned.knots.multiplicity_at(u, eps);
                if mult < degree + 1 {
                    cloned.try_refine_knot(vec![u; degree + 1 - mult])?;
                }
            }
        }

        let knots = cloned.knots.as_slice();
        let first_of = |u: T, fallback: usize| {
            knots
                .iter()
                .position(|k| (*k - u).abs() <= eps)
                .unwrap_or(fallback)
        };
        let a = if start <= d0 + eps { 0 } else { first_of(start, 0) };
        let b = if end >= d1 - eps {
            knots.len() - 1 - degree
        } else {
            first_of(end, knots.len() - 1 - degree)
        };

        let sub_knots = knots[a..(b + degree + 1)].to_vec();
        let sub_points = cloned.control_points[a..b].to_vec();
        Self::try_new(degree, sub_points, sub_knots)
    }

    /// Affinely reparameterize the curve so that its domain becomes `[start, end]`.
    pub fn try_rescale_domain(&mut self, start: T, end: T) -> anyhow::Result<()> {
        anyhow::ensure!(
            start < end,
            "Domain start must be strictly less than domain end"
        );
        let span = self.knots.last() - self.knots.first();
        anyhow::ensure!(
            span > T::default_epsilon(),
            "Cannot rescale a degenerate knot vector"
        );
        self.knots.rescale(start, end);
        Ok(())
    }

    /// Find a local closest point on the curve to a given point.
    ///
    /// The search is restricted to `interval` (intersected with the knot
    /// domain) and started at `seed` when one is supplied, so the result is
    /// the local minimum nearest the seed rather than a guaranteed global
    /// one. Without a seed, the initial guess comes from polyline sampling.
    ///
    /// Reaching the iteration cap is not an error: the best iterate and its
    /// residual distance are returned.
    pub fn closest_point(
        &self,
        point: &OPoint<T, DimNameDiff<D, U1>>,
        interval: Option<(T, T)>,
        seed: Option<T>,
        options: Option<ClosestPointOptions<T>>,
    ) -> anyhow::Result<ClosestPoint<T, OPoint<T, DimNameDiff<D, U1>>>>
    where
        D: DimNameSub<U1>,
        DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
        T: ArgminFloat,
        T: ArgminScaledSub<T, T, T>,
    {
        let (d0, d1) = self.knots_domain();
        let (t0, t1) = match interval {
            Some((a, b)) => (
                if a > d0 { a } else { d0 },
                if b < d1 { b } else { d1 },
            ),
            None => (d0, d1),
        };
        anyhow::ensure!(
            t0 < t1,
            "Search interval does not intersect the curve domain"
        );

        let u0 = match seed {
            Some(s) => {
                if s < t0 {
                    t0
                } else if s > t1 {
                    t1
                } else {
                    s
                }
            }
            None => {
                let samples = self.control_points.len() * self.degree;
                let pts = self.sample_regular_range_with_parameter(t0, t1, samples.max(2));
                let mut min = <T as nalgebra::RealField>::max_value().unwrap();
                let mut u = t0;
                for i in 0..pts.len() - 1 {
                    let (u0, p0) = &pts[i];
                    let (u1, p1) = &pts[i + 1];
                    let (proj_u, proj_pt) = segment_closest_point(point, p0, p1, *u0, *u1);
                    let d = (point - proj_pt).norm();
                    if d < min {
                        min = d;
                        u = proj_u;
                    }
                }
                u
            }
        };

        let options = options.unwrap_or_default();
        let solver = ClosestParameterNewton::new((t0, t1), self.is_closed())
            .with_step_size_tolerance(options.step_size_tolerance);
        let res = Executor::new(ClosestParameterProblem::new(point, self), solver)
            .configure(|state| state.param(u0).max_iters(options.max_iters))
            .run()?;

        #[cfg(feature = "log")]
        if matches!(
            res.state().get_termination_reason(),
            Some(argmin::core::TerminationReason::MaxItersReached)
        ) {
            log::trace!("closest-point refinement stopped at the iteration cap");
        }

        let u = res
            .state()
            .get_best_param()
            .or(res.state().get_param())
            .cloned()
            .ok_or(anyhow::anyhow!("No closest parameter found"))?;
        let closest = self.point_at(u);
        let distance = (point - &closest).norm();
        Ok(ClosestPoint::new(u, closest, distance))
    }

    /// Cast the curve to a curve with another floating point type
    pub fn cast<F: FloatingPoint + SupersetOf<T>>(&self) -> NurbsCurve<F, D>
    where
        DefaultAllocator: Allocator<D>,
    {
        NurbsCurve {
            control_points: self
                .control_points
                .iter()
                .map(|p| p.clone().cast())
                .collect(),
            degree: self.degree,
            knots: self.knots.cast(),
        }
    }
}

impl<T: FloatingPoint, D: DimName> Invertible for NurbsCurve<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Reverse the direction of the curve
    fn invert(&mut self) {
        self.control_points.reverse();
        self.knots.invert();
    }
}

/// Dehomogenize a point
pub fn dehomogenize<T: FloatingPoint, D: DimName>(
    point: &OPoint<T, D>,
) -> Option<OPoint<T, DimNameDiff<D, U1>>>
where
    D: DimNameSub<U1>,
    DefaultAllocator: Allocator<D>,
    DefaultAllocator: Allocator<DimNameDiff<D, U1>>,
{
    let v = &point.coords;
    let idx = D::dim() - 1;
    let w = v[idx];
    if w != T::zero() {
        let coords =
            v.generic_view((0, 0), (<D as DimNameSub<U1>>::Output::name(), Const::<1>)) / w;
        Some(OPoint { coords })
    } else {
        None
    }
}
