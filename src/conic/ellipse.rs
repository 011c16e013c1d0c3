use argmin::core::ArgminFloat;
use argmin_math::ArgminScaledSub;
use nalgebra::allocator::Allocator;
use nalgebra::{
    Const, DefaultAllocator, DimName, DimNameAdd, DimNameSub, DimNameSum, OPoint, OVector, Point2,
    Point3, Vector2, Vector3, U1,
};

use crate::closest_parameter::ClosestPoint;
use crate::curve::NurbsCurve;
use crate::misc::{FloatingPoint, Invertible};
use crate::prelude::KnotVector;

/// Radii below this threshold make an ellipse degenerate.
const DEGENERACY_EPSILON: f64 = 1e-12;

/// Parameter bounds within this distance of 0 or ±2π snap to the exact value.
const PARAM_FUZZ: f64 = 1e-12;

/// An elliptic arc given by a centre, an orthonormal spanning frame, two
/// radii and a parameter interval inside [-2π, 2π] of length at most 2π.
///
/// The value is immutable and always valid: construction and re-bounding go
/// through validated factories only. The curve is traced as
/// `centre + xradius·cos(t)·xaxis + yradius·sin(t)·yaxis`, with the
/// parameter direction flipped when the reversed flag is set.
#[derive(Clone, Debug)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(bound(
        serialize = "T: serde::Serialize, OPoint<T, D>: serde::Serialize, OVector<T, D>: serde::Serialize",
        deserialize = "T: serde::Deserialize<'de>, OPoint<T, D>: serde::Deserialize<'de>, OVector<T, D>: serde::Deserialize<'de>"
    ))
)]
pub struct Ellipse<T: FloatingPoint, D: DimName>
where
    DefaultAllocator: Allocator<D>,
{
    centre: OPoint<T, D>,
    xaxis: OVector<T, D>,
    yaxis: OVector<T, D>,
    xradius: T,
    yradius: T,
    startparam: T,
    endparam: T,
    reversed: bool,
}

/// 2D ellipse alias
pub type Ellipse2D<T> = Ellipse<T, Const<2>>;
/// 3D ellipse alias
pub type Ellipse3D<T> = Ellipse<T, Const<3>>;

impl<T: FloatingPoint> Ellipse3D<T> {
    /// Create a full-period 3D ellipse.
    ///
    /// The spanning frame is derived from `direction` and `normal`: the
    /// direction is projected perpendicular to the normal, and the second
    /// axis completes a right-handed orthonormal frame.
    ///
    /// # Failures
    /// - a radius below the degeneracy threshold
    /// - a zero-length direction or normal
    /// - a direction parallel to the normal
    pub fn try_new(
        centre: Point3<T>,
        direction: Vector3<T>,
        normal: Vector3<T>,
        xradius: T,
        yradius: T,
        reversed: bool,
    ) -> anyhow::Result<Self> {
        let eps = T::from_f64(DEGENERACY_EPSILON).unwrap();
        anyhow::ensure!(
            xradius > eps && yradius > eps,
            "Degenerate ellipse: radii must be positive"
        );
        anyhow::ensure!(normal.norm() > eps, "Normal must have a positive length");

        let normal = normal.normalize();
        let projected = &direction - &normal * direction.dot(&normal);
        anyhow::ensure!(
            projected.norm() > eps,
            "Spanning direction is parallel to the normal"
        );

        let xaxis = projected.normalize();
        let yaxis = normal.cross(&xaxis);

        Ok(Self {
            centre,
            xaxis,
            yaxis,
            xradius,
            yradius,
            startparam: T::zero(),
            endparam: T::two_pi(),
            reversed,
        })
    }
}

impl<T: FloatingPoint> Ellipse2D<T> {
    /// Create a full-period 2D ellipse. The second spanning vector is the
    /// counter-clockwise perpendicular of the direction.
    pub fn try_new(
        centre: Point2<T>,
        direction: Vector2<T>,
        xradius: T,
        yradius: T,
        reversed: bool,
    ) -> anyhow::Result<Self> {
        let eps = T::from_f64(DEGENERACY_EPSILON).unwrap();
        anyhow::ensure!(
            xradius > eps && yradius > eps,
            "Degenerate ellipse: radii must be positive"
        );
        anyhow::ensure!(
            direction.norm() > eps,
            "Spanning direction must have a positive length"
        );

        let xaxis = direction.normalize();
        let yaxis = Vector2::new(-xaxis.y, xaxis.x);

        Ok(Self {
            centre,
            xaxis,
            yaxis,
            xradius,
            yradius,
            startparam: T::zero(),
            endparam: T::two_pi(),
            reversed,
        })
    }
}

impl<T: FloatingPoint, D: DimName> Ellipse<T, D>
where
    DefaultAllocator: Allocator<D>,
{
    /// Return a copy bounded to `[startparam, endparam]`.
    ///
    /// Bounds within fuzz of 0 or ±2π snap to the exact value.
    ///
    /// # Failures
    /// - start not strictly less than end
    /// - bounds outside [-2π, 2π]
    /// - a span exceeding 2π
    pub fn try_with_param_bounds(&self, startparam: T, endparam: T) -> anyhow::Result<Self> {
        let fuzz = T::from_f64(PARAM_FUZZ).unwrap();
        let two_pi = T::two_pi();

        let snap = |t: T| {
            if t.abs() < fuzz {
                T::zero()
            } else if (two_pi - t).abs() < fuzz {
                two_pi
            } else if (two_pi + t).abs() < fuzz {
                -two_pi
            } else {
                t
            }
        };
        let startparam = snap(startparam);
        let endparam = snap(endparam);

        anyhow::ensure!(
            startparam < endparam,
            "First parameter must be strictly less than second"
        );
        anyhow::ensure!(
            startparam >= -two_pi && endparam <= two_pi,
            "Parameters must be in [-2pi, 2pi]"
        );
        anyhow::ensure!(
            endparam - startparam <= two_pi,
            "Parameter span must not exceed 2pi"
        );

        let mut bounded = self.clone();
        bounded.startparam = startparam;
        bounded.endparam = endparam;
        Ok(bounded)
    }

    /// Return a copy restricted to the given sub-interval.
    pub fn try_sub_curve(&self, from_param: T, to_param: T) -> anyhow::Result<Self> {
        self.try_with_param_bounds(from_param, to_param)
    }

    pub fn centre(&self) -> &OPoint<T, D> {
        &self.centre
    }

    pub fn xaxis(&self) -> &OVector<T, D> {
        &self.xaxis
    }

    pub fn yaxis(&self) -> &OVector<T, D> {
        &self.yaxis
    }

    pub fn xradius(&self) -> T {
        self.xradius
    }

    pub fn yradius(&self) -> T {
        self.yradius
    }

    pub fn startparam(&self) -> T {
        self.startparam
    }

    pub fn endparam(&self) -> T {
        self.endparam
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn is_closed(&self) -> bool {
        self.endparam - self.startparam == T::two_pi()
    }

    /// Move the ellipse along a direction.
    pub fn translated(&self, direction: &OVector<T, D>) -> Self {
        let mut translated = self.clone();
        translated.centre += direction;
        translated
    }

    /// Map an external parameter to the internal angle, undoing reversal.
    fn raw_parameter(&self, t: T) -> T {
        if self.reversed {
            self.startparam + self.endparam - t
        } else {
            t
        }
    }

    /// Evaluate at the internal angle, ignoring reversal.
    fn raw_point(&self, angle: T) -> OPoint<T, D> {
        let mut p = self.centre.clone();
        p.coords += &self.xaxis * (self.xradius * angle.cos());
        p.coords += &self.yaxis * (self.yradius * angle.sin());
        p
    }

    /// Evaluate the ellipse at a parameter.
    pub fn point_at(&self, t: T) -> OPoint<T, D> {
        self.raw_point(self.raw_parameter(t))
    }

    /// Evaluate the tangent at a parameter.
    pub fn tangent_at(&self, t: T) -> OVector<T, D> {
        let angle = self.raw_parameter(t);
        let mut tangent = &self.xaxis * (-self.xradius * angle.sin());
        tangent += &self.yaxis * (self.yradius * angle.cos());
        if self.reversed {
            -tangent
        } else {
            tangent
        }
    }

    /// Find a local closest point on the arc within `[tmin, tmax]`.
    ///
    /// When no seed is supplied, a same-centre circle of matching radius is
    /// solved in closed form to produce one; the seed is then refined by a
    /// bounded Newton iteration with a damped fallback on the exact curve.
    /// Non-convergence is not an error: the best iterate is returned and
    /// the caller applies its own tolerance to the residual distance.
    pub fn closest_point(
        &self,
        point: &OPoint<T, D>,
        tmin: T,
        tmax: T,
        seed: Option<T>,
    ) -> ClosestPoint<T, OPoint<T, D>> {
        let tmin = tmin.max(self.startparam);
        let tmax = tmax.min(self.endparam);

        // solve in internal angle space where evaluation ignores reversal
        let (lo, hi) = if self.reversed {
            (self.raw_parameter(tmax), self.raw_parameter(tmin))
        } else {
            (tmin, tmax)
        };

        let guess = match seed {
            Some(s) => self.raw_parameter(s).clamp(lo, hi),
            None => {
                // closest point on a concentric circle, in closed form
                let local = point - &self.centre;
                let angle = local.dot(&self.yaxis).atan2(local.dot(&self.xaxis));
                let two_pi = T::two_pi();
                let candidates = [angle - two_pi, angle, angle + two_pi];
                candidates
                    .iter()
                    .copied()
                    .find(|c| lo <= *c && *c <= hi)
                    .unwrap_or_else(|| {
                        // outside the arc: take the nearest interval end
                        let nearest = candidates
                            .iter()
                            .copied()
                            .reduce(|a, b| {
                                let da = (a.clamp(lo, hi) - a).abs();
                                let db = (b.clamp(lo, hi) - b).abs();
                                if da <= db {
                                    a
                                } else {
                                    b
                                }
                            })
                            .unwrap();
                        nearest.clamp(lo, hi)
                    })
            }
        };

        let mut u = guess;
        let mut best_u = u;
        let mut best_distance = (&self.raw_point(u) - point).norm();

        let max_iters = 32;
        let step_tolerance = T::from_f64(1e-13).unwrap();
        for _ in 0..max_iters {
            let position = self.raw_point(u);
            let mut d1 = &self.xaxis * (-self.xradius * u.sin());
            d1 += &self.yaxis * (self.yradius * u.cos());
            let mut d2 = &self.xaxis * (-self.xradius * u.cos());
            d2 += &self.yaxis * (-self.yradius * u.sin());

            let diff = &position - point;
            let gradient = d1.dot(&diff);
            let hessian = d2.dot(&diff) + d1.dot(&d1);

            let step = if hessian.abs() > T::default_epsilon() && hessian > T::zero() {
                -gradient / hessian
            } else {
                // not locally convex, fall back to a damped gradient step
                let scale = (hi - lo) * T::from_f64(0.1).unwrap();
                -gradient.signum() * scale
            };

            let next = (u + step).clamp(lo, hi);
            let distance = (&self.raw_point(next) - point).norm();
            if distance < best_distance {
                best_distance = distance;
                best_u = next;
            }

            if (next - u).abs() < step_tolerance {
                u = next;
                break;
            }
            u = next;
        }

        let parameter = if self.reversed {
            self.startparam + self.endparam - best_u
        } else {
            best_u
        };
        let closest = self.point_at(parameter);
        ClosestPoint::new(parameter, closest, best_distance)
    }

    /// Convert the arc into a rational quadratic NURBS curve tracing it
    /// exactly over `[startparam, endparam]`.
    ///
    /// The canonical closed form of the ellipse (alternating weights 1 and
    /// 1/√2 on quarter spans) is laid out over the whole legal bound range
    /// [-2π, 2π]; the canonical parameters of the requested bounds are
    /// located by closest-point projection seeded with the analytic
    /// parameter values, the sub-curve in between is extracted, its basis
    /// rescaled to the requested interval and the direction reversed when
    /// the reversed flag is set.
    pub fn try_to_nurbs(&self) -> anyhow::Result<NurbsCurve<T, DimNameSum<D, U1>>>
    where
        D: DimNameAdd<U1>,
        DimNameSum<D, U1>: DimNameSub<U1, Output = D>,
        DefaultAllocator: Allocator<DimNameSum<D, U1>>,
        T: ArgminFloat + ArgminScaledSub<T, T, T>,
    {
        let canonical = self.canonical_nurbs();

        let p0 = self.raw_point(self.startparam);
        let p1 = self.raw_point(self.endparam);
        let c0 = canonical.closest_point(&p0, None, Some(self.startparam), None)?;
        let c1 = canonical.closest_point(&p1, None, Some(self.endparam), None)?;

        // projections of quarter-span bounds land on existing knots; snap so
        // the sub-curve extraction sees their exact multiplicity
        let snap_eps = T::from_f64(1e-9).unwrap();
        let snap = |t: T| {
            canonical
                .knots()
                .iter()
                .copied()
                .find(|k| {
                    let d = *k - t;
                    -snap_eps < d && d < snap_eps
                })
                .unwrap_or(t)
        };
        let t0 = snap(c0.parameter());
        let t1 = snap(c1.parameter());
        anyhow::ensure!(
            t0 < t1,
            "Canonical parameters of the arc bounds are not ordered"
        );

        let mut segment = canonical.try_sub_curve(t0, t1)?;
        segment.try_rescale_domain(self.startparam, self.endparam)?;

        if self.reversed {
            segment.invert();
        }

        Ok(segment)
    }

    /// The canonical closed rational quadratic form of the ellipse over
    /// [-2π, 2π]: eight quarter spans, corner points of weight one and
    /// tangent-intersection midpoints of weight 1/√2.
    fn canonical_nurbs(&self) -> NurbsCurve<T, DimNameSum<D, U1>>
    where
        D: DimNameAdd<U1>,
        DefaultAllocator: Allocator<DimNameSum<D, U1>>,
    {
        let one = T::one();
        let zero = T::zero();
        let weight = one / T::from_f64(2.0).unwrap().sqrt();

        let axis1 = &self.xaxis * self.xradius;
        let axis2 = &self.yaxis * self.yradius;

        // cos/sin at the quarter boundaries, exact
        let trig = |span: usize| match span % 4 {
            0 => (one, zero),
            1 => (zero, one),
            2 => (-one, zero),
            _ => (zero, -one),
        };

        let homogeneous = |spatial: OPoint<T, D>, w: T| {
            let mut coords: Vec<T> = spatial.coords.iter().map(|c| *c * w).collect();
            coords.push(w);
            OPoint::<T, DimNameSum<D, U1>>::from_slice(&coords)
        };

        let spans = 8;
        let mut control_points = Vec::with_capacity(spans * 2 + 1);
        for span in 0..spans {
            let (cos, sin) = trig(span);

            let mut corner = self.centre.clone();
            corner.coords += &axis1 * cos + &axis2 * sin;
            control_points.push(homogeneous(corner, one));

            let mut mid = self.centre.clone();
            mid.coords += &axis1 * (cos - sin) + &axis2 * (sin + cos);
            control_points.push(homogeneous(mid, weight));
        }
        let (cos, sin) = trig(spans);
        let mut last = self.centre.clone();
        last.coords += &axis1 * cos + &axis2 * sin;
        control_points.push(homogeneous(last, one));

        let two_pi = T::two_pi();
        let quarter = T::frac_pi_2();
        let mut knots = vec![-two_pi; 3];
        for span in 1..spans {
            let k = -two_pi + T::from_usize(span).unwrap() * quarter;
            knots.push(k);
            knots.push(k);
        }
        knots.extend(std::iter::repeat_n(two_pi, 3));

        NurbsCurve::new_unchecked(2, control_points, KnotVector::new(knots))
    }
}
