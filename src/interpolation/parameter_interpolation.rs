use nalgebra::{DMatrix, DVector, Dyn, LU};

use crate::knot::KnotVector;
use crate::misc::FloatingPoint;

/// Global B-spline interpolation through points at prescribed, strictly
/// increasing parameters.
///
/// The knot vector is built by parameter averaging, the collocation matrix
/// is factorized once and reused for every solve, so a whole family of
/// control-point rows can be interpolated against the same basis.
pub struct ParameterInterpolation<T: FloatingPoint> {
    knots: KnotVector<T>,
    lu: LU<T, Dyn, Dyn>,
    size: usize,
}

impl<T: FloatingPoint> ParameterInterpolation<T> {
    pub fn try_new(parameters: &[T], degree: usize) -> anyhow::Result<Self> {
        let n = parameters.len();
        anyhow::ensure!(n > degree, "Too few interpolation points for degree");
        anyhow::ensure!(
            parameters.windows(2).all(|w| w[0] < w[1]),
            "Interpolation parameters must be strictly increasing"
        );

        let knots = KnotVector::averaged(parameters, degree);
        let span_n = knots.len() - degree - 2;

        let mut matrix = DMatrix::<T>::zeros(n, n);
        for (i, u) in parameters.iter().enumerate() {
            let span = knots.find_knot_span_index(span_n, degree, *u);
            let basis = knots.basis_functions(span, *u, degree);
            for (k, b) in basis.iter().enumerate() {
                matrix[(i, span - degree + k)] = *b;
            }
        }

        Ok(Self {
            knots,
            lu: matrix.lu(),
            size: n,
        })
    }

    pub fn knots(&self) -> &KnotVector<T> {
        &self.knots
    }

    /// Solve for the control points interpolating the given points, one
    /// linear solve per coordinate against the shared factorization.
    pub fn try_solve(&self, points: &[DVector<T>]) -> anyhow::Result<Vec<DVector<T>>> {
        anyhow::ensure!(
            points.len() == self.size,
            "Expected {} interpolation points, got {}",
            self.size,
            points.len()
        );
        let dim = points[0].len();

        let mut solved = DMatrix::<T>::zeros(self.size, dim);
        for i in 0..dim {
            let b = DVector::from_iterator(self.size, points.iter().map(|p| p[i]));
            let xs = self
                .lu
                .solve(&b)
                .ok_or(anyhow::anyhow!("Interpolation solve failed"))?;
            for j in 0..self.size {
                solved[(j, i)] = xs[j];
            }
        }

        let mut control_points = vec![];
        for i in 0..self.size {
            let coords: Vec<_> = (0..dim).map(|j| solved[(i, j)]).collect();
            control_points.push(DVector::from_vec(coords));
        }

        Ok(control_points)
    }
}
