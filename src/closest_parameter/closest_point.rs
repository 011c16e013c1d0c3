use crate::misc::FloatingPoint;

/// Result of a closest-point query: the parameter of a local distance
/// minimum, the point evaluated there and the residual distance.
///
/// A query that stops at the iteration cap is not an error; the best
/// iterate is reported and the caller applies its own tolerance to
/// `distance`.
#[derive(Clone, Debug)]
pub struct ClosestPoint<T, P> {
    parameter: T,
    point: P,
    distance: T,
}

impl<T: FloatingPoint, P> ClosestPoint<T, P> {
    pub fn new(parameter: T, point: P, distance: T) -> Self {
        Self {
            parameter,
            point,
            distance,
        }
    }

    pub fn parameter(&self) -> T {
        self.parameter
    }

    pub fn point(&self) -> &P {
        &self.point
    }

    pub fn distance(&self) -> T {
        self.distance
    }
}

/// Configuration of the iterative closest-point refinement.
/// Tolerance and iteration cap are configuration, not part of the
/// solver contract.
#[derive(Clone, Copy, Debug)]
pub struct ClosestPointOptions<T> {
    pub max_iters: u64,
    pub step_size_tolerance: T,
}

impl<T: FloatingPoint> Default for ClosestPointOptions<T> {
    fn default() -> Self {
        Self {
            max_iters: 16,
            step_size_tolerance: T::from_f64(1e-13).unwrap(),
        }
    }
}
