use argmin::{argmin_error_closure, core::*, float};
use argmin_math::ArgminScaledSub;

/// Newton's method constrained to a knot domain, used to refine the
/// closest parameter on a NURBS curve.
#[derive(Clone, Copy)]
pub struct ClosestParameterNewton<F, P> {
    /// step size
    gamma: F,
    /// domain of the parameter
    knot_domain: (P, P),
    /// the target curve is closed or not
    closed: bool,
    /// step size below which the iteration is considered converged
    step_size_tolerance: F,
}

impl<F, P> ClosestParameterNewton<F, P>
where
    F: ArgminFloat,
    P: Clone + ArgminScaledSub<P, F, P>,
{
    pub fn new(domain: (P, P), closed: bool) -> Self {
        ClosestParameterNewton {
            gamma: float!(1.0),
            knot_domain: domain,
            closed,
            step_size_tolerance: F::epsilon(),
        }
    }

    pub fn with_step_size_tolerance(mut self, tolerance: F) -> Self {
        self.step_size_tolerance = tolerance;
        self
    }
}

impl<O, F> Solver<O, IterState<F, F, (), F, (), F>> for ClosestParameterNewton<F, F>
where
    O: Gradient<Param = F, Gradient = F> + Hessian<Param = F, Hessian = F>,
    F: Clone + ArgminScaledSub<F, F, F> + ArgminFloat,
{
    const NAME: &'static str = "Closest parameter newton method";

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: IterState<F, F, (), F, (), F>,
    ) -> Result<(IterState<F, F, (), F, (), F>, Option<KV>), Error> {
        let param = state.get_param().ok_or_else(argmin_error_closure!(
            NotInitialized,
            "`ClosestParameterNewton` requires an initial parameter vector."
        ))?;

        let grad = problem.gradient(param)?;
        let hessian = problem.hessian(param)?;
        let inv = F::one() / hessian;
        let new_param = param.scaled_sub(&self.gamma, &(inv * grad));

        // Constrain the parameter to the domain; a closed curve wraps
        // around instead of clamping.
        let new_param = if new_param < self.knot_domain.0 {
            if self.closed {
                self.knot_domain.1 - (new_param - self.knot_domain.0)
            } else {
                self.knot_domain.0
            }
        } else if new_param > self.knot_domain.1 {
            if self.closed {
                self.knot_domain.0 + (new_param - self.knot_domain.1)
            } else {
                self.knot_domain.1
            }
        } else {
            new_param
        };

        Ok((state.param(new_param), None))
    }

    fn terminate(&mut self, state: &IterState<F, F, (), F, (), F>) -> TerminationStatus {
        if state.iter > state.max_iters {
            return TerminationStatus::Terminated(TerminationReason::MaxItersReached);
        }

        match (state.get_param(), state.get_prev_param()) {
            (Some(current_param), Some(prev_param)) => {
                let delta = (*current_param - *prev_param).abs();
                if delta < self.step_size_tolerance {
                    TerminationStatus::Terminated(TerminationReason::SolverConverged)
                } else {
                    TerminationStatus::NotTerminated
                }
            }
            _ => TerminationStatus::NotTerminated,
        }
    }
}
