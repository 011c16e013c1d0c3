pub mod closest_parameter_newton;
pub mod closest_parameter_problem;
pub mod closest_point;

pub use closest_parameter_newton::*;
pub use closest_parameter_problem::*;
pub use closest_point::*;
