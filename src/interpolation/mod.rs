pub mod parameter_interpolation;

pub use parameter_interpolation::*;
