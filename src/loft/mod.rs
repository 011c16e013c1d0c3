pub mod loft_parameters;
pub mod loft_surface;
pub mod unify_curves;

pub use loft_parameters::*;
pub use loft_surface::*;
pub use unify_curves::*;

#[cfg(test)]
mod tests;
