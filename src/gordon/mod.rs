pub mod gordon_surface;
pub use gordon_surface::*;

#[cfg(test)]
mod tests;
