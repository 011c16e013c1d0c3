#![allow(clippy::needless_range_loop)]

mod closest_parameter;
mod conic;
mod curve;
mod gordon;
mod interpolation;
mod knot;
mod loft;
mod misc;
mod surface;

pub mod prelude {
    pub use crate::closest_parameter::*;
    pub use crate::conic::*;
    pub use crate::curve::*;
    pub use crate::gordon::*;
    pub use crate::knot::*;
    pub use crate::loft::*;
    pub use crate::misc::*;
    pub use crate::surface::*;
}
