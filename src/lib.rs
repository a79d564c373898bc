#![allow(clippy::needless_range_loop)]

mod bezier;
mod curve;
mod error;
mod knot;
mod misc;
mod polyline;
mod surface;

pub mod prelude {
    pub use crate::bezier::*;
    pub use crate::curve::*;
    pub use crate::error::*;
    pub use crate::knot::*;
    pub use crate::misc::*;
    pub use crate::polyline::*;
    pub use crate::surface::*;
}
