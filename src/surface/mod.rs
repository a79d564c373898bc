pub mod nurbs_surface;
pub use nurbs_surface::*;

/// A parametric direction on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceDirection {
    U,
    V,
}
