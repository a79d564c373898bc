pub mod binomial;
pub mod curvature;
pub mod floating_point;
pub mod frenet_frame;
pub mod trigonometry;

pub use binomial::*;
pub use curvature::*;
pub use floating_point::*;
pub use frenet_frame::*;
pub use trigonometry::*;
