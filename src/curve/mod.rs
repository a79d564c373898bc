pub mod approximation;
pub mod curve_length_parameter;
pub mod nurbs_curve;
pub use approximation::*;
pub use curve_length_parameter::*;
pub use nurbs_curve::*;

#[cfg(test)]
mod tests;
