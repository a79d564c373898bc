pub mod poly_line;
pub use poly_line::*;
