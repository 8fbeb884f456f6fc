pub mod errors;
mod vector_math;

pub use errors::*;
pub use vector_math::*;
