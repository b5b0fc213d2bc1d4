//! B-spline bases and their evaluation tables

pub mod bspline;
pub mod derivative;
pub mod tensor;
pub mod values;

pub use bspline::Bspline;
pub use derivative::{gradient, PartialDerivative};
pub use tensor::{ComponentRequest, TensorBasis};
pub use values::{BasisOperand, BasisValues};
