//! Sum-factorization assembly of Galerkin matrices

pub mod apply;
pub mod macroelement;
pub mod recursive;
pub mod second_order;

pub use apply::{kronecker_apply, ApplyBuffers};
pub use macroelement::assemble_parallel;
pub use recursive::{assemble_1d, recursive_assemble, MAX_TMP};
pub use second_order::{
    bilinear_sparsities, element_splitting, kronecker_sparsities, EqCoef, Part, SecondOrderModel,
};
