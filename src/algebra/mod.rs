//! Matrix primitives shared by the whole crate

pub mod kronecker;
pub mod mmatrix;
pub mod sparsity;

use nalgebra::{DMatrix, DVector};

pub use kronecker::{apply_right, apply_right_all, ApplyWork, RightOperand};
pub use mmatrix::{frobenius_distance, MMatrix};
pub use sparsity::{bilinear_sparsity, kronecker_sparsity, Sparsity};

pub type Mat = DMatrix<f64>;
pub type Vec64 = DVector<f64>;
