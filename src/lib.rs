//! iga-assembler - Galerkin matrix assembly for tensor-product B-spline
//! spaces
//!
//! This library assembles stiffness/mass/convection matrices for
//! second-order scalar PDEs discretized by isogeometric (B-spline) spaces,
//! using sum factorization to contract the tensor-product quadrature grid
//! one direction at a time:
//! - Univariate B-spline evaluation with active-function tracking
//! - CSR sparsity algebra (bilinear and Kronecker composition)
//! - A recursive n-D assembler with an optimized 1-D kernel
//! - Matrix-free operator application over the same evaluations
//! - Geometry maps (B-spline and NURBS) with coefficient push-forward
//! - Macro-element parallel assembly under a 2^D coloring
//!
//! ## Example
//! ```rust
//! use iga_assembler::prelude::*;
//!
//! // degree-1 space with two elements on the unit interval
//! let spline = Bspline::new(1, vec![0.0, 0.0, 0.5, 1.0, 1.0]).unwrap();
//! let basis = TensorBasis::new(vec![spline]).unwrap();
//!
//! // assemble the mass matrix
//! let model = SecondOrderModel::new(EqCoef::mass(1, 1.0), None).unwrap();
//! let quad = recommended_quadrature(&basis, &basis);
//! let mass = model.assemble(&basis, &basis, &quad).unwrap();
//! assert_eq!(mass.rows(), 3);
//! ```

pub mod algebra;
pub mod assemble;
pub mod bases;
pub mod error;
pub mod geometry;
pub mod grid;
pub mod io;
pub mod quadrature;
pub mod tools;

// Re-export common types
pub mod prelude {
    pub use crate::algebra::{
        bilinear_sparsity, frobenius_distance, kronecker_sparsity, MMatrix, Sparsity,
    };
    pub use crate::assemble::{assemble_parallel, EqCoef, Part, SecondOrderModel};
    pub use crate::bases::{Bspline, PartialDerivative, TensorBasis};
    pub use crate::error::{IgaError, IgaResult};
    pub use crate::geometry::{BasisCoefficientMap, GeoMap, RationalMap};
    pub use crate::grid::CartesianGrid;
    pub use crate::io::{Problem, ProblemDef};
    pub use crate::quadrature::{
        gauss, recommended_quadrature, ElementQuadrature, QuadTemplate, TensorQuadrature,
    };
}
