//! File and JSON boundaries

pub mod matrixio;
pub mod problem;

pub use matrixio::{read_matrix, write_matrix, MatrixData};
pub use problem::{
    BasisDef, EqCoefsDef, GeoMapDef, MatrixDef, Problem, ProblemDef, QuadratureDef,
    SparseMatrixDef,
};
