//! End-to-end: decode a problem, assemble, write and re-read the matrix

use approx::assert_relative_eq;

use iga_assembler::algebra::frobenius_distance;
use iga_assembler::io::matrixio::{read_matrix, write_matrix, MatrixData};
use iga_assembler::io::{Problem, ProblemDef};
use iga_assembler::prelude::*;

const STIFFNESS_PROBLEM: &str = r#"{
    "test":  {"type": "TensorBasis", "components": [
        {"type": "Bspline", "degree": 1, "knots": [0.0, 0.0, 0.5, 1.0, 1.0]}]},
    "trial": {"type": "TensorBasis", "components": [
        {"type": "Bspline", "degree": 1, "knots": [0.0, 0.0, 0.5, 1.0, 1.0]}]},
    "geometry": {"type": "BasisCoefficientMap",
        "basis": {"type": "TensorBasis", "components": [
            {"type": "Bspline", "degree": 1, "knots": [0.0, 0.0, 1.0, 1.0]}]},
        "coefs": {"type": "matrix", "rows": 1, "cols": 2, "coefs": [0.0, 1.0]}},
    "EqCoefs": {"dim": 1, "A": {"type": "matrix", "rows": 1, "cols": 1, "coefs": [1.0]}}
}"#;

#[test]
fn decoded_problem_assembles_the_reference_stiffness() {
    let problem = Problem::from_json(STIFFNESS_PROBLEM).unwrap();
    let model = SecondOrderModel::new(problem.eq.clone(), problem.geometry.clone()).unwrap();
    let quad = recommended_quadrature(&problem.test, &problem.trial);
    let m = model
        .assemble(&problem.test, &problem.trial, &quad)
        .unwrap()
        .to_dense();

    let expect = [[2.0, -2.0, 0.0], [-2.0, 4.0, -2.0], [0.0, -2.0, 2.0]];
    for i in 0..3 {
        for j in 0..3 {
            assert_relative_eq!(m[(i, j)], expect[i][j], epsilon = 1e-12);
        }
    }
}

#[test]
fn assembled_matrix_survives_the_file_format() {
    let problem = Problem::from_json(STIFFNESS_PROBLEM).unwrap();
    let model = SecondOrderModel::new(problem.eq.clone(), problem.geometry.clone()).unwrap();
    let quad = recommended_quadrature(&problem.test, &problem.trial);
    let m = model.assemble(&problem.test, &problem.trial, &quad).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stiffness.bin");
    let name = path.to_str().unwrap();

    let data = MatrixData::from(&m);
    write_matrix(&data, name).unwrap();
    let back = read_matrix(name).unwrap();

    assert_eq!(back.rows, m.rows());
    assert_eq!(back.cols, m.cols());
    assert_relative_eq!(
        frobenius_distance(&m.to_csr(), &back.to_csr()),
        0.0,
        epsilon = 0.0
    );
    for (a, b) in data.values.iter().zip(&back.values) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn problem_json_round_trip_preserves_the_definition() {
    let def: ProblemDef = serde_json::from_str(STIFFNESS_PROBLEM).unwrap();
    let encoded = serde_json::to_string_pretty(&def).unwrap();
    let back: ProblemDef = serde_json::from_str(&encoded).unwrap();
    assert_eq!(def, back);
}

#[test]
fn missing_coefficients_default_to_mass() {
    let text = r#"{
        "test":  {"type": "Bspline", "degree": 1, "knots": [0.0, 0.0, 1.0, 1.0]},
        "trial": {"type": "Bspline", "degree": 1, "knots": [0.0, 0.0, 1.0, 1.0]}
    }"#;
    let problem = Problem::from_json(text).unwrap();
    assert!(problem.eq.has_c());
    assert!(!problem.eq.has_a());

    let model = SecondOrderModel::new(problem.eq.clone(), None).unwrap();
    let quad = recommended_quadrature(&problem.test, &problem.trial);
    let m = model
        .assemble(&problem.test, &problem.trial, &quad)
        .unwrap()
        .to_dense();
    // one linear element: mass matrix [[1/3, 1/6], [1/6, 1/3]]
    assert_relative_eq!(m[(0, 0)], 1.0 / 3.0, epsilon = 1e-12);
    assert_relative_eq!(m[(0, 1)], 1.0 / 6.0, epsilon = 1e-12);
}

#[test]
fn malformed_problems_are_rejected() {
    assert!(Problem::from_json("not json").is_err());
    let wrong_tag = r#"{
        "test":  {"type": "Chebyshev", "degree": 1, "knots": []},
        "trial": {"type": "Bspline", "degree": 1, "knots": [0.0, 0.0, 1.0, 1.0]}
    }"#;
    assert!(Problem::from_json(wrong_tag).is_err());
    let dim_mismatch = r#"{
        "test":  {"type": "Bspline", "degree": 1, "knots": [0.0, 0.0, 1.0, 1.0]},
        "trial": {"type": "Bspline", "degree": 1, "knots": [0.0, 0.0, 1.0, 1.0]},
        "EqCoefs": {"dim": 2, "C": 1.0}
    }"#;
    assert!(Problem::from_json(dim_mismatch).is_err());
}
