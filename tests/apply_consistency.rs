//! Matrix-free application against the assembled matrix

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};

use iga_assembler::algebra::Mat;
use iga_assembler::prelude::*;

fn uniform_bspline(degree: usize, elements: usize) -> Bspline {
    let mut knots = vec![0.0; degree + 1];
    for i in 1..elements {
        knots.push(i as f64 / elements as f64);
    }
    knots.extend(std::iter::repeat(1.0).take(degree + 1));
    Bspline::new(degree, knots).unwrap()
}

fn square_basis(degree: usize, elements: usize) -> TensorBasis {
    TensorBasis::new(vec![
        uniform_bspline(degree, elements),
        uniform_bspline(degree, elements),
    ])
    .unwrap()
}

/// deterministic pseudo-random vector
fn test_vector(n: usize) -> Vec<f64> {
    (0..n).map(|i| (0.7 * i as f64 + 0.3).sin()).collect()
}

fn check_apply_matches(model: &SecondOrderModel, test: &TensorBasis, trial: &TensorBasis) {
    let quad = recommended_quadrature(test, trial);
    let m = model.assemble(test, trial, &quad).unwrap();
    let dense: DMatrix<f64> = m.to_dense();

    let v = test_vector(trial.size());
    let mut u = vec![0.0; test.size()];
    model.apply(test, trial, &quad, &v, &mut u).unwrap();

    let expected = &dense * DVector::from_vec(v);
    let diff: f64 = u
        .iter()
        .zip(expected.iter())
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt();
    assert_relative_eq!(diff, 0.0, epsilon = 1e-9);
}

#[test]
fn laplacian_apply_matches_assembled_matrix() {
    let basis = square_basis(2, 4);
    let model = SecondOrderModel::new(EqCoef::laplace(2), None).unwrap();
    check_apply_matches(&model, &basis, &basis);
}

#[test]
fn full_second_order_apply_matches() {
    let a = Mat::from_row_slice(2, 2, &[1.0, 0.25, 0.25, 2.0]);
    let b = DVector::from_vec(vec![1.0, -0.5]);
    let eq = EqCoef::new(2, Some(a), Some(b), 0.75).unwrap();
    let basis = square_basis(2, 3);
    let model = SecondOrderModel::new(eq, None).unwrap();
    check_apply_matches(&model, &basis, &basis);
}

#[test]
fn apply_supports_different_test_and_trial_spaces() {
    let test = square_basis(2, 2);
    let trial = square_basis(1, 4);
    let model = SecondOrderModel::new(EqCoef::mass(2, 1.0), None).unwrap();
    check_apply_matches(&model, &test, &trial);
}

#[test]
fn apply_with_geometry_matches() {
    let geo_basis = TensorBasis::new(vec![uniform_bspline(1, 1), uniform_bspline(1, 1)]).unwrap();
    // sheared square: (ξ, η) -> (ξ + 0.5 η, η)
    let coefs = Mat::from_column_slice(2, 4, &[0.0, 0.0, 1.0, 0.0, 0.5, 1.0, 1.5, 1.0]);
    let geo = GeoMap::BasisCoefficient(BasisCoefficientMap::new(geo_basis, coefs).unwrap());
    let model = SecondOrderModel::new(EqCoef::laplace(2), Some(geo)).unwrap();
    let basis = square_basis(2, 2);
    check_apply_matches(&model, &basis, &basis);
}

#[test]
fn apply_rejects_wrong_vector_sizes() {
    let basis = square_basis(1, 2);
    let model = SecondOrderModel::new(EqCoef::mass(2, 1.0), None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    let v = vec![0.0; basis.size() + 1];
    let mut u = vec![0.0; basis.size()];
    assert!(model.apply(&basis, &basis, &quad, &v, &mut u).is_err());
}
