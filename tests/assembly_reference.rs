//! Reference checks of assembled matrices against tensor-product identities

use approx::assert_relative_eq;
use nalgebra::{DMatrix, DVector};

use iga_assembler::algebra::Mat;
use iga_assembler::io::problem::GeoMapDef;
use iga_assembler::prelude::*;

fn uniform_bspline(degree: usize, elements: usize) -> Bspline {
    let mut knots = vec![0.0; degree + 1];
    for i in 1..elements {
        knots.push(i as f64 / elements as f64);
    }
    knots.extend(std::iter::repeat(1.0).take(degree + 1));
    Bspline::new(degree, knots).unwrap()
}

fn interval_basis(degree: usize, elements: usize) -> TensorBasis {
    TensorBasis::new(vec![uniform_bspline(degree, elements)]).unwrap()
}

fn square_basis(degree: usize, elements: usize) -> TensorBasis {
    TensorBasis::new(vec![
        uniform_bspline(degree, elements),
        uniform_bspline(degree, elements),
    ])
    .unwrap()
}

fn assemble_1d_matrix(degree: usize, elements: usize, eq: EqCoef) -> DMatrix<f64> {
    let basis = interval_basis(degree, elements);
    let model = SecondOrderModel::new(eq, None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    model.assemble(&basis, &basis, &quad).unwrap().to_dense()
}

#[test]
fn unit_square_laplacian_is_a_kronecker_sum() {
    // 2-D Laplacian vs S ⊗ M + M ⊗ S of the 1-D factors
    let degree = 2;
    let basis = square_basis(degree, 1);
    let model = SecondOrderModel::new(EqCoef::laplace(2), None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    let assembled = model.assemble(&basis, &basis, &quad).unwrap().to_dense();

    let stiff = assemble_1d_matrix(degree, 1, EqCoef::laplace(1));
    let mass = assemble_1d_matrix(degree, 1, EqCoef::mass(1, 1.0));

    // direction 0 varies fastest: the slow factor comes first in kronecker
    let expected = mass.kronecker(&stiff) + stiff.kronecker(&mass);
    assert_relative_eq!((assembled - expected).norm(), 0.0, epsilon = 1e-10);
}

#[test]
fn mass_matrix_is_a_kronecker_power_in_3d() {
    let degree = 1;
    let elements = 2;
    let basis = TensorBasis::new(vec![
        uniform_bspline(degree, elements),
        uniform_bspline(degree, elements),
        uniform_bspline(degree, elements),
    ])
    .unwrap();
    let model = SecondOrderModel::new(EqCoef::mass(3, 1.0), None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    let assembled = model.assemble(&basis, &basis, &quad).unwrap().to_dense();

    let m1 = assemble_1d_matrix(degree, elements, EqCoef::mass(1, 1.0));
    let expected = m1.kronecker(&m1).kronecker(&m1);
    assert_relative_eq!((assembled - expected).norm(), 0.0, epsilon = 1e-10);
}

#[test]
fn affine_geometry_scales_the_mass_matrix() {
    // x = 2ξ doubles every mass entry through the Jacobian determinant
    let basis = interval_basis(1, 2);
    let quad = recommended_quadrature(&basis, &basis);

    let identity = SecondOrderModel::new(EqCoef::mass(1, 1.0), None).unwrap();
    let reference = identity.assemble(&basis, &basis, &quad).unwrap().to_dense();

    let geo_basis = TensorBasis::new(vec![uniform_bspline(1, 1)]).unwrap();
    let coefs = Mat::from_column_slice(1, 2, &[0.0, 2.0]);
    let geo = GeoMap::BasisCoefficient(BasisCoefficientMap::new(geo_basis, coefs).unwrap());
    let stretched = SecondOrderModel::new(EqCoef::mass(1, 1.0), Some(geo)).unwrap();
    let scaled = stretched.assemble(&basis, &basis, &quad).unwrap().to_dense();

    assert_relative_eq!((scaled - 2.0 * reference).norm(), 0.0, epsilon = 1e-10);
}

#[test]
fn symmetric_coefficients_give_a_symmetric_matrix() {
    let a = Mat::from_row_slice(2, 2, &[2.0, 0.5, 0.5, 1.0]);
    let eq = EqCoef::new(2, Some(a), None, 1.0).unwrap();
    let basis = square_basis(2, 2);
    let model = SecondOrderModel::new(eq, None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    let m = model.assemble(&basis, &basis, &quad).unwrap().to_dense();
    assert_relative_eq!((m.clone() - m.transpose()).norm(), 0.0, epsilon = 1e-10);
}

#[test]
fn convection_term_produces_gradient_moments() {
    // pure convection with b = 1 on the unit interval: row sums of M are
    // ∫ w Σ φ' = 0, and the total sum telescopes to zero
    let eq = EqCoef::new(1, None, Some(DVector::from_vec(vec![1.0])), 0.0).unwrap();
    let basis = interval_basis(2, 3);
    let model = SecondOrderModel::new(eq, None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    let m = model.assemble(&basis, &basis, &quad).unwrap().to_dense();
    for r in 0..m.nrows() {
        let row_sum: f64 = (0..m.ncols()).map(|c| m[(r, c)]).sum();
        // ∫ φ_r · (Σ_c φ_c)' = ∫ φ_r · 0
        assert_relative_eq!(row_sum, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn quarter_ring_mass_integrates_the_area() {
    // the sum over all mass entries is ∫ 1 dx over the quarter annulus
    let text = std::fs::read_to_string(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/geometries.json"
    ))
    .unwrap();
    let table: serde_json::Value = serde_json::from_str(&text).unwrap();
    let def: GeoMapDef = serde_json::from_value(table["ring"].clone()).unwrap();
    let geo = def.to_map().unwrap();

    let basis = TensorBasis::new(vec![uniform_bspline(2, 2), uniform_bspline(2, 2)]).unwrap();
    let model = SecondOrderModel::new(EqCoef::mass(2, 1.0), Some(geo)).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    let m = model.assemble(&basis, &basis, &quad).unwrap();

    let total: f64 = m.values().iter().sum();
    let area = std::f64::consts::FRAC_PI_4 * 3.0;
    assert_relative_eq!(total, area, epsilon = 5e-4);
}
