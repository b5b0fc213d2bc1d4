//! Benchmarks for sum-factorization assembly

use criterion::{black_box, criterion_group, criterion_main, Criterion};
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

fn cube_basis(degree: usize, elements: usize) -> TensorBasis {
    TensorBasis::new(vec![
        uniform_bspline(degree, elements),
        uniform_bspline(degree, elements),
        uniform_bspline(degree, elements),
    ])
    .unwrap()
}

fn benchmark_global_2d(c: &mut Criterion) {
    let basis = square_basis(2, 16);
    let model = SecondOrderModel::new(EqCoef::laplace(2), None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    c.bench_function("laplace_2d_deg2_16x16_global", |b| {
        b.iter(|| {
            let m = model.assemble(&basis, &basis, &quad).unwrap();
            black_box(&m);
        })
    });
}

fn benchmark_global_3d(c: &mut Criterion) {
    let basis = cube_basis(2, 6);
    let model = SecondOrderModel::new(EqCoef::laplace(3), None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    c.bench_function("laplace_3d_deg2_6x6x6_global", |b| {
        b.iter(|| {
            let m = model.assemble(&basis, &basis, &quad).unwrap();
            black_box(&m);
        })
    });
}

fn benchmark_macro_2d(c: &mut Criterion) {
    let basis = square_basis(2, 16);
    let model = SecondOrderModel::new(EqCoef::laplace(2), None).unwrap();
    c.bench_function("laplace_2d_deg2_16x16_macro4", |b| {
        b.iter(|| {
            let m = assemble_parallel(&model, &basis, &basis, 4, &[]).unwrap();
            black_box(&m);
        })
    });
}

fn benchmark_apply_2d(c: &mut Criterion) {
    let basis = square_basis(2, 16);
    let model = SecondOrderModel::new(EqCoef::laplace(2), None).unwrap();
    let quad = recommended_quadrature(&basis, &basis);
    let v: Vec<f64> = (0..basis.size()).map(|i| (i as f64 * 0.1).sin()).collect();
    c.bench_function("laplace_2d_deg2_16x16_apply", |b| {
        b.iter(|| {
            let mut u = vec![0.0; basis.size()];
            model.apply(&basis, &basis, &quad, &v, &mut u).unwrap();
            black_box(&u);
        })
    });
}

criterion_group!(
    benches,
    benchmark_global_2d,
    benchmark_global_3d,
    benchmark_macro_2d,
    benchmark_apply_2d
);
criterion_main!(benches);
