//! Second-order scalar models and their Part decomposition
//!
//! A model `∇u·A∇w + b·∇u w + c u w` is flattened into Parts: one additive
//! term each, carrying a test derivative, a trial derivative and a
//! per-quadrature-point scalar coefficient. The assembler below is
//! oblivious to the PDE; it only consumes Parts.

use std::collections::BTreeSet;
use std::ops::Range;

use log::debug;

use crate::algebra::{bilinear_sparsity, kronecker_sparsity, Mat, MMatrix, Sparsity, Vec64};
use crate::bases::{BasisValues, ComponentRequest, PartialDerivative, TensorBasis};
use crate::error::{IgaError, IgaResult};
use crate::geometry::{transform_coefs, GeoMap};
use crate::quadrature::TensorQuadrature;
use crate::tools::timing::{
    PhaseTimer, TIME_ASSEMBLE, TIME_COMPUTE_STRUCTURE, TIME_EVAL_BASES, TIME_EVAL_COEF,
};

use super::apply::{kronecker_apply, ApplyBuffers};
use super::recursive::{recursive_assemble, MAX_TMP};

/// One additive term of the bilinear form. `coefs` addresses a slice of the
/// coefficient buffer owned by the model for the duration of one assembly.
#[derive(Debug, Clone)]
pub struct Part {
    pub test: PartialDerivative,
    pub trial: PartialDerivative,
    pub coefs: Range<usize>,
}

/// Coefficients of a second-order scalar operator
#[derive(Debug, Clone)]
pub struct EqCoef {
    dim: usize,
    a: Option<Mat>,
    b: Option<Vec64>,
    c: f64,
}

impl EqCoef {
    pub fn new(
        dim: usize,
        a: Option<Mat>,
        b: Option<Vec64>,
        c: f64,
    ) -> IgaResult<Self> {
        if let Some(a) = &a {
            if a.shape() != (dim, dim) {
                return Err(IgaError::ShapeMismatch(format!(
                    "A is {}x{}, dimension is {}",
                    a.nrows(),
                    a.ncols(),
                    dim
                )));
            }
        }
        if let Some(b) = &b {
            if b.len() != dim {
                return Err(IgaError::ShapeMismatch(format!(
                    "b has {} entries, dimension is {}",
                    b.len(),
                    dim
                )));
            }
        }
        Ok(Self { dim, a, b, c })
    }

    /// Pure mass model `c · u w`
    pub fn mass(dim: usize, c: f64) -> Self {
        Self {
            dim,
            a: None,
            b: None,
            c,
        }
    }

    /// Laplace model `∇u · ∇w`
    pub fn laplace(dim: usize) -> Self {
        Self {
            dim,
            a: Some(Mat::identity(dim, dim)),
            b: None,
            c: 0.0,
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn a(&self) -> Option<&Mat> {
        self.a.as_ref()
    }

    pub fn b(&self) -> Option<&Vec64> {
        self.b.as_ref()
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn has_a(&self) -> bool {
        self.a.as_ref().map_or(false, |a| a.norm() != 0.0)
    }

    pub fn has_b(&self) -> bool {
        self.b.as_ref().map_or(false, |b| b.norm() != 0.0)
    }

    pub fn has_c(&self) -> bool {
        self.c != 0.0
    }
}

/// A second-order model, optionally composed with a geometry map
#[derive(Debug, Clone)]
pub struct SecondOrderModel {
    coefs: EqCoef,
    geo: Option<GeoMap>,
}

impl SecondOrderModel {
    pub fn new(coefs: EqCoef, geo: Option<GeoMap>) -> IgaResult<Self> {
        if let Some(geo) = &geo {
            if geo.domain_dim() != coefs.dim() {
                return Err(IgaError::ShapeMismatch(format!(
                    "geometry domain dimension {} vs coefficient dimension {}",
                    geo.domain_dim(),
                    coefs.dim()
                )));
            }
        }
        Ok(Self { coefs, geo })
    }

    pub fn coefs(&self) -> &EqCoef {
        &self.coefs
    }

    pub fn geometry(&self) -> Option<&GeoMap> {
        self.geo.as_ref()
    }

    /// Expand the model into Parts over the given quadrature grid. Returns
    /// the coefficient buffer and the Parts addressing into it.
    pub fn init_parts(&self, quad: &TensorQuadrature) -> IgaResult<(Vec<f64>, Vec<Part>)> {
        match &self.geo {
            Some(geo) => self.init_with_geo(geo, quad),
            None => Ok(self.init_no_geo(quad)),
        }
    }

    fn init_no_geo(&self, quad: &TensorQuadrature) -> (Vec<f64>, Vec<Part>) {
        let dim = self.coefs.dim();
        let n = quad.size();
        let mut data = Vec::new();
        let mut parts = Vec::new();

        let mut push = |data: &mut Vec<f64>, test, trial, value: f64| {
            let beg = data.len();
            data.extend(std::iter::repeat(value).take(n));
            parts.push(Part {
                test,
                trial,
                coefs: beg..beg + n,
            });
        };

        if self.coefs.has_a() {
            let a = self.coefs.a().unwrap();
            for i in 0..dim {
                for j in 0..dim {
                    if a[(i, j)] != 0.0 {
                        let mut test = PartialDerivative::zero();
                        test.set(i, 1);
                        let mut trial = PartialDerivative::zero();
                        trial.set(j, 1);
                        push(&mut data, test, trial, a[(i, j)]);
                    }
                }
            }
        }
        if self.coefs.has_b() {
            let b = self.coefs.b().unwrap();
            for i in 0..dim {
                if b[i] != 0.0 {
                    let mut trial = PartialDerivative::zero();
                    trial.set(i, 1);
                    push(&mut data, PartialDerivative::zero(), trial, b[i]);
                }
            }
        }
        if self.coefs.has_c() {
            push(
                &mut data,
                PartialDerivative::zero(),
                PartialDerivative::zero(),
                self.coefs.c(),
            );
        }
        (data, parts)
    }

    fn init_with_geo(
        &self,
        geo: &GeoMap,
        quad: &TensorQuadrature,
    ) -> IgaResult<(Vec<f64>, Vec<Part>)> {
        let dim = self.coefs.dim();
        let n = quad.size();

        let mut num_comp = 0;
        if self.coefs.has_a() {
            num_comp += dim * dim;
        }
        if self.coefs.has_b() {
            num_comp += dim;
        }
        if self.coefs.has_c() {
            num_comp += 1;
        }
        let mut data = vec![0.0; num_comp * n];
        let mut parts = Vec::with_capacity(num_comp);

        let mut next = 0;
        if self.coefs.has_a() {
            for i in 0..dim {
                for j in 0..dim {
                    let mut test = PartialDerivative::zero();
                    test.set(i, 1);
                    let mut trial = PartialDerivative::zero();
                    trial.set(j, 1);
                    parts.push(Part {
                        test,
                        trial,
                        coefs: next..next + n,
                    });
                    next += n;
                }
            }
        }
        let b_beg = next;
        if self.coefs.has_b() {
            for i in 0..dim {
                let mut trial = PartialDerivative::zero();
                trial.set(i, 1);
                parts.push(Part {
                    test: PartialDerivative::zero(),
                    trial,
                    coefs: next..next + n,
                });
                next += n;
            }
        }
        let c_beg = next;
        if self.coefs.has_c() {
            parts.push(Part {
                test: PartialDerivative::zero(),
                trial: PartialDerivative::zero(),
                coefs: next..next + n,
            });
        }

        let (a_slice, rest) = data.split_at_mut(b_beg);
        let (b_slice, c_slice) = rest.split_at_mut(c_beg - b_beg);
        transform_coefs(
            geo,
            &quad.grid(),
            if self.coefs.has_a() {
                self.coefs.a()
            } else {
                None
            },
            if self.coefs.has_b() {
                self.coefs.b()
            } else {
                None
            },
            if self.coefs.has_c() {
                Some(self.coefs.c())
            } else {
                None
            },
            a_slice,
            b_slice,
            c_slice,
        )?;
        Ok((data, parts))
    }

    /// Assemble the Galerkin matrix by global sum factorization
    pub fn assemble(
        &self,
        test: &TensorBasis,
        trial: &TensorBasis,
        quad: &TensorQuadrature,
    ) -> IgaResult<MMatrix> {
        let dim = quad.domain_dim();

        let (data, parts) = {
            let _t = PhaseTimer::new(&TIME_EVAL_COEF);
            self.init_parts(quad)?
        };

        let (tsts, trls) = {
            let _t = PhaseTimer::new(&TIME_EVAL_BASES);
            let mut tsts = test.evaluate_components(&test_request(dim, &parts), &quad.grid())?;
            let trls = trial.evaluate_components(&trial_request(dim, &parts), &quad.grid())?;
            quad.apply_to_values(&mut tsts);
            (tsts, trls)
        };

        let (eles, sprs, mut krns, mut mems, mut out) = {
            let _t = PhaseTimer::new(&TIME_COMPUTE_STRUCTURE);
            let eles = element_splitting(test, trial, quad);
            let sprs = bilinear_sparsities(&tsts, &trls);
            let krns = kronecker_sparsities(&sprs);
            let mems: Vec<Vec<Vec<f64>>> = (0..dim - 1)
                .map(|c| (0..MAX_TMP).map(|_| vec![0.0; krns[c].nnz()]).collect())
                .collect();
            let out = vec![0.0; krns[dim - 1].nnz()];
            (eles, sprs, krns, mems, out)
        };

        debug!(
            "assembling {} parts over {} quadrature points ({} nonzeros)",
            parts.len(),
            quad.size(),
            out.len()
        );
        {
            let _t = PhaseTimer::new(&TIME_ASSEMBLE);
            for part in &parts {
                recursive_assemble(
                    &tsts,
                    &trls,
                    part.test,
                    part.trial,
                    &data[part.coefs.clone()],
                    &mut out,
                    &sprs,
                    &krns,
                    &eles,
                    &mut mems,
                );
            }
        }
        Ok(MMatrix::from_parts(krns.pop().unwrap(), out))
    }

    /// Accumulate `out_v += M · in_v` without materializing `M`
    pub fn apply(
        &self,
        test: &TensorBasis,
        trial: &TensorBasis,
        quad: &TensorQuadrature,
        in_v: &[f64],
        out_v: &mut [f64],
    ) -> IgaResult<()> {
        let dim = quad.domain_dim();
        if in_v.len() != trial.size() || out_v.len() != test.size() {
            return Err(IgaError::ShapeMismatch(format!(
                "vector sizes {}/{} vs trial/test sizes {}/{}",
                in_v.len(),
                out_v.len(),
                trial.size(),
                test.size()
            )));
        }

        let (data, parts) = {
            let _t = PhaseTimer::new(&TIME_EVAL_COEF);
            self.init_parts(quad)?
        };

        let (tsts, trls) = {
            let _t = PhaseTimer::new(&TIME_EVAL_BASES);
            let mut tsts = test.evaluate_components(&test_request(dim, &parts), &quad.grid())?;
            let trls = trial.evaluate_components(&trial_request(dim, &parts), &quad.grid())?;
            quad.apply_to_values(&mut tsts);
            (tsts, trls)
        };

        let mut buffers = ApplyBuffers::default();
        for part in &parts {
            kronecker_apply(
                &tsts,
                &trls,
                part.test,
                part.trial,
                &data[part.coefs.clone()],
                in_v,
                out_v,
                &mut buffers,
            );
        }
        Ok(())
    }
}

/// Per-direction bilinear sparsities of a test/trial evaluation pair
pub fn bilinear_sparsities(tsts: &[BasisValues], trls: &[BasisValues]) -> Vec<Sparsity> {
    tsts.iter()
        .zip(trls)
        .map(|(t, r)| bilinear_sparsity(t.sparsity(), r.sparsity()))
        .collect()
}

/// Cumulative Kronecker sparsities: `K[0] = S[0]`,
/// `K[i] = kronecker(S[i], K[i-1])`
pub fn kronecker_sparsities(sprs: &[Sparsity]) -> Vec<Sparsity> {
    let mut krns = Vec::with_capacity(sprs.len());
    krns.push(sprs[0].clone());
    for s in &sprs[1..] {
        let prev = krns.last().unwrap();
        krns.push(kronecker_sparsity(s, prev));
    }
    krns
}

/// Cumulative end indices of the quadrature points per element, one list
/// per direction; elements are delimited by the union of test and trial
/// break points.
pub fn element_splitting(
    test: &TensorBasis,
    trial: &TensorBasis,
    quad: &TensorQuadrature,
) -> Vec<Vec<usize>> {
    let dim = test.domain_dim();
    let mut eles = Vec::with_capacity(dim);
    for i in 0..dim {
        let nodes = quad.component(i).nodes();
        let brk_t = test.component(i).breaks();
        let brk_r = trial.component(i).breaks();
        let mut it = 1;
        let mut ir = 1;
        let mut pt = 0;
        let mut splits = Vec::new();
        while it < brk_t.len() && ir < brk_r.len() {
            while pt < nodes.len() && nodes[pt] < brk_t[it] && nodes[pt] < brk_r[ir] {
                pt += 1;
            }
            splits.push(pt);
            if pt == nodes.len() {
                break;
            }
            while it < brk_t.len() && nodes[pt] >= brk_t[it] {
                it += 1;
            }
            while ir < brk_r.len() && nodes[pt] >= brk_r[ir] {
                ir += 1;
            }
        }
        eles.push(splits);
    }
    eles
}

fn request_for(
    dim: usize,
    parts: &[Part],
    pick: impl Fn(&Part) -> PartialDerivative,
) -> ComponentRequest {
    (0..dim)
        .map(|c| {
            let set: BTreeSet<PartialDerivative> =
                parts.iter().map(|p| pick(p).component(c)).collect();
            set.into_iter().collect()
        })
        .collect()
}

/// De-duplicated per-direction test derivative orders of a Part list
pub fn test_request(dim: usize, parts: &[Part]) -> ComponentRequest {
    request_for(dim, parts, |p| p.test)
}

/// De-duplicated per-direction trial derivative orders of a Part list
pub fn trial_request(dim: usize, parts: &[Part]) -> ComponentRequest {
    request_for(dim, parts, |p| p.trial)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bases::Bspline;
    use crate::quadrature::recommended_quadrature;
    use approx::assert_relative_eq;

    fn interval_basis(elements: usize) -> TensorBasis {
        let mut knots = vec![0.0, 0.0];
        for i in 1..elements {
            knots.push(i as f64 / elements as f64);
        }
        knots.push(1.0);
        knots.push(1.0);
        TensorBasis::new(vec![Bspline::new(1, knots).unwrap()]).unwrap()
    }

    #[test]
    fn part_decomposition_without_geometry() {
        let eq = EqCoef::new(
            2,
            Some(Mat::identity(2, 2)),
            Some(Vec64::from_vec(vec![1.0, 0.0])),
            3.0,
        )
        .unwrap();
        let model = SecondOrderModel::new(eq, None).unwrap();
        let b = interval_basis(2);
        let basis = TensorBasis::new(vec![
            b.component(0).clone(),
            b.component(0).clone(),
        ])
        .unwrap();
        let quad = recommended_quadrature(&basis, &basis);
        let (data, parts) = model.init_parts(&quad).unwrap();
        // 2 diagonal A entries + 1 convection entry + mass
        assert_eq!(parts.len(), 4);
        assert_eq!(data.len(), 4 * quad.size());
        assert_relative_eq!(data[parts[3].coefs.start], 3.0);
    }

    #[test]
    fn derivative_requests_are_deduplicated() {
        let eq = EqCoef::laplace(2);
        let model = SecondOrderModel::new(eq, None).unwrap();
        let b = interval_basis(1);
        let basis = TensorBasis::new(vec![
            b.component(0).clone(),
            b.component(0).clone(),
        ])
        .unwrap();
        let quad = recommended_quadrature(&basis, &basis);
        let (_, parts) = model.init_parts(&quad).unwrap();
        let req = test_request(2, &parts);
        // orders {0, 1} in each direction
        assert_eq!(req[0].len(), 2);
        assert_eq!(req[1].len(), 2);
    }

    #[test]
    fn element_splitting_tracks_merged_breaks() {
        let test = interval_basis(2);
        let trial = interval_basis(4);
        let quad = recommended_quadrature(&test, &trial);
        let eles = element_splitting(&test, &trial, &quad);
        // four merged elements, two gauss points each
        assert_eq!(eles[0], vec![2, 4, 6, 8]);
    }

    #[test]
    fn interval_stiffness_reference() {
        // S1: degree 1, two elements, A = 1
        let eq = EqCoef::new(1, Some(Mat::identity(1, 1)), None, 0.0).unwrap();
        let model = SecondOrderModel::new(eq, None).unwrap();
        let basis = interval_basis(2);
        let quad = recommended_quadrature(&basis, &basis);
        let m = model.assemble(&basis, &basis, &quad).unwrap().to_dense();
        let expect = [[2.0, -2.0, 0.0], [-2.0, 4.0, -2.0], [0.0, -2.0, 2.0]];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(m[(i, j)], expect[i][j], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn interval_mass_reference() {
        // S2: degree 1, two elements, c = 1
        let model = SecondOrderModel::new(EqCoef::mass(1, 1.0), None).unwrap();
        let basis = interval_basis(2);
        let quad = recommended_quadrature(&basis, &basis);
        let m = model.assemble(&basis, &basis, &quad).unwrap().to_dense();
        let expect = [
            [1.0 / 6.0, 1.0 / 12.0, 0.0],
            [1.0 / 12.0, 1.0 / 3.0, 1.0 / 12.0],
            [0.0, 1.0 / 12.0, 1.0 / 6.0],
        ];
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(m[(i, j)], expect[i][j], epsilon = 1e-12);
            }
        }
    }
}
