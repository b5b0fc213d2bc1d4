//! Evaluated basis data at a batch of quadrature points

use crate::algebra::{RightOperand, Sparsity};

use super::derivative::PartialDerivative;

/// Values of a univariate basis at a batch of points.
///
/// The sparsity has one row per evaluation point listing the active basis
/// functions there; every row holds the same number of actives (`width`),
/// so each derivative plane is a flat `rows × width` table. All planes
/// share the sparsity.
#[derive(Debug, Clone)]
pub struct BasisValues {
    sparsity: Sparsity,
    width: usize,
    /// one plane of `rows * width` values per requested derivative
    data: Vec<f64>,
    ders: Vec<PartialDerivative>,
}

impl BasisValues {
    /// Allocate a zeroed table; `offsets[pt]` is the first active basis
    /// index at point `pt`.
    pub fn new(
        cols: usize,
        offsets: &[usize],
        width: usize,
        ders: Vec<PartialDerivative>,
    ) -> Self {
        let rows = offsets.len();
        let sparsity = Sparsity::banded(cols, offsets, width);
        let data = vec![0.0; ders.len() * rows * width];
        Self {
            sparsity,
            width,
            data,
            ders,
        }
    }

    pub fn rows(&self) -> usize {
        self.sparsity.rows()
    }

    pub fn cols(&self) -> usize {
        self.sparsity.cols()
    }

    /// Number of active functions at every point
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn sparsity(&self) -> &Sparsity {
        &self.sparsity
    }

    pub fn requested(&self) -> &[PartialDerivative] {
        &self.ders
    }

    /// Plane index of a requested derivative
    pub fn der_index(&self, der: PartialDerivative) -> usize {
        self.ders
            .iter()
            .position(|&d| d == der)
            .expect("derivative was not requested at evaluation")
    }

    /// Active basis indices at point `pt`
    pub fn actives(&self, pt: usize) -> &[usize] {
        self.sparsity.row_cols(pt)
    }

    /// Value of the `local`-th active function at `pt` in plane `der`
    #[inline]
    pub fn value(&self, der: usize, pt: usize, local: usize) -> f64 {
        self.data[der * self.sparsity.nnz() + pt * self.width + local]
    }

    /// All active values at `pt` in plane `der`
    pub fn values_at(&self, der: usize, pt: usize) -> &[f64] {
        let beg = der * self.sparsity.nnz() + pt * self.width;
        &self.data[beg..beg + self.width]
    }

    pub fn values_at_mut(&mut self, der: usize, pt: usize) -> &mut [f64] {
        let beg = der * self.sparsity.nnz() + pt * self.width;
        &mut self.data[beg..beg + self.width]
    }

    /// Multiply the values at each point by a per-point weight, across all
    /// derivative planes. Used to absorb quadrature weights into the test
    /// side.
    pub fn apply_weights(&mut self, weights: &[f64]) {
        debug_assert_eq!(weights.len(), self.rows());
        let plane = self.sparsity.nnz();
        for d in 0..self.ders.len() {
            for (pt, &w) in weights.iter().enumerate() {
                for v in &mut self.data[d * plane + pt * self.width..][..self.width] {
                    *v *= w;
                }
            }
        }
    }

    /// View one derivative plane as a Kronecker factor: the `rows × cols`
    /// evaluation matrix, or its transpose.
    pub fn operand(&self, der: usize, transposed: bool) -> BasisOperand<'_> {
        BasisOperand {
            values: self,
            der,
            transposed,
        }
    }
}

/// A `BasisValues` plane acting as a sparse matrix factor in a Kronecker
/// chain
pub struct BasisOperand<'a> {
    values: &'a BasisValues,
    der: usize,
    transposed: bool,
}

impl RightOperand for BasisOperand<'_> {
    fn rows(&self) -> usize {
        if self.transposed {
            self.values.cols()
        } else {
            self.values.rows()
        }
    }

    fn cols(&self) -> usize {
        if self.transposed {
            self.values.rows()
        } else {
            self.values.cols()
        }
    }

    fn accumulate(&self, block: usize, src: &[f64], dst: &mut [f64]) {
        let v = self.values;
        for pt in 0..v.rows() {
            let actives = v.actives(pt);
            let vals = v.values_at(self.der, pt);
            if self.transposed {
                // dst[:, pt] += Σ_j src[:, j] · M(pt, j)
                let d = &mut dst[pt * block..(pt + 1) * block];
                for (&j, &val) in actives.iter().zip(vals) {
                    let s = &src[j * block..(j + 1) * block];
                    for (dv, sv) in d.iter_mut().zip(s) {
                        *dv += val * sv;
                    }
                }
            } else {
                // dst[:, j] += src[:, pt] · M(pt, j)
                let s = &src[pt * block..(pt + 1) * block];
                for (&j, &val) in actives.iter().zip(vals) {
                    let d = &mut dst[j * block..(j + 1) * block];
                    for (dv, sv) in d.iter_mut().zip(s) {
                        *dv += val * sv;
                    }
                }
            }
        }
    }
}
