//! Sparse output matrix: a sparsity skeleton plus a flat value vector

use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use super::sparsity::Sparsity;

/// Assembled sparse matrix in CSR layout.
///
/// The value at flat position `p` of row `r` belongs to column
/// `sparsity.row_cols(r)[p - sparsity.start(r)]`.
#[derive(Debug, Clone, Default)]
pub struct MMatrix {
    sparsity: Sparsity,
    values: Vec<f64>,
}

impl MMatrix {
    /// Zero matrix over the given sparsity
    pub fn zeros(sparsity: Sparsity) -> Self {
        let values = vec![0.0; sparsity.nnz()];
        Self { sparsity, values }
    }

    /// Matrix from a sparsity and a matching value vector
    pub fn from_parts(sparsity: Sparsity, values: Vec<f64>) -> Self {
        assert_eq!(sparsity.nnz(), values.len());
        Self { sparsity, values }
    }

    pub fn rows(&self) -> usize {
        self.sparsity.rows()
    }

    pub fn cols(&self) -> usize {
        self.sparsity.cols()
    }

    pub fn nnz(&self) -> usize {
        self.sparsity.nnz()
    }

    pub fn sparsity(&self) -> &Sparsity {
        &self.sparsity
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    /// Values of row `r` with their column indices
    pub fn row(&self, r: usize) -> (&[usize], &[f64]) {
        let beg = self.sparsity.start(r);
        let end = beg + self.sparsity.row_nnz(r);
        (self.sparsity.row_cols(r), &self.values[beg..end])
    }

    /// Entry `(row, col)`, zero if not stored
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.sparsity
            .position(row, col)
            .map_or(0.0, |p| self.values[p])
    }

    /// Convert to CSR format for interop
    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.rows(), self.cols());
        for r in 0..self.rows() {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals) {
                coo.push(r, c, v);
            }
        }
        CsrMatrix::from(&coo)
    }

    /// Convert to a dense matrix (for comparison/debugging)
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut mat = DMatrix::zeros(self.rows(), self.cols());
        for r in 0..self.rows() {
            let (cols, vals) = self.row(r);
            for (&c, &v) in cols.iter().zip(vals) {
                mat[(r, c)] = v;
            }
        }
        mat
    }

    /// Frobenius norm of the stored values
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// Frobenius distance between two sparse matrices of equal shape
pub fn frobenius_distance(a: &CsrMatrix<f64>, b: &CsrMatrix<f64>) -> f64 {
    assert_eq!(a.nrows(), b.nrows());
    assert_eq!(a.ncols(), b.ncols());
    let mut diff: std::collections::BTreeMap<(usize, usize), f64> = a
        .triplet_iter()
        .map(|(r, c, &v)| ((r, c), v))
        .collect();
    for (r, c, &v) in b.triplet_iter() {
        *diff.entry((r, c)).or_insert(0.0) -= v;
    }
    diff.values().map(|v| v * v).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small() -> MMatrix {
        let sp = Sparsity::new(3, vec![0, 2, 4], vec![0, 1, 1, 2]);
        MMatrix::from_parts(sp, vec![1.0, 2.0, 3.0, 4.0])
    }

    #[test]
    fn dense_expansion() {
        let m = small();
        let d = m.to_dense();
        assert_relative_eq!(d[(0, 0)], 1.0);
        assert_relative_eq!(d[(0, 1)], 2.0);
        assert_relative_eq!(d[(1, 1)], 3.0);
        assert_relative_eq!(d[(1, 2)], 4.0);
        assert_relative_eq!(d[(0, 2)], 0.0);
    }

    #[test]
    fn csr_round_trip() {
        let m = small();
        let csr = m.to_csr();
        assert_eq!(csr.nnz(), 4);
        assert_relative_eq!(frobenius_distance(&csr, &m.to_csr()), 0.0);
    }

    #[test]
    fn missing_entry_is_zero() {
        let m = small();
        assert_relative_eq!(m.get(1, 0), 0.0);
        assert_relative_eq!(m.get(1, 2), 4.0);
    }
}
