//! Geometry maps defined by a basis and control points

use crate::algebra::{apply_right_all, ApplyWork, Mat, RightOperand};
use crate::bases::{ComponentRequest, PartialDerivative, TensorBasis};
use crate::error::{IgaError, IgaResult};
use crate::grid::CartesianGrid;

/// Highest domain dimension the geometry pipeline accepts
pub const MAX_GEO_DIM: usize = 4;

/// A map `ξ ↦ Σ_α c_α φ_α(ξ)` from the parameter domain into physical
/// space, with one control point per column of `coefs`.
#[derive(Debug, Clone)]
pub struct BasisCoefficientMap {
    basis: TensorBasis,
    coefs: Mat,
}

impl BasisCoefficientMap {
    pub fn new(basis: TensorBasis, coefs: Mat) -> IgaResult<Self> {
        if coefs.ncols() != basis.size() {
            return Err(IgaError::ShapeMismatch(format!(
                "{} control points for a basis of size {}",
                coefs.ncols(),
                basis.size()
            )));
        }
        Ok(Self { basis, coefs })
    }

    pub fn basis(&self) -> &TensorBasis {
        &self.basis
    }

    pub fn coefs(&self) -> &Mat {
        &self.coefs
    }

    pub fn target_dim(&self) -> usize {
        self.coefs.nrows()
    }

    pub fn domain_dim(&self) -> usize {
        self.basis.domain_dim()
    }

    fn check_dim(&self) -> IgaResult<()> {
        if self.domain_dim() > MAX_GEO_DIM {
            return Err(IgaError::Unsupported(format!(
                "geometry evaluation supports domain dimension up to {}, got {}",
                MAX_GEO_DIM,
                self.domain_dim()
            )));
        }
        Ok(())
    }

    /// Map values at every grid point, as a `target_dim × num_points`
    /// matrix
    pub fn evaluate(&self, grid: &CartesianGrid) -> IgaResult<Mat> {
        self.check_dim()?;
        let dim = self.domain_dim();
        let tar = self.target_dim();

        let request: ComponentRequest = vec![vec![PartialDerivative::zero()]; dim];
        let vals = self.basis.evaluate_components(&request, grid)?;

        let ops: Vec<_> = vals.iter().map(|v| v.operand(0, true)).collect();
        let op_refs: Vec<&dyn RightOperand> = ops.iter().map(|o| o as &dyn RightOperand).collect();

        let mut result = Mat::zeros(tar, grid.num_points());
        let mut work = ApplyWork::default();
        apply_right_all(
            tar,
            self.coefs.as_slice(),
            &op_refs,
            result.as_mut_slice(),
            &mut work,
        );
        Ok(result)
    }

    /// Jacobians at every grid point: a `(domain_dim · target_dim) ×
    /// num_points` matrix whose column `p` stores `∂x_t/∂ξ_c` at row
    /// `c · target_dim + t`
    pub fn jacobian(&self, grid: &CartesianGrid) -> IgaResult<Mat> {
        self.check_dim()?;
        let dim = self.domain_dim();
        let tar = self.target_dim();
        let n = grid.num_points();

        let value = PartialDerivative::zero();
        let slope = PartialDerivative::from_raw(1);
        let request: ComponentRequest = vec![vec![value, slope]; dim];
        let vals = self.basis.evaluate_components(&request, grid)?;

        let mut jacs = Mat::zeros(dim * tar, n);
        let mut partial = vec![0.0; tar * n];
        let mut work = ApplyWork::default();
        for c in 0..dim {
            let ops: Vec<_> = vals
                .iter()
                .enumerate()
                .map(|(i, v)| v.operand(if i == c { 1 } else { 0 }, true))
                .collect();
            let op_refs: Vec<&dyn RightOperand> =
                ops.iter().map(|o| o as &dyn RightOperand).collect();
            apply_right_all(tar, self.coefs.as_slice(), &op_refs, &mut partial, &mut work);
            for p in 0..n {
                for t in 0..tar {
                    jacs[(c * tar + t, p)] = partial[p * tar + t];
                }
            }
        }
        Ok(jacs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bases::Bspline;
    use approx::assert_relative_eq;

    fn unit_square_map() -> BasisCoefficientMap {
        let b = Bspline::new(1, vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let basis = TensorBasis::new(vec![b.clone(), b]).unwrap();
        // control points (0,0), (1,0), (0,1), (1,1), direction 0 fastest
        let coefs = Mat::from_columns(&[
            nalgebra::DVector::from_vec(vec![0.0, 0.0]),
            nalgebra::DVector::from_vec(vec![1.0, 0.0]),
            nalgebra::DVector::from_vec(vec![0.0, 1.0]),
            nalgebra::DVector::from_vec(vec![1.0, 1.0]),
        ]);
        BasisCoefficientMap::new(basis, coefs).unwrap()
    }

    #[test]
    fn identity_map_reproduces_grid() {
        let map = unit_square_map();
        let grid = CartesianGrid::new(vec![vec![0.25, 0.75], vec![0.5]]);
        let vals = map.evaluate(&grid).unwrap();
        let pts = grid.to_points();
        for p in 0..grid.num_points() {
            assert_relative_eq!(vals[(0, p)], pts[(0, p)], epsilon = 1e-14);
            assert_relative_eq!(vals[(1, p)], pts[(1, p)], epsilon = 1e-14);
        }
    }

    #[test]
    fn identity_map_jacobian() {
        let map = unit_square_map();
        let grid = CartesianGrid::new(vec![vec![0.3], vec![0.6]]);
        let jacs = map.jacobian(&grid).unwrap();
        // column layout: [dx0/dξ0, dx1/dξ0, dx0/dξ1, dx1/dξ1]
        assert_relative_eq!(jacs[(0, 0)], 1.0, epsilon = 1e-14);
        assert_relative_eq!(jacs[(1, 0)], 0.0, epsilon = 1e-14);
        assert_relative_eq!(jacs[(2, 0)], 0.0, epsilon = 1e-14);
        assert_relative_eq!(jacs[(3, 0)], 1.0, epsilon = 1e-14);
    }

    #[test]
    fn control_point_count_checked() {
        let b = Bspline::new(1, vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let basis = TensorBasis::new(vec![b]).unwrap();
        assert!(BasisCoefficientMap::new(basis, Mat::zeros(1, 3)).is_err());
    }
}
