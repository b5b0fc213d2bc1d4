//! Tensor products of univariate bases

use crate::error::{IgaError, IgaResult};
use crate::grid::CartesianGrid;

use super::bspline::Bspline;
use super::derivative::PartialDerivative;
use super::values::BasisValues;

/// Per-direction derivative orders to evaluate (1-D multi-indices)
pub type ComponentRequest = Vec<Vec<PartialDerivative>>;

/// A tensor-product basis: one univariate B-spline per parameter direction.
///
/// Basis function `(α_0, …, α_{D-1})` has global index
/// `Σ_i α_i · Π_{j<i} size_j`, with direction 0 varying fastest.
#[derive(Debug, Clone)]
pub struct TensorBasis {
    components: Vec<Bspline>,
}

impl TensorBasis {
    pub fn new(components: Vec<Bspline>) -> IgaResult<Self> {
        if components.is_empty() {
            return Err(IgaError::Unsupported(
                "tensor basis needs at least one direction".into(),
            ));
        }
        Ok(Self { components })
    }

    pub fn domain_dim(&self) -> usize {
        self.components.len()
    }

    pub fn size(&self) -> usize {
        self.components.iter().map(|b| b.size()).product()
    }

    pub fn component(&self, dir: usize) -> &Bspline {
        &self.components[dir]
    }

    pub fn components(&self) -> &[Bspline] {
        &self.components
    }

    /// Per-direction sizes, direction 0 first
    pub fn sizes(&self) -> Vec<usize> {
        self.components.iter().map(|b| b.size()).collect()
    }

    /// Evaluate each direction's basis at the matching grid component.
    ///
    /// This is the only evaluation entry point: the tensor structure of the
    /// grid is what makes sum factorization possible, and evaluation on
    /// arbitrary point clouds is rejected at the decode boundary.
    pub fn evaluate_components(
        &self,
        request: &ComponentRequest,
        grid: &CartesianGrid,
    ) -> IgaResult<Vec<BasisValues>> {
        let dim = self.domain_dim();
        if grid.domain_dim() != dim || request.len() != dim {
            return Err(IgaError::ShapeMismatch(format!(
                "basis dim {} vs grid dim {} vs request dim {}",
                dim,
                grid.domain_dim(),
                request.len()
            )));
        }
        Ok((0..dim)
            .map(|c| self.components[c].evaluate(&request[c], grid.component(c)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square_basis() -> TensorBasis {
        let bx = Bspline::new(1, vec![0.0, 0.0, 0.5, 1.0, 1.0]).unwrap();
        let by = Bspline::new(2, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        TensorBasis::new(vec![bx, by]).unwrap()
    }

    #[test]
    fn sizes() {
        let b = square_basis();
        assert_eq!(b.domain_dim(), 2);
        assert_eq!(b.size(), 9);
        assert_eq!(b.sizes(), vec![3, 3]);
    }

    #[test]
    fn component_evaluation() {
        let b = square_basis();
        let grid = CartesianGrid::new(vec![vec![0.25, 0.75], vec![0.5]]);
        let req = vec![vec![PartialDerivative::zero()]; 2];
        let vals = b.evaluate_components(&req, &grid).unwrap();
        assert_eq!(vals.len(), 2);
        assert_eq!(vals[0].rows(), 2);
        assert_eq!(vals[1].rows(), 1);
        let sum: f64 = vals[1].values_at(0, 0).iter().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
    }

    #[test]
    fn mismatched_grid_is_rejected() {
        let b = square_basis();
        let grid = CartesianGrid::new(vec![vec![0.5]]);
        let req = vec![vec![PartialDerivative::zero()]; 2];
        assert!(b.evaluate_components(&req, &grid).is_err());
    }
}
