//! Rational (NURBS) geometry as a quotient of a homogeneous map

use crate::algebra::Mat;
use crate::error::IgaResult;
use crate::grid::CartesianGrid;

use super::GeoMap;

/// Quotient map `x = y_{1..T} / y_{T+1}` over a map into homogeneous
/// coordinates: the last target component of the underlying map is the
/// weight.
#[derive(Debug, Clone)]
pub struct RationalMap {
    original: Box<GeoMap>,
}

impl RationalMap {
    pub fn new(original: GeoMap) -> Self {
        Self {
            original: Box::new(original),
        }
    }

    pub fn underlying(&self) -> &GeoMap {
        &self.original
    }

    pub fn target_dim(&self) -> usize {
        self.original.target_dim() - 1
    }

    pub fn domain_dim(&self) -> usize {
        self.original.domain_dim()
    }

    pub fn evaluate(&self, grid: &CartesianGrid) -> IgaResult<Mat> {
        let vals = self.original.evaluate(grid)?;
        let tar = self.target_dim();
        let n = vals.ncols();
        let mut out = Mat::zeros(tar, n);
        for p in 0..n {
            let den = vals[(tar, p)];
            for t in 0..tar {
                out[(t, p)] = vals[(t, p)] / den;
            }
        }
        Ok(out)
    }

    /// Quotient-rule Jacobian: `(J_y · w − y · ∇w) / w²` per point
    pub fn jacobian(&self, grid: &CartesianGrid) -> IgaResult<Mat> {
        let vals = self.original.evaluate(grid)?;
        let jacs = self.original.jacobian(grid)?;
        let tar = self.target_dim();
        let dom = self.domain_dim();
        let n = vals.ncols();

        let mut out = Mat::zeros(dom * tar, n);
        for p in 0..n {
            let den = vals[(tar, p)];
            for c in 0..dom {
                let dw = jacs[(c * (tar + 1) + tar, p)];
                for t in 0..tar {
                    let dy = jacs[(c * (tar + 1) + t, p)];
                    out[(c * tar + t, p)] = (dy * den - vals[(t, p)] * dw) / (den * den);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bases::{Bspline, TensorBasis};
    use crate::geometry::BasisCoefficientMap;
    use approx::assert_relative_eq;

    /// Quarter circle as a degree-2 NURBS arc
    fn quarter_circle() -> RationalMap {
        let b = Bspline::new(2, vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]).unwrap();
        let basis = TensorBasis::new(vec![b]).unwrap();
        let w = std::f64::consts::FRAC_1_SQRT_2;
        // homogeneous control points (x·w, y·w, w)
        let coefs = Mat::from_column_slice(3, 3, &[1.0, 0.0, 1.0, w, w, w, 0.0, 1.0, 1.0]);
        let map = BasisCoefficientMap::new(basis, coefs).unwrap();
        RationalMap::new(GeoMap::BasisCoefficient(map))
    }

    #[test]
    fn points_lie_on_the_circle() {
        let map = quarter_circle();
        assert_eq!(map.target_dim(), 2);
        let grid = CartesianGrid::new(vec![vec![0.0, 0.2, 0.5, 0.9, 1.0]]);
        let pts = map.evaluate(&grid).unwrap();
        for p in 0..pts.ncols() {
            let r = (pts[(0, p)].powi(2) + pts[(1, p)].powi(2)).sqrt();
            assert_relative_eq!(r, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn tangent_is_orthogonal_to_radius() {
        let map = quarter_circle();
        let grid = CartesianGrid::new(vec![vec![0.1, 0.5, 0.8]]);
        let pts = map.evaluate(&grid).unwrap();
        let jac = map.jacobian(&grid).unwrap();
        for p in 0..pts.ncols() {
            let dot = pts[(0, p)] * jac[(0, p)] + pts[(1, p)] * jac[(1, p)];
            assert_relative_eq!(dot, 0.0, epsilon = 1e-12);
        }
    }
}
