//! Geometry maps from the parameter domain to physical space

pub mod bc_map;
pub mod rational;
pub mod transform;

pub use bc_map::{BasisCoefficientMap, MAX_GEO_DIM};
pub use rational::RationalMap;
pub use transform::transform_coefs;

use crate::algebra::Mat;
use crate::error::IgaResult;
use crate::grid::CartesianGrid;

/// A geometry map, dispatched by its decoded type tag
#[derive(Debug, Clone)]
pub enum GeoMap {
    BasisCoefficient(BasisCoefficientMap),
    Rational(RationalMap),
}

impl GeoMap {
    pub fn target_dim(&self) -> usize {
        match self {
            GeoMap::BasisCoefficient(m) => m.target_dim(),
            GeoMap::Rational(m) => m.target_dim(),
        }
    }

    pub fn domain_dim(&self) -> usize {
        match self {
            GeoMap::BasisCoefficient(m) => m.domain_dim(),
            GeoMap::Rational(m) => m.domain_dim(),
        }
    }

    /// Map values at every grid point, `target_dim × num_points`
    pub fn evaluate(&self, grid: &CartesianGrid) -> IgaResult<Mat> {
        match self {
            GeoMap::BasisCoefficient(m) => m.evaluate(grid),
            GeoMap::Rational(m) => m.evaluate(grid),
        }
    }

    /// Jacobians at every grid point, `(domain_dim · target_dim) ×
    /// num_points`, column `p` holding `∂x_t/∂ξ_c` at row `c · target_dim + t`
    pub fn jacobian(&self, grid: &CartesianGrid) -> IgaResult<Mat> {
        match self {
            GeoMap::BasisCoefficient(m) => m.jacobian(grid),
            GeoMap::Rational(m) => m.jacobian(grid),
        }
    }
}
