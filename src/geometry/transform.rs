//! Push-forward of PDE coefficients through a geometry map
//!
//! After the transform the assembler integrates on the parameter domain:
//! the Jacobian inverse carries the derivatives back and the determinant
//! carries the volume element.

use crate::algebra::{Mat, Vec64};
use crate::error::{IgaError, IgaResult};
use crate::grid::CartesianGrid;

use super::GeoMap;

/// Invert one point-wise Jacobian. Returns `(J⁻¹, |det J|)`, using the
/// pseudo-inverse `(JᵀJ)⁻¹Jᵀ` and `sqrt(det JᵀJ)` when the map goes into a
/// higher-dimensional space.
fn invert_jacobian(j: &Mat) -> IgaResult<(Mat, f64)> {
    let (tar, dom) = j.shape();
    if dom == tar {
        let det = j.determinant();
        let inv = j
            .clone()
            .try_inverse()
            .ok_or_else(|| IgaError::InvalidGeometry("singular Jacobian".into()))?;
        Ok((inv, det.abs()))
    } else {
        let jtj = j.transpose() * j;
        let det = jtj.determinant();
        if det <= 0.0 {
            return Err(IgaError::InvalidGeometry("rank-deficient Jacobian".into()));
        }
        let inv = jtj
            .try_inverse()
            .ok_or_else(|| IgaError::InvalidGeometry("rank-deficient Jacobian".into()))?;
        Ok(((j * inv).transpose(), det.sqrt()))
    }
}

/// Transform constant coefficients `(A, b, c)` into per-quadrature-point
/// arrays on the parameter domain:
///
/// `ta[(i·D+j)·N + p] = [J⁻¹ A J⁻ᵀ]_ij · det`,
/// `tb[i·N + p] = [J⁻¹ b]_i · det`, `tc[p] = c · det`.
///
/// Output slices must be sized `D²·N`, `D·N` and `N` for the coefficients
/// that are present, and may be empty otherwise.
pub fn transform_coefs(
    geo: &GeoMap,
    grid: &CartesianGrid,
    a: Option<&Mat>,
    b: Option<&Vec64>,
    c: Option<f64>,
    ta: &mut [f64],
    tb: &mut [f64],
    tc: &mut [f64],
) -> IgaResult<()> {
    let dom = geo.domain_dim();
    let tar = geo.target_dim();
    let n = grid.num_points();
    let jacs = geo.jacobian(grid)?;

    if let Some(a) = a {
        if a.shape() != (tar, tar) {
            return Err(IgaError::ShapeMismatch(format!(
                "A is {}x{}, target dimension is {}",
                a.nrows(),
                a.ncols(),
                tar
            )));
        }
    }
    if let Some(b) = b {
        if b.len() != tar {
            return Err(IgaError::ShapeMismatch(format!(
                "b has {} entries, target dimension is {}",
                b.len(),
                tar
            )));
        }
    }

    let mut jp = Mat::zeros(tar, dom);
    for p in 0..n {
        for c_dir in 0..dom {
            for t in 0..tar {
                jp[(t, c_dir)] = jacs[(c_dir * tar + t, p)];
            }
        }
        let (ji, det) = invert_jacobian(&jp)?;

        if let Some(a) = a {
            let tmp = &ji * a * ji.transpose() * det;
            for i in 0..dom {
                for j in 0..dom {
                    ta[(i * dom + j) * n + p] = tmp[(i, j)];
                }
            }
        }
        if let Some(b) = b {
            let tmp = &ji * b * det;
            for i in 0..dom {
                tb[i * n + p] = tmp[i];
            }
        }
        if let Some(c) = c {
            tc[p] = c * det;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bases::{Bspline, TensorBasis};
    use crate::geometry::BasisCoefficientMap;
    use approx::assert_relative_eq;

    fn interval_map(scale: f64) -> GeoMap {
        let b = Bspline::new(1, vec![0.0, 0.0, 1.0, 1.0]).unwrap();
        let basis = TensorBasis::new(vec![b]).unwrap();
        let coefs = Mat::from_column_slice(1, 2, &[0.0, scale]);
        GeoMap::BasisCoefficient(BasisCoefficientMap::new(basis, coefs).unwrap())
    }

    #[test]
    fn identity_transform_is_no_op() {
        let geo = interval_map(1.0);
        let grid = CartesianGrid::new(vec![vec![0.2, 0.8]]);
        let a = Mat::from_element(1, 1, 3.0);
        let mut ta = vec![0.0; 2];
        let mut tc = vec![0.0; 2];
        transform_coefs(&geo, &grid, Some(&a), None, Some(2.0), &mut ta, &mut [], &mut tc)
            .unwrap();
        for p in 0..2 {
            assert_relative_eq!(ta[p], 3.0, epsilon = 1e-14);
            assert_relative_eq!(tc[p], 2.0, epsilon = 1e-14);
        }
    }

    #[test]
    fn affine_stretch_scales_coefficients() {
        // x = 2ξ: J = 2, det = 2, tA = A/2, tC = 2c
        let geo = interval_map(2.0);
        let grid = CartesianGrid::new(vec![vec![0.5]]);
        let a = Mat::from_element(1, 1, 1.0);
        let b = Vec64::from_vec(vec![1.0]);
        let mut ta = vec![0.0; 1];
        let mut tb = vec![0.0; 1];
        let mut tc = vec![0.0; 1];
        transform_coefs(
            &geo,
            &grid,
            Some(&a),
            Some(&b),
            Some(1.0),
            &mut ta,
            &mut tb,
            &mut tc,
        )
        .unwrap();
        assert_relative_eq!(ta[0], 0.5, epsilon = 1e-14);
        assert_relative_eq!(tb[0], 1.0, epsilon = 1e-14);
        assert_relative_eq!(tc[0], 2.0, epsilon = 1e-14);
    }

    #[test]
    fn shape_checks() {
        let geo = interval_map(1.0);
        let grid = CartesianGrid::new(vec![vec![0.5]]);
        let a = Mat::zeros(2, 2);
        let mut ta = vec![0.0; 4];
        let res = transform_coefs(&geo, &grid, Some(&a), None, None, &mut ta, &mut [], &mut []);
        assert!(res.is_err());
    }
}
