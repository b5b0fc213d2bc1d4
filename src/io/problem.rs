//! JSON problem descriptions
//!
//! Decoded objects carry a `"type"` tag; the serde-tagged enums below are
//! the registry mapping tags to builders. Everything here lives at the
//! process edges: runtime types are constructed once on decode and the
//! assembler never sees JSON.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::algebra::{Mat, MMatrix, Sparsity};
use crate::assemble::EqCoef;
use crate::bases::{Bspline, TensorBasis};
use crate::error::{IgaError, IgaResult};
use crate::geometry::{BasisCoefficientMap, GeoMap, RationalMap};
use crate::quadrature::{ElementQuadrature, QuadTemplate, TensorQuadrature};

/// Dense matrix, column-major coefficient list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatrixDef {
    #[serde(rename = "matrix")]
    Matrix {
        rows: usize,
        cols: usize,
        coefs: Vec<f64>,
    },
}

impl MatrixDef {
    pub fn from_mat(m: &Mat) -> Self {
        MatrixDef::Matrix {
            rows: m.nrows(),
            cols: m.ncols(),
            coefs: m.as_slice().to_vec(),
        }
    }

    pub fn to_mat(&self) -> IgaResult<Mat> {
        let MatrixDef::Matrix { rows, cols, coefs } = self;
        if coefs.len() != rows * cols {
            return Err(IgaError::ShapeMismatch(format!(
                "matrix {}x{} with {} coefficients",
                rows,
                cols,
                coefs.len()
            )));
        }
        Ok(Mat::from_column_slice(*rows, *cols, coefs))
    }

    pub fn to_column(&self) -> IgaResult<DVector<f64>> {
        let m = self.to_mat()?;
        if m.ncols() != 1 {
            return Err(IgaError::ShapeMismatch(format!(
                "expected a column vector, got {}x{}",
                m.nrows(),
                m.ncols()
            )));
        }
        Ok(DVector::from_column_slice(m.as_slice()))
    }
}

/// Sparse matrix in row-major CSR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SparseMatrixDef {
    #[serde(rename = "sparse matrix")]
    Sparse {
        rows: usize,
        cols: usize,
        coefs: Vec<f64>,
        col_pos: Vec<usize>,
        row_beg: Vec<usize>,
    },
}

impl From<&MMatrix> for SparseMatrixDef {
    fn from(m: &MMatrix) -> Self {
        SparseMatrixDef::Sparse {
            rows: m.rows(),
            cols: m.cols(),
            coefs: m.values().to_vec(),
            col_pos: m.sparsity().col_indices().to_vec(),
            row_beg: m.sparsity().row_starts().to_vec(),
        }
    }
}

impl TryFrom<SparseMatrixDef> for MMatrix {
    type Error = IgaError;

    fn try_from(def: SparseMatrixDef) -> IgaResult<Self> {
        let SparseMatrixDef::Sparse {
            rows,
            cols,
            coefs,
            col_pos,
            row_beg,
        } = def;
        if row_beg.len() != rows + 1
            || row_beg.first() != Some(&0)
            || row_beg.last() != Some(&col_pos.len())
            || coefs.len() != col_pos.len()
            || row_beg.windows(2).any(|w| w[0] > w[1])
        {
            return Err(IgaError::Parse("inconsistent sparse matrix data".into()));
        }
        Ok(MMatrix::from_parts(
            Sparsity::new(cols, row_beg, col_pos),
            coefs,
        ))
    }
}

/// Basis description: a univariate B-spline or a tensor product of them
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BasisDef {
    Bspline {
        degree: usize,
        knots: Vec<f64>,
    },
    TensorBasis {
        components: Vec<BasisDef>,
    },
}

impl BasisDef {
    fn to_bspline(&self) -> IgaResult<Bspline> {
        match self {
            BasisDef::Bspline { degree, knots } => Bspline::new(*degree, knots.clone()),
            BasisDef::TensorBasis { .. } => Err(IgaError::Unsupported(
                "tensor basis components must be univariate B-splines".into(),
            )),
        }
    }

    pub fn to_tensor(&self) -> IgaResult<TensorBasis> {
        match self {
            BasisDef::Bspline { .. } => TensorBasis::new(vec![self.to_bspline()?]),
            BasisDef::TensorBasis { components } => TensorBasis::new(
                components
                    .iter()
                    .map(|c| c.to_bspline())
                    .collect::<IgaResult<Vec<_>>>()?,
            ),
        }
    }
}

impl From<&TensorBasis> for BasisDef {
    fn from(b: &TensorBasis) -> Self {
        BasisDef::TensorBasis {
            components: b
                .components()
                .iter()
                .map(|c| BasisDef::Bspline {
                    degree: c.degree(),
                    knots: c.knots().to_vec(),
                })
                .collect(),
        }
    }
}

/// Geometry description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeoMapDef {
    BasisCoefficientMap {
        basis: BasisDef,
        coefs: MatrixDef,
    },
    RationalMap {
        original: Box<GeoMapDef>,
    },
}

impl GeoMapDef {
    pub fn to_map(&self) -> IgaResult<GeoMap> {
        match self {
            GeoMapDef::BasisCoefficientMap { basis, coefs } => Ok(GeoMap::BasisCoefficient(
                BasisCoefficientMap::new(basis.to_tensor()?, coefs.to_mat()?)?,
            )),
            GeoMapDef::RationalMap { original } => {
                Ok(GeoMap::Rational(RationalMap::new(original.to_map()?)))
            }
        }
    }
}

impl From<&GeoMap> for GeoMapDef {
    fn from(g: &GeoMap) -> Self {
        match g {
            GeoMap::BasisCoefficient(m) => GeoMapDef::BasisCoefficientMap {
                basis: BasisDef::from(m.basis()),
                coefs: MatrixDef::from_mat(m.coefs()),
            },
            GeoMap::Rational(m) => GeoMapDef::RationalMap {
                original: Box::new(GeoMapDef::from(m.underlying())),
            },
        }
    }
}

/// Quadrature description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum QuadratureDef {
    ElementQuadrature {
        template: QuadTemplate,
        elements: Vec<f64>,
    },
    TensorQuadrature {
        components: Vec<QuadratureDef>,
    },
}

impl QuadratureDef {
    fn to_element(&self) -> IgaResult<ElementQuadrature> {
        match self {
            QuadratureDef::ElementQuadrature { template, elements } => Ok(
                ElementQuadrature::from_template(template.clone(), elements.clone()),
            ),
            QuadratureDef::TensorQuadrature { .. } => Err(IgaError::Unsupported(
                "tensor quadrature components must be element quadratures".into(),
            )),
        }
    }

    pub fn to_tensor(&self) -> IgaResult<TensorQuadrature> {
        match self {
            QuadratureDef::ElementQuadrature { .. } => {
                Ok(TensorQuadrature::new(vec![self.to_element()?]))
            }
            QuadratureDef::TensorQuadrature { components } => Ok(TensorQuadrature::new(
                components
                    .iter()
                    .map(|c| c.to_element())
                    .collect::<IgaResult<Vec<_>>>()?,
            )),
        }
    }
}

impl From<&TensorQuadrature> for QuadratureDef {
    fn from(q: &TensorQuadrature) -> Self {
        QuadratureDef::TensorQuadrature {
            components: q
                .components()
                .iter()
                .map(|c| QuadratureDef::ElementQuadrature {
                    template: c.template().clone(),
                    elements: c.elements().to_vec(),
                })
                .collect(),
        }
    }
}

/// PDE coefficients; absent fields default to zero, except `C` which
/// defaults to 1 iff all three are absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqCoefsDef {
    pub dim: usize,
    #[serde(rename = "A", default, skip_serializing_if = "Option::is_none")]
    pub a: Option<MatrixDef>,
    #[serde(rename = "B", default, skip_serializing_if = "Option::is_none")]
    pub b: Option<MatrixDef>,
    #[serde(rename = "C", default, skip_serializing_if = "Option::is_none")]
    pub c: Option<f64>,
}

impl EqCoefsDef {
    pub fn to_coefs(&self) -> IgaResult<EqCoef> {
        let all_absent = self.a.is_none() && self.b.is_none() && self.c.is_none();
        let c = self.c.unwrap_or(if all_absent { 1.0 } else { 0.0 });
        EqCoef::new(
            self.dim,
            self.a.as_ref().map(|m| m.to_mat()).transpose()?,
            self.b.as_ref().map(|m| m.to_column()).transpose()?,
            c,
        )
    }
}

impl From<&EqCoef> for EqCoefsDef {
    fn from(eq: &EqCoef) -> Self {
        Self {
            dim: eq.dim(),
            a: eq.a().filter(|_| eq.has_a()).map(MatrixDef::from_mat),
            b: eq.b().filter(|_| eq.has_b()).map(|b| {
                MatrixDef::from_mat(&Mat::from_column_slice(b.len(), 1, b.as_slice()))
            }),
            c: if eq.has_c() { Some(eq.c()) } else { None },
        }
    }
}

/// The on-disk problem description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDef {
    pub test: BasisDef,
    pub trial: BasisDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeoMapDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quadrature: Option<QuadratureDef>,
    #[serde(
        rename = "EqCoefs",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub eq_coefs: Option<EqCoefsDef>,
}

/// A decoded, validated problem
pub struct Problem {
    pub test: TensorBasis,
    pub trial: TensorBasis,
    pub geometry: Option<GeoMap>,
    pub quadrature: Option<TensorQuadrature>,
    pub eq: EqCoef,
}

impl Problem {
    pub fn from_def(def: &ProblemDef) -> IgaResult<Self> {
        let test = def.test.to_tensor()?;
        let trial = def.trial.to_tensor()?;
        let geometry = def.geometry.as_ref().map(|g| g.to_map()).transpose()?;
        let quadrature = def.quadrature.as_ref().map(|q| q.to_tensor()).transpose()?;
        let eq = match &def.eq_coefs {
            Some(e) => e.to_coefs()?,
            // a missing block means all coefficients are absent: pure mass
            None => EqCoef::mass(test.domain_dim(), 1.0),
        };
        if eq.dim() != test.domain_dim() {
            return Err(IgaError::ShapeMismatch(format!(
                "coefficient dimension {} vs basis dimension {}",
                eq.dim(),
                test.domain_dim()
            )));
        }
        Ok(Self {
            test,
            trial,
            geometry,
            quadrature,
            eq,
        })
    }

    pub fn from_json(text: &str) -> IgaResult<Self> {
        let def: ProblemDef = serde_json::from_str(text)?;
        Self::from_def(&def)
    }
}
