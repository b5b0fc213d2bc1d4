//! Univariate B-spline basis
//!
//! Evaluation follows the classic triangular recursion, run in two passes
//! per point: first the derivative-refining passes (knot-difference
//! quotients), then the remaining value-refining passes (with `(x - k)`
//! factors). Running the derivative passes first keeps the number of
//! cancellation-prone operations at a minimum.

use crate::error::{IgaError, IgaResult};

use super::derivative::PartialDerivative;
use super::values::BasisValues;

/// B-spline basis of one variable, defined by a degree and a knot vector
#[derive(Debug, Clone, PartialEq)]
pub struct Bspline {
    degree: usize,
    knots: Vec<f64>,
}

impl Bspline {
    pub fn new(degree: usize, knots: Vec<f64>) -> IgaResult<Self> {
        if knots.windows(2).any(|w| w[0] > w[1]) {
            return Err(IgaError::InvalidKnots("knots must be non-decreasing".into()));
        }
        if knots.len() < 2 * degree + 2 {
            return Err(IgaError::InvalidKnots(format!(
                "need at least {} knots for degree {}, got {}",
                2 * degree + 2,
                degree,
                knots.len()
            )));
        }
        Ok(Self { degree, knots })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Number of basis functions
    pub fn size(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    /// Unique break points (element boundaries), including both ends
    pub fn breaks(&self) -> Vec<f64> {
        let interior = &self.knots[self.degree..self.knots.len() - self.degree];
        let mut brks: Vec<f64> = Vec::with_capacity(interior.len());
        for &k in interior {
            if brks.last().map_or(true, |&b| k > b) {
                brks.push(k);
            }
        }
        brks
    }

    /// Evaluate the requested derivative orders at a batch of points.
    ///
    /// Returns one plane per entry of `ders`; at each point exactly
    /// `degree + 1` functions are active, indices `[span - degree, span]`.
    pub fn evaluate(&self, ders: &[PartialDerivative], xs: &[f64]) -> BasisValues {
        let width = self.degree + 1;
        let last_span = self.knots.len() - self.degree - 2;

        let mut offsets = Vec::with_capacity(xs.len());
        let mut spans = Vec::with_capacity(xs.len());
        let mut span = self.degree;
        for &x in xs {
            while span < last_span && self.knots[span + 1] <= x {
                span += 1;
            }
            spans.push(span);
            offsets.push(span - self.degree);
        }

        let mut res = BasisValues::new(self.size(), &offsets, width, ders.to_vec());
        for (d, der) in ders.iter().enumerate() {
            let order = der.raw() as usize;
            for (pt, &x) in xs.iter().enumerate() {
                eval_span(
                    self.degree,
                    order,
                    x,
                    &self.knots,
                    spans[pt],
                    res.values_at_mut(d, pt),
                );
            }
        }
        res
    }
}

/// `deg · (deg-1) ··· (deg-der+1)`
fn falling_factorial(deg: usize, der: usize) -> f64 {
    (deg - der + 1..=deg).product::<usize>() as f64
}

/// Values of the `der`-th derivative of the `deg+1` functions active on the
/// span starting at knot index `j`, written into `o`
fn eval_span(deg: usize, der: usize, x: f64, k: &[f64], j: usize, o: &mut [f64]) {
    if der > deg {
        o.fill(0.0);
        return;
    }
    o[0] = falling_factorial(deg, der);
    // derivative-refining passes
    for r in 1..=der {
        o[r] = o[r - 1] / (k[j + r] - k[j]);
        for i in (1..r).rev() {
            o[i] = o[i - 1] / (k[j + i] - k[j + i - r]) - o[i] / (k[j + i + 1] - k[j + i + 1 - r]);
        }
        o[0] /= -(k[j + 1] - k[j + 1 - r]);
    }
    // value-refining passes complete the recursion
    for r in der + 1..=deg {
        o[r] = o[r - 1] * (x - k[j]) / (k[j + r] - k[j]);
        for i in (1..r).rev() {
            o[i] = o[i - 1] * (x - k[j + i - r]) / (k[j + i] - k[j + i - r])
                + o[i] * (k[j + i + 1] - x) / (k[j + i + 1] - k[j + i + 1 - r]);
        }
        o[0] *= (k[j + 1] - x) / (k[j + 1] - k[j + 1 - r]);
    }
}
