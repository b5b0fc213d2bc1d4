//! Quadrature rules on element partitions and their tensor composition

use serde::{Deserialize, Serialize};

use crate::bases::{BasisValues, TensorBasis};
use crate::grid::CartesianGrid;

/// A reference rule on `[-1, 1]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuadTemplate {
    pub nodes: Vec<f64>,
    pub weights: Vec<f64>,
    pub name: String,
}

/// Gauss–Legendre template with `n` points, exact for polynomials of
/// degree `2n - 1`.
///
/// Nodes are the Legendre roots, found by Newton iteration from the
/// Chebyshev initial guess.
pub fn gauss(n: usize) -> QuadTemplate {
    assert!(n > 0);
    let mut nodes = vec![0.0; n];
    let mut weights = vec![0.0; n];

    let nf = n as f64;
    for i in 0..n.div_ceil(2) {
        let mut x = (std::f64::consts::PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
        let mut pp = 0.0;
        for _ in 0..100 {
            // Legendre recurrence up to P_n
            let mut p1 = 1.0;
            let mut p2 = 0.0;
            for j in 1..=n {
                let p3 = p2;
                p2 = p1;
                p1 = ((2 * j - 1) as f64 * x * p2 - (j - 1) as f64 * p3) / j as f64;
            }
            pp = nf * (x * p1 - p2) / (x * x - 1.0);
            let dx = p1 / pp;
            x -= dx;
            if dx.abs() < 1e-15 {
                break;
            }
        }
        nodes[i] = -x;
        nodes[n - 1 - i] = x;
        let w = 2.0 / ((1.0 - x * x) * pp * pp);
        weights[i] = w;
        weights[n - 1 - i] = w;
    }

    QuadTemplate {
        nodes,
        weights,
        name: format!("gauss{}", n),
    }
}

/// A univariate rule: the template instantiated on every interval of an
/// element partition
#[derive(Debug, Clone)]
pub struct ElementQuadrature {
    nodes: Vec<f64>,
    weights: Vec<f64>,
    template: QuadTemplate,
    elements: Vec<f64>,
}

impl ElementQuadrature {
    /// Map the template onto each interval `[elements[e], elements[e+1]]`
    pub fn from_template(template: QuadTemplate, elements: Vec<f64>) -> Self {
        debug_assert_eq!(template.nodes.len(), template.weights.len());
        let per = template.nodes.len();
        let n_ele = elements.len().saturating_sub(1);
        let mut nodes = Vec::with_capacity(n_ele * per);
        let mut weights = Vec::with_capacity(n_ele * per);
        for w in elements.windows(2) {
            let (a, b) = (w[0], w[1]);
            for (&x, &wt) in template.nodes.iter().zip(&template.weights) {
                nodes.push(x * (b - a) / 2.0 + (a + b) / 2.0);
                weights.push(wt * (b - a) / 2.0);
            }
        }
        Self {
            nodes,
            weights,
            template,
            elements,
        }
    }

    /// Wrap precomputed nodes and weights (used for macro-local slices)
    pub fn from_raw(nodes: Vec<f64>, weights: Vec<f64>) -> Self {
        debug_assert_eq!(nodes.len(), weights.len());
        Self {
            nodes,
            weights,
            template: QuadTemplate::default(),
            elements: Vec::new(),
        }
    }

    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn template(&self) -> &QuadTemplate {
        &self.template
    }

    pub fn elements(&self) -> &[f64] {
        &self.elements
    }

    /// Absorb the weights into an evaluation table of matching row count
    pub fn apply_to_values(&self, val: &mut BasisValues) {
        if val.rows() == self.size() {
            val.apply_weights(&self.weights);
        }
    }
}

/// Tensor product of univariate rules, one per direction
#[derive(Debug, Clone)]
pub struct TensorQuadrature {
    components: Vec<ElementQuadrature>,
}

impl TensorQuadrature {
    pub fn new(components: Vec<ElementQuadrature>) -> Self {
        Self { components }
    }

    pub fn domain_dim(&self) -> usize {
        self.components.len()
    }

    pub fn component(&self, dir: usize) -> &ElementQuadrature {
        &self.components[dir]
    }

    pub fn components(&self) -> &[ElementQuadrature] {
        &self.components
    }

    pub fn size(&self) -> usize {
        self.components.iter().map(|c| c.size()).product()
    }

    /// The quadrature nodes as a Cartesian grid
    pub fn grid(&self) -> CartesianGrid {
        CartesianGrid::new(self.components.iter().map(|c| c.nodes.clone()).collect())
    }

    /// Absorb each direction's weights into the matching evaluation table
    pub fn apply_to_values(&self, vals: &mut [BasisValues]) {
        for (c, val) in self.components.iter().zip(vals) {
            c.apply_to_values(val);
        }
    }
}

/// Sorted union of two break-point sequences: the integration subdivision
/// for a test/trial pair
pub fn knots_to_elements(brks1: &[f64], brks2: &[f64]) -> Vec<f64> {
    debug_assert_eq!(brks1[0], brks2[0]);
    let mut merged = Vec::with_capacity(brks1.len() + brks2.len() - 1);
    merged.push(brks1[0]);
    let (mut i1, mut i2) = (0, 0);
    loop {
        let last = *merged.last().unwrap();
        while i1 < brks1.len() && brks1[i1] <= last {
            i1 += 1;
        }
        while i2 < brks2.len() && brks2[i2] <= last {
            i2 += 1;
        }
        match (brks1.get(i1), brks2.get(i2)) {
            (Some(&a), Some(&b)) => merged.push(a.min(b)),
            (Some(&a), None) => merged.push(a),
            (None, Some(&b)) => merged.push(b),
            (None, None) => break,
        }
    }
    merged
}

/// Gauss rule matched to a test/trial pair: `(deg_t + deg_r)/2 + 1` points
/// per element of the merged break sequence, per direction
pub fn recommended_quadrature(test: &TensorBasis, trial: &TensorBasis) -> TensorQuadrature {
    debug_assert_eq!(test.domain_dim(), trial.domain_dim());
    let comps = (0..test.domain_dim())
        .map(|c| {
            let points = (test.component(c).degree() + trial.component(c).degree()) / 2 + 1;
            let elements = knots_to_elements(
                &test.component(c).breaks(),
                &trial.component(c).breaks(),
            );
            ElementQuadrature::from_template(gauss(points), elements)
        })
        .collect();
    TensorQuadrature::new(comps)
}
