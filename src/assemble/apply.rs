//! Matrix-free application of one Part
//!
//! The transpose view of the assembler: push the input coefficients to the
//! quadrature grid through the trial basis, multiply by the Part
//! coefficients, and integrate back through the (weight-carrying) test
//! basis. No matrix is materialized.

use crate::algebra::{apply_right_all, ApplyWork, RightOperand};
use crate::bases::{BasisValues, PartialDerivative};
use crate::tools::timing::{PhaseTimer, TIME_APPLY_KRONECKER, TIME_APPLY_TRIAL};

/// Reusable buffers for repeated [`kronecker_apply`] calls
#[derive(Debug, Default)]
pub struct ApplyBuffers {
    eval: Vec<f64>,
    integrated: Vec<f64>,
    work: ApplyWork,
}

/// Accumulate `out_v += M_part · in_v` without materializing `M_part`.
///
/// `tsts` must already carry the quadrature weights (the same convention
/// as the assembler); `coefs` holds the Part coefficient at every
/// quadrature grid point.
#[allow(clippy::too_many_arguments)]
pub fn kronecker_apply(
    tsts: &[BasisValues],
    trls: &[BasisValues],
    dtst: PartialDerivative,
    dtrl: PartialDerivative,
    coefs: &[f64],
    in_v: &[f64],
    out_v: &mut [f64],
    buffers: &mut ApplyBuffers,
) {
    let dim = trls.len();
    let quad_size: usize = trls.iter().map(|v| v.rows()).product();
    debug_assert_eq!(coefs.len(), quad_size);

    // values of the trial expansion at every quadrature point, times the
    // Part coefficient
    {
        let _t = PhaseTimer::new(&TIME_APPLY_TRIAL);
        let ops: Vec<_> = (0..dim)
            .map(|c| trls[c].operand(trls[c].der_index(dtrl.component(c)), true))
            .collect();
        let op_refs: Vec<&dyn RightOperand> = ops.iter().map(|o| o as &dyn RightOperand).collect();
        buffers.eval.resize(quad_size, 0.0);
        apply_right_all(1, in_v, &op_refs, &mut buffers.eval, &mut buffers.work);
        for (e, &c) in buffers.eval.iter_mut().zip(coefs) {
            *e *= c;
        }
    }

    // integrate against the test basis and accumulate
    {
        let _t = PhaseTimer::new(&TIME_APPLY_KRONECKER);
        let ops: Vec<_> = (0..dim)
            .map(|c| tsts[c].operand(tsts[c].der_index(dtst.component(c)), false))
            .collect();
        let op_refs: Vec<&dyn RightOperand> = ops.iter().map(|o| o as &dyn RightOperand).collect();
        buffers.integrated.resize(out_v.len(), 0.0);
        apply_right_all(
            1,
            &buffers.eval,
            &op_refs,
            &mut buffers.integrated,
            &mut buffers.work,
        );
        for (o, &v) in out_v.iter_mut().zip(&buffers.integrated) {
            *o += v;
        }
    }
}
