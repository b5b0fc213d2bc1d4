//! Macro-element parallel assembly
//!
//! The parameter domain is cut into macros of consecutive elements per
//! direction. Each macro is a self-contained assembly problem over
//! restricted knot vectors and a slice of the quadrature rule; its local
//! matrix is scatter-added into the global one. Macros are scheduled in
//! `2^D` coloring classes (even/odd macro index per direction): within one
//! class no two macros share a global basis function, so the scatter needs
//! no locks, and `wait_all` separates the classes.

use std::cell::UnsafeCell;
use std::sync::{Arc, Mutex};

use log::debug;

use crate::algebra::{MMatrix, Sparsity};
use crate::bases::{Bspline, ComponentRequest, PartialDerivative, TensorBasis};
use crate::error::{IgaError, IgaResult};
use crate::quadrature::{recommended_quadrature, ElementQuadrature, TensorQuadrature};
use crate::tools::timing::{PhaseTimer, TIME_ADD_MACRO, TIME_MACRO_SETUP};
use crate::tools::{SubIndex, ThreadPool};

use super::second_order::{bilinear_sparsities, kronecker_sparsities, SecondOrderModel};

/// One direction's slice of a macro: restricted bases, their index shifts
/// into the global spaces, and the quadrature points lying inside
struct MacroInfo {
    tst: Bspline,
    tst_shift: usize,
    trl: Bspline,
    trl_shift: usize,
    quad: ElementQuadrature,
}

/// Global value vector written concurrently by the scatter tasks.
///
/// SAFETY invariant: tasks running between two `wait_all` calls belong to
/// one coloring class and therefore own disjoint sets of global rows; CSR
/// rows are disjoint value ranges, so concurrent writes never alias.
struct ScatterTarget(UnsafeCell<Vec<f64>>);

unsafe impl Sync for ScatterTarget {}

impl ScatterTarget {
    /// Callers must hold the coloring invariant described on the type.
    #[allow(clippy::mut_from_ref)]
    unsafe fn slice(&self) -> &mut [f64] {
        (*self.0.get()).as_mut_slice()
    }
}

struct MacroCtx {
    model: SecondOrderModel,
    macros: Vec<Vec<MacroInfo>>,
    sparsity: Sparsity,
    tst_dims: Vec<usize>,
    trl_dims: Vec<usize>,
    values: ScatterTarget,
    error: Mutex<Option<IgaError>>,
}

/// Assemble with macro-element decomposition on a worker pool.
///
/// `macro_size` gives the number of elements per macro and direction: an
/// empty list defaults every direction, a single entry is replicated, and
/// `-1` entries are replaced by `max(deg_test, deg_trial) + 1`.
pub fn assemble_parallel(
    model: &SecondOrderModel,
    test: &TensorBasis,
    trial: &TensorBasis,
    threads: usize,
    macro_size: &[i64],
) -> IgaResult<MMatrix> {
    let dim = test.domain_dim();
    if trial.domain_dim() != dim {
        return Err(IgaError::ShapeMismatch(
            "test and trial dimension differ".into(),
        ));
    }

    let ctx = {
        let _t = PhaseTimer::new(&TIME_MACRO_SETUP);
        let quad = recommended_quadrature(test, trial);
        let sizes = normalize_macro_sizes(test, trial, macro_size)?;
        let macros = (0..dim)
            .map(|i| {
                make_macros_1d(
                    test.component(i),
                    trial.component(i),
                    quad.component(i),
                    sizes[i],
                )
            })
            .collect::<IgaResult<Vec<_>>>()?;
        let sparsity = global_sparsity(test, trial, &quad)?;
        let values = ScatterTarget(UnsafeCell::new(vec![0.0; sparsity.nnz()]));
        Arc::new(MacroCtx {
            model: model.clone(),
            macros,
            sparsity,
            tst_dims: test.sizes(),
            trl_dims: trial.sizes(),
            values,
            error: Mutex::new(None),
        })
    };

    let hardware = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let pool = ThreadPool::new(threads.clamp(1, hardware));
    let num: Vec<usize> = ctx.macros.iter().map(|m| m.len()).collect();

    for color in 0..(1usize << dim) {
        let start: Vec<usize> = (0..dim).map(|c| (color >> c) & 1).collect();
        if start.iter().zip(&num).any(|(&p, &n)| p >= n) {
            continue;
        }
        debug!("macro color class {:0width$b}", color, width = dim);
        let mut pos = start.clone();
        loop {
            let task_pos = pos.clone();
            let task_ctx = Arc::clone(&ctx);
            pool.execute(move || assemble_macro(&task_ctx, &task_pos));

            let mut c = 0;
            while c < dim {
                pos[c] += 2;
                if pos[c] < num[c] {
                    break;
                }
                pos[c] = start[c];
                c += 1;
            }
            if c == dim {
                break;
            }
        }
        pool.wait_all();
    }
    drop(pool);

    if let Some(err) = ctx.error.lock().unwrap().take() {
        return Err(err);
    }
    let ctx = Arc::into_inner(ctx).expect("workers have retired");
    Ok(MMatrix::from_parts(ctx.sparsity, ctx.values.0.into_inner()))
}

/// Assemble one macro and scatter it into the global values
fn assemble_macro(ctx: &MacroCtx, pos: &[usize]) {
    if ctx.error.lock().unwrap().is_some() {
        return;
    }
    let dim = pos.len();
    let mut tst_comps = Vec::with_capacity(dim);
    let mut trl_comps = Vec::with_capacity(dim);
    let mut quads = Vec::with_capacity(dim);
    let mut tst_ranges = Vec::with_capacity(dim);
    let mut trl_ranges = Vec::with_capacity(dim);
    for (i, &p) in pos.iter().enumerate() {
        let info = &ctx.macros[i][p];
        tst_ranges.push((info.tst_shift, info.tst_shift + info.tst.size()));
        trl_ranges.push((info.trl_shift, info.trl_shift + info.trl.size()));
        tst_comps.push(info.tst.clone());
        trl_comps.push(info.trl.clone());
        quads.push(info.quad.clone());
    }

    let local = (|| -> IgaResult<MMatrix> {
        let local_tst = TensorBasis::new(tst_comps)?;
        let local_trl = TensorBasis::new(trl_comps)?;
        let quad = TensorQuadrature::new(quads);
        ctx.model.assemble(&local_tst, &local_trl, &quad)
    })();

    match local {
        Ok(part) => {
            let _t = PhaseTimer::new(&TIME_ADD_MACRO);
            let tst_sub = SubIndex::new(&ctx.tst_dims, &tst_ranges);
            let trl_sub = SubIndex::new(&ctx.trl_dims, &trl_ranges);
            // rows of this macro belong to this task alone within the
            // current color class
            let values = unsafe { ctx.values.slice() };
            for r in 0..part.rows() {
                let rr = tst_sub.local_to_global(r);
                let dst_cols = ctx.sparsity.row_cols(rr);
                let base = ctx.sparsity.start(rr);
                let (cols, vals) = part.row(r);
                let mut p = 0;
                for (&c, &v) in cols.iter().zip(vals) {
                    let cc = trl_sub.local_to_global(c);
                    while dst_cols[p] < cc {
                        p += 1;
                    }
                    values[base + p] += v;
                }
            }
        }
        Err(err) => {
            let mut slot = ctx.error.lock().unwrap();
            if slot.is_none() {
                *slot = Some(err);
            }
        }
    }
}

fn normalize_macro_sizes(
    test: &TensorBasis,
    trial: &TensorBasis,
    macro_size: &[i64],
) -> IgaResult<Vec<usize>> {
    let dim = test.domain_dim();
    let raw: Vec<i64> = match macro_size.len() {
        0 => vec![-1; dim],
        1 => vec![macro_size[0]; dim],
        l if l == dim => macro_size.to_vec(),
        _ => {
            return Err(IgaError::ShapeMismatch(
                "macro size list length does not match the dimension".into(),
            ))
        }
    };
    raw.iter()
        .enumerate()
        .map(|(i, &s)| match s {
            -1 => Ok(test.component(i).degree().max(trial.component(i).degree()) + 1),
            s if s >= 1 => Ok(s as usize),
            _ => Err(IgaError::ShapeMismatch(
                "macro sizes must be positive".into(),
            )),
        })
        .collect()
}

/// Walk the quadrature points of one direction and cut a macro after every
/// `macro_s` elements (elements delimited by the union of test and trial
/// breaks)
fn make_macros_1d(
    test: &Bspline,
    trial: &Bspline,
    quad: &ElementQuadrature,
    macro_s: usize,
) -> IgaResult<Vec<MacroInfo>> {
    let nodes = quad.nodes();
    let weights = quad.weights();
    let brk_t = test.breaks();
    let brk_r = trial.breaks();

    let mut result = Vec::new();
    let (mut it, mut ir) = (1, 1);
    let mut pt = 0;
    let mut pto = 0;
    let mut ec = 0;
    while it < brk_t.len() && ir < brk_r.len() {
        while pt < nodes.len() && nodes[pt] < brk_t[it] && nodes[pt] < brk_r[ir] {
            pt += 1;
        }
        ec += 1;
        if pt == nodes.len() {
            result.push(close_macro(test, trial, &nodes[pto..pt], &weights[pto..pt])?);
            break;
        }
        if ec == macro_s {
            result.push(close_macro(test, trial, &nodes[pto..pt], &weights[pto..pt])?);
            pto = pt;
            ec = 0;
        }
        while it < brk_t.len() && nodes[pt] >= brk_t[it] {
            it += 1;
        }
        while ir < brk_r.len() && nodes[pt] >= brk_r[ir] {
            ir += 1;
        }
    }
    Ok(result)
}

fn close_macro(
    test: &Bspline,
    trial: &Bspline,
    nodes: &[f64],
    weights: &[f64],
) -> IgaResult<MacroInfo> {
    let (tst, tst_shift) = restrict(test, nodes)?;
    let (trl, trl_shift) = restrict(trial, nodes)?;
    Ok(MacroInfo {
        tst,
        tst_shift,
        trl,
        trl_shift,
        quad: ElementQuadrature::from_raw(nodes.to_vec(), weights.to_vec()),
    })
}

/// Restrict a basis to the functions active on a node range: the knot
/// window spanning first active through last active
fn restrict(basis: &Bspline, nodes: &[f64]) -> IgaResult<(Bspline, usize)> {
    let d0 = [PartialDerivative::zero()];
    let first = basis.evaluate(&d0, &nodes[..1]).actives(0)[0];
    let last = *basis
        .evaluate(&d0, &nodes[nodes.len() - 1..])
        .actives(0)
        .last()
        .expect("degree+1 actives");
    let end = last + basis.degree() + 2;
    let knots = basis.knots()[first..end].to_vec();
    Ok((Bspline::new(basis.degree(), knots)?, first))
}

/// The full-domain output sparsity, built from value-only evaluations
fn global_sparsity(
    test: &TensorBasis,
    trial: &TensorBasis,
    quad: &TensorQuadrature,
) -> IgaResult<Sparsity> {
    let dim = test.domain_dim();
    let req: ComponentRequest = vec![vec![PartialDerivative::zero()]; dim];
    let tsts = test.evaluate_components(&req, &quad.grid())?;
    let trls = trial.evaluate_components(&req, &quad.grid())?;
    let sprs = bilinear_sparsities(&tsts, &trls);
    let mut krns = kronecker_sparsities(&sprs);
    Ok(krns.pop().expect("at least one direction"))
}
