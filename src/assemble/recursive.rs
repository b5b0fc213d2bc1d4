//! The sum-factorization kernels
//!
//! `recursive_assemble` contracts one parameter direction at a time: the
//! recursion computes lower-dimensional integrals for a small block of
//! quadrature points along the current axis, then folds the block into the
//! output through the per-direction basis values. The 1-D base case
//! accumulates outer products per element into a small dense block and
//! scatters it into the CSR layout.
//!
//! Both kernels rely on two structural facts: active sets are constant
//! within an element, and column index lists are strictly increasing, so
//! source and destination columns can be merged by a linear scan.

use crate::algebra::Sparsity;
use crate::bases::{BasisValues, PartialDerivative};

/// Upper bound on the quadrature-point block size along the current axis;
/// scratch tensors hold this many lower-dimensional integrals.
pub const MAX_TMP: usize = 10;

/// 1-D bilinear sum factorization over an element partition of the
/// quadrature points.
///
/// `eles` holds the cumulative end index of each element; `spr` is the
/// bilinear sparsity of the output. `out` is accumulated into.
pub fn assemble_1d(
    tst: &BasisValues,
    trl: &BasisValues,
    dtst: PartialDerivative,
    dtrl: PartialDerivative,
    coefs: &[f64],
    out: &mut [f64],
    spr: &Sparsity,
    eles: &[usize],
) {
    let der_tst = tst.der_index(dtst.component(0));
    let der_trl = trl.der_index(dtrl.component(0));

    let mut tmp = Vec::new();
    let mut pt_beg = 0;
    for &pt_end in eles {
        let active_tst = tst.actives(pt_beg);
        let active_trl = trl.actives(pt_beg);
        let num_tst = active_tst.len();
        let num_trl = active_trl.len();

        tmp.clear();
        tmp.resize(num_tst * num_trl, 0.0);

        for q in pt_beg..pt_end {
            let tv = tst.values_at(der_tst, q);
            let rv = trl.values_at(der_trl, q);
            let w = coefs[q];
            for (r, &t) in tv.iter().enumerate() {
                let row = &mut tmp[r * num_trl..(r + 1) * num_trl];
                let tw = t * w;
                for (dst, &v) in row.iter_mut().zip(rv) {
                    *dst += tw * v;
                }
            }
        }

        for (r, &id_tst) in active_tst.iter().enumerate() {
            let cols = spr.row_cols(id_tst);
            let base = spr.start(id_tst);
            let mut p = 0;
            for (c, &id_trl) in active_trl.iter().enumerate() {
                while cols[p] < id_trl {
                    p += 1;
                }
                out[base + p] += tmp[r * num_trl + c];
            }
        }
        pt_beg = pt_end;
    }
}

/// Recursive n-D sum factorization.
///
/// All slices are indexed by direction, 0 first; the recursion peels the
/// last (slowest-varying) direction. `krns[i]` is the Kronecker sparsity
/// accumulated over directions `0..=i`, `mems[i]` holds `MAX_TMP` scratch
/// buffers of `krns[i].nnz()` entries, and `eles[i]` the cumulative element
/// boundaries of the quadrature points along direction `i`. `out` has
/// `krns[D-1].nnz()` entries and is accumulated into.
#[allow(clippy::too_many_arguments)]
pub fn recursive_assemble(
    tsts: &[BasisValues],
    trls: &[BasisValues],
    dtst: PartialDerivative,
    dtrl: PartialDerivative,
    coefs: &[f64],
    out: &mut [f64],
    sprs: &[Sparsity],
    krns: &[Sparsity],
    eles: &[Vec<usize>],
    mems: &mut [Vec<Vec<f64>>],
) {
    let dim = tsts.len();
    if dim == 1 {
        assemble_1d(
            &tsts[0], &trls[0], dtst, dtrl, coefs, out, &sprs[0], &eles[0],
        );
        return;
    }

    // data for the current (last) direction
    let m_tst = &tsts[dim - 1];
    let m_trl = &trls[dim - 1];
    let m_spr = &sprs[dim - 1];
    let m_krn = &krns[dim - 1];
    let m_ele = &eles[dim - 1];
    let (m_mem, r_mems) = mems.split_last_mut().expect("scratch for every direction");

    // sparsity of the recursion output
    let t_krn = &krns[dim - 2];

    let pt_num = m_tst.rows();
    let coef_block = coefs.len() / pt_num;
    let der_tst = m_tst.der_index(dtst.component(dim - 1));
    let der_trl = m_trl.der_index(dtrl.component(dim - 1));

    let mut ele_idx = 0;
    let mut pt_beg = 0;
    while pt_beg < pt_num {
        let boundary = m_ele[ele_idx];
        let pt_blk = MAX_TMP.min(boundary - pt_beg);

        // lower-dimensional integrals for each point of the block
        for (t, mem) in m_mem.iter_mut().enumerate().take(pt_blk) {
            mem[..t_krn.nnz()].fill(0.0);
            recursive_assemble(
                &tsts[..dim - 1],
                &trls[..dim - 1],
                dtst,
                dtrl,
                &coefs[(pt_beg + t) * coef_block..(pt_beg + t + 1) * coef_block],
                mem,
                &sprs[..dim - 1],
                &krns[..dim - 1],
                &eles[..dim - 1],
                r_mems,
            );
        }

        // contract the block along the current direction; the active sets
        // are constant over the block because blocks never cross elements
        let active_tst = m_tst.actives(pt_beg);
        let active_trl = m_trl.actives(pt_beg);
        for (ts, &gi) in active_tst.iter().enumerate() {
            let pos = m_spr.row_cols(gi);
            for r in 0..t_krn.rows() {
                let block = t_krn.row_nnz(r);
                let r_start = t_krn.start(r);
                let out_row = m_krn.start(gi * t_krn.rows() + r);

                let mut p = 0;
                for (tr, &gj) in active_trl.iter().enumerate() {
                    while pos[p] != gj {
                        p += 1;
                    }
                    let dst = &mut out[out_row + block * p..out_row + block * (p + 1)];
                    for (t, mem) in m_mem.iter().enumerate().take(pt_blk) {
                        let w = m_tst.value(der_tst, pt_beg + t, ts)
                            * m_trl.value(der_trl, pt_beg + t, tr);
                        let src = &mem[r_start..r_start + block];
                        for (d, &s) in dst.iter_mut().zip(src) {
                            *d += w * s;
                        }
                    }
                }
            }
        }

        pt_beg += pt_blk;
        if pt_beg == boundary {
            ele_idx += 1;
        }
    }
}
