//! Blockwise application of Kronecker operator chains
//!
//! `apply_right_all(block, v, ops, ..)` computes `(ops[D-1]ᵀ ⊗ … ⊗ ops[0]ᵀ) v`
//! one factor at a time: `ops[0]` contracts the fastest-varying index of `v`,
//! `ops[D-1]` the slowest. This is the only place the operator order is
//! defined; everything else passes operator slices in direction order.

/// One factor of a Kronecker chain.
///
/// Behaves as a `rows() × cols()` matrix applied from the right to blocks of
/// column-major data.
pub trait RightOperand {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;

    /// Add `src * M` to `dst`, where `src` is `block × rows()` and `dst` is
    /// `block × cols()`, both column-major with leading dimension `block`.
    fn accumulate(&self, block: usize, src: &[f64], dst: &mut [f64]);
}

/// Apply one operator to every `block × rows` sub-block of `src`
pub fn apply_right(block: usize, src: &[f64], dst: &mut [f64], op: &dyn RightOperand) {
    let src_cols = op.rows();
    let dst_cols = op.cols();
    let blk_num = src.len() / src_cols / block;
    debug_assert_eq!(src.len(), blk_num * src_cols * block);
    debug_assert_eq!(dst.len(), blk_num * dst_cols * block);

    dst.fill(0.0);
    for b in 0..blk_num {
        let s = &src[b * block * src_cols..(b + 1) * block * src_cols];
        let d = &mut dst[b * block * dst_cols..(b + 1) * block * dst_cols];
        op.accumulate(block, s, d);
    }
}

/// Reusable scratch for [`apply_right_all`]
#[derive(Debug, Default)]
pub struct ApplyWork {
    a: Vec<f64>,
    b: Vec<f64>,
}

/// Largest intermediate size produced while applying `ops` to data of
/// `src_size` entries. Used to reason about scratch demand.
pub fn max_intermediate_size(src_size: usize, ops: &[&dyn RightOperand]) -> usize {
    let mut size = src_size;
    let mut max = 0;
    for op in ops {
        size = size / op.rows() * op.cols();
        max = max.max(size);
    }
    max
}

/// Apply a chain of operators; the result lands in `dst`, which must have
/// the final size `src.len() / Π rows · Π cols`.
pub fn apply_right_all(
    block0: usize,
    src: &[f64],
    ops: &[&dyn RightOperand],
    dst: &mut [f64],
    work: &mut ApplyWork,
) {
    let n = ops.len();
    debug_assert!(n > 0);
    let ApplyWork { a, b } = work;

    let mut block = block0;
    let mut size = src.len();
    for (i, op) in ops.iter().enumerate() {
        let new_size = size / op.rows() * op.cols();
        if i + 1 == n {
            let input: &[f64] = if i == 0 { src } else { &a[..size] };
            apply_right(block, input, &mut dst[..new_size], *op);
        } else {
            if b.len() < new_size {
                b.resize(new_size, 0.0);
            }
            let input: &[f64] = if i == 0 { src } else { &a[..size] };
            apply_right(block, input, &mut b[..new_size], *op);
            std::mem::swap(a, b);
        }
        size = new_size;
        block *= op.cols();
    }
}
