//! Host reference pooling algorithms.
//!
//! These are the canonical, portable implementations: k-max selection, sum
//! folding, and max folding, each as a pure function over row-major slices
//! plus a [`Layer`] implementation that adds shape/space validation and meta
//! bookkeeping. The accelerator kernels must match these bit-for-bit; the
//! parity tests in `tests/gpu_parity.rs` hold them to that.
//!
//! # Folding
//!
//! Folding halves the row dimension by combining row `r` with row
//! `r + N/2`, by sum or by element-wise maximum. Max folding additionally
//! records a switch buffer — one-hot per pooled pair — used to route
//! gradients in the backward pass. Equal values mark the lower half
//! selected (`v1 <= v2` selects `v2`): a deliberate asymmetry, preserved
//! exactly by the kernels.

use wide::f32x8;

use crate::config::KMaxConfig;
use crate::error::{PoolError, PoolResult};
use crate::layer::{FpropState, KMaxState, Layer};
use crate::matrix::Matrix;
use crate::space::Meta;

// ---------------------------------------------------------------------------
// Reference algorithms
// ---------------------------------------------------------------------------

/// Sum folding forward: `out[r, c] = x[r, c] + x[r + rows/2, c]`.
///
/// `x` is `(rows, cols)` row-major with `rows` even; `out` is
/// `(rows/2, cols)`.
pub fn sum_fold(x: &[f32], rows: usize, cols: usize, out: &mut [f32]) {
    debug_assert_eq!(x.len(), rows * cols);
    debug_assert_eq!(out.len(), rows / 2 * cols);

    let half = rows / 2;
    for r in 0..half {
        let upper = &x[r * cols..(r + 1) * cols];
        let lower = &x[(r + half) * cols..(r + half + 1) * cols];
        let dst = &mut out[r * cols..(r + 1) * cols];

        let chunks = cols / 8;
        for i in 0..chunks {
            let mut a = [0.0f32; 8];
            let mut b = [0.0f32; 8];
            a.copy_from_slice(&upper[i * 8..i * 8 + 8]);
            b.copy_from_slice(&lower[i * 8..i * 8 + 8]);
            let sum: [f32; 8] = (f32x8::new(a) + f32x8::new(b)).into();
            dst[i * 8..i * 8 + 8].copy_from_slice(&sum);
        }
        for c in chunks * 8..cols {
            dst[c] = upper[c] + lower[c];
        }
    }
}

/// Sum folding backward: both contributing rows receive the upstream
/// gradient unchanged (addition's local gradient is 1 for each operand).
///
/// `delta` is `(half_rows, cols)`; `grad` is `(2 * half_rows, cols)`.
pub fn sum_fold_bprop(delta: &[f32], half_rows: usize, cols: usize, grad: &mut [f32]) {
    debug_assert_eq!(delta.len(), half_rows * cols);
    debug_assert_eq!(grad.len(), 2 * half_rows * cols);

    let half_len = half_rows * cols;
    grad[..half_len].copy_from_slice(delta);
    grad[half_len..].copy_from_slice(delta);
}

/// Max folding forward.
///
/// `out[r, c] = max(v1, v2)` where `v1 = x[r, c]`, `v2 = x[r + rows/2, c]`.
/// `switches[r, c]` is 1 iff `v1 > v2` (strict); `switches[r + rows/2, c]`
/// is 1 iff `v1 <= v2`, so ties select the lower half. Exactly one switch
/// per pooled pair is set.
pub fn max_fold(x: &[f32], rows: usize, cols: usize, out: &mut [f32], switches: &mut [f32]) {
    debug_assert_eq!(x.len(), rows * cols);
    debug_assert_eq!(out.len(), rows / 2 * cols);
    debug_assert_eq!(switches.len(), rows * cols);

    let half = rows / 2;
    for r in 0..half {
        for c in 0..cols {
            let v1 = x[r * cols + c];
            let v2 = x[(r + half) * cols + c];
            out[r * cols + c] = v1.max(v2);
            switches[r * cols + c] = f32::from(v1 > v2);
            switches[(r + half) * cols + c] = f32::from(v1 <= v2);
        }
    }
}

/// Max folding backward: the full upstream gradient goes to the row each
/// switch marks as selected, zero to the other, per cell independently.
///
/// `delta` is `(half_rows, cols)`; `switches` and `grad` are
/// `(2 * half_rows, cols)`.
pub fn max_fold_bprop(
    delta: &[f32],
    switches: &[f32],
    half_rows: usize,
    cols: usize,
    grad: &mut [f32],
) {
    debug_assert_eq!(delta.len(), half_rows * cols);
    debug_assert_eq!(switches.len(), 2 * half_rows * cols);
    debug_assert_eq!(grad.len(), 2 * half_rows * cols);

    let half_len = half_rows * cols;
    for i in 0..half_len {
        grad[i] = switches[i] * delta[i];
        grad[half_len + i] = switches[half_len + i] * delta[i];
    }
}

/// K-max selection forward.
///
/// Rows are partitioned into consecutive groups of `config.group_size`.
/// Per group and column, the `k` largest values are kept in their original
/// row order; ties keep the earliest row. `out` is
/// `(groups * k, cols)`; `indices` receives the source row of every output
/// cell.
pub fn kmax_select(
    x: &[f32],
    rows: usize,
    cols: usize,
    config: &KMaxConfig,
    out: &mut [f32],
    indices: &mut [u32],
) {
    let k = config.k;
    let gs = config.group_size;
    debug_assert_eq!(rows % gs, 0);
    debug_assert_eq!(out.len(), (rows / gs) * k * cols);
    debug_assert_eq!(indices.len(), out.len());

    let groups = rows / gs;
    let mut order: Vec<usize> = Vec::with_capacity(gs);
    for g in 0..groups {
        let base = g * gs;
        for c in 0..cols {
            // Rank rows by value (descending), earliest row winning ties,
            // then restore row order among the k selected.
            order.clear();
            order.extend(0..gs);
            order.sort_by(|&a, &b| {
                let va = x[(base + a) * cols + c];
                let vb = x[(base + b) * cols + c];
                vb.partial_cmp(&va)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.cmp(&b))
            });
            order[..k].sort_unstable();

            for (i, &row) in order[..k].iter().enumerate() {
                let out_r = g * k + i;
                out[out_r * cols + c] = x[(base + row) * cols + c];
                indices[out_r * cols + c] = (base + row) as u32;
            }
        }
    }
}

/// K-max backward: scatter each upstream gradient value to the row it was
/// selected from; unselected rows receive zero.
pub fn kmax_bprop(
    delta: &[f32],
    state: &KMaxState,
    out_rows: usize,
    cols: usize,
    grad: &mut [f32],
) {
    debug_assert_eq!(delta.len(), out_rows * cols);
    debug_assert_eq!(state.indices.len(), delta.len());
    debug_assert_eq!(grad.len(), state.input_rows * cols);

    grad.fill(0.0);
    for r in 0..out_rows {
        for c in 0..cols {
            let src = state.indices[r * cols + c] as usize;
            grad[src * cols + c] += delta[r * cols + c];
        }
    }
}

// ---------------------------------------------------------------------------
// Layer implementations
// ---------------------------------------------------------------------------

/// Validates a folding input against its space and shape preconditions.
fn check_fold_input(op: &'static str, x: &Matrix, meta: &Meta) -> PoolResult<()> {
    let (rows, cols) = x.shape();
    let below = meta.space_below(op)?;
    below.expect_shape(op, rows, cols)?;
    if rows % 2 != 0 || cols == 0 {
        return Err(PoolError::invalid_shape(op, rows, cols));
    }
    Ok(())
}

/// Sum folding layer: halves the row dimension by summing paired rows.
///
/// No forward-pass state is needed; the backward pass distributes gradients
/// without it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumFolding;

impl Layer for SumFolding {
    fn name(&self) -> &'static str {
        "sum_folding"
    }

    fn fprop(&self, x: Matrix, meta: &mut Meta) -> PoolResult<(Matrix, FpropState)> {
        check_fold_input("sum_folding.fprop", &x, meta)?;
        let (rows, cols) = x.shape();

        let mut out = Matrix::zeros(rows / 2, cols);
        sum_fold(x.as_slice(), rows, cols, out.as_mut_slice());

        meta.space_above = Some(meta.space_below("sum_folding.fprop")?.folded("sum_folding.fprop")?);
        Ok((out, FpropState::None))
    }

    fn bprop(&self, delta: Matrix, meta: &mut Meta, _state: &FpropState) -> PoolResult<Matrix> {
        let op = "sum_folding.bprop";
        let (half_rows, cols) = delta.shape();
        let above = meta.space_above(op)?;
        above.expect_shape(op, half_rows, cols)?;

        let mut grad = Matrix::zeros(half_rows * 2, cols);
        sum_fold_bprop(delta.as_slice(), half_rows, cols, grad.as_mut_slice());

        meta.space_below = Some(above.unfolded());
        Ok(grad)
    }
}

/// Max folding layer: element-wise maximum of paired rows, recording a
/// switch buffer for gradient routing.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaxFolding;

impl Layer for MaxFolding {
    fn name(&self) -> &'static str {
        "max_folding"
    }

    fn fprop(&self, x: Matrix, meta: &mut Meta) -> PoolResult<(Matrix, FpropState)> {
        check_fold_input("max_folding.fprop", &x, meta)?;
        let (rows, cols) = x.shape();

        let mut out = Matrix::zeros(rows / 2, cols);
        let mut switches = Matrix::zeros(rows, cols);
        max_fold(
            x.as_slice(),
            rows,
            cols,
            out.as_mut_slice(),
            switches.as_mut_slice(),
        );

        meta.space_above = Some(meta.space_below("max_folding.fprop")?.folded("max_folding.fprop")?);
        Ok((out, FpropState::Switches(switches)))
    }

    fn bprop(&self, delta: Matrix, meta: &mut Meta, state: &FpropState) -> PoolResult<Matrix> {
        let op = "max_folding.bprop";
        let (half_rows, cols) = delta.shape();
        let above = meta.space_above(op)?;
        above.expect_shape(op, half_rows, cols)?;

        let switches = match state {
            FpropState::Switches(s) => s,
            _ => return Err(PoolError::validation(format!("{op}: expected switch state"))),
        };
        if switches.shape() != (half_rows * 2, cols) {
            return Err(PoolError::shape_mismatch(
                op,
                &[half_rows * 2, cols],
                &[switches.rows(), switches.cols()],
            ));
        }

        let mut grad = Matrix::zeros(half_rows * 2, cols);
        max_fold_bprop(
            delta.as_slice(),
            switches.as_slice(),
            half_rows,
            cols,
            grad.as_mut_slice(),
        );

        meta.space_below = Some(above.unfolded());
        Ok(grad)
    }
}

/// K-max pooling layer: per row-group and column, keep the k largest values
/// in their original order.
#[derive(Debug, Clone, Copy)]
pub struct KMaxPooling {
    /// Selection configuration.
    pub config: KMaxConfig,
}

impl KMaxPooling {
    /// Creates a k-max pooling layer with a validated configuration.
    pub fn new(config: KMaxConfig) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }
}

impl Layer for KMaxPooling {
    fn name(&self) -> &'static str {
        "kmax_pooling"
    }

    fn fprop(&self, x: Matrix, meta: &mut Meta) -> PoolResult<(Matrix, FpropState)> {
        let op = "kmax_pooling.fprop";
        let (rows, cols) = x.shape();
        let below = meta.space_below(op)?;
        below.expect_shape(op, rows, cols)?;
        if rows % self.config.group_size != 0 {
            return Err(PoolError::validation(format!(
                "{op}: {rows} rows not divisible by group_size {}",
                self.config.group_size
            )));
        }
        if cols == 0 {
            return Err(PoolError::invalid_shape(op, rows, cols));
        }

        let out_rows = self.config.output_rows(rows);
        let mut out = Matrix::zeros(out_rows, cols);
        let mut indices = vec![0u32; out_rows * cols];
        kmax_select(
            x.as_slice(),
            rows,
            cols,
            &self.config,
            out.as_mut_slice(),
            &mut indices,
        );

        meta.space_above = Some(crate::space::Space {
            rows: out_rows,
            cols,
            domain: below.domain,
        });
        Ok((
            out,
            FpropState::KMax(KMaxState {
                input_rows: rows,
                indices,
            }),
        ))
    }

    fn bprop(&self, delta: Matrix, meta: &mut Meta, state: &FpropState) -> PoolResult<Matrix> {
        let op = "kmax_pooling.bprop";
        let (out_rows, cols) = delta.shape();
        let above = meta.space_above(op)?;
        above.expect_shape(op, out_rows, cols)?;

        let kmax_state = match state {
            FpropState::KMax(s) => s,
            _ => return Err(PoolError::validation(format!("{op}: expected k-max state"))),
        };
        if kmax_state.indices.len() != out_rows * cols {
            return Err(PoolError::shape_mismatch(
                op,
                &[out_rows, cols],
                &[kmax_state.indices.len() / cols.max(1), cols],
            ));
        }

        let mut grad = Matrix::zeros(kmax_state.input_rows, cols);
        kmax_bprop(delta.as_slice(), kmax_state, out_rows, cols, grad.as_mut_slice());

        meta.space_below = Some(crate::space::Space {
            rows: kmax_state.input_rows,
            cols,
            domain: above.domain,
        });
        Ok(grad)
    }
}
