//! The layer fprop/bprop contract.
//!
//! Every pooling variant implements [`Layer`]: `fprop` consumes an input
//! buffer plus the [`Meta`] context and produces an output buffer together
//! with an opaque [`FpropState`]; `bprop` is the mirror, consuming the
//! upstream gradient and the state recorded by the matching forward call.
//!
//! Buffers and state are created per forward call and consumed by at most
//! one matching backward call; nothing persists across unrelated
//! fprop/bprop pairs.

use crate::error::PoolResult;
use crate::matrix::Matrix;
use crate::space::Meta;

/// Selection record for k-max pooling.
///
/// One source-row index per output cell, stored row-major in the output's
/// shape. `bprop` scatters each upstream gradient value back to the row it
/// came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KMaxState {
    /// Row count of the forward input, which is also the gradient's.
    pub input_rows: usize,
    /// Source row index for each output cell, `output_rows * cols` entries.
    pub indices: Vec<u32>,
}

/// State produced by a forward pass and required by the matching backward
/// pass.
#[derive(Debug, Clone, PartialEq)]
pub enum FpropState {
    /// No state: the backward pass is fully generic (sum folding).
    None,
    /// Selected-index record (k-max pooling).
    KMax(KMaxState),
    /// Switch buffer: one-hot per pooled pair, same shape as the forward
    /// input (max folding).
    Switches(Matrix),
}

/// Polymorphic interface shared by all pooling variants.
///
/// Implementations validate the input against `meta.space_below` and update
/// `meta.space_above` on `fprop`; `bprop` validates against
/// `meta.space_above` and updates `meta.space_below`. Extra meta keys pass
/// through untouched.
pub trait Layer {
    /// Operation name used in error context.
    fn name(&self) -> &'static str;

    /// Forward pass: compute the layer's output from its input.
    fn fprop(&self, x: Matrix, meta: &mut Meta) -> PoolResult<(Matrix, FpropState)>;

    /// Backward pass: compute the input gradient from the output gradient,
    /// using the state saved during `fprop`.
    fn bprop(&self, delta: Matrix, meta: &mut Meta, state: &FpropState) -> PoolResult<Matrix>;
}
