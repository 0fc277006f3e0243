//! GPU backend for foldpool using wgpu.
//!
//! Only available with the `gpu` feature. The backend mirrors the host
//! reference algorithms in `pooling`: folding runs directly on
//! device-resident data as WGSL compute kernels, while k-max pooling
//! delegates to the host implementation across an explicit domain-transfer
//! round trip.
//!
//! # Architecture
//!
//! - [`WgpuBackend`] — adapter/device initialization and management
//! - [`GpuTensor`] — device-resident buffer with shape metadata
//! - [`PipelineCache`] — lazily-initialized kernel programs, scoped to the
//!   adapter object rather than ambient global state
//! - [`GpuPooling`] — the accelerator-aware layer adapter, dispatching one
//!   of the [`PoolingOp`] strategies
//!
//! # Execution model
//!
//! Kernels run as a 2D grid of independent work items, one per output
//! cell; no work item communicates with another and every output cell has
//! exactly one writer, so correctness never depends on scheduling order.
//! The grid is re-derived from the input shape on every call. Before any
//! read of kernel output the device is polled to completion.

mod backend;
mod layer;
mod pipeline;
pub mod shaders;
mod tensor;
mod uniforms;

pub use backend::{PowerPreference, WgpuBackend, WgpuOptions};
pub use layer::{GpuFpropState, GpuPooling, PoolingOp};
pub use pipeline::PipelineCache;
pub use tensor::GpuTensor;
pub use uniforms::FoldUniforms;

/// Maximum VRAM allocation per buffer (2GB).
pub const MAX_VRAM_ALLOC: u64 = 2 * 1024 * 1024 * 1024;

/// Checks whether a size in bytes exceeds the per-buffer VRAM limit.
#[inline]
pub fn exceeds_vram_limit(size_bytes: u64) -> bool {
    size_bytes > MAX_VRAM_ALLOC
}

/// Number of workgroups needed to cover `total` items with `group` threads.
#[inline]
pub fn workgroup_count(total: usize, group: usize) -> u32 {
    total.div_ceil(group) as u32
}

/// Splits a flat block size into 2D workgroup dimensions `(rows, cols)`.
///
/// The column dimension is capped at 16 so that short-and-wide and
/// tall-and-narrow inputs both keep their workgroups reasonably full.
#[inline]
pub fn block_dims(block_size: usize) -> (u32, u32) {
    let y = block_size.min(16) as u32;
    let x = (block_size as u32 / y).max(1);
    (x, y)
}
