//! # foldpool
//!
//! Pooling and folding layers for convolutional sentence models, with a CPU
//! reference implementation and an optional GPU backend.
//!
//! Three layers share one fprop/bprop contract:
//!
//! - **Sum folding** adds the top and bottom halves of the input rows.
//! - **Max folding** takes the elementwise maximum of the two halves and
//!   records a switch buffer that routes gradients back to the winning rows.
//! - **K-max pooling** keeps, per group of rows and per column, the k
//!   largest values in their original row order.
//!
//! Every call is threaded through a [`Meta`] context carrying [`Space`]
//! descriptors for the buffers below and above the layer. Buffers live in an
//! explicit memory [`Domain`]; moving between domains is always a visible,
//! synchronous transfer, never an implicit copy.
//!
//! ## Quick start
//!
//! ```rust
//! use foldpool::{Layer, Matrix, Meta, Space, SumFolding};
//!
//! let x = Matrix::new(4, 2, vec![1.0, 2.0, 3.0, 4.0, 0.0, 5.0, 9.0, 1.0])?;
//! let mut meta = Meta::with_space_below(Space::host(4, 2));
//!
//! let layer = SumFolding;
//! let (y, state) = layer.fprop(x, &mut meta)?;
//! assert_eq!(y.as_slice(), &[1.0, 7.0, 12.0, 5.0]);
//!
//! let delta = Matrix::new(2, 2, vec![0.1, 0.2, 0.3, 0.4])?;
//! let grad = layer.bprop(delta, &mut meta, &state)?;
//! assert_eq!(grad.rows(), 4);
//! # Ok::<(), foldpool::PoolError>(())
//! ```
//!
//! ## GPU backend
//!
//! With the `gpu` feature, [`gpu::GpuPooling`] runs the folding layers as
//! WGSL compute kernels on device-resident [`gpu::GpuTensor`] buffers and
//! delegates k-max pooling to the host implementation across an explicit
//! domain-transfer round trip. Host and device paths produce bitwise
//! identical results for the same input.

pub mod config;
pub mod error;
pub mod layer;
pub mod matrix;
pub mod pooling;
pub mod space;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use config::{ConfigError, FoldConfig, KMaxConfig, DEFAULT_BLOCK_SIZE, MAX_BLOCK_SIZE};
pub use error::{PoolError, PoolResult};
pub use layer::{FpropState, KMaxState, Layer};
pub use matrix::Matrix;
pub use pooling::{KMaxPooling, MaxFolding, SumFolding};
pub use space::{Domain, Meta, Space};
