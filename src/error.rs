//! Unified error types for foldpool.
//!
//! This module provides [`PoolError`], a unified error type covering both the
//! host reference path and the GPU backend. It uses the `thiserror` crate for
//! ergonomic error handling.
//!
//! Every error is unrecoverable for the fprop/bprop call that produced it:
//! nothing is retried internally, and the caller decides whether to abort the
//! whole network evaluation. Messages carry the operation name and the shapes
//! involved so a failure can be diagnosed without inspecting device state.
//!
//! # Example
//!
//! ```rust
//! use foldpool::PoolError;
//!
//! fn check_even(op: &'static str, rows: usize) -> Result<(), PoolError> {
//!     if rows % 2 != 0 {
//!         return Err(PoolError::invalid_shape(op, rows, 1));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::config::ConfigError;
use crate::space::Domain;

/// Unified error type for foldpool operations.
#[derive(Error, Debug)]
pub enum PoolError {
    /// Shape mismatch between a buffer and its space descriptor, or between
    /// an input and what a layer expects.
    #[error("{op}: shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Operation that detected the mismatch.
        op: &'static str,
        /// Expected shape `[rows, cols]`.
        expected: Vec<usize>,
        /// Actual shape received.
        got: Vec<usize>,
    },

    /// Shape that no folding layer can process: odd row count or zero columns.
    ///
    /// Folding halves the row dimension, so an odd row count would leave one
    /// row unpaired. This is rejected up front rather than silently truncated.
    #[error("{op}: invalid shape ({rows}, {cols}): rows must be even and cols non-zero")]
    InvalidShape {
        /// Operation that rejected the shape.
        op: &'static str,
        /// Row count received.
        rows: usize,
        /// Column count received.
        cols: usize,
    },

    /// Operation invoked on a buffer residing in the wrong memory domain.
    ///
    /// Transfers to a domain the buffer already occupies also fail with this
    /// variant; a transfer is never a silent no-op.
    #[error("{op}: domain mismatch: expected {expected:?}, got {got:?}")]
    DomainMismatch {
        /// Operation that detected the mismatch.
        op: &'static str,
        /// Domain the operation requires.
        expected: Domain,
        /// Domain the buffer actually resides in.
        got: Domain,
    },

    /// The accelerator rejected or aborted a kernel launch.
    ///
    /// Covers out-of-memory, invalid grid dimensions, and invalid device
    /// state.
    #[error("kernel launch failed: {0}")]
    KernelLaunch(String),

    /// A domain transfer could not complete.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// Metadata or adapter state validation failed.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// GPU device request failed.
    #[cfg(feature = "gpu")]
    #[error("failed to create GPU device: {0}")]
    DeviceRequestFailed(#[from] wgpu::RequestDeviceError),

    /// GPU buffer async operation failed.
    #[cfg(feature = "gpu")]
    #[error("buffer async error: {0}")]
    BufferAsync(#[from] wgpu::BufferAsyncError),

    /// No suitable GPU adapter was found.
    #[cfg(feature = "gpu")]
    #[error("failed to find suitable GPU adapter: {0}")]
    AdapterNotFound(String),

    /// GPU hardware doesn't support required limits.
    #[cfg(feature = "gpu")]
    #[error("unsupported GPU limits: {0}")]
    UnsupportedLimits(String),

    /// A single allocation would exceed the per-buffer VRAM limit.
    #[cfg(feature = "gpu")]
    #[error("buffer of {requested} bytes exceeds VRAM limit of {limit} bytes")]
    BufferTooLarge {
        /// Requested allocation in bytes.
        requested: u64,
        /// Configured limit in bytes.
        limit: u64,
    },
}

/// Result type alias for foldpool operations.
pub type PoolResult<T> = Result<T, PoolError>;

impl PoolError {
    /// Creates a shape mismatch error.
    pub fn shape_mismatch(op: &'static str, expected: &[usize], got: &[usize]) -> Self {
        PoolError::ShapeMismatch {
            op,
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Creates an invalid shape error.
    pub fn invalid_shape(op: &'static str, rows: usize, cols: usize) -> Self {
        PoolError::InvalidShape { op, rows, cols }
    }

    /// Creates a domain mismatch error.
    pub fn domain_mismatch(op: &'static str, expected: Domain, got: Domain) -> Self {
        PoolError::DomainMismatch { op, expected, got }
    }

    /// Creates a kernel launch error.
    pub fn kernel_launch<S: Into<String>>(msg: S) -> Self {
        PoolError::KernelLaunch(msg.into())
    }

    /// Creates a transfer error.
    pub fn transfer<S: Into<String>>(msg: S) -> Self {
        PoolError::Transfer(msg.into())
    }

    /// Creates a validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        PoolError::Validation(msg.into())
    }

    /// Creates an adapter not found error.
    #[cfg(feature = "gpu")]
    pub fn adapter_not_found<S: Into<String>>(msg: S) -> Self {
        PoolError::AdapterNotFound(msg.into())
    }

    /// Creates an unsupported limits error.
    #[cfg(feature = "gpu")]
    pub fn unsupported_limits<S: Into<String>>(msg: S) -> Self {
        PoolError::UnsupportedLimits(msg.into())
    }

    /// Creates a buffer too large error.
    #[cfg(feature = "gpu")]
    pub fn buffer_too_large(requested: u64, limit: u64) -> Self {
        PoolError::BufferTooLarge { requested, limit }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = PoolError::shape_mismatch("sum_folding.fprop", &[4, 2], &[3, 2]);
        let msg = err.to_string();
        assert!(msg.contains("sum_folding.fprop"));
        assert!(msg.contains("[4, 2]"));
        assert!(msg.contains("[3, 2]"));
    }

    #[test]
    fn test_invalid_shape_message() {
        let err = PoolError::invalid_shape("max_folding.fprop", 5, 3);
        let msg = err.to_string();
        assert!(msg.contains("(5, 3)"));
        assert!(msg.contains("even"));
    }

    #[test]
    fn test_domain_mismatch_message() {
        let err = PoolError::domain_mismatch("to_host", Domain::Device, Domain::Host);
        let msg = err.to_string();
        assert!(msg.contains("to_host"));
        assert!(msg.contains("Device"));
        assert!(msg.contains("Host"));
    }

    #[test]
    fn test_transfer_message() {
        let err = PoolError::transfer("map_async callback dropped");
        assert!(err.to_string().contains("transfer failed"));
    }
}
