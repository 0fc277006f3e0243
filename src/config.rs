//! Layer configuration and validation.
//!
//! This module provides the configuration surface exposed to the framework:
//! [`KMaxConfig`] for k-max pooling (selection count and grouping
//! granularity) and [`FoldConfig`] for the folding layers (work-item block
//! size, a performance knob that never changes results).
//!
//! # Example
//!
//! ```rust
//! use foldpool::{KMaxConfig, FoldConfig};
//!
//! let kmax = KMaxConfig { k: 4, group_size: 8 };
//! kmax.validate().expect("invalid k-max configuration");
//!
//! let fold = FoldConfig::default();
//! assert_eq!(fold.block_size, 256);
//! ```

use std::borrow::Cow;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default work-item block size for folding kernels.
///
/// The block is shaped per call from the input's column count; 256 threads
/// per block is a safe default across adapters.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// Maximum supported block size.
///
/// Matches the compute invocation limit requested from the device.
pub const MAX_BLOCK_SIZE: usize = 256;

/// Configuration validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A dimension or count parameter is out of range.
    #[error("invalid dimension: {0}")]
    InvalidDimension(Cow<'static, str>),

    /// The selection count exceeds the group it selects from.
    #[error("k ({k}) exceeds group_size ({group_size})")]
    KExceedsGroup {
        /// Requested selection count.
        k: usize,
        /// Rows available per group.
        group_size: usize,
    },
}

/// K-max pooling configuration.
///
/// The input's rows are partitioned into consecutive groups of `group_size`
/// rows. Per group and column, the `k` largest values are kept, preserving
/// their original row order, so the output has `k` rows per group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KMaxConfig {
    /// Number of values to select per group and column.
    pub k: usize,
    /// Number of consecutive rows forming one selection group.
    pub group_size: usize,
}

impl KMaxConfig {
    /// Creates a validated configuration.
    pub fn new(k: usize, group_size: usize) -> Result<Self, ConfigError> {
        let config = Self { k, group_size };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.k == 0 {
            return Err(ConfigError::InvalidDimension(Cow::Borrowed(
                "k must be positive",
            )));
        }
        if self.group_size == 0 {
            return Err(ConfigError::InvalidDimension(Cow::Borrowed(
                "group_size must be positive",
            )));
        }
        if self.k > self.group_size {
            return Err(ConfigError::KExceedsGroup {
                k: self.k,
                group_size: self.group_size,
            });
        }
        Ok(())
    }

    /// Output row count for an input with `rows` rows.
    ///
    /// `rows` must be a multiple of `group_size`; callers validate that
    /// before invoking the reference algorithm.
    #[inline]
    pub fn output_rows(&self, rows: usize) -> usize {
        (rows / self.group_size) * self.k
    }
}

/// Folding layer configuration.
///
/// `block_size` tunes how many work items share a dispatch block on the
/// accelerator. It affects throughput only; results are identical for every
/// valid value because each output cell has exactly one writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FoldConfig {
    /// Threads per dispatch block.
    pub block_size: usize,
}

impl Default for FoldConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl FoldConfig {
    /// Creates a validated configuration.
    pub fn new(block_size: usize) -> Result<Self, ConfigError> {
        let config = Self { block_size };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::InvalidDimension(Cow::Owned(format!(
                "block_size must be in 1..={}, got {}",
                MAX_BLOCK_SIZE, self.block_size
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kmax_valid() {
        let config = KMaxConfig::new(4, 8).unwrap();
        assert_eq!(config.k, 4);
        assert_eq!(config.output_rows(16), 8);
    }

    #[test]
    fn test_kmax_whole_group() {
        // k == group_size keeps every row
        let config = KMaxConfig::new(8, 8).unwrap();
        assert_eq!(config.output_rows(8), 8);
    }

    #[test]
    fn test_kmax_zero_k() {
        assert!(KMaxConfig::new(0, 8).is_err());
    }

    #[test]
    fn test_kmax_k_exceeds_group() {
        let err = KMaxConfig::new(9, 8).unwrap_err();
        assert_eq!(
            err,
            ConfigError::KExceedsGroup {
                k: 9,
                group_size: 8
            }
        );
    }

    #[test]
    fn test_fold_default() {
        let config = FoldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.block_size, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_fold_block_size_bounds() {
        assert!(FoldConfig::new(0).is_err());
        assert!(FoldConfig::new(MAX_BLOCK_SIZE).is_ok());
        assert!(FoldConfig::new(MAX_BLOCK_SIZE + 1).is_err());
    }
}
