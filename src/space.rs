//! Space descriptors and the metadata context.
//!
//! A [`Space`] records the logical shape of a buffer and the memory domain
//! it currently occupies. Two spaces are paired across a domain transfer:
//! the source space describes the buffer in domain A, the returned space
//! describes the relocated buffer in domain B. The invariant maintained
//! throughout is that a space's recorded shape matches its buffer's actual
//! dimensions; layers check this and fail with `ShapeMismatch` when it does
//! not hold.
//!
//! [`Meta`] is the metadata context threaded through every fprop/bprop
//! call. It carries the space below (input side) and above (output side) of
//! the current layer, plus arbitrary extra keys the framework passes
//! through untouched.

use std::collections::HashMap;

use crate::error::{PoolError, PoolResult};
use crate::matrix::Matrix;

#[cfg(feature = "gpu")]
use crate::gpu::{GpuTensor, WgpuBackend};

/// Memory domain a buffer resides in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// Host (CPU) memory.
    Host,
    /// Accelerator (GPU) memory.
    Device,
}

/// Shape and domain descriptor for a single buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Space {
    /// Row count of the described buffer.
    pub rows: usize,
    /// Column count of the described buffer.
    pub cols: usize,
    /// Memory domain the buffer resides in.
    pub domain: Domain,
}

impl Space {
    /// Creates a host-domain space.
    pub fn host(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            domain: Domain::Host,
        }
    }

    /// Creates a device-domain space.
    pub fn device(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            domain: Domain::Device,
        }
    }

    /// Returns `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Checks that this space describes `(rows, cols)`.
    pub fn expect_shape(&self, op: &'static str, rows: usize, cols: usize) -> PoolResult<()> {
        if (self.rows, self.cols) != (rows, cols) {
            return Err(PoolError::shape_mismatch(
                op,
                &[self.rows, self.cols],
                &[rows, cols],
            ));
        }
        Ok(())
    }

    /// Checks that this space is in `domain`.
    pub fn expect_domain(&self, op: &'static str, domain: Domain) -> PoolResult<()> {
        if self.domain != domain {
            return Err(PoolError::domain_mismatch(op, domain, self.domain));
        }
        Ok(())
    }

    /// The space describing the output of folding this space's buffer.
    ///
    /// Folding halves the row dimension; the domain is unchanged.
    pub fn folded(&self, op: &'static str) -> PoolResult<Space> {
        if self.rows % 2 != 0 || self.cols == 0 {
            return Err(PoolError::invalid_shape(op, self.rows, self.cols));
        }
        Ok(Space {
            rows: self.rows / 2,
            cols: self.cols,
            domain: self.domain,
        })
    }

    /// The space describing the gradient input of a folding layer, i.e. this
    /// space with its row dimension doubled.
    pub fn unfolded(&self) -> Space {
        Space {
            rows: self.rows * 2,
            cols: self.cols,
            domain: self.domain,
        }
    }

    /// Returns a copy of this space relocated to `domain`.
    pub fn with_domain(&self, domain: Domain) -> Space {
        Space { domain, ..*self }
    }
}

#[cfg(feature = "gpu")]
impl Space {
    /// Moves a device-resident buffer to host memory.
    ///
    /// Returns the relocated buffer and the updated space tagged
    /// [`Domain::Host`]. Blocks until the device has completed all prior
    /// writes to the buffer; values are preserved exactly (both domains use
    /// f32). Transferring a buffer this space already places on the host
    /// fails with `DomainMismatch`.
    pub fn to_host(&self, backend: &WgpuBackend, buffer: GpuTensor) -> PoolResult<(Matrix, Space)> {
        self.expect_domain("space.to_host", Domain::Device)?;
        self.expect_shape("space.to_host", buffer.rows(), buffer.cols())?;

        log::debug!("to_host: {}x{} ({} bytes)", self.rows, self.cols, buffer.size_bytes());
        let data = buffer.download(backend)?;
        let matrix = Matrix::new(self.rows, self.cols, data)?;
        Ok((matrix, self.with_domain(Domain::Host)))
    }

    /// Moves a host-resident buffer to device memory.
    ///
    /// The inverse of [`Space::to_host`]; same exactness and blocking
    /// guarantees, same `DomainMismatch` policy.
    pub fn to_device(
        &self,
        backend: &WgpuBackend,
        buffer: Matrix,
    ) -> PoolResult<(GpuTensor, Space)> {
        self.expect_domain("space.to_device", Domain::Host)?;
        let (rows, cols) = buffer.shape();
        self.expect_shape("space.to_device", rows, cols)?;

        log::debug!("to_device: {}x{}", rows, cols);
        let tensor = GpuTensor::upload(backend, buffer.as_slice(), rows, cols)?;
        Ok((tensor, self.with_domain(Domain::Device)))
    }
}

/// Metadata context threaded through fprop/bprop calls.
///
/// `space_below` must be present before `fprop`; `fprop` records
/// `space_above` for the produced output. `bprop` consumes `space_above`
/// and records `space_below` for the produced gradient. Extra keys are
/// passed through untouched.
#[derive(Debug, Clone, Default)]
pub struct Meta {
    /// Space of the layer's input (and of the gradient `bprop` produces).
    pub space_below: Option<Space>,
    /// Space of the layer's output (and of the gradient `bprop` consumes).
    pub space_above: Option<Space>,
    /// Framework keys carried through untouched.
    pub extra: HashMap<String, String>,
}

impl Meta {
    /// Creates a context with the given input space.
    pub fn with_space_below(space: Space) -> Self {
        Self {
            space_below: Some(space),
            ..Default::default()
        }
    }

    /// The input space, or a validation error naming `op` if absent.
    pub fn space_below(&self, op: &'static str) -> PoolResult<Space> {
        self.space_below
            .ok_or_else(|| PoolError::validation(format!("{op}: meta has no space_below")))
    }

    /// The output space, or a validation error naming `op` if absent.
    pub fn space_above(&self, op: &'static str) -> PoolResult<Space> {
        self.space_above
            .ok_or_else(|| PoolError::validation(format!("{op}: meta has no space_above")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expect_shape() {
        let s = Space::host(4, 2);
        assert!(s.expect_shape("test", 4, 2).is_ok());
        assert!(matches!(
            s.expect_shape("test", 4, 3),
            Err(PoolError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_expect_domain() {
        let s = Space::device(4, 2);
        assert!(s.expect_domain("test", Domain::Device).is_ok());
        assert!(matches!(
            s.expect_domain("test", Domain::Host),
            Err(PoolError::DomainMismatch { .. })
        ));
    }

    #[test]
    fn test_folded_halves_rows() {
        let s = Space::host(6, 3);
        let folded = s.folded("test").unwrap();
        assert_eq!(folded.shape(), (3, 3));
        assert_eq!(folded.domain, Domain::Host);
        assert_eq!(folded.unfolded().shape(), (6, 3));
    }

    #[test]
    fn test_folded_rejects_odd_rows() {
        let s = Space::host(5, 3);
        assert!(matches!(
            s.folded("test"),
            Err(PoolError::InvalidShape { rows: 5, cols: 3, .. })
        ));
    }

    #[test]
    fn test_folded_rejects_zero_cols() {
        let s = Space::host(4, 0);
        assert!(s.folded("test").is_err());
    }

    #[test]
    fn test_meta_space_below_required() {
        let meta = Meta::default();
        assert!(meta.space_below("kmax.fprop").is_err());

        let meta = Meta::with_space_below(Space::host(2, 2));
        assert_eq!(meta.space_below("kmax.fprop").unwrap().shape(), (2, 2));
    }
}
