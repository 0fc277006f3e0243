//! Device-resident tensor with upload/download helpers.
//!
//! [`GpuTensor`] is the accelerator half of the dual-domain buffer model: a
//! wgpu storage buffer wrapping a `(rows, cols)` row-major f32 matrix. It
//! is exclusively owned; domain transfers consume it (or a host
//! [`Matrix`](crate::matrix::Matrix)) and produce a new owned buffer in the
//! target domain.

use wgpu::util::DeviceExt;

use crate::error::{PoolError, PoolResult};
use crate::gpu::backend::WgpuBackend;
use crate::gpu::{exceeds_vram_limit, MAX_VRAM_ALLOC};

/// A device-resident `(rows, cols)` f32 buffer.
///
/// Data is stored row-major, matching the host `Matrix` layout, so
/// transfers are plain byte copies with no reshaping.
pub struct GpuTensor {
    /// The underlying wgpu buffer.
    pub buffer: wgpu::Buffer,
    rows: usize,
    cols: usize,
}

impl GpuTensor {
    /// Creates a device tensor by uploading host data.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if `data.len() != rows * cols`.
    /// - `BufferTooLarge` if the allocation exceeds [`MAX_VRAM_ALLOC`].
    pub fn upload(
        backend: &WgpuBackend,
        data: &[f32],
        rows: usize,
        cols: usize,
    ) -> PoolResult<Self> {
        if data.len() != rows * cols {
            return Err(PoolError::shape_mismatch(
                "gpu_tensor.upload",
                &[rows, cols],
                &[data.len()],
            ));
        }
        Self::check_size(rows, cols)?;

        let buffer = backend
            .device()
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("foldpool tensor"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
            });

        Ok(Self { buffer, rows, cols })
    }

    /// Creates a device tensor with uninitialized contents.
    ///
    /// Used for kernel outputs where every element is written by exactly
    /// one work item before any read.
    pub fn uninit(backend: &WgpuBackend, rows: usize, cols: usize) -> PoolResult<Self> {
        Self::check_size(rows, cols)?;

        let buffer = backend.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("foldpool tensor (uninit)"),
            size: (rows * cols * std::mem::size_of::<f32>()) as u64,
            usage: wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST
                | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        Ok(Self { buffer, rows, cols })
    }

    fn check_size(rows: usize, cols: usize) -> PoolResult<()> {
        let size_bytes = (rows * cols * std::mem::size_of::<f32>()) as u64;
        if exceeds_vram_limit(size_bytes) {
            return Err(PoolError::buffer_too_large(size_bytes, MAX_VRAM_ALLOC));
        }
        Ok(())
    }

    /// Downloads the tensor contents to host memory.
    ///
    /// Synchronous: blocks until the device has completed all prior writes
    /// to this buffer and the copy has materialized on the host. Values
    /// are preserved exactly.
    pub fn download(&self, backend: &WgpuBackend) -> PoolResult<Vec<f32>> {
        let size_bytes = self.size_bytes();

        let staging = backend.device().create_buffer(&wgpu::BufferDescriptor {
            label: Some("foldpool staging (download)"),
            size: size_bytes,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let mut encoder = backend
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("foldpool download encoder"),
            });
        encoder.copy_buffer_to_buffer(&self.buffer, 0, &staging, 0, size_bytes);
        backend.queue().submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });

        // Completion barrier: the device must assert all prior writes done.
        backend.poll();

        rx.recv()
            .map_err(|e| PoolError::transfer(format!("map result channel closed: {e}")))?
            .map_err(PoolError::from)?;

        let data = {
            let mapped = slice.get_mapped_range();
            bytemuck::cast_slice(&mapped).to_vec()
        };
        staging.unmap();

        Ok(data)
    }

    /// Returns `(rows, cols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Row count.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Column count.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Total element count.
    #[inline]
    pub fn num_elements(&self) -> usize {
        self.rows * self.cols
    }

    /// Size in bytes.
    #[inline]
    pub fn size_bytes(&self) -> u64 {
        (self.num_elements() * std::mem::size_of::<f32>()) as u64
    }
}

impl std::fmt::Debug for GpuTensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuTensor")
            .field("rows", &self.rows)
            .field("cols", &self.cols)
            .field("size_bytes", &self.size_bytes())
            .finish()
    }
}
