//! Accelerator-aware pooling layer adapters.
//!
//! [`GpuPooling`] implements the fprop/bprop contract over device-resident
//! buffers by dispatching one of the [`PoolingOp`] strategies:
//!
//! - `SumFold` / `MaxFold` invoke WGSL kernels directly on device data;
//! - `HostKMax` delegates to the host reference implementation across an
//!   explicit domain-transfer round trip.
//!
//! The strategies are selected by configuration and share one contract, so
//! the framework above treats all three uniformly.

use wgpu::util::DeviceExt;

use crate::config::FoldConfig;
use crate::error::{PoolError, PoolResult};
use crate::gpu::backend::WgpuBackend;
use crate::gpu::pipeline::PipelineCache;
use crate::gpu::tensor::GpuTensor;
use crate::gpu::uniforms::FoldUniforms;
use crate::gpu::{block_dims, workgroup_count};
use crate::layer::{FpropState, Layer};
use crate::pooling::KMaxPooling;
use crate::space::{Domain, Meta};

/// Pooling strategy executed by a [`GpuPooling`] adapter.
pub enum PoolingOp {
    /// K-max pooling, delegated to the host implementation.
    ///
    /// Every call incurs a full round-trip domain transfer (device to host
    /// and back). This is a known performance deficiency of the k-max
    /// path, kept explicit rather than hidden behind the adapter.
    HostKMax(KMaxPooling),
    /// Sum folding on device-resident data.
    SumFold,
    /// Max folding on device-resident data, recording a switch buffer.
    MaxFold,
}

/// Forward-pass state of a [`GpuPooling`] call.
#[derive(Debug)]
pub enum GpuFpropState {
    /// No state (sum folding).
    None,
    /// State of the delegated host layer (k-max pooling).
    Host(FpropState),
    /// Device-resident switch buffer (max folding).
    Switches(GpuTensor),
}

/// Accelerator-aware pooling layer.
///
/// Owns the kernel programs for its strategy; the programs are compiled
/// lazily on first dispatch and scoped to this adapter.
pub struct GpuPooling {
    op: PoolingOp,
    pipelines: PipelineCache,
}

impl GpuPooling {
    /// Creates an adapter for the given strategy.
    ///
    /// `config.block_size` shapes the kernel workgroups; it affects
    /// throughput only, never results.
    pub fn new(backend: &WgpuBackend, op: PoolingOp, config: FoldConfig) -> PoolResult<Self> {
        config.validate()?;
        let pipelines = PipelineCache::new(backend.device_arc(), block_dims(config.block_size));
        Ok(Self { op, pipelines })
    }

    /// Convenience: sum folding adapter.
    pub fn sum_folding(backend: &WgpuBackend, config: FoldConfig) -> PoolResult<Self> {
        Self::new(backend, PoolingOp::SumFold, config)
    }

    /// Convenience: max folding adapter.
    pub fn max_folding(backend: &WgpuBackend, config: FoldConfig) -> PoolResult<Self> {
        Self::new(backend, PoolingOp::MaxFold, config)
    }

    /// Convenience: host-delegating k-max adapter.
    pub fn kmax(backend: &WgpuBackend, layer: KMaxPooling, config: FoldConfig) -> PoolResult<Self> {
        Self::new(backend, PoolingOp::HostKMax(layer), config)
    }

    /// Operation name used in error context.
    pub fn name(&self) -> &'static str {
        match self.op {
            PoolingOp::HostKMax(_) => "gpu_kmax_pooling",
            PoolingOp::SumFold => "gpu_sum_folding",
            PoolingOp::MaxFold => "gpu_max_folding",
        }
    }

    /// Forward pass on device-resident input.
    ///
    /// Validates `x` against `meta.space_below`, records the output space
    /// in `meta.space_above`, and returns the output together with the
    /// state the matching [`bprop`](Self::bprop) requires.
    pub fn fprop(
        &mut self,
        backend: &WgpuBackend,
        x: GpuTensor,
        meta: &mut Meta,
    ) -> PoolResult<(GpuTensor, GpuFpropState)> {
        match &self.op {
            PoolingOp::HostKMax(layer) => {
                let op = "gpu_kmax_pooling.fprop";
                let below = meta.space_below(op)?;
                let (x_host, host_below) = below.to_host(backend, x)?;
                meta.space_below = Some(host_below);

                let (y_host, state) = layer.fprop(x_host, meta)?;

                let above = meta.space_above(op)?;
                let (y_dev, dev_above) = above.to_device(backend, y_host)?;
                meta.space_above = Some(dev_above);
                Ok((y_dev, GpuFpropState::Host(state)))
            }
            PoolingOp::SumFold => {
                let op = "gpu_sum_folding.fprop";
                let below = meta.space_below(op)?;
                below.expect_domain(op, Domain::Device)?;
                below.expect_shape(op, x.rows(), x.cols())?;
                let above = below.folded(op)?;

                let out = GpuTensor::uninit(backend, above.rows, above.cols)?;
                let block = self.pipelines.block();
                let (pipeline, layout) = self.pipelines.sum_fprop()?;
                dispatch(
                    backend,
                    pipeline,
                    layout,
                    FoldUniforms::new(x.rows(), x.cols()),
                    &[&x.buffer, &out.buffer],
                    (above.rows, above.cols),
                    block,
                    op,
                )?;

                meta.space_above = Some(above);
                Ok((out, GpuFpropState::None))
            }
            PoolingOp::MaxFold => {
                let op = "gpu_max_folding.fprop";
                let below = meta.space_below(op)?;
                below.expect_domain(op, Domain::Device)?;
                below.expect_shape(op, x.rows(), x.cols())?;
                let above = below.folded(op)?;

                let out = GpuTensor::uninit(backend, above.rows, above.cols)?;
                let switches = GpuTensor::uninit(backend, x.rows(), x.cols())?;
                let block = self.pipelines.block();
                let (pipeline, layout) = self.pipelines.max_fprop()?;
                dispatch(
                    backend,
                    pipeline,
                    layout,
                    FoldUniforms::new(x.rows(), x.cols()),
                    &[&x.buffer, &out.buffer, &switches.buffer],
                    (above.rows, above.cols),
                    block,
                    op,
                )?;

                meta.space_above = Some(above);
                Ok((out, GpuFpropState::Switches(switches)))
            }
        }
    }

    /// Backward pass, consuming the state of the matching forward call.
    ///
    /// Validates `delta` against `meta.space_above` and records the
    /// gradient's space in `meta.space_below`.
    pub fn bprop(
        &mut self,
        backend: &WgpuBackend,
        delta: GpuTensor,
        meta: &mut Meta,
        state: &GpuFpropState,
    ) -> PoolResult<GpuTensor> {
        match &self.op {
            PoolingOp::HostKMax(layer) => {
                let op = "gpu_kmax_pooling.bprop";
                let host_state = match state {
                    GpuFpropState::Host(s) => s,
                    _ => {
                        return Err(PoolError::validation(format!(
                            "{op}: expected delegated host state"
                        )))
                    }
                };

                let above = meta.space_above(op)?;
                let (delta_host, host_above) = above.to_host(backend, delta)?;
                meta.space_above = Some(host_above);

                let grad_host = layer.bprop(delta_host, meta, host_state)?;

                let below = meta.space_below(op)?;
                let (grad_dev, dev_below) = below.to_device(backend, grad_host)?;
                meta.space_below = Some(dev_below);
                Ok(grad_dev)
            }
            PoolingOp::SumFold => {
                let op = "gpu_sum_folding.bprop";
                let above = meta.space_above(op)?;
                above.expect_domain(op, Domain::Device)?;
                above.expect_shape(op, delta.rows(), delta.cols())?;
                let below = above.unfolded();

                let grad = GpuTensor::uninit(backend, below.rows, below.cols)?;
                let block = self.pipelines.block();
                let (pipeline, layout) = self.pipelines.sum_bprop()?;
                dispatch(
                    backend,
                    pipeline,
                    layout,
                    FoldUniforms::new(below.rows, below.cols),
                    &[&delta.buffer, &grad.buffer],
                    (above.rows, above.cols),
                    block,
                    op,
                )?;

                meta.space_below = Some(below);
                Ok(grad)
            }
            PoolingOp::MaxFold => {
                let op = "gpu_max_folding.bprop";
                let switches = match state {
                    GpuFpropState::Switches(s) => s,
                    _ => {
                        return Err(PoolError::validation(format!("{op}: expected switch state")))
                    }
                };

                let above = meta.space_above(op)?;
                above.expect_domain(op, Domain::Device)?;
                above.expect_shape(op, delta.rows(), delta.cols())?;
                let below = above.unfolded();

                if switches.shape() != (below.rows, below.cols) {
                    return Err(PoolError::shape_mismatch(
                        op,
                        &[below.rows, below.cols],
                        &[switches.rows(), switches.cols()],
                    ));
                }

                let grad = GpuTensor::uninit(backend, below.rows, below.cols)?;
                let block = self.pipelines.block();
                let (pipeline, layout) = self.pipelines.max_bprop()?;
                dispatch(
                    backend,
                    pipeline,
                    layout,
                    FoldUniforms::new(below.rows, below.cols),
                    &[&delta.buffer, &switches.buffer, &grad.buffer],
                    (above.rows, above.cols),
                    block,
                    op,
                )?;

                meta.space_below = Some(below);
                Ok(grad)
            }
        }
    }
}

impl std::fmt::Debug for GpuPooling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuPooling")
            .field("op", &self.name())
            .field("pipelines", &self.pipelines)
            .finish()
    }
}

/// Encodes and submits one folding kernel over a `(rows, cols)` output
/// extent, then blocks until the device asserts completion.
///
/// The grid is derived from the extent on every call; the trailing partial
/// workgroups are trimmed by the bounds check inside the kernel. Launch
/// rejection (validation or out-of-memory) surfaces as `KernelLaunch`.
#[allow(clippy::too_many_arguments)]
fn dispatch(
    backend: &WgpuBackend,
    pipeline: &wgpu::ComputePipeline,
    layout: &wgpu::BindGroupLayout,
    uniforms: FoldUniforms,
    storages: &[&wgpu::Buffer],
    extent: (usize, usize),
    block: (u32, u32),
    op: &'static str,
) -> PoolResult<()> {
    let device = backend.device();

    device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(op),
        contents: bytemuck::bytes_of(&uniforms),
        usage: wgpu::BufferUsages::UNIFORM,
    });

    let mut entries = vec![wgpu::BindGroupEntry {
        binding: 0,
        resource: uniform_buffer.as_entire_binding(),
    }];
    for (i, buffer) in storages.iter().enumerate() {
        entries.push(wgpu::BindGroupEntry {
            binding: (i + 1) as u32,
            resource: buffer.as_entire_binding(),
        });
    }
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(op),
        layout,
        entries: &entries,
    });

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some(op),
    });
    {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(op),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);

        let groups_x = workgroup_count(extent.0, block.0 as usize);
        let groups_y = workgroup_count(extent.1, block.1 as usize);
        log::debug!(
            "{op}: dispatching {groups_x}x{groups_y} workgroups of {}x{} over ({}, {})",
            block.0,
            block.1,
            extent.0,
            extent.1
        );
        pass.dispatch_workgroups(groups_x, groups_y, 1);
    }
    backend.queue().submit(std::iter::once(encoder.finish()));

    let validation = pollster::block_on(device.pop_error_scope());
    let oom = pollster::block_on(device.pop_error_scope());
    if let Some(e) = validation.or(oom) {
        return Err(PoolError::kernel_launch(format!("{op}: {e}")));
    }

    // Output is not ready for reads (including transfers) until the device
    // asserts completion of all prior writes.
    backend.poll();
    Ok(())
}
