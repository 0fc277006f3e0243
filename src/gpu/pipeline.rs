//! Compute pipeline management.
//!
//! [`PipelineCache`] holds the compiled folding kernels. Programs are
//! compiled lazily on first use and are scoped to the cache (and the
//! device Arc it holds) — no module-load globals; dropping the cache
//! releases everything.

use std::sync::Arc;

use crate::error::PoolResult;
use crate::gpu::shaders;

/// Binding pattern of a kernel's storage buffers after the uniform.
#[derive(Clone, Copy)]
enum Bindings {
    /// One read buffer, one read-write buffer.
    ReadWrite1,
    /// One read buffer, two read-write buffers (max fold forward).
    ReadWrite2,
    /// Two read buffers, one read-write buffer (max fold backward).
    Read2Write1,
}

/// Cached compute pipelines for the folding kernels.
pub struct PipelineCache {
    device: Arc<wgpu::Device>,
    block: (u32, u32),

    sum_fprop: Option<(wgpu::ComputePipeline, wgpu::BindGroupLayout)>,
    sum_bprop: Option<(wgpu::ComputePipeline, wgpu::BindGroupLayout)>,
    max_fprop: Option<(wgpu::ComputePipeline, wgpu::BindGroupLayout)>,
    max_bprop: Option<(wgpu::ComputePipeline, wgpu::BindGroupLayout)>,
}

impl PipelineCache {
    /// Creates an empty cache compiling kernels for the given workgroup
    /// dimensions.
    pub fn new(device: Arc<wgpu::Device>, block: (u32, u32)) -> Self {
        Self {
            device,
            block,
            sum_fprop: None,
            sum_bprop: None,
            max_fprop: None,
            max_bprop: None,
        }
    }

    /// Workgroup dimensions the kernels are compiled for.
    pub fn block(&self) -> (u32, u32) {
        self.block
    }

    /// Gets or builds the sum folding forward pipeline.
    pub fn sum_fprop(&mut self) -> PoolResult<&(wgpu::ComputePipeline, wgpu::BindGroupLayout)> {
        if self.sum_fprop.is_none() {
            let src = shaders::generate_sum_fold_fprop(self.block.0, self.block.1);
            self.sum_fprop =
                Some(self.build("sum_fold_fprop", &src, Bindings::ReadWrite1)?);
        }
        Ok(self.sum_fprop.as_ref().unwrap())
    }

    /// Gets or builds the sum folding backward pipeline.
    pub fn sum_bprop(&mut self) -> PoolResult<&(wgpu::ComputePipeline, wgpu::BindGroupLayout)> {
        if self.sum_bprop.is_none() {
            let src = shaders::generate_sum_fold_bprop(self.block.0, self.block.1);
            self.sum_bprop =
                Some(self.build("sum_fold_bprop", &src, Bindings::ReadWrite1)?);
        }
        Ok(self.sum_bprop.as_ref().unwrap())
    }

    /// Gets or builds the max folding forward pipeline.
    pub fn max_fprop(&mut self) -> PoolResult<&(wgpu::ComputePipeline, wgpu::BindGroupLayout)> {
        if self.max_fprop.is_none() {
            let src = shaders::generate_max_fold_fprop(self.block.0, self.block.1);
            self.max_fprop =
                Some(self.build("max_fold_fprop", &src, Bindings::ReadWrite2)?);
        }
        Ok(self.max_fprop.as_ref().unwrap())
    }

    /// Gets or builds the max folding backward pipeline.
    pub fn max_bprop(&mut self) -> PoolResult<&(wgpu::ComputePipeline, wgpu::BindGroupLayout)> {
        if self.max_bprop.is_none() {
            let src = shaders::generate_max_fold_bprop(self.block.0, self.block.1);
            self.max_bprop =
                Some(self.build("max_fold_bprop", &src, Bindings::Read2Write1)?);
        }
        Ok(self.max_bprop.as_ref().unwrap())
    }

    fn build(
        &self,
        entry: &'static str,
        source: &str,
        bindings: Bindings,
    ) -> PoolResult<(wgpu::ComputePipeline, wgpu::BindGroupLayout)> {
        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(entry),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        let layout = self.create_bind_group_layout(entry, bindings);

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(entry),
                bind_group_layouts: &[&layout],
                push_constant_ranges: &[],
            });

        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(entry),
                layout: Some(&pipeline_layout),
                module: &shader,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            });

        Ok((pipeline, layout))
    }

    fn create_bind_group_layout(
        &self,
        label: &'static str,
        bindings: Bindings,
    ) -> wgpu::BindGroupLayout {
        let storage = |binding: u32, read_only: bool| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let uniform = wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::COMPUTE,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };

        let entries = match bindings {
            Bindings::ReadWrite1 => vec![uniform, storage(1, true), storage(2, false)],
            Bindings::ReadWrite2 => {
                vec![uniform, storage(1, true), storage(2, false), storage(3, false)]
            }
            Bindings::Read2Write1 => {
                vec![uniform, storage(1, true), storage(2, true), storage(3, false)]
            }
        };

        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
            })
    }
}

impl std::fmt::Debug for PipelineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineCache")
            .field("block", &self.block)
            .field("has_sum_fprop", &self.sum_fprop.is_some())
            .field("has_sum_bprop", &self.sum_bprop.is_some())
            .field("has_max_fprop", &self.max_fprop.is_some())
            .field("has_max_bprop", &self.max_bprop.is_some())
            .finish()
    }
}
