//! GPU backend initialization and device management.
//!
//! [`WgpuBackend`] owns the wgpu device and queue and is the entry point
//! for all accelerator operations. Kernel-program state lives in a
//! [`PipelineCache`](super::PipelineCache) scoped to the adapter that
//! created it; there is no process-wide global state and teardown is
//! dropping the backend.

use std::sync::Arc;

use crate::config::MAX_BLOCK_SIZE;
use crate::error::{PoolError, PoolResult};

/// Power preference for GPU adapter selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PowerPreference {
    /// Prefer low power consumption (integrated GPU).
    LowPower,
    /// Prefer high performance (discrete GPU).
    #[default]
    HighPerformance,
}

impl From<PowerPreference> for wgpu::PowerPreference {
    fn from(pref: PowerPreference) -> Self {
        match pref {
            PowerPreference::LowPower => wgpu::PowerPreference::LowPower,
            PowerPreference::HighPerformance => wgpu::PowerPreference::HighPerformance,
        }
    }
}

/// Options for initializing the wgpu backend.
#[derive(Debug, Clone)]
pub struct WgpuOptions {
    /// Power preference for adapter selection.
    pub power_preference: PowerPreference,
    /// Preferred backend (Vulkan, DX12, Metal, ...). `None` auto-selects.
    pub backend: Option<wgpu::Backends>,
    /// Required limits (minimum).
    pub required_limits: wgpu::Limits,
}

impl Default for WgpuOptions {
    fn default() -> Self {
        Self {
            power_preference: PowerPreference::HighPerformance,
            backend: None,
            required_limits: wgpu::Limits {
                max_compute_invocations_per_workgroup: MAX_BLOCK_SIZE as u32,
                ..wgpu::Limits::downlevel_defaults()
            },
        }
    }
}

/// The main GPU backend struct.
///
/// Holds the wgpu device, queue, and adapter info.
///
/// # Example
///
/// ```rust,ignore
/// use foldpool::gpu::{WgpuBackend, WgpuOptions};
///
/// let backend = WgpuBackend::init(WgpuOptions::default())?;
/// println!("Using GPU: {}", backend.adapter_info().name);
/// ```
pub struct WgpuBackend {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The selected adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device for resource creation.
    pub device: Arc<wgpu::Device>,
    /// The wgpu queue for command submission.
    pub queue: Arc<wgpu::Queue>,
    adapter_info: wgpu::AdapterInfo,
    limits: wgpu::Limits,
}

impl WgpuBackend {
    /// Initializes the GPU backend with the given options.
    ///
    /// # Errors
    ///
    /// - `PoolError::AdapterNotFound` — no suitable GPU adapter.
    /// - `PoolError::UnsupportedLimits` — adapter below required limits.
    /// - `PoolError::DeviceRequestFailed` — device creation failed.
    pub fn init(options: WgpuOptions) -> PoolResult<Self> {
        let backends = options.backend.unwrap_or(wgpu::Backends::all());
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = pollster::block_on(Self::request_adapter(&instance, &options))?;
        let adapter_info = adapter.get_info();

        log::info!(
            "Selected GPU adapter: {} ({:?})",
            adapter_info.name,
            adapter_info.backend
        );

        Self::check_limits(&adapter.limits(), &options.required_limits)?;

        let (device, queue) = pollster::block_on(Self::request_device(&adapter, &options))?;
        let limits = device.limits();

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            limits,
        })
    }

    async fn request_adapter(
        instance: &wgpu::Instance,
        options: &WgpuOptions,
    ) -> PoolResult<wgpu::Adapter> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: options.power_preference.into(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await;

        match adapter {
            Some(a) => Ok(a),
            None => instance
                .request_adapter(&wgpu::RequestAdapterOptions {
                    power_preference: wgpu::PowerPreference::None,
                    compatible_surface: None,
                    force_fallback_adapter: false,
                })
                .await
                .ok_or_else(|| {
                    PoolError::adapter_not_found(
                        "No GPU adapters available. Ensure GPU drivers are installed.",
                    )
                }),
        }
    }

    async fn request_device(
        adapter: &wgpu::Adapter,
        options: &WgpuOptions,
    ) -> PoolResult<(wgpu::Device, wgpu::Queue)> {
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("foldpool GPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: options.required_limits.clone(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        Ok((device, queue))
    }

    fn check_limits(adapter: &wgpu::Limits, required: &wgpu::Limits) -> PoolResult<()> {
        if adapter.max_storage_buffer_binding_size < required.max_storage_buffer_binding_size {
            return Err(PoolError::unsupported_limits(format!(
                "max_storage_buffer_binding_size: adapter has {}, required {}",
                adapter.max_storage_buffer_binding_size, required.max_storage_buffer_binding_size
            )));
        }

        if adapter.max_compute_invocations_per_workgroup
            < required.max_compute_invocations_per_workgroup
        {
            return Err(PoolError::unsupported_limits(format!(
                "max_compute_invocations_per_workgroup: adapter has {}, required {}",
                adapter.max_compute_invocations_per_workgroup,
                required.max_compute_invocations_per_workgroup
            )));
        }

        Ok(())
    }

    /// Returns information about the selected adapter.
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Returns the device limits.
    pub fn limits(&self) -> &wgpu::Limits {
        &self.limits
    }

    /// Returns whether a buffer size (in bytes) fits a storage binding.
    pub fn supports_buffer_size(&self, size_bytes: u64) -> bool {
        size_bytes <= self.limits.max_storage_buffer_binding_size as u64
    }

    /// Blocks until the device has completed all submitted work.
    pub fn poll(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }

    /// Returns a reference to the device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Returns a clone of the device Arc.
    pub fn device_arc(&self) -> Arc<wgpu::Device> {
        Arc::clone(&self.device)
    }
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter_info.name)
            .field("backend", &self.adapter_info.backend)
            .field("device_type", &self.adapter_info.device_type)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_default() {
        let opts = WgpuOptions::default();
        assert_eq!(opts.power_preference, PowerPreference::HighPerformance);
        assert!(opts.backend.is_none());
        assert!(opts.required_limits.max_compute_invocations_per_workgroup >= 256);
    }

    // Backend init requires a GPU, run with: cargo test --features gpu -- --ignored
    #[test]
    #[ignore = "Requires GPU"]
    fn test_backend_init() {
        let backend = WgpuBackend::init(WgpuOptions::default()).expect("Failed to init backend");
        assert!(!backend.adapter_info().name.is_empty());
    }
}
