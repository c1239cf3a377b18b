//! GPU device acquisition.

use std::sync::Arc;

use tracing::{debug, info, warn};
use wgpu::{Adapter, Device, Instance, Queue};

use super::{GpuError, GpuResult};

/// Acquired wgpu instance, adapter, device and queue.
///
/// All command submissions go through the single `queue`; `poll_wait`
/// blocks until the device is idle. Handles are released on drop in
/// reverse acquisition order.
pub struct GpuContext {
    #[allow(dead_code)]
    instance: Instance,
    adapter: Adapter,
    device: Arc<Device>,
    queue: Arc<Queue>,
}

impl GpuContext {
    /// Acquires a compute-capable device, preferring a high-performance
    /// adapter.
    ///
    /// # Errors
    ///
    /// [`GpuError::NoAdapter`] when no adapter is available,
    /// [`GpuError::DeviceRequest`] when device creation fails. Both are
    /// recovered by the back-end selection chain.
    pub fn acquire() -> GpuResult<Self> {
        pollster::block_on(Self::acquire_async())
    }

    async fn acquire_async() -> GpuResult<Self> {
        let instance = Instance::new(wgpu::InstanceDescriptor::default());

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        info!(
            "GPU adapter: {} ({:?})",
            adapter_info.name, adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("bluenoise-gpu"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        device.on_uncaptured_error(Box::new(|error| {
            warn!("uncaptured GPU error: {error:?}");
        }));

        debug!("GPU device ready");

        Ok(Self {
            instance,
            adapter,
            device: Arc::new(device),
            queue: Arc::new(queue),
        })
    }

    /// The wgpu device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The command queue.
    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    /// The selected adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Submits a command buffer to the queue.
    pub fn submit(&self, command_buffer: wgpu::CommandBuffer) {
        self.queue.submit(std::iter::once(command_buffer));
    }

    /// Blocks until all submitted work has completed.
    pub fn poll_wait(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}
