//! GPU buffer wrappers: typed creation, upload and staging readback.

use bytemuck::Pod;
use futures::channel::oneshot;
use wgpu::{Buffer, BufferDescriptor, BufferUsages, Device, Queue};

use super::{GpuError, GpuResult};

/// How a buffer is bound by the compute kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferRole {
    /// Read-only storage binding.
    StorageRead,
    /// Read-write storage binding.
    StorageReadWrite,
    /// Uniform binding.
    Uniform,
    /// Host-mappable readback target (never bound to a pipeline).
    Staging,
}

impl BufferRole {
    fn usages(self) -> BufferUsages {
        match self {
            Self::StorageRead | Self::StorageReadWrite => {
                BufferUsages::STORAGE | BufferUsages::COPY_SRC | BufferUsages::COPY_DST
            }
            Self::Uniform => BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            Self::Staging => BufferUsages::MAP_READ | BufferUsages::COPY_DST,
        }
    }
}

/// A wgpu buffer with its byte size and binding role.
pub struct GpuBuffer {
    buffer: Buffer,
    size: usize,
    role: BufferRole,
}

impl GpuBuffer {
    /// Creates an uninitialized buffer of `size` bytes.
    pub fn new(device: &Device, size: usize, role: BufferRole, label: &str) -> Self {
        let buffer = device.create_buffer(&BufferDescriptor {
            label: Some(label),
            size: size as u64,
            usage: role.usages(),
            mapped_at_creation: false,
        });
        Self { buffer, size, role }
    }

    /// Creates a buffer initialized with `data`.
    pub fn with_data<T: Pod>(
        device: &Device,
        queue: &Queue,
        data: &[T],
        role: BufferRole,
        label: &str,
    ) -> Self {
        let this = Self::new(device, std::mem::size_of_val(data), role, label);
        queue.write_buffer(&this.buffer, 0, bytemuck::cast_slice(data));
        this
    }

    /// Overwrites the buffer contents. The upload must fit exactly the
    /// region written by the kernels, so a short or long slice is an
    /// error rather than a partial write.
    pub fn write<T: Pod>(&self, queue: &Queue, data: &[T]) -> GpuResult<()> {
        let bytes = bytemuck::cast_slice(data);
        if bytes.len() > self.size {
            return Err(GpuError::BufferSizeMismatch {
                expected: self.size,
                actual: bytes.len(),
            });
        }
        queue.write_buffer(&self.buffer, 0, bytes);
        Ok(())
    }

    /// The underlying wgpu buffer.
    pub fn raw(&self) -> &Buffer {
        &self.buffer
    }

    /// Byte size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Binding role.
    pub fn role(&self) -> BufferRole {
        self.role
    }

    /// Bind group entry for binding slot `index`.
    pub fn binding(&self, index: u32) -> wgpu::BindGroupEntry<'_> {
        wgpu::BindGroupEntry {
            binding: index,
            resource: self.buffer.as_entire_binding(),
        }
    }

    /// Maps a staging buffer and copies `count` elements back to the host.
    ///
    /// Blocks until the device has finished all submitted work. Only valid
    /// on [`BufferRole::Staging`] buffers.
    pub fn read_back<T: Pod + Clone>(&self, device: &Device, count: usize) -> GpuResult<Vec<T>> {
        debug_assert_eq!(self.role, BufferRole::Staging);

        let slice = self.buffer.slice(..);
        let (sender, receiver) = oneshot::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        device.poll(wgpu::Maintain::Wait);

        pollster::block_on(receiver)
            .map_err(|_| GpuError::BufferRead("map channel closed".into()))??;

        let mapped = slice.get_mapped_range();
        let bytes = count * std::mem::size_of::<T>();
        if bytes > mapped.len() {
            return Err(GpuError::BufferSizeMismatch {
                expected: bytes,
                actual: mapped.len(),
            });
        }
        let out: Vec<T> = bytemuck::cast_slice(&mapped[..bytes]).to_vec();

        drop(mapped);
        self.buffer.unmap();

        Ok(out)
    }
}
