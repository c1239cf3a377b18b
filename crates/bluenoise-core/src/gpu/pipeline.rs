//! Compute pipeline construction and bind group management.

use wgpu::Device;

use super::buffer::{BufferRole, GpuBuffer};
use super::{GpuError, GpuResult, WORKGROUP_SIZE};

/// A compute pipeline with its bind group layout.
pub struct ComputePipeline {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    binding_count: usize,
}

impl ComputePipeline {
    /// Compiles `shader_source` (WGSL) and builds a pipeline whose layout
    /// matches `bindings`, in binding-slot order.
    pub fn from_shader(
        device: &Device,
        shader_source: &str,
        entry_point: &str,
        bindings: &[BufferRole],
        label: &str,
    ) -> GpuResult<Self> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = bindings
            .iter()
            .enumerate()
            .map(|(i, role)| wgpu::BindGroupLayoutEntry {
                binding: i as u32,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: match role {
                    BufferRole::StorageRead => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    BufferRole::StorageReadWrite => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    BufferRole::Uniform => wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    BufferRole::Staging => {
                        unreachable!("staging buffers are never bound to a pipeline")
                    }
                },
                count: None,
            })
            .collect();

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &layout_entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(entry_point),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            cache: None,
        });

        Ok(Self {
            pipeline,
            bind_group_layout,
            binding_count: bindings.len(),
        })
    }

    /// Binds `buffers` to the pipeline layout, slot by slot.
    pub fn create_bind_group(
        &self,
        device: &Device,
        buffers: &[&GpuBuffer],
        label: &str,
    ) -> GpuResult<wgpu::BindGroup> {
        if buffers.len() != self.binding_count {
            return Err(GpuError::PipelineCreation(format!(
                "expected {} bindings, got {}",
                self.binding_count,
                buffers.len()
            )));
        }

        let entries: Vec<wgpu::BindGroupEntry> = buffers
            .iter()
            .enumerate()
            .map(|(i, buffer)| buffer.binding(i as u32))
            .collect();

        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.bind_group_layout,
            entries: &entries,
        }))
    }

    /// The underlying wgpu pipeline.
    pub fn pipeline(&self) -> &wgpu::ComputePipeline {
        &self.pipeline
    }

    /// Workgroups needed to cover `items` work items.
    pub fn workgroups_for(items: u32) -> u32 {
        items.div_ceil(WORKGROUP_SIZE)
    }
}
