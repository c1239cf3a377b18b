//! Host-side driver for the GPU back-end.
//!
//! Owns every buffer and pipeline for one generation call. The occupancy
//! bits are re-uploaded before each dispatch (the pattern changes between
//! calls); the kernel weights and grid constants are uploaded once.

use bytemuck::{Pod, Zeroable};
use tracing::debug;

use crate::grid::GridDims;
use crate::kernel::GaussianKernel;
use crate::pattern::BinaryPattern;
use crate::reduce::{self, Extrema};

use super::buffer::{BufferRole, GpuBuffer};
use super::device::GpuContext;
use super::pipeline::ComputePipeline;
use super::{shaders, GpuError, GpuResult};

/// Grid constants bound as a uniform to the energy kernel.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct DimsUniform {
    width: u32,
    height: u32,
    filter_size: u32,
    cells: u32,
}

/// One element of the reduction buffers: energy value, linear index and
/// the (possibly minority-flipped) polarity of the cell.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ReduceCell {
    value: f32,
    index: u32,
    polarity: u32,
    pad: u32,
}

/// Active element count for one reduction level.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ReduceState {
    len: u32,
    pad0: u32,
    pad1: u32,
    pad2: u32,
}

/// GPU implementation of the evaluate/extrema contract.
pub struct GpuExecutor {
    ctx: GpuContext,
    dims: GridDims,

    energy_pipeline: ComputePipeline,
    energy_bind: wgpu::BindGroup,
    pattern_buf: GpuBuffer,
    energy_buf: GpuBuffer,
    energy_staging: GpuBuffer,

    extrema_pipeline: ComputePipeline,
    extrema_bind: wgpu::BindGroup,
    min_in: GpuBuffer,
    max_in: GpuBuffer,
    min_out: GpuBuffer,
    max_out: GpuBuffer,
    state_buf: GpuBuffer,
    min_staging: GpuBuffer,
    max_staging: GpuBuffer,

    bits_scratch: Vec<u32>,
    cells_scratch: Vec<ReduceCell>,
}

impl GpuExecutor {
    /// Acquires a device and builds both pipelines and all buffers for a
    /// `dims` grid. Any failure here is recovered by the selection chain.
    pub fn new(dims: GridDims, kernel: &GaussianKernel) -> GpuResult<Self> {
        let ctx = GpuContext::acquire()?;
        let n = dims.cells();

        let max_groups = ctx.device().limits().max_compute_workgroups_per_dimension;
        if ComputePipeline::workgroups_for(n as u32) > max_groups {
            return Err(GpuError::DeviceRequest(format!(
                "grid needs more than {max_groups} workgroups"
            )));
        }

        let device = ctx.device();
        let queue = ctx.queue();

        let pattern_buf = GpuBuffer::new(
            device,
            n * std::mem::size_of::<u32>(),
            BufferRole::StorageRead,
            "pattern",
        );
        let weights_buf = GpuBuffer::with_data(
            device,
            queue,
            kernel.weights(),
            BufferRole::StorageRead,
            "kernel-weights",
        );
        let energy_buf = GpuBuffer::new(
            device,
            n * std::mem::size_of::<f32>(),
            BufferRole::StorageReadWrite,
            "energy",
        );
        let dims_buf = GpuBuffer::with_data(
            device,
            queue,
            &[DimsUniform {
                width: dims.width(),
                height: dims.height(),
                filter_size: kernel.size() as u32,
                cells: n as u32,
            }],
            BufferRole::Uniform,
            "dims",
        );
        let energy_staging = GpuBuffer::new(
            device,
            n * std::mem::size_of::<f32>(),
            BufferRole::Staging,
            "energy-staging",
        );

        let energy_pipeline = ComputePipeline::from_shader(
            device,
            shaders::ENERGY,
            "energy_main",
            &[
                BufferRole::StorageRead,
                BufferRole::StorageRead,
                BufferRole::StorageReadWrite,
                BufferRole::Uniform,
            ],
            "energy",
        )?;
        // The bind group keeps the weight and uniform buffers alive; they
        // are immutable after this point and never touched again by the
        // host.
        let energy_bind = energy_pipeline.create_bind_group(
            device,
            &[&pattern_buf, &weights_buf, &energy_buf, &dims_buf],
            "energy-bind",
        )?;

        let cell_size = std::mem::size_of::<ReduceCell>();
        let half = n.div_ceil(2);
        let min_in = GpuBuffer::new(device, n * cell_size, BufferRole::StorageRead, "min-in");
        let max_in = GpuBuffer::new(device, n * cell_size, BufferRole::StorageRead, "max-in");
        let min_out = GpuBuffer::new(
            device,
            half * cell_size,
            BufferRole::StorageReadWrite,
            "min-out",
        );
        let max_out = GpuBuffer::new(
            device,
            half * cell_size,
            BufferRole::StorageReadWrite,
            "max-out",
        );
        let state_buf = GpuBuffer::new(
            device,
            std::mem::size_of::<ReduceState>(),
            BufferRole::Uniform,
            "reduce-state",
        );
        let min_staging = GpuBuffer::new(device, cell_size, BufferRole::Staging, "min-staging");
        let max_staging = GpuBuffer::new(device, cell_size, BufferRole::Staging, "max-staging");

        let extrema_pipeline = ComputePipeline::from_shader(
            device,
            shaders::EXTREMA,
            "extrema_main",
            &[
                BufferRole::StorageRead,
                BufferRole::StorageRead,
                BufferRole::StorageReadWrite,
                BufferRole::StorageReadWrite,
                BufferRole::Uniform,
            ],
            "extrema",
        )?;
        let extrema_bind = extrema_pipeline.create_bind_group(
            device,
            &[&min_in, &max_in, &min_out, &max_out, &state_buf],
            "extrema-bind",
        )?;

        debug!(cells = n, filter = kernel.size(), "GPU executor ready");

        Ok(Self {
            ctx,
            dims,
            energy_pipeline,
            energy_bind,
            pattern_buf,
            energy_buf,
            energy_staging,
            extrema_pipeline,
            extrema_bind,
            min_in,
            max_in,
            min_out,
            max_out,
            state_buf,
            min_staging,
            max_staging,
            bits_scratch: Vec::with_capacity(n),
            cells_scratch: Vec::with_capacity(n),
        })
    }

    /// Evaluates the energy field of `pattern` into `out`. With
    /// `reversed`, the complement bits are uploaded, so the zero cells
    /// contribute.
    pub fn evaluate(
        &mut self,
        pattern: &BinaryPattern,
        reversed: bool,
        out: &mut [f32],
    ) -> GpuResult<()> {
        let n = self.dims.cells();
        debug_assert_eq!(pattern.len(), n);
        debug_assert_eq!(out.len(), n);

        self.bits_scratch.clear();
        self.bits_scratch
            .extend(pattern.bits().iter().map(|&b| u32::from(b != reversed)));
        self.pattern_buf.write(self.ctx.queue(), &self.bits_scratch)?;

        let mut encoder =
            self.ctx
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("energy"),
                });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("energy"),
                timestamp_writes: None,
            });
            pass.set_pipeline(self.energy_pipeline.pipeline());
            pass.set_bind_group(0, Some(&self.energy_bind), &[]);
            pass.dispatch_workgroups(ComputePipeline::workgroups_for(n as u32), 1, 1);
        }
        encoder.copy_buffer_to_buffer(
            self.energy_buf.raw(),
            0,
            self.energy_staging.raw(),
            0,
            self.energy_buf.size() as u64,
        );
        self.ctx.submit(encoder.finish());

        let values: Vec<f32> = self.energy_staging.read_back(self.ctx.device(), n)?;
        out.copy_from_slice(&values);
        Ok(())
    }

    /// Tree-reduces `energy` into the minority-aware extrema.
    ///
    /// The minority flip is resolved on the host when the reduction
    /// triples are built, exactly like the CPU reducer; the device only
    /// ever sees the effective polarity.
    pub fn extrema(
        &mut self,
        energy: &[f32],
        pattern: &BinaryPattern,
    ) -> GpuResult<Option<Extrema>> {
        let n = pattern.len();
        debug_assert_eq!(energy.len(), n);

        let flip = reduce::minority_flipped(pattern);
        self.cells_scratch.clear();
        for (i, &value) in energy.iter().enumerate() {
            self.cells_scratch.push(ReduceCell {
                value,
                index: i as u32,
                polarity: u32::from(pattern.get(i) != flip),
                pad: 0,
            });
        }

        let queue = self.ctx.queue();
        self.min_in.write(queue, &self.cells_scratch)?;
        self.max_in.write(queue, &self.cells_scratch)?;

        let cell_size = std::mem::size_of::<ReduceCell>() as u64;
        let mut len = n as u32;
        while len > 1 {
            let out_len = len.div_ceil(2);
            self.state_buf.write(
                self.ctx.queue(),
                &[ReduceState {
                    len,
                    pad0: 0,
                    pad1: 0,
                    pad2: 0,
                }],
            )?;

            let mut encoder =
                self.ctx
                    .device()
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("extrema"),
                    });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("extrema"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(self.extrema_pipeline.pipeline());
                pass.set_bind_group(0, Some(&self.extrema_bind), &[]);
                pass.dispatch_workgroups(ComputePipeline::workgroups_for(out_len), 1, 1);
            }
            // Feed this level's result back as the next level's input.
            encoder.copy_buffer_to_buffer(
                self.min_out.raw(),
                0,
                self.min_in.raw(),
                0,
                out_len as u64 * cell_size,
            );
            encoder.copy_buffer_to_buffer(
                self.max_out.raw(),
                0,
                self.max_in.raw(),
                0,
                out_len as u64 * cell_size,
            );
            self.ctx.submit(encoder.finish());

            len = out_len;
        }

        let mut encoder =
            self.ctx
                .device()
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("extrema-readback"),
                });
        encoder.copy_buffer_to_buffer(self.min_in.raw(), 0, self.min_staging.raw(), 0, cell_size);
        encoder.copy_buffer_to_buffer(self.max_in.raw(), 0, self.max_staging.raw(), 0, cell_size);
        self.ctx.submit(encoder.finish());

        let min: ReduceCell = self.min_staging.read_back(self.ctx.device(), 1)?[0];
        let max: ReduceCell = self.max_staging.read_back(self.ctx.device(), 1)?[0];

        // A surviving cell of the wrong polarity means that class was
        // empty; the caller treats that as an invariant violation.
        if min.polarity != 0 || max.polarity != 1 {
            return Ok(None);
        }

        Ok(Some(Extrema {
            largest_void: min.index as usize,
            tightest_cluster: max.index as usize,
        }))
    }
}
