//! GPU back-end for the energy evaluator and extrema reducer.
//!
//! Built on wgpu compute. Two kernels are dispatched:
//!
//! 1. **energy** — one work item per cell, workgroup size 256; bindings
//!    are the occupancy bits and Gaussian weights (read-only storage), the
//!    energy field (read-write storage) and the grid constants (uniform).
//! 2. **extrema** — a tree reduction over `(value, index, polarity)`
//!    triples: paired input buffers feed per-pair argmin-over-zeros into
//!    the min output and argmax-over-ones into the max output, halving the
//!    active length per dispatch until one triple remains in each.
//!
//! All submissions are serialized on the single device queue; each
//! operation waits for device idle before reading staging buffers back.
//! wgpu handles are released on drop on every exit path, so a failure in
//! any initialization step unwinds the steps before it.
//!
//! This module only exists with the `gpu` cargo feature enabled. It never
//! surfaces initialization errors past the adapter: the selection chain
//! downgrades to the CPU back-ends instead.

mod buffer;
mod device;
mod executor;
mod pipeline;
mod shaders;

pub use device::GpuContext;
pub use executor::GpuExecutor;

use thiserror::Error;

/// Workgroup size for both compute kernels.
pub const WORKGROUP_SIZE: u32 = 256;

/// Result alias for GPU operations.
pub type GpuResult<T> = Result<T, GpuError>;

/// Errors raised by the GPU back-end.
///
/// Initialization-time variants are recovered by falling back to a CPU
/// back-end; runtime variants abort the generation call.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No adapter with compute support was found.
    #[error("no suitable GPU adapter found")]
    NoAdapter,

    /// Device creation failed on the selected adapter.
    #[error("failed to create GPU device: {0}")]
    DeviceRequest(String),

    /// Shader compilation or pipeline creation failed.
    #[error("failed to create compute pipeline: {0}")]
    PipelineCreation(String),

    /// Staging buffer mapping failed during readback.
    #[error("buffer readback failed: {0}")]
    BufferRead(String),

    /// A buffer was bound or written with a mismatched size.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSizeMismatch {
        /// Expected byte length.
        expected: usize,
        /// Actual byte length.
        actual: usize,
    },

    /// The device was lost or a submission failed mid-run.
    #[error("GPU execution failed: {0}")]
    ExecutionFailed(String),
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        Self::DeviceRequest(e.to_string())
    }
}

impl From<wgpu::BufferAsyncError> for GpuError {
    fn from(e: wgpu::BufferAsyncError) -> Self {
        Self::BufferRead(e.to_string())
    }
}
