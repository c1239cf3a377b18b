//! Compute-kernel adapter: a uniform `evaluate` / `extrema` surface over
//! the CPU-single, CPU-parallel and (optionally) GPU back-ends.
//!
//! Selection walks the preference chain GPU → CPU-parallel → CPU-single.
//! Any initialization failure downgrades to the next back-end with a
//! single warning; the semantic contract never changes. Runtime failures
//! of an already-initialized back-end are fatal and surface as
//! [`Error::Backend`].
//!
//! All back-ends produce identical results: the per-cell summation order
//! is fixed, and extrema ties break toward the smallest linear index.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::{BackendPreference, Preferences};
use crate::energy;
use crate::error::{Error, Result};
use crate::grid::GridDims;
use crate::kernel::GaussianKernel;
use crate::pattern::BinaryPattern;
use crate::reduce::{self, Extrema};

#[cfg(feature = "gpu")]
use crate::gpu::GpuExecutor;

/// Worker count used when the caller passes `threads = 0`.
pub const DEFAULT_THREADS: u32 = 10;

/// Identifies which back-end the adapter settled on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Sequential CPU evaluation.
    CpuSingle,
    /// Data-parallel CPU evaluation over a dedicated thread pool.
    CpuParallel,
    /// GPU compute dispatches.
    Gpu,
}

/// The selected compute back-end for one generation call.
pub enum ComputeBackend {
    CpuSingle(CpuSingle),
    CpuParallel(CpuParallel),
    #[cfg(feature = "gpu")]
    Gpu(GpuExecutor),
}

impl ComputeBackend {
    /// Selects a back-end for the given grid, honoring `prefs` and
    /// downgrading on initialization failure.
    pub fn select(prefs: &Preferences, dims: GridDims, kernel: &Arc<GaussianKernel>) -> Self {
        if prefs.back_end != BackendPreference::Cpu {
            #[cfg(feature = "gpu")]
            match GpuExecutor::new(dims, kernel) {
                Ok(executor) => {
                    debug!("compute back-end: gpu");
                    return Self::Gpu(executor);
                }
                Err(e) => {
                    warn!("GPU unavailable ({e}); falling back to CPU");
                }
            }
            #[cfg(not(feature = "gpu"))]
            if prefs.back_end == BackendPreference::Gpu {
                warn!("built without the `gpu` feature; falling back to CPU");
            }
        }

        let threads = if prefs.threads == 0 {
            DEFAULT_THREADS
        } else {
            prefs.threads
        };

        if threads > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads as usize)
                .build()
            {
                Ok(pool) => {
                    debug!(threads, "compute back-end: cpu-parallel");
                    return Self::CpuParallel(CpuParallel {
                        pool,
                        dims,
                        kernel: Arc::clone(kernel),
                        scratch: Vec::new(),
                    });
                }
                Err(e) => {
                    warn!("thread pool unavailable ({e}); falling back to single-threaded CPU");
                }
            }
        }

        debug!("compute back-end: cpu-single");
        Self::CpuSingle(CpuSingle {
            dims,
            kernel: Arc::clone(kernel),
            scratch: Vec::new(),
        })
    }

    /// Which back-end was selected.
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::CpuSingle(_) => BackendKind::CpuSingle,
            Self::CpuParallel(_) => BackendKind::CpuParallel,
            #[cfg(feature = "gpu")]
            Self::Gpu(_) => BackendKind::Gpu,
        }
    }

    /// Overwrites `out` with the energy field of `pattern`.
    ///
    /// With `reversed` set, the zero cells contribute instead: the field
    /// equals an evaluation of the bitwise complement. Blocks until all
    /// workers (or the GPU queue) have finished.
    pub fn evaluate(
        &mut self,
        pattern: &BinaryPattern,
        reversed: bool,
        out: &mut [f32],
    ) -> Result<()> {
        match self {
            Self::CpuSingle(b) => {
                b.evaluate(pattern, reversed, out);
                Ok(())
            }
            Self::CpuParallel(b) => {
                b.evaluate(pattern, reversed, out);
                Ok(())
            }
            #[cfg(feature = "gpu")]
            Self::Gpu(b) => b
                .evaluate(pattern, reversed, out)
                .map_err(|e| Error::Backend(e.to_string())),
        }
    }

    /// Minority-aware extrema of `energy` under `pattern`.
    pub fn extrema(&mut self, energy: &[f32], pattern: &BinaryPattern) -> Result<Extrema> {
        let found = match self {
            Self::CpuSingle(_) | Self::CpuParallel(_) => reduce::extrema(energy, pattern),
            #[cfg(feature = "gpu")]
            Self::Gpu(b) => b
                .extrema(energy, pattern)
                .map_err(|e| Error::Backend(e.to_string()))?,
        };
        found.ok_or(Error::InvariantViolation(
            "extrema reduction over a single-class pattern",
        ))
    }
}

/// Sequential CPU back-end.
pub struct CpuSingle {
    dims: GridDims,
    kernel: Arc<GaussianKernel>,
    scratch: Vec<bool>,
}

impl CpuSingle {
    fn evaluate(&mut self, pattern: &BinaryPattern, reversed: bool, out: &mut [f32]) {
        if reversed {
            pattern.complement_into(&mut self.scratch);
            energy::evaluate_serial(&self.dims, &self.kernel, &self.scratch, out);
        } else {
            energy::evaluate_serial(&self.dims, &self.kernel, pattern.bits(), out);
        }
    }
}

/// Data-parallel CPU back-end with a dedicated worker pool.
pub struct CpuParallel {
    pool: rayon::ThreadPool,
    dims: GridDims,
    kernel: Arc<GaussianKernel>,
    scratch: Vec<bool>,
}

impl CpuParallel {
    fn evaluate(&mut self, pattern: &BinaryPattern, reversed: bool, out: &mut [f32]) {
        let bits = if reversed {
            pattern.complement_into(&mut self.scratch);
            self.scratch.as_slice()
        } else {
            pattern.bits()
        };
        energy::evaluate_parallel(&self.pool, &self.dims, &self.kernel, bits, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(w: u32, h: u32) -> (GridDims, Arc<GaussianKernel>, BinaryPattern) {
        let dims = GridDims::new(w, h);
        let kernel = Arc::new(GaussianKernel::new(GaussianKernel::size_for_grid(w, h)));
        let pattern = BinaryPattern::random(dims, dims.cells() * 2 / 5, 1);
        (dims, kernel, pattern)
    }

    #[test]
    fn cpu_preference_selects_cpu() {
        let (dims, kernel, _) = setup(16, 16);
        let b = ComputeBackend::select(&Preferences::cpu(1), dims, &kernel);
        assert_eq!(b.kind(), BackendKind::CpuSingle);

        let b = ComputeBackend::select(&Preferences::cpu(4), dims, &kernel);
        assert_eq!(b.kind(), BackendKind::CpuParallel);
    }

    #[test]
    fn zero_threads_selects_parallel_default() {
        let (dims, kernel, _) = setup(16, 16);
        let b = ComputeBackend::select(&Preferences::cpu(0), dims, &kernel);
        assert_eq!(b.kind(), BackendKind::CpuParallel);
    }

    #[test]
    fn single_and_parallel_agree() {
        let (dims, kernel, pattern) = setup(16, 16);
        let mut single = ComputeBackend::select(&Preferences::cpu(1), dims, &kernel);
        let mut parallel = ComputeBackend::select(&Preferences::cpu(4), dims, &kernel);

        let mut e1 = vec![0.0f32; dims.cells()];
        let mut e2 = vec![0.0f32; dims.cells()];
        for reversed in [false, true] {
            single.evaluate(&pattern, reversed, &mut e1).unwrap();
            parallel.evaluate(&pattern, reversed, &mut e2).unwrap();
            assert_eq!(e1, e2);
            assert_eq!(
                single.extrema(&e1, &pattern).unwrap(),
                parallel.extrema(&e2, &pattern).unwrap()
            );
        }
    }

    #[test]
    fn reversed_equals_complement_evaluation() {
        let (dims, kernel, pattern) = setup(16, 16);
        let mut backend = ComputeBackend::select(&Preferences::cpu(1), dims, &kernel);

        let mut reversed = vec![0.0f32; dims.cells()];
        backend.evaluate(&pattern, true, &mut reversed).unwrap();

        let mut bits = Vec::new();
        pattern.complement_into(&mut bits);
        let complement = BinaryPattern::from_bits(dims, bits);
        let mut direct = vec![0.0f32; dims.cells()];
        backend.evaluate(&complement, false, &mut direct).unwrap();

        assert_eq!(reversed, direct);
    }
}
