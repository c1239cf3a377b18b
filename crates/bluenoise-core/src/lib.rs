//! # bluenoise-core
//!
//! Blue-noise dither array generation via the void-and-cluster method.
//!
//! The generator produces a `width × height` integer array where every
//! rank in `[0, width·height)` appears exactly once and any thresholded
//! subset of the array is free of low-frequency clumping — the lookup
//! table used by ordered-dithering pipelines.
//!
//! ## Modules
//!
//! | Module | What it provides |
//! |--------|-----------------|
//! | [`grid`] | Toroidal 1↔2-D index arithmetic |
//! | [`kernel`] | Precomputed Gaussian weight table (σ = 1.5) |
//! | [`pattern`] | Binary occupancy grid + seeded uniform sampler |
//! | [`energy`] | Toroidal Gaussian energy field, serial and parallel |
//! | [`reduce`] | Minority-aware argmin/argmax reduction |
//! | [`homogenize`] | Cluster→void swap loop to the prototype fixed point |
//! | [`rank`] | Three-phase rank assignment |
//! | [`backend`] | Compute back-end adapter with GPU→CPU fallback |
//! | [`gpu`] | wgpu compute back-end (cargo feature `gpu`) |
//!
//! ## Quick start
//!
//! ```no_run
//! use bluenoise_core::{generate, Preferences};
//!
//! let prefs = Preferences::default().with_seed(42);
//! let array = generate(64, 64, &prefs)?;
//! let bytes = array.to_grayscale();
//! # Ok::<(), bluenoise_core::Error>(())
//! ```
//!
//! Generation is deterministic for a fixed `(width, height, seed,
//! back_end)` and runs to completion or fails — a partially-ranked array
//! is never returned.

pub mod backend;
pub mod config;
pub mod energy;
pub mod error;
pub mod generate;
pub mod grid;
pub mod homogenize;
pub mod kernel;
pub mod pattern;
pub mod rank;
pub mod reduce;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use backend::{BackendKind, ComputeBackend};
pub use config::{BackendPreference, Preferences};
pub use error::{Error, Result};
pub use generate::{generate, DitherArray, MAX_CELLS, MIN_AXIS};
pub use grid::GridDims;
pub use kernel::GaussianKernel;
pub use pattern::BinaryPattern;
pub use reduce::Extrema;
