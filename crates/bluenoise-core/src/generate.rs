//! Generation driver: compose sampler, homogenizer and ranker into the
//! public entry point.

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::ComputeBackend;
use crate::config::Preferences;
use crate::error::{Error, Result};
use crate::grid::GridDims;
use crate::kernel::GaussianKernel;
use crate::pattern::BinaryPattern;
use crate::{homogenize, rank};

/// Smallest supported grid axis.
pub const MIN_AXIS: u32 = 16;

/// Largest supported cell count (2²⁴).
pub const MAX_CELLS: u64 = 1 << 24;

/// A generated blue-noise dither array: a permutation of `[0, N)` laid out
/// row-major over a `width × height` torus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DitherArray {
    width: u32,
    height: u32,
    ranks: Vec<u32>,
}

impl DitherArray {
    /// Grid width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Grid height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The per-cell ranks, row-major. Always a permutation of
    /// `[0, width·height)`.
    #[inline]
    pub fn ranks(&self) -> &[u32] {
        &self.ranks
    }

    /// Consumes the array, returning the rank vector.
    pub fn into_ranks(self) -> Vec<u32> {
        self.ranks
    }

    /// Rank at `(x, y)`.
    #[inline]
    pub fn at(&self, x: u32, y: u32) -> u32 {
        self.ranks[(y * self.width + x) as usize]
    }

    /// Maps the ranks to an 8-bit grayscale buffer,
    /// `byte = round(rank · 255 / (N − 1))`.
    ///
    /// This is a boundary convenience for image sinks; the correctness of
    /// the array itself never depends on it.
    pub fn to_grayscale(&self) -> Vec<u8> {
        let n = self.ranks.len();
        let span = (n - 1) as f32;
        self.ranks
            .iter()
            .map(|&r| (r as f32 * 255.0 / span).round() as u8)
            .collect()
    }
}

/// Generates a `width × height` blue-noise dither array.
///
/// Deterministic for fixed `(width, height, prefs.seed, prefs.back_end)`.
/// Runs to completion or fails; a partially-ranked array is never
/// returned.
///
/// # Errors
///
/// [`Error::DimensionTooSmall`] / [`Error::GridTooLarge`] /
/// [`Error::EmptyPixelBudget`] for invalid inputs, [`Error::Backend`] if
/// an initialized back-end fails mid-run.
pub fn generate(width: u32, height: u32, prefs: &Preferences) -> Result<DitherArray> {
    if width < MIN_AXIS {
        return Err(Error::DimensionTooSmall {
            axis: "width",
            value: width,
            min: MIN_AXIS,
        });
    }
    if height < MIN_AXIS {
        return Err(Error::DimensionTooSmall {
            axis: "height",
            value: height,
            min: MIN_AXIS,
        });
    }
    let cells = width as u64 * height as u64;
    if cells > MAX_CELLS {
        return Err(Error::GridTooLarge {
            cells,
            max: MAX_CELLS,
        });
    }

    let dims = GridDims::new(width, height);
    let n = dims.cells();
    // The prototype starts at 2/5 coverage.
    let minority = n * 2 / 5;
    if minority == 0 {
        return Err(Error::EmptyPixelBudget { width, height });
    }

    info!(width, height, seed = prefs.seed, "generating dither array");

    let kernel = Arc::new(GaussianKernel::new(GaussianKernel::size_for_grid(
        width, height,
    )));
    let mut backend = ComputeBackend::select(prefs, dims, &kernel);
    debug!(kind = ?backend.kind(), filter = kernel.size(), "back-end selected");

    let mut pattern = BinaryPattern::random(dims, minority, prefs.seed);
    let mut energy = vec![0.0f32; n];

    let swaps = homogenize::homogenize(&mut backend, &mut pattern, &mut energy)?;
    debug!(swaps, "homogenized");

    let ranks = rank::assign_ranks(&mut backend, &mut pattern, &mut energy)?;

    debug_assert!({
        let mut sorted = ranks.clone();
        sorted.sort_unstable();
        sorted.iter().enumerate().all(|(i, &r)| i as u32 == r)
    });

    Ok(DitherArray {
        width,
        height,
        ranks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Preferences;

    #[test]
    fn rejects_small_axes() {
        let prefs = Preferences::cpu(1);
        assert!(matches!(
            generate(15, 16, &prefs),
            Err(Error::DimensionTooSmall { axis: "width", .. })
        ));
        assert!(matches!(
            generate(16, 8, &prefs),
            Err(Error::DimensionTooSmall { axis: "height", .. })
        ));
    }

    #[test]
    fn rejects_oversized_grids() {
        let prefs = Preferences::cpu(1);
        assert!(matches!(
            generate(1 << 13, 1 << 13, &prefs),
            Err(Error::GridTooLarge { .. })
        ));
    }

    #[test]
    fn grayscale_mapping_covers_full_range() {
        let prefs = Preferences::cpu(1).with_seed(0);
        let array = generate(16, 16, &prefs).unwrap();
        let bytes = array.to_grayscale();
        assert_eq!(bytes.len(), 256);
        assert!(bytes.contains(&0));
        assert!(bytes.contains(&255));
    }
}
