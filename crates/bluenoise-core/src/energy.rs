//! Toroidal Gaussian energy field evaluation.
//!
//! For every cell the evaluator sums the kernel weight of each occupied
//! cell within the filter window, wrapping both axes. This is the hot path
//! of the whole construction: it runs once or twice per homogenizer
//! iteration and once per assigned rank, so for useful grid sizes the
//! inner loop executes millions of times.
//!
//! Cells are independent, so the field can be partitioned across workers
//! by output row; the pattern and kernel are read-only for the duration of
//! a call.

use rayon::prelude::*;

use crate::grid::GridDims;
use crate::kernel::GaussianKernel;

/// Energy of a single cell: Gaussian-weighted count of occupied cells in
/// the toroidal filter window centered on `(x, y)`.
#[inline]
fn cell_energy(dims: &GridDims, kernel: &GaussianKernel, bits: &[bool], x: u32, y: u32) -> f32 {
    let size = kernel.size() as i64;
    let half = size / 2;
    let width = dims.width() as i64;
    let height = dims.height() as i64;
    let weights = kernel.weights();

    let mut sum = 0.0f32;
    for q in 0..size {
        let wy = ((y as i64 + q - half).rem_euclid(height) as usize) * width as usize;
        let row = (q * size) as usize;
        for p in 0..size {
            let wx = (x as i64 + p - half).rem_euclid(width) as usize;
            if bits[wy + wx] {
                sum += weights[row + p as usize];
            }
        }
    }
    sum
}

/// Overwrites `out` with the energy field of `bits`, sequentially.
pub fn evaluate_serial(dims: &GridDims, kernel: &GaussianKernel, bits: &[bool], out: &mut [f32]) {
    debug_assert_eq!(bits.len(), dims.cells());
    debug_assert_eq!(out.len(), dims.cells());

    let width = dims.width();
    for (y, row) in out.chunks_mut(width as usize).enumerate() {
        for (x, cell) in row.iter_mut().enumerate() {
            *cell = cell_energy(dims, kernel, bits, x as u32, y as u32);
        }
    }
}

/// Overwrites `out` with the energy field of `bits`, fanning the output
/// rows across the given thread pool. Each worker writes a disjoint range
/// of `out`; the result is identical to [`evaluate_serial`] because every
/// cell's summation order is fixed regardless of scheduling.
pub fn evaluate_parallel(
    pool: &rayon::ThreadPool,
    dims: &GridDims,
    kernel: &GaussianKernel,
    bits: &[bool],
    out: &mut [f32],
) {
    debug_assert_eq!(bits.len(), dims.cells());
    debug_assert_eq!(out.len(), dims.cells());

    let width = dims.width() as usize;
    pool.install(|| {
        out.par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, cell) in row.iter_mut().enumerate() {
                    *cell = cell_energy(dims, kernel, bits, x as u32, y as u32);
                }
            });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::BinaryPattern;

    fn small_kernel() -> GaussianKernel {
        GaussianKernel::new(9)
    }

    #[test]
    fn empty_pattern_has_zero_energy() {
        let dims = GridDims::new(8, 8);
        let p = BinaryPattern::zeros(dims);
        let mut e = vec![1.0f32; dims.cells()];
        evaluate_serial(&dims, &small_kernel(), p.bits(), &mut e);
        assert!(e.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn single_one_reproduces_kernel_weights() {
        let dims = GridDims::new(16, 16);
        let kernel = small_kernel();
        let mut p = BinaryPattern::zeros(dims);
        let center = dims.to_linear(5, 6);
        p.set(center, true);

        let mut e = vec![0.0f32; dims.cells()];
        evaluate_serial(&dims, &kernel, p.bits(), &mut e);

        let half = kernel.half() as i64;
        for dy in -half..=half {
            for dx in -half..=half {
                let i = dims.to_linear(5 + dx, 6 + dy);
                let expected = kernel.at((dx + half) as usize, (dy + half) as usize);
                assert!(
                    (e[i] - expected).abs() < 1e-6,
                    "offset ({dx},{dy}): {} != {expected}",
                    e[i]
                );
            }
        }
        // Cells outside the window see nothing.
        let far = dims.to_linear(5 + half + 1, 6);
        assert_eq!(e[far], 0.0);
    }

    #[test]
    fn wraps_across_the_seam() {
        let dims = GridDims::new(16, 16);
        let kernel = small_kernel();
        let mut p = BinaryPattern::zeros(dims);
        p.set(dims.to_linear(0, 0), true);

        let mut e = vec![0.0f32; dims.cells()];
        evaluate_serial(&dims, &kernel, p.bits(), &mut e);

        // The cell one step "before" the origin sits right next to it on
        // the torus and must see the distance-1 weight.
        let neighbor = dims.to_linear(-1, 0);
        assert!((e[neighbor] - kernel.at(kernel.half() - 1, kernel.half())).abs() < 1e-6);
    }

    #[test]
    fn parallel_matches_serial_bitwise() {
        let dims = GridDims::new(24, 16);
        let kernel = GaussianKernel::new(GaussianKernel::size_for_grid(24, 16));
        let p = BinaryPattern::random(dims, dims.cells() * 2 / 5, 42);

        let mut serial = vec![0.0f32; dims.cells()];
        evaluate_serial(&dims, &kernel, p.bits(), &mut serial);

        for threads in [2usize, 4] {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap();
            let mut parallel = vec![0.0f32; dims.cells()];
            evaluate_parallel(&pool, &dims, &kernel, p.bits(), &mut parallel);
            assert_eq!(serial, parallel);
        }
    }

    #[test]
    fn complement_evaluation_matches_reversed_semantics() {
        let dims = GridDims::new(16, 16);
        let kernel = small_kernel();
        let p = BinaryPattern::random(dims, 100, 3);

        let mut complement = Vec::new();
        p.complement_into(&mut complement);

        let mut e = vec![0.0f32; dims.cells()];
        evaluate_serial(&dims, &kernel, &complement, &mut e);

        // Energy of the complement counts exactly the zero cells.
        let mut manual = vec![0.0f32; dims.cells()];
        let flipped: Vec<bool> = p.bits().iter().map(|&b| !b).collect();
        evaluate_serial(&dims, &kernel, &flipped, &mut manual);
        assert_eq!(e, manual);
    }
}
