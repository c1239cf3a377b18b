//! Binary occupancy pattern over the generation grid.
//!
//! The pattern is the mutable state of the whole construction: the sampler
//! creates it, the homogenizer swaps single cells until no tight cluster
//! borders a large void, and the ranker toggles cells while assigning
//! ranks. The popcount is cached because the minority-aware reducer needs
//! it on every call.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::GridDims;

/// Row-major binary occupancy grid with a cached popcount.
#[derive(Debug, Clone)]
pub struct BinaryPattern {
    dims: GridDims,
    bits: Vec<bool>,
    ones: usize,
}

impl BinaryPattern {
    /// Creates an all-zero pattern.
    pub fn zeros(dims: GridDims) -> Self {
        Self {
            dims,
            bits: vec![false; dims.cells()],
            ones: 0,
        }
    }

    /// Creates a pattern from explicit bits. Panics if the length does not
    /// match the grid.
    pub fn from_bits(dims: GridDims, bits: Vec<bool>) -> Self {
        assert_eq!(bits.len(), dims.cells(), "bit count must match the grid");
        let ones = bits.iter().filter(|&&b| b).count();
        Self { dims, bits, ones }
    }

    /// Samples a uniform random pattern with exactly `ones` set cells.
    ///
    /// The vector starts with `ones` leading set bits and is shuffled with
    /// a Fisher–Yates pass, so every arrangement with the requested
    /// popcount is equally likely. Deterministic for a fixed `seed`.
    pub fn random(dims: GridDims, ones: usize, seed: u64) -> Self {
        let n = dims.cells();
        assert!(ones <= n, "cannot place more ones than cells");

        let mut bits = vec![false; n];
        for bit in bits.iter_mut().take(ones) {
            *bit = true;
        }

        let mut rng = StdRng::seed_from_u64(seed);
        for i in 0..n.saturating_sub(1) {
            let j = rng.gen_range(i + 1..n);
            bits.swap(i, j);
        }

        Self { dims, bits, ones }
    }

    /// Grid dimensions.
    #[inline]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Cell count.
    #[inline]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// True when the grid has no cells. (Never the case in practice; the
    /// driver rejects empty grids.)
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Number of set cells.
    #[inline]
    pub fn ones(&self) -> usize {
        self.ones
    }

    /// Value of cell `i`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.bits[i]
    }

    /// Sets cell `i`, keeping the popcount cache in sync.
    #[inline]
    pub fn set(&mut self, i: usize, value: bool) {
        if self.bits[i] != value {
            self.bits[i] = value;
            if value {
                self.ones += 1;
            } else {
                self.ones -= 1;
            }
        }
    }

    /// Raw bit slice, row-major.
    #[inline]
    pub fn bits(&self) -> &[bool] {
        &self.bits
    }

    /// Writes the bitwise complement into `out`, resizing it as needed.
    pub fn complement_into(&self, out: &mut Vec<bool>) {
        out.clear();
        out.extend(self.bits.iter().map(|&b| !b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_has_exact_popcount() {
        let dims = GridDims::new(16, 16);
        for seed in 0..4 {
            let p = BinaryPattern::random(dims, 102, seed);
            assert_eq!(p.ones(), 102);
            assert_eq!(p.bits().iter().filter(|&&b| b).count(), 102);
        }
    }

    #[test]
    fn random_is_deterministic_per_seed() {
        let dims = GridDims::new(16, 16);
        let a = BinaryPattern::random(dims, 100, 7);
        let b = BinaryPattern::random(dims, 100, 7);
        assert_eq!(a.bits(), b.bits());

        let c = BinaryPattern::random(dims, 100, 8);
        assert_ne!(a.bits(), c.bits());
    }

    #[test]
    fn set_maintains_popcount() {
        let dims = GridDims::new(4, 4);
        let mut p = BinaryPattern::zeros(dims);
        p.set(3, true);
        p.set(7, true);
        assert_eq!(p.ones(), 2);
        p.set(3, true); // no-op
        assert_eq!(p.ones(), 2);
        p.set(3, false);
        assert_eq!(p.ones(), 1);
    }

    #[test]
    fn complement_flips_every_bit() {
        let dims = GridDims::new(4, 4);
        let p = BinaryPattern::random(dims, 5, 0);
        let mut c = Vec::new();
        p.complement_into(&mut c);
        assert!(p.bits().iter().zip(&c).all(|(&a, &b)| a != b));
    }
}
