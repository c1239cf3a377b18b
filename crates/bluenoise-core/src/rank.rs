//! Three-phase rank assignment.
//!
//! Starting from the homogenized prototype with `k` ones:
//!
//! - **Phase A** peels the prototype apart: the tightest cluster is removed
//!   repeatedly and receives ranks `k-1, k-2, …, 0`, so the last-removed
//!   (most isolated) pixel gets rank 0. The prototype is then restored.
//! - **Phase B** grows the pattern to half coverage: the largest void is
//!   filled repeatedly, receiving ranks `k … ⌈N/2⌉-1`.
//! - **Phase C** ranks the remaining cells with the evaluator in reversed
//!   polarity: the energy of the *zero* population identifies the
//!   densest empty region, which is filled and receives the next rank.
//!
//! Every cell is written exactly once; the result is a permutation of
//! `[0, N)`.

use tracing::debug;

use crate::backend::ComputeBackend;
use crate::error::{Error, Result};
use crate::pattern::BinaryPattern;

/// Assigns a unique rank to every cell of the homogenized `pattern`.
///
/// `pattern` is consumed as working state and left in an unspecified
/// configuration; `energy` is scratch space of the same length.
pub fn assign_ranks(
    backend: &mut ComputeBackend,
    pattern: &mut BinaryPattern,
    energy: &mut [f32],
) -> Result<Vec<u32>> {
    let n = pattern.len();
    let k = pattern.ones();
    let half = n.div_ceil(2);
    let mut ranks = vec![0u32; n];

    #[cfg(debug_assertions)]
    let mut written = vec![false; n];
    macro_rules! mark {
        ($i:expr) => {
            #[cfg(debug_assertions)]
            {
                debug_assert!(!written[$i], "rank written twice at cell {}", $i);
                written[$i] = true;
            }
        };
    }

    // Phase A: rank the minority pixels, latest-removed = lowest rank.
    debug!(k, "ranking minority pixels");
    let prototype = pattern.clone();
    for rank in (0..k).rev() {
        backend.evaluate(pattern, false, energy)?;
        let cluster = backend.extrema(energy, pattern)?.tightest_cluster;
        if !pattern.get(cluster) {
            return Err(Error::InvariantViolation(
                "tightest cluster fell outside the one class",
            ));
        }
        pattern.set(cluster, false);
        ranks[cluster] = rank as u32;
        mark!(cluster);
    }
    *pattern = prototype;

    // Phase B: fill voids up to half coverage.
    debug!(from = k, to = half, "ranking remainder of first half");
    for rank in k..half {
        backend.evaluate(pattern, false, energy)?;
        let void = backend.extrema(energy, pattern)?.largest_void;
        if pattern.get(void) {
            return Err(Error::InvariantViolation(
                "largest void fell outside the zero class",
            ));
        }
        pattern.set(void, true);
        ranks[void] = rank as u32;
        mark!(void);
    }

    // Phase C: beyond half coverage the zeros are the minority, so the
    // reducer's flip makes the cluster search run over them while the
    // reversed field measures zero-population density.
    debug!(from = half, to = n, "ranking second half");
    for rank in half..n {
        backend.evaluate(pattern, true, energy)?;
        let cell = backend.extrema(energy, pattern)?.tightest_cluster;
        if pattern.get(cell) {
            return Err(Error::InvariantViolation(
                "phase C selected an already-ranked cell",
            ));
        }
        pattern.set(cell, true);
        ranks[cell] = rank as u32;
        mark!(cell);
    }

    Ok(ranks)
}
