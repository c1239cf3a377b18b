//! Generation preferences.
//!
//! A plain configuration record threaded through [`generate`]; there is no
//! global state. All options are optional with conservative defaults.
//!
//! [`generate`]: crate::generate::generate

/// Which compute back-end the adapter should try first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendPreference {
    /// Try the GPU first, fall back to CPU. The default.
    #[default]
    Auto,
    /// CPU only, never attempt GPU initialization.
    Cpu,
    /// Same fallback chain as `Auto`; expresses intent when the caller
    /// requires the GPU attempt even if a future default changes.
    Gpu,
}

/// Preferences for one generation call.
#[derive(Debug, Clone, Copy)]
pub struct Preferences {
    /// Back-end selection. Initialization failures downgrade silently
    /// along GPU → CPU-parallel → CPU-single.
    pub back_end: BackendPreference,
    /// CPU worker count. `0` selects the default of 10 workers; `1` runs
    /// the sequential evaluator.
    pub threads: u32,
    /// Seed for the initial-pattern sampler. Generation is fully
    /// deterministic given `(width, height, seed, back_end)`.
    pub seed: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            back_end: BackendPreference::Auto,
            threads: 0,
            seed: 0,
        }
    }
}

impl Preferences {
    /// CPU-only preferences with an explicit worker count.
    pub fn cpu(threads: u32) -> Self {
        Self {
            back_end: BackendPreference::Cpu,
            threads,
            ..Self::default()
        }
    }

    /// Sets the sampler seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_auto_and_seed_zero() {
        let p = Preferences::default();
        assert_eq!(p.back_end, BackendPreference::Auto);
        assert_eq!(p.threads, 0);
        assert_eq!(p.seed, 0);
    }

    #[test]
    fn builders_compose() {
        let p = Preferences::cpu(4).with_seed(9);
        assert_eq!(p.back_end, BackendPreference::Cpu);
        assert_eq!(p.threads, 4);
        assert_eq!(p.seed, 9);
    }
}
