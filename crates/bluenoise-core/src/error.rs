//! Error types for dither array generation.

use thiserror::Error;

/// Result alias for generation operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the generation pipeline.
///
/// Back-end *initialization* problems never appear here: they are handled
/// by silently downgrading to the next back-end in the preference chain.
/// Only unrecoverable conditions surface.
#[derive(Debug, Error)]
pub enum Error {
    /// Grid dimension below the supported minimum.
    #[error("grid axis {axis} is {value}, must be at least {min}")]
    DimensionTooSmall {
        /// `"width"` or `"height"`.
        axis: &'static str,
        /// Offending value.
        value: u32,
        /// Supported minimum.
        min: u32,
    },

    /// Grid cell count above the supported maximum.
    #[error("grid has {cells} cells, must be at most {max}")]
    GridTooLarge {
        /// Requested cell count.
        cells: u64,
        /// Supported maximum.
        max: u64,
    },

    /// The minority pixel budget computed to zero (degenerate grid).
    #[error("initial pixel budget is zero for a {width}x{height} grid")]
    EmptyPixelBudget {
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },

    /// A previously-initialized back-end failed during evaluation or
    /// reduction. Fatal: the generation call terminates.
    #[error("compute back-end failure: {0}")]
    Backend(String),

    /// An internal invariant was violated — a bug in the construction
    /// kernel, not in the caller's input.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(&'static str),
}
