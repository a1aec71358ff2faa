//! Error types for the surface-synth core.

use thiserror::Error;

/// Errors produced by field construction and engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Width or height was zero, or their product overflowed `usize`.
    #[error("invalid dimensions: width and height must be non-zero")]
    InvalidDimensions,

    /// A caller-supplied data vector did not match the lattice size.
    #[error("dimension mismatch: lattice of {expected} cells, got {got} values")]
    DimensionMismatch { expected: usize, got: usize },

    /// A caller-supplied height sample was NaN or infinite.
    #[error("non-finite height at cell {index}")]
    NonFiniteHeight { index: usize },

    /// A lattice-sized buffer could not be allocated. This is the only
    /// fatal runtime condition; it is surfaced instead of aborting.
    #[error("allocation of {cells} cells failed")]
    Allocation { cells: usize },

    /// A requested engine name was not found in the registry.
    #[error("unknown engine: {0}")]
    UnknownEngine(String),
}
