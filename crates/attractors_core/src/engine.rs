//! Trajectory computation for planar recurrences.
//!
//! - [`advance`] iterates a recurrence for an exact number of points.
//! - [`advance_windowed`] iterates a bound recurrence and records only the
//!   successors that land inside a [`Window`].
//! - [`compute_region`] fans windowed runs out over a bounded thread pool, one
//!   per randomly sampled origin.
//! - [`Signature`] binds parameter names to tuple slots once, up front.

pub mod aggregate;
pub mod sampler;
pub mod signature;
pub mod trajectory;
pub mod types;

pub use aggregate::{compute_region, compute_region_with, AggregateResult, OriginRun};
pub use sampler::{sample, OriginSampler, DEFAULT_SEED};
pub use signature::{signature_of, BoundRecurrence, Signature};
pub use trajectory::{advance, advance_windowed};
pub use types::{Interval, ParameterTuple, Point, Trajectory, Window, PARAM_SLOTS};

use thiserror::Error;

/// Structural failures of the engine. Numeric divergence (NaN, infinities) is
/// never an error; it flows through trajectories as data.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A window interval is inverted or non-finite, or a requested count is zero.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
    /// Parameter values do not line up with a recurrence's signature.
    #[error("arity mismatch: {0}")]
    ArityMismatch(String),
    /// A per-origin task panicked. The whole aggregate is abandoned.
    #[error("worker task for origin {index} failed: {message}")]
    WorkerTaskFailure { index: usize, message: String },
    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
