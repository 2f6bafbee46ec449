//! The `attractors_core` crate computes trajectories of planar strange attractors.
//!
//! Key components:
//! - **Traits**: `RecurrenceFunction` (x, y, a..f -> x', y'), `PlanarMap` (bound recurrence),
//!   `HasSignature` (ordered parameter names), `Scalar` (VM numeric type).
//! - **Engine**: exact-length and windowed trajectories, origin sampling, and the
//!   multi-origin region aggregator running on a scoped thread pool.
//! - **Equation Engine**: a bytecode VM for recurrences written as expressions.
//! - **Families / Presets**: the built-in attractor formulas and a JSON catalog of
//!   named parameter presets.

pub mod config;
pub mod engine;
pub mod equation_engine;
pub mod families;
pub mod presets;
pub mod traits;
