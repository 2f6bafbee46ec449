use crate::engine::{ParameterTuple, Signature};
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types the expression VM can evaluate over.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// A planar recurrence `(x, y, a..f) -> (x', y')`.
///
/// The full six-slot parameter tuple is always supplied; implementations read
/// the slots they use and ignore the rest. Implementations must be pure:
/// identical inputs give identical outputs.
pub trait RecurrenceFunction {
    fn apply(&self, x: f64, y: f64, params: &ParameterTuple) -> (f64, f64);
}

impl<F> RecurrenceFunction for F
where
    F: Fn(f64, f64, &ParameterTuple) -> (f64, f64),
{
    #[inline(always)]
    fn apply(&self, x: f64, y: f64, params: &ParameterTuple) -> (f64, f64) {
        self(x, y, params)
    }
}

/// A recurrence with all of its parameters already fixed: `(x, y) -> (x', y')`.
/// This is what the windowed engine and the multi-origin aggregator iterate.
pub trait PlanarMap {
    fn step(&self, x: f64, y: f64) -> (f64, f64);
}

impl<F> PlanarMap for F
where
    F: Fn(f64, f64) -> (f64, f64),
{
    #[inline(always)]
    fn step(&self, x: f64, y: f64) -> (f64, f64) {
        self(x, y)
    }
}

/// Recurrences that know the ordered names of their parameters.
pub trait HasSignature {
    /// Parameter names in tuple-slot order, excluding `x` and `y`.
    fn signature(&self) -> Signature;
}
