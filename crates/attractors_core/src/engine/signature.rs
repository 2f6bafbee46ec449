use super::{EngineError, ParameterTuple, Result, PARAM_SLOTS};
use crate::traits::{HasSignature, PlanarMap, RecurrenceFunction};
use std::collections::HashSet;

/// Ordered parameter names of a recurrence, excluding `x` and `y`.
///
/// Slot `i` of a [`ParameterTuple`] is bound to `names()[i]`. Binding checks
/// widths and names once so the hot loop never has to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    names: Vec<String>,
}

impl Signature {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.len() > PARAM_SLOTS {
            return Err(EngineError::ArityMismatch(format!(
                "signature has {} parameters, at most {PARAM_SLOTS} are supported",
                names.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in &names {
            if name == "x" || name == "y" {
                return Err(EngineError::ArityMismatch(format!(
                    "'{name}' is a state variable, not a parameter"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(EngineError::ArityMismatch(format!(
                    "parameter '{name}' appears more than once"
                )));
            }
        }
        Ok(Self { names })
    }

    /// Skips validation; only for the built-in families, whose names are
    /// checked by their own tests.
    pub(crate) fn from_static(names: &[&'static str]) -> Self {
        Self {
            names: names.iter().map(|name| name.to_string()).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn slot(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Checks that `params` has exactly one value per name.
    pub fn check(&self, params: &ParameterTuple) -> Result<()> {
        if params.width() != self.len() {
            return Err(EngineError::ArityMismatch(format!(
                "signature ({}) expects {} parameters, tuple has {}",
                self.names.join(", "),
                self.len(),
                params.width()
            )));
        }
        Ok(())
    }

    /// Builds a tuple from `(name, value)` pairs. Every name must be bound
    /// exactly once.
    pub fn tuple_from_named<'a, I>(&self, values: I) -> Result<ParameterTuple>
    where
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let mut params = ParameterTuple::new(&vec![ParameterTuple::UNUSED; self.len()])?;
        let mut bound = vec![false; self.len()];
        for (name, value) in values {
            let slot = self.slot(name).ok_or_else(|| {
                EngineError::ArityMismatch(format!(
                    "unknown parameter '{name}' for signature ({})",
                    self.names.join(", ")
                ))
            })?;
            if bound[slot] {
                return Err(EngineError::ArityMismatch(format!(
                    "parameter '{name}' given more than once"
                )));
            }
            bound[slot] = true;
            params.set(slot, value);
        }
        if let Some(missing) = bound.iter().position(|b| !b) {
            return Err(EngineError::ArityMismatch(format!(
                "missing value for parameter '{}'",
                self.names[missing]
            )));
        }
        Ok(params)
    }

    pub fn bind<F: RecurrenceFunction>(
        &self,
        function: F,
        params: ParameterTuple,
    ) -> Result<BoundRecurrence<F>> {
        self.check(&params)?;
        Ok(BoundRecurrence { function, params })
    }

    pub fn bind_named<'a, F, I>(&self, function: F, values: I) -> Result<BoundRecurrence<F>>
    where
        F: RecurrenceFunction,
        I: IntoIterator<Item = (&'a str, f64)>,
    {
        let params = self.tuple_from_named(values)?;
        Ok(BoundRecurrence { function, params })
    }
}

/// The signature a recurrence declares for itself.
pub fn signature_of<F: HasSignature + ?Sized>(function: &F) -> Signature {
    function.signature()
}

/// A recurrence with its parameter tuple resolved: the `(x, y) -> (x', y')`
/// form consumed by the windowed engine and the aggregator.
#[derive(Debug, Clone)]
pub struct BoundRecurrence<F> {
    function: F,
    params: ParameterTuple,
}

impl<F> BoundRecurrence<F> {
    pub fn function(&self) -> &F {
        &self.function
    }

    pub fn params(&self) -> &ParameterTuple {
        &self.params
    }
}

impl<F: RecurrenceFunction> PlanarMap for BoundRecurrence<F> {
    #[inline(always)]
    fn step(&self, x: f64, y: f64) -> (f64, f64) {
        self.function.apply(x, y, &self.params)
    }
}
