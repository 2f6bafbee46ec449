use super::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::ops::Index;

/// Number of parameter slots every recurrence receives (`a` through `f`).
pub const PARAM_SLOTS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Closed interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub min: f64,
    pub max: f64,
}

impl Interval {
    fn checked(axis: &str, (min, max): (f64, f64)) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(EngineError::InvalidBounds(format!(
                "{axis} limits must be finite, got ({min}, {max})"
            )));
        }
        if min > max {
            return Err(EngineError::InvalidBounds(format!(
                "{axis} minimum {min} exceeds maximum {max}"
            )));
        }
        if !(max - min).is_finite() {
            return Err(EngineError::InvalidBounds(format!(
                "{axis} span overflows: ({min}, {max})"
            )));
        }
        Ok(Self { min, max })
    }

    #[inline(always)]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Rectangular region used both for origin sampling and for point retention.
/// Always valid once constructed: both intervals are finite with `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WindowLimits", into = "WindowLimits")]
pub struct Window {
    x: Interval,
    y: Interval,
}

#[derive(Serialize, Deserialize)]
struct WindowLimits {
    xlim: (f64, f64),
    ylim: (f64, f64),
}

impl Window {
    pub fn new(xlim: (f64, f64), ylim: (f64, f64)) -> Result<Self> {
        Ok(Self {
            x: Interval::checked("x", xlim)?,
            y: Interval::checked("y", ylim)?,
        })
    }

    pub fn xlim(&self) -> Interval {
        self.x
    }

    pub fn ylim(&self) -> Interval {
        self.y
    }

    /// Inclusive on all four edges. NaN coordinates are never inside.
    #[inline(always)]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x.contains(x) && self.y.contains(y)
    }

    pub fn contains_point(&self, point: Point) -> bool {
        self.contains(point.x, point.y)
    }
}

impl TryFrom<WindowLimits> for Window {
    type Error = EngineError;

    fn try_from(limits: WindowLimits) -> Result<Self> {
        Window::new(limits.xlim, limits.ylim)
    }
}

impl From<Window> for WindowLimits {
    fn from(window: Window) -> Self {
        Self {
            xlim: (window.x.min, window.x.max),
            ylim: (window.y.min, window.y.max),
        }
    }
}

/// Fixed-width positional parameters for a recurrence.
///
/// `width` counts the leading slots that carry real values; the remaining
/// slots hold [`ParameterTuple::UNUSED`].
#[derive(Debug, Clone, Copy)]
pub struct ParameterTuple {
    slots: [f64; PARAM_SLOTS],
    width: usize,
}

impl ParameterTuple {
    pub const UNUSED: f64 = f64::NAN;

    pub fn new(values: &[f64]) -> Result<Self> {
        if values.len() > PARAM_SLOTS {
            return Err(EngineError::ArityMismatch(format!(
                "at most {PARAM_SLOTS} parameters are supported, got {}",
                values.len()
            )));
        }
        let mut slots = [Self::UNUSED; PARAM_SLOTS];
        slots[..values.len()].copy_from_slice(values);
        Ok(Self {
            slots,
            width: values.len(),
        })
    }

    /// A tuple with every slot in use.
    pub const fn full(slots: [f64; PARAM_SLOTS]) -> Self {
        Self {
            slots,
            width: PARAM_SLOTS,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The used leading slots.
    pub fn values(&self) -> &[f64] {
        &self.slots[..self.width]
    }

    /// All slots, unused ones included.
    pub fn slots(&self) -> &[f64; PARAM_SLOTS] {
        &self.slots
    }

    pub(crate) fn set(&mut self, slot: usize, value: f64) {
        self.slots[slot] = value;
    }
}

impl Default for ParameterTuple {
    fn default() -> Self {
        Self {
            slots: [Self::UNUSED; PARAM_SLOTS],
            width: 0,
        }
    }
}

impl Index<usize> for ParameterTuple {
    type Output = f64;

    #[inline(always)]
    fn index(&self, slot: usize) -> &f64 {
        &self.slots[slot]
    }
}

/// An ordered run of points stored as two parallel coordinate columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Trajectory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            xs: Vec::with_capacity(capacity),
            ys: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    #[inline(always)]
    pub fn push(&mut self, x: f64, y: f64) {
        self.xs.push(x);
        self.ys.push(y);
    }

    pub fn point(&self, index: usize) -> Option<Point> {
        Some(Point::new(*self.xs.get(index)?, *self.ys.get(index)?))
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.xs
            .iter()
            .zip(&self.ys)
            .map(|(&x, &y)| Point::new(x, y))
    }

    /// Appends `other` after the last point of `self`.
    pub fn append(&mut self, other: &Trajectory) {
        self.xs.extend_from_slice(&other.xs);
        self.ys.extend_from_slice(&other.ys);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_rejects_inverted_and_non_finite_limits() {
        assert!(matches!(
            Window::new((2.0, -2.0), (-2.0, 2.0)),
            Err(EngineError::InvalidBounds(_))
        ));
        assert!(matches!(
            Window::new((-2.0, 2.0), (f64::NAN, 2.0)),
            Err(EngineError::InvalidBounds(_))
        ));
        assert!(matches!(
            Window::new((-f64::MAX, f64::MAX), (-1.0, 1.0)),
            Err(EngineError::InvalidBounds(_))
        ));
        assert!(Window::new((1.0, 1.0), (0.0, 0.0)).is_ok());
    }

    #[test]
    fn window_contains_is_inclusive_and_rejects_nan() {
        let window = Window::new((-2.0, 2.0), (-1.0, 1.0)).unwrap();
        assert!(window.contains(-2.0, 1.0));
        assert!(window.contains(2.0, -1.0));
        assert!(!window.contains(2.0000001, 0.0));
        assert!(!window.contains(f64::NAN, 0.0));
        assert!(!window.contains(0.0, f64::INFINITY));
    }

    #[test]
    fn window_deserialization_validates_limits() {
        let window: Window =
            serde_json::from_str(r#"{"xlim": [-3.0, 3.0], "ylim": [-1.0, 2.0]}"#).unwrap();
        assert_eq!(window.xlim(), Interval { min: -3.0, max: 3.0 });
        assert_eq!(window.ylim(), Interval { min: -1.0, max: 2.0 });

        let err = serde_json::from_str::<Window>(r#"{"xlim": [3.0, -3.0], "ylim": [0.0, 1.0]}"#)
            .expect_err("inverted limits should fail");
        assert!(err.to_string().contains("exceeds"), "unexpected error: {err}");
    }

    #[test]
    fn parameter_tuple_pads_with_unused_slots() {
        let params = ParameterTuple::new(&[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(params.width(), 3);
        assert_eq!(params.values(), &[1.0, 2.0, 3.0]);
        assert_eq!(params[2], 3.0);
        assert!(params[3].is_nan());
        assert!(params[5].is_nan());
    }

    #[test]
    fn parameter_tuple_rejects_more_than_six_values() {
        let err = ParameterTuple::new(&[0.0; 7]).expect_err("seven values should fail");
        assert!(matches!(err, EngineError::ArityMismatch(_)));
    }

    #[test]
    fn trajectory_append_keeps_point_order() {
        let mut first = Trajectory::default();
        first.push(1.0, 2.0);
        let mut second = Trajectory::default();
        second.push(3.0, 4.0);
        second.push(5.0, 6.0);

        first.append(&second);
        let points: Vec<Point> = first.points().collect();
        assert_eq!(
            points,
            vec![
                Point::new(1.0, 2.0),
                Point::new(3.0, 4.0),
                Point::new(5.0, 6.0)
            ]
        );
        assert_eq!(first.point(3), None);
    }
}
