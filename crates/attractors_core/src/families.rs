//! Built-in attractor families and the [`Attractor`] object that pairs one of
//! them with concrete parameter values.

use crate::config::RegionConfig;
use crate::engine::{
    self, advance, compute_region, compute_region_with, AggregateResult, BoundRecurrence,
    EngineError, OriginSampler, ParameterTuple, Point, Signature, Trajectory,
};
use crate::presets::Preset;
use crate::traits::HasSignature;
use anyhow::{anyhow, Result};
use num_complex::Complex64;
use std::fmt;

/// Recurrence shape shared by every built-in family.
pub type Recurrence = fn(f64, f64, &ParameterTuple) -> (f64, f64);

/// Palettes a preset may name. Rendering is not done here; the name is only
/// carried through presets.
pub const COLORMAPS: &[&str] = &[
    "bgy", "bmw", "bgyw", "bmy", "fire", "gray", "kgy", "kbc", "viridis", "inferno",
];

pub const DEFAULT_COLORMAP: &str = "kgy";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default: f64,
    pub doc: &'static str,
}

const fn param(name: &'static str, default: f64, doc: &'static str) -> ParamSpec {
    ParamSpec { name, default, doc }
}

pub struct Family {
    pub name: &'static str,
    /// LaTeX source of the update rule.
    pub equations: &'static [&'static str],
    pub params: &'static [ParamSpec],
    pub recurrence: Recurrence,
    /// Adjusts parameters that would make the recurrence degenerate.
    guard: Option<fn(&mut ParameterTuple)>,
}

impl Family {
    pub fn param_names(&self) -> Vec<&'static str> {
        self.params.iter().map(|p| p.name).collect()
    }

    /// Fails when the family declares more parameters than a tuple holds.
    pub fn defaults(&self) -> engine::Result<ParameterTuple> {
        let values: Vec<f64> = self.params.iter().map(|p| p.default).collect();
        ParameterTuple::new(&values)
    }
}

impl fmt::Debug for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Family")
            .field("name", &self.name)
            .field("params", &self.param_names())
            .finish()
    }
}

impl HasSignature for Family {
    fn signature(&self) -> Signature {
        Signature::from_static(&self.param_names())
    }
}

fn clifford(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (a, b, c, d) = (p[0], p[1], p[2], p[3]);
    ((a * y).sin() + c * (a * x).cos(), (b * x).sin() + d * (b * y).cos())
}

fn de_jong(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (a, b, c, d) = (p[0], p[1], p[2], p[3]);
    ((a * y).sin() - (b * x).cos(), (c * x).sin() - (d * y).cos())
}

fn svensson(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (a, b, c, d) = (p[0], p[1], p[2], p[3]);
    (d * (a * x).sin() - (b * y).sin(), c * (a * x).cos() + (b * y).cos())
}

fn fractal_dream(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (a, b, c, d) = (p[0], p[1], p[2], p[3]);
    ((b * y).sin() + c * (b * x).sin(), (a * x).sin() + d * (a * y).sin())
}

fn bedhead(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (a, b) = (p[0], p[1]);
    (y * (x * y / b).sin() + (a * x - y).cos(), x + y.sin() / b)
}

const BEDHEAD_MIN_B: f64 = 3.0 * f64::EPSILON;

/// Keeps `b` away from zero, where Bedhead divides by it.
fn bedhead_guard(params: &mut ParameterTuple) {
    let b = params[1];
    if -BEDHEAD_MIN_B < b && b < BEDHEAD_MIN_B {
        params.set(1, BEDHEAD_MIN_B);
    }
}

/// Sign with sgn(0) = 0.
fn sgn(v: f64) -> f64 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        v
    }
}

fn hopalong1(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (a, b, c) = (p[0], p[1], p[2]);
    (y - (b * x - c).abs().sqrt() * sgn(x), a - x)
}

fn hopalong2(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (a, b, c) = (p[0], p[1], p[2]);
    (
        y - 1.0 - (b * x - 1.0 - c).abs().sqrt() * sgn(x - 1.0),
        a - x - 1.0,
    )
}

fn gumowski_g(x: f64, mu: f64) -> f64 {
    mu * x + 2.0 * (1.0 - mu) * x * x / (1.0 + x * x)
}

fn gumowski_mira(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (a, b, mu) = (p[0], p[1], p[2]);
    let x_next = y + a * (1.0 - b * y * y) * y + gumowski_g(x, mu);
    let y_next = -x + gumowski_g(x_next, mu);
    (x_next, y_next)
}

/// Highest icon degree honoured; larger (or infinite) degrees are clamped.
pub const MAX_ICON_DEGREE: i64 = 64;

fn symmetric_icon(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
    let (alpha, beta, gamma, omega, lambda, degree) = (p[0], p[1], p[2], p[3], p[4], p[5]);
    let z = Complex64::new(x, y);
    // z^(degree - 1) by repeated multiplication; degree truncates toward zero
    // and NaN counts as 0.
    let degree = (degree as i64).clamp(0, MAX_ICON_DEGREE);
    let mut z_pow = z;
    for _ in 2..degree {
        z_pow *= z;
    }
    let scale = alpha * z.norm_sqr() + lambda + beta * (z * z_pow).re;
    (
        scale * x + gamma * z_pow.re - omega * y,
        scale * y - gamma * z_pow.im + omega * x,
    )
}

const AB: [ParamSpec; 2] = [
    param("a", 1.7, "Attractor parameter a"),
    param("b", 1.7, "Attractor parameter b"),
];

const FOUR_PARAMS: [ParamSpec; 4] = [
    AB[0],
    AB[1],
    param("c", 0.6, "Attractor parameter c"),
    param("d", 1.2, "Attractor parameter d"),
];

const HOPALONG_PARAMS: [ParamSpec; 3] = [
    param("a", 9.8, "Attractor parameter a"),
    param("b", 4.1, "Attractor parameter b"),
    param("c", 3.8, "Attractor parameter c"),
];

/// Built-in families, sorted by name.
pub static FAMILIES: [Family; 9] = [
    Family {
        name: "Bedhead",
        equations: &[
            r"$x_{n+1} = y_n\ \sin\ \frac{x_ny_n}{b} + \cos(ax_n-y_n)$",
            r"$y_{n+1} = x_n+\frac{\sin\ y_n}{b}$",
        ],
        params: &[
            param("a", 0.64, "Attractor parameter a"),
            param("b", 0.76, "Attractor parameter b"),
        ],
        recurrence: bedhead,
        guard: Some(bedhead_guard),
    },
    Family {
        name: "Clifford",
        equations: &[
            r"$x_{n+1} = \sin\ ay_n + c\ \cos\ ax_n$",
            r"$y_{n+1} = \sin\ bx_n + d\ \cos\ by_n$",
        ],
        params: &FOUR_PARAMS,
        recurrence: clifford,
        guard: None,
    },
    Family {
        name: "DeJong",
        equations: &[
            r"$x_{n+1} = \sin\ ay_n - c\ \cos\ bx_n$",
            r"$y_{n+1} = \sin\ cx_n - d\ \cos\ dy_n$",
        ],
        params: &FOUR_PARAMS,
        recurrence: de_jong,
        guard: None,
    },
    Family {
        name: "FractalDream",
        equations: &[
            r"$x_{n+1} = \sin\ by_n + c\ \sin\ bx_n$",
            r"$y_{n+1} = \sin\ ax_n + d\ \sin\ ay_n$",
        ],
        params: &[
            AB[0],
            AB[1],
            param("c", 1.15, "Attractor parameter c"),
            param("d", 2.34, "Attractor parameter d"),
        ],
        recurrence: fractal_dream,
        guard: None,
    },
    Family {
        name: "GumowskiMira",
        equations: &[
            r"$G(x) = \mu x + \frac{2(1-\mu)x^2}{1+x^2}$",
            r"$x_{n+1} = y_n + ay_n(1-by_n^2) + G(x_n)$",
            r"$y_{n+1} = -x_n + G(x_{n+1})$",
        ],
        params: &[
            param("a", 0.64, "Attractor parameter a"),
            param("b", 0.76, "Attractor parameter b"),
            param("mu", 0.6, "Attractor parameter mu"),
        ],
        recurrence: gumowski_mira,
        guard: None,
    },
    Family {
        name: "Hopalong1",
        equations: &[
            r"$x_{n+1} = y_n-\mathrm{sgn}(x_n)\sqrt{\left|\ bx_n-c\ \right|}$",
            r"$y_{n+1} = a-x_n$",
        ],
        params: &HOPALONG_PARAMS,
        recurrence: hopalong1,
        guard: None,
    },
    Family {
        name: "Hopalong2",
        equations: &[
            r"$x_{n+1} = y_n-1-\mathrm{sgn}(x_n-1)\sqrt{\left|\ bx_n-1-c\ \right|}$",
            r"$y_{n+1} = a-x_n-1$",
        ],
        params: &HOPALONG_PARAMS,
        recurrence: hopalong2,
        guard: None,
    },
    Family {
        name: "Svensson",
        equations: &[
            r"$x_{n+1} = d\ \sin\ ax_n - \sin\ by_n$",
            r"$y_{n+1} = c\ \cos\ ax_n + \cos\ by_n$",
        ],
        params: &FOUR_PARAMS,
        recurrence: svensson,
        guard: None,
    },
    Family {
        name: "SymmetricIcon",
        equations: &[],
        params: &[
            param("a", 0.6, "Attractor parameter alpha"),
            param("b", 1.2, "Attractor parameter beta"),
            param("g", 0.6, "Attractor parameter gamma"),
            param("om", 1.2, "Attractor parameter omega"),
            param("l", 0.6, "Attractor parameter lambda"),
            param("d", 1.2, "Attractor parameter degree"),
        ],
        recurrence: symmetric_icon,
        guard: None,
    },
];

pub fn families() -> &'static [Family] {
    &FAMILIES
}

pub fn family(name: &str) -> Option<&'static Family> {
    FAMILIES.iter().find(|f| f.name == name)
}

/// A family with concrete parameter values, a starting point and a palette.
#[derive(Debug, Clone)]
pub struct Attractor {
    family: &'static Family,
    pub colormap: String,
    pub origin: Point,
    params: ParameterTuple,
}

impl Attractor {
    pub fn new(family: &'static Family) -> engine::Result<Self> {
        Ok(Self {
            family,
            colormap: DEFAULT_COLORMAP.to_string(),
            origin: Point::new(0.0, 0.0),
            params: family.defaults()?,
        })
    }

    pub fn named(name: &str) -> Result<Self> {
        let fam = family(name).ok_or_else(|| anyhow!("Unknown attractor family '{name}'."))?;
        Ok(Self::new(fam)?)
    }

    pub fn family(&self) -> &'static Family {
        self.family
    }

    pub fn name(&self) -> &'static str {
        self.family.name
    }

    pub fn params(&self) -> &ParameterTuple {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<f64> {
        self.family.signature().slot(name).map(|slot| self.params[slot])
    }

    pub fn set_param(&mut self, name: &str, value: f64) -> engine::Result<()> {
        let slot = self.family.signature().slot(name).ok_or_else(|| {
            EngineError::ArityMismatch(format!(
                "{} has no parameter '{name}'",
                self.family.name
            ))
        })?;
        self.params.set(slot, value);
        Ok(())
    }

    /// Replaces all parameters positionally, in signature order.
    pub fn set_params(&mut self, values: &[f64]) -> engine::Result<()> {
        let params = ParameterTuple::new(values)?;
        self.family.signature().check(&params)?;
        self.params = params;
        Ok(())
    }

    /// The family's recurrence with the current parameters bound, after the
    /// family guard has been applied.
    pub fn bound(&self) -> engine::Result<BoundRecurrence<Recurrence>> {
        let mut params = self.params;
        if let Some(guard) = self.family.guard {
            guard(&mut params);
        }
        self.family.signature().bind(self.family.recurrence, params)
    }

    /// `n` unfiltered points starting at [`Attractor::origin`].
    pub fn trajectory(&self, n: usize) -> engine::Result<Trajectory> {
        let bound = self.bound()?;
        advance(bound.function(), self.origin, bound.params(), n)
    }

    /// Windowed multi-origin region, every run concatenated into one trajectory.
    pub fn compute(&self, config: &RegionConfig) -> Result<Trajectory> {
        let window = config.window()?;
        let result = compute_region(
            &self.bound()?,
            &window,
            config.points_per_origin,
            config.origin_count,
            config.worker_count,
        )?;
        Ok(result.concat())
    }

    /// Like [`Attractor::compute`] but with an explicit sampler and the runs
    /// kept apart.
    pub fn compute_runs(
        &self,
        sampler: &OriginSampler,
        config: &RegionConfig,
    ) -> Result<AggregateResult> {
        let window = config.window()?;
        Ok(compute_region_with(
            sampler,
            &self.bound()?,
            &window,
            config.points_per_origin,
            config.origin_count,
            config.worker_count,
        )?)
    }

    /// The preset record describing this attractor.
    pub fn vals(&self) -> Preset {
        let mut values = vec![self.origin.x, self.origin.y];
        values.extend_from_slice(self.params.values());
        Preset {
            family: self.family.name.to_string(),
            colormap: self.colormap.clone(),
            values,
        }
    }
}
