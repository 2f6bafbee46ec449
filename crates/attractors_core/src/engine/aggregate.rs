use super::{advance_windowed, EngineError, OriginSampler, Point, Result, Trajectory, Window};
use crate::traits::PlanarMap;
use log::{debug, warn};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// One windowed run and the origin it started from.
#[derive(Debug, Clone, Serialize)]
pub struct OriginRun {
    pub origin: Point,
    pub trajectory: Trajectory,
}

/// Per-origin trajectories of a region computation. The order of runs carries
/// no meaning; the order of points inside each run does.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateResult {
    pub runs: Vec<OriginRun>,
}

impl AggregateResult {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    pub fn total_points(&self) -> usize {
        self.runs.iter().map(|run| run.trajectory.len()).sum()
    }

    pub fn trajectories(&self) -> impl Iterator<Item = &Trajectory> {
        self.runs.iter().map(|run| &run.trajectory)
    }

    /// All recorded points in one trajectory, runs laid end to end.
    pub fn concat(&self) -> Trajectory {
        let mut merged = Trajectory::with_capacity(self.total_points());
        for trajectory in self.trajectories() {
            merged.append(trajectory);
        }
        merged
    }
}

/// [`compute_region_with`] using the process-wide sampler.
pub fn compute_region<M>(
    map: &M,
    window: &Window,
    points_per_origin: usize,
    origin_count: usize,
    worker_count: usize,
) -> Result<AggregateResult>
where
    M: PlanarMap + Sync + ?Sized,
{
    compute_region_with(
        OriginSampler::global(),
        map,
        window,
        points_per_origin,
        origin_count,
        worker_count,
    )
}

/// Samples `origin_count` origins in `window` and runs [`advance_windowed`]
/// from each of them on a pool of `worker_count` threads.
///
/// All origins are drawn before any work is dispatched. The pool lives only
/// for this call; its threads are joined before returning. If any run panics
/// the whole computation fails with [`EngineError::WorkerTaskFailure`] and no
/// partial result is returned.
pub fn compute_region_with<M>(
    sampler: &OriginSampler,
    map: &M,
    window: &Window,
    points_per_origin: usize,
    origin_count: usize,
    worker_count: usize,
) -> Result<AggregateResult>
where
    M: PlanarMap + Sync + ?Sized,
{
    if points_per_origin == 0 {
        return Err(EngineError::InvalidBounds(
            "points per origin must be at least 1".to_string(),
        ));
    }
    if worker_count == 0 {
        return Err(EngineError::InvalidBounds(
            "worker count must be at least 1".to_string(),
        ));
    }

    let origins = sampler.sample(window, origin_count);
    debug!(
        "dispatching {} origins x {} attempts across {} workers",
        origins.len(),
        points_per_origin,
        worker_count
    );

    let runs = ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .thread_name(|i| format!("attractor-worker-{i}"))
        .build_scoped(
            |thread| thread.run(),
            |pool| {
                pool.install(|| {
                    origins
                        .par_iter()
                        .enumerate()
                        .map(|(index, &origin)| {
                            run_origin(map, window, origin, points_per_origin, index)
                        })
                        .collect::<Result<Vec<_>>>()
                })
            },
        )??;

    let result = AggregateResult { runs };
    debug!(
        "region complete: {} runs, {} recorded points",
        result.len(),
        result.total_points()
    );
    Ok(result)
}

fn run_origin<M>(
    map: &M,
    window: &Window,
    origin: Point,
    n_attempts: usize,
    index: usize,
) -> Result<OriginRun>
where
    M: PlanarMap + ?Sized,
{
    let trajectory = catch_unwind(AssertUnwindSafe(|| {
        advance_windowed(map, origin, window, n_attempts)
    }))
    .map_err(|payload| {
        let message = panic_payload_to_string(payload);
        warn!("origin {index} at ({}, {}) failed: {message}", origin.x, origin.y);
        EngineError::WorkerTaskFailure { index, message }
    })??;
    Ok(OriginRun { origin, trajectory })
}

fn panic_payload_to_string(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    if let Some(message) = payload.downcast_ref::<&str>() {
        return (*message).to_string();
    }
    "recurrence panicked".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ParameterTuple, Signature};

    fn fractal_dream(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
        ((p[1] * y).sin() + p[2] * (p[1] * x).sin(), (p[0] * x).sin() + p[3] * (p[0] * y).sin())
    }

    fn window() -> Window {
        Window::new((-2.0, 2.0), (-2.0, 2.0)).unwrap()
    }

    #[test_log::test]
    fn four_origins_on_eight_workers_stay_in_window() {
        let bound = Signature::new(["a", "b", "c", "d"])
            .unwrap()
            .bind(fractal_dream, ParameterTuple::new(&[1.7, 1.7, 1.15, 2.34]).unwrap())
            .unwrap();
        let sampler = OriginSampler::seeded(12);

        let result = compute_region_with(&sampler, &bound, &window(), 10_000, 4, 8).unwrap();
        assert_eq!(result.len(), 4);
        for run in &result.runs {
            assert!(window().contains_point(run.origin));
            assert!(run.trajectory.len() <= 10_000);
            assert!(run.trajectory.points().all(|p| window().contains_point(p)));
        }
        assert_eq!(result.concat().len(), result.total_points());
    }

    #[test_log::test]
    fn each_run_matches_a_serial_windowed_walk() {
        let map = |x: f64, y: f64| (0.9 * y + 0.1, -0.9 * x + 0.3 * y);
        let result =
            compute_region_with(&OriginSampler::seeded(3), &map, &window(), 500, 6, 2).unwrap();
        assert_eq!(result.len(), 6);
        for run in &result.runs {
            let serial = advance_windowed(&map, run.origin, &window(), 500).unwrap();
            assert_eq!(run.trajectory, serial);
        }
    }

    #[test_log::test]
    fn zero_origins_give_an_empty_result() {
        let map = |x: f64, y: f64| (y, x);
        let result = compute_region(&map, &window(), 10, 0, 4).unwrap();
        assert!(result.is_empty());
        assert!(result.concat().is_empty());
    }

    #[test_log::test]
    fn invalid_counts_fail_before_sampling() {
        let map = |x: f64, y: f64| (y, x);
        let sampler = OriginSampler::seeded(5);
        assert!(matches!(
            compute_region_with(&sampler, &map, &window(), 0, 4, 4),
            Err(EngineError::InvalidBounds(_))
        ));
        assert!(matches!(
            compute_region_with(&sampler, &map, &window(), 10, 4, 0),
            Err(EngineError::InvalidBounds(_))
        ));
        // Nothing was drawn from the generator by the rejected calls.
        let fresh = OriginSampler::seeded(5);
        assert_eq!(sampler.sample(&window(), 2), fresh.sample(&window(), 2));
    }

    #[test_log::test]
    fn a_panicking_run_fails_the_whole_region() {
        let map = |x: f64, y: f64| {
            if x > 0.0 {
                panic!("domain error at x = {x}");
            }
            (x - 1.0, y)
        };
        let right_half = Window::new((0.5, 1.0), (-1.0, 1.0)).unwrap();
        let err = compute_region_with(&OriginSampler::seeded(9), &map, &right_half, 10, 3, 2)
            .expect_err("panicking recurrence should fail");
        match err {
            EngineError::WorkerTaskFailure { message, .. } => {
                assert!(message.contains("domain error"), "unexpected message: {message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
