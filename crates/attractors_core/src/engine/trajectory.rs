use super::{EngineError, ParameterTuple, Point, Result, Trajectory, Window};
use crate::traits::{PlanarMap, RecurrenceFunction};

/// Iterates `func` from `origin` and returns exactly `n` points, `origin` first.
///
/// Point `i + 1` is `func` applied to point `i` and the full parameter tuple.
/// Nothing is filtered: divergent values are stored as they come out.
pub fn advance<F>(func: &F, origin: Point, params: &ParameterTuple, n: usize) -> Result<Trajectory>
where
    F: RecurrenceFunction + ?Sized,
{
    if n == 0 {
        return Err(EngineError::InvalidBounds(
            "trajectory length must be at least 1".to_string(),
        ));
    }

    let mut xs = vec![0.0; n];
    let mut ys = vec![0.0; n];
    xs[0] = origin.x;
    ys[0] = origin.y;

    let (mut x, mut y) = (origin.x, origin.y);
    for (xi, yi) in xs[1..].iter_mut().zip(&mut ys[1..]) {
        (x, y) = func.apply(x, y, params);
        *xi = x;
        *yi = y;
    }

    Ok(Trajectory { xs, ys })
}

/// Iterates `map` from `origin` exactly `n_attempts` times and records only the
/// successors that fall inside `window`.
///
/// Rejected points are still iterated from; the filter applies to the output
/// only. The origin itself is never recorded, and an empty result is valid.
pub fn advance_windowed<M>(
    map: &M,
    origin: Point,
    window: &Window,
    n_attempts: usize,
) -> Result<Trajectory>
where
    M: PlanarMap + ?Sized,
{
    if n_attempts == 0 {
        return Err(EngineError::InvalidBounds(
            "number of attempts must be at least 1".to_string(),
        ));
    }

    let mut recorded = Trajectory::default();
    let mut current = origin;
    for _ in 0..n_attempts {
        let (x, y) = map.step(current.x, current.y);
        if window.contains(x, y) {
            recorded.push(x, y);
        }
        current = Point::new(x, y);
    }

    Ok(recorded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fractal_dream(x: f64, y: f64, p: &ParameterTuple) -> (f64, f64) {
        let (a, b, c, d) = (p[0], p[1], p[2], p[3]);
        ((b * y).sin() + c * (b * x).sin(), (a * x).sin() + d * (a * y).sin())
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-8, "{a} != {e}");
        }
    }

    #[test]
    fn advance_first_step_matches_closed_form() {
        let params = ParameterTuple::new(&[3.0, 4.0, 5.0, 6.0]).unwrap();
        let traj = advance(&fractal_dream, Point::new(1.0, 2.0), &params, 2).unwrap();

        let expected_x = (4.0f64 * 2.0).sin() + 5.0 * (4.0f64 * 1.0).sin();
        let expected_y = (3.0f64 * 1.0).sin() + 6.0 * (3.0f64 * 2.0).sin();
        assert_eq!(traj.xs[1], expected_x);
        assert_eq!(traj.ys[1], expected_y);
        assert!((traj.xs[1] + 2.7946542299162593).abs() < 1e-12);
        assert!((traj.ys[1] + 1.535372981133688).abs() < 1e-12);
    }

    #[test]
    fn advance_ignores_trailing_parameter_slots() {
        let params = ParameterTuple::full([1.0, 2.0, 1.0, -0.5, 2.0, 2.0]);
        let traj = advance(&fractal_dream, Point::new(0.5, 0.5), &params, 5).unwrap();

        assert_close(
            &traj.xs,
            &[0.5, 1.68294197, 0.2388541, 1.44372879, -0.03872752],
        );
        assert_close(
            &traj.ys,
            &[0.5, 0.23971277, 0.87500646, -0.14718441, 1.06526456],
        );
    }

    #[test]
    fn advance_returns_exact_length_with_origin_first() {
        let params = ParameterTuple::new(&[1.7, 1.7, 1.15, 2.34]).unwrap();
        for n in [1, 2, 17, 1000] {
            let traj = advance(&fractal_dream, Point::new(0.1, -0.3), &params, n).unwrap();
            assert_eq!(traj.len(), n);
            assert_eq!(traj.point(0), Some(Point::new(0.1, -0.3)));
        }
    }

    #[test]
    fn advance_rejects_zero_length() {
        let params = ParameterTuple::default();
        let err = advance(&fractal_dream, Point::new(0.0, 0.0), &params, 0)
            .expect_err("zero length should fail");
        assert!(matches!(err, EngineError::InvalidBounds(_)));
    }

    #[test]
    fn advance_propagates_divergence_as_values() {
        let blow_up = |x: f64, y: f64, _: &ParameterTuple| (x * x * 1e200, y / 0.0);
        let traj = advance(&blow_up, Point::new(10.0, 1.0), &ParameterTuple::default(), 4).unwrap();
        assert_eq!(traj.len(), 4);
        assert!(traj.xs[3].is_infinite());
        assert!(traj.ys[1].is_infinite());
    }

    #[test]
    fn advance_is_deterministic() {
        let params = ParameterTuple::new(&[-0.966918, 2.879879, 0.765145, 0.744728]).unwrap();
        let first = advance(&fractal_dream, Point::new(0.2, 0.1), &params, 10_000).unwrap();
        let second = advance(&fractal_dream, Point::new(0.2, 0.1), &params, 10_000).unwrap();
        let bits = |v: &[f64]| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&first.xs), bits(&second.xs));
        assert_eq!(bits(&first.ys), bits(&second.ys));
    }

    #[test]
    fn windowed_points_stay_inside_window() {
        let params = ParameterTuple::new(&[-0.966918, 2.879879, 0.765145, 0.744728]).unwrap();
        let map = |x: f64, y: f64| fractal_dream(x, y, &params);
        let window = Window::new((-2.0, 2.0), (-2.0, 2.0)).unwrap();

        let traj = advance_windowed(&map, Point::new(0.1, 0.1), &window, 1_000_000).unwrap();
        assert!(traj.len() <= 1_000_000);
        assert!(traj.points().all(|p| window.contains_point(p)));
    }

    #[test]
    fn windowed_keeps_walking_through_rejected_points() {
        // Alternates between (5, 0) and (0, 0); only every other step is inside.
        let toggle = |x: f64, _y: f64| if x == 0.0 { (5.0, 0.0) } else { (0.0, 0.0) };
        let window = Window::new((-1.0, 1.0), (-1.0, 1.0)).unwrap();

        let traj = advance_windowed(&toggle, Point::new(0.0, 0.0), &window, 6).unwrap();
        assert_eq!(traj.len(), 3);
        assert!(traj.xs.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn windowed_never_records_the_origin() {
        let fixed = |x: f64, y: f64| (x, y);
        let inside = Window::new((-1.0, 1.0), (-1.0, 1.0)).unwrap();
        let traj = advance_windowed(&fixed, Point::new(0.5, 0.5), &inside, 3).unwrap();
        assert_eq!(traj.len(), 3);

        // Origin outside the window: the walk still starts there.
        let shift = |x: f64, y: f64| (x - 1.0, y - 1.0);
        let traj = advance_windowed(&shift, Point::new(2.0, 2.0), &inside, 2).unwrap();
        assert_eq!(
            traj.points().collect::<Vec<_>>(),
            vec![Point::new(1.0, 1.0), Point::new(0.0, 0.0)]
        );
    }

    #[test]
    fn windowed_may_return_nothing() {
        let escape = |x: f64, y: f64| (x + 10.0, y);
        let window = Window::new((-1.0, 1.0), (-1.0, 1.0)).unwrap();
        let traj = advance_windowed(&escape, Point::new(0.0, 0.0), &window, 100).unwrap();
        assert!(traj.is_empty());
    }

    #[test]
    fn windowed_rejects_zero_attempts() {
        let fixed = |x: f64, y: f64| (x, y);
        let window = Window::new((-1.0, 1.0), (-1.0, 1.0)).unwrap();
        assert!(matches!(
            advance_windowed(&fixed, Point::new(0.0, 0.0), &window, 0),
            Err(EngineError::InvalidBounds(_))
        ));
    }
}
