//! Pure geometry and filtering helpers.
//!
//! Nothing here holds state: range mapping, exponential smoothing, Euclidean
//! distance, containment and the bounded-exponential hold sampler.

use rand::Rng;

/// A point on the canvas, in canvas units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance_to(self, other: Point) -> f64 {
        l2norm(other.x - self.x, other.y - self.y)
    }
}

/// Map `x` linearly from `[a, b]` onto `[c, d]`.
///
/// `a == b` yields a non-finite result; parameter validation rejects that.
#[inline]
pub fn linear_map(x: f64, a: f64, b: f64, c: f64, d: f64) -> f64 {
    c + (x - a) * (d - c) / (b - a)
}

/// One exponential-moving-average step: `alpha * sample + (1 - alpha) * prev`.
#[inline]
pub fn ema(alpha: f64, sample: f64, prev: f64) -> f64 {
    alpha * sample + (1.0 - alpha) * prev
}

#[inline]
pub fn l2norm(dx: f64, dy: f64) -> f64 {
    dx.hypot(dy)
}

/// Strict containment: a point exactly `tolerance` away is outside.
#[inline]
pub fn contains(center: Point, cursor: Point, tolerance: f64) -> bool {
    center.distance_to(cursor) < tolerance
}

/// Bounded-exponential duration in seconds.
///
/// Returns `min` exactly when `max` is absent or not above `min`. Otherwise
/// draws from an exponential with scale `(max - min) / spread`, clips the
/// draw to `max - min` and adds `min` back, so the result is always in
/// `[min, max]` with most of the mass near `min`.
pub fn randomized_duration<R: Rng>(
    min: f64,
    max: Option<f64>,
    spread: f64,
    rng: &mut R,
) -> f64 {
    let Some(max) = max else {
        return min;
    };
    if max <= min {
        return min;
    }
    let window = max - min;
    let beta = window / spread;
    // Inverse-CDF draw; 1 - u lies in (0, 1] so the log is finite.
    let u: f64 = rng.random();
    let draw = -beta * (1.0 - u).ln();
    let clipped = if draw.is_finite() { draw.min(window) } else { window };
    clipped + min
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn ema_half_alpha_averages() {
        assert_eq!(ema(0.5, 800.0, 600.0), 700.0);
        assert_eq!(ema(1.0, 800.0, 600.0), 800.0);
    }

    #[test]
    fn linear_map_endpoints_and_inverted_range() {
        assert_eq!(linear_map(0.0, 0.0, 1000.0, 0.0, 1200.0), 0.0);
        assert_eq!(linear_map(1000.0, 0.0, 1000.0, 0.0, 1200.0), 1200.0);
        assert_eq!(linear_map(500.0, 0.0, 1000.0, 0.0, 1200.0), 600.0);
        // Bottom > top flips the axis.
        assert_eq!(linear_map(1000.0, 1000.0, 0.0, 0.0, 800.0), 0.0);
    }

    #[test]
    fn containment_is_strict() {
        let c = Point::new(600.0, 400.0);
        assert!(!contains(c, Point::new(625.0, 400.0), 25.0));
        assert!(contains(c, Point::new(624.0, 400.0), 25.0));
        assert!(contains(c, c, 25.0));
        // 3-4-5 triangle scaled by 5 lands exactly on the boundary.
        assert!(!contains(c, Point::new(615.0, 420.0), 25.0));
    }

    #[test]
    fn degenerate_window_returns_min_exactly() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(randomized_duration(0.5, None, 5.0, &mut rng), 0.5);
        assert_eq!(randomized_duration(0.5, Some(0.5), 5.0, &mut rng), 0.5);
        assert_eq!(randomized_duration(0.5, Some(0.2), 5.0, &mut rng), 0.5);
    }

    #[test]
    fn samples_stay_in_window_and_cluster_near_min() {
        let mut rng = StdRng::seed_from_u64(42);
        let n = 5_000;
        let mut below_mid = 0;
        for _ in 0..n {
            let v = randomized_duration(1.0, Some(2.0), 5.0, &mut rng);
            assert!((1.0..=2.0).contains(&v), "{v} outside [1, 2]");
            if v < 1.5 {
                below_mid += 1;
            }
        }
        // P(draw < window/2) = 1 - e^-2.5, about 0.92.
        assert!(below_mid > n * 85 / 100, "only {below_mid} of {n} below midpoint");
    }
}
