//! Cubic Bezier segments in the (time, value) plane.

/// Bisection steps used to invert the time curve. 24 halvings resolve the
/// parameter to ~6e-8 of the keyframe interval.
pub const SOLVE_ITERATIONS: u32 = 24;

/// A cubic segment whose x axis is time and y axis is value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeCurve {
    pub p0: (f64, f64),
    pub p1: (f64, f64),
    pub p2: (f64, f64),
    pub p3: (f64, f64),
}

#[inline]
fn cubic(a: f64, b: f64, c: f64, d: f64, s: f64) -> f64 {
    let u = 1.0 - s;
    u * u * u * a + 3.0 * u * u * s * b + 3.0 * u * s * s * c + s * s * s * d
}

impl TimeCurve {
    #[inline]
    pub fn x(&self, s: f64) -> f64 {
        cubic(self.p0.0, self.p1.0, self.p2.0, self.p3.0, s)
    }

    #[inline]
    pub fn y(&self, s: f64) -> f64 {
        cubic(self.p0.1, self.p1.1, self.p2.1, self.p3.1, s)
    }

    /// Parameter `s` in `[0, 1]` with `x(s) == x`, found by bisection.
    ///
    /// The curve's x coordinate must be non-decreasing, which holds when both
    /// handles stay inside the keyframe interval.
    pub fn solve_parameter(&self, x: f64, iterations: u32) -> f64 {
        let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
        for _ in 0..iterations {
            let mid = 0.5 * (lo + hi);
            if self.x(mid) < x {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        0.5 * (lo + hi)
    }

    /// Value at time `x`.
    pub fn value_at(&self, x: f64) -> f64 {
        self.y(self.solve_parameter(x, SOLVE_ITERATIONS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_curve_is_linear() {
        let curve = TimeCurve {
            p0: (0.0, 0.0),
            p1: (1.0 / 3.0, 10.0 / 3.0),
            p2: (2.0 / 3.0, 20.0 / 3.0),
            p3: (1.0, 10.0),
        };
        for i in 0..=10 {
            let t = i as f64 / 10.0;
            assert!((curve.value_at(t) - t * 10.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_ease_in_out_is_symmetric() {
        let curve = TimeCurve {
            p0: (0.0, 0.0),
            p1: (0.5, 0.0),
            p2: (0.5, 1.0),
            p3: (1.0, 1.0),
        };
        assert!((curve.value_at(0.5) - 0.5).abs() < 1e-6);
        assert!(curve.value_at(0.25) < 0.25);
        assert!(curve.value_at(0.75) > 0.75);
    }

    #[test]
    fn test_endpoints() {
        let curve = TimeCurve {
            p0: (2.0, 5.0),
            p1: (2.5, 9.0),
            p2: (3.0, -1.0),
            p3: (4.0, 7.0),
        };
        assert!((curve.value_at(2.0) - 5.0).abs() < 1e-4);
        assert!((curve.value_at(4.0) - 7.0).abs() < 1e-4);
    }
}
