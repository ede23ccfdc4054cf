//! Animated properties and the keyframe evaluator.

use crate::bezier::TimeCurve;
use crate::keyframe::{Ease, Interpolation, Keyframe};
use crate::value::Value;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Fraction of the interval used for the handle on a Linear side that meets a
/// Bezier side.
const LINEAR_HANDLE_FRACTION: f64 = 0.01;

/// Influence applied by auto-Bezier keyframes, as a fraction of the interval.
const AUTO_BEZIER_INFLUENCE: f64 = 100.0 / 6.0;

/// A property whose value is a function of time.
///
/// In JSON a property is either a bare [`Value`] (static) or an object with
/// `value` and `keyframes`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "PropertyRepr", into = "PropertyRepr")]
pub struct AnimatedProperty {
    /// Value used when there are no keyframes.
    pub static_value: Value,
    /// Keyframes in non-decreasing time order.
    pub keyframes: Vec<Keyframe>,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PropertyRepr {
    Static(Value),
    Animated {
        #[serde(default)]
        value: Value,
        #[serde(default)]
        keyframes: Vec<Keyframe>,
    },
}

impl From<PropertyRepr> for AnimatedProperty {
    fn from(repr: PropertyRepr) -> Self {
        match repr {
            PropertyRepr::Static(value) => AnimatedProperty::constant(value),
            PropertyRepr::Animated { value, keyframes } => AnimatedProperty::from_unsorted(value, keyframes),
        }
    }
}

impl From<AnimatedProperty> for PropertyRepr {
    fn from(p: AnimatedProperty) -> Self {
        if p.keyframes.is_empty() {
            PropertyRepr::Static(p.static_value)
        } else {
            PropertyRepr::Animated {
                value: p.static_value,
                keyframes: p.keyframes,
            }
        }
    }
}

impl AnimatedProperty {
    /// A property that never changes.
    pub fn constant(value: impl Into<Value>) -> Self {
        Self {
            static_value: value.into(),
            keyframes: Vec::new(),
        }
    }

    /// A keyframed property. Keyframes must already be time ordered.
    pub fn animated(keyframes: Vec<Keyframe>) -> Self {
        let static_value = keyframes.first().map(|k| k.value.clone()).unwrap_or_default();
        Self {
            static_value,
            keyframes,
        }
    }

    /// Build from keyframes in any order. Sorting is stable, so keyframes that
    /// share a time keep their relative order (the later one wins).
    pub fn from_unsorted(static_value: Value, mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.retain(|k| !k.time.is_nan());
        keyframes.sort_by_key(|k| OrderedFloat(k.time));
        Self {
            static_value,
            keyframes,
        }
    }

    /// Whether the property has any keyframes.
    pub fn is_animated(&self) -> bool {
        !self.keyframes.is_empty()
    }

    /// Evaluate the property at time `t` (seconds).
    pub fn value(&self, t: f64) -> Value {
        let kfs = &self.keyframes;
        let (Some(first), Some(last)) = (kfs.first(), kfs.last()) else {
            return self.static_value.clone();
        };
        if t.is_nan() {
            return first.value.clone();
        }

        // First keyframe strictly after `t`.
        let next = kfs.partition_point(|k| k.time <= t);
        if next == 0 {
            return first.value.clone();
        }
        if next == kfs.len() {
            return last.value.clone();
        }

        let k0 = &kfs[next - 1];
        if t == k0.time {
            return k0.value.clone();
        }
        self.interpolate_segment(next - 1, t)
    }

    /// Convenience: evaluate and read a scalar, falling back to `default`.
    pub fn scalar_at(&self, t: f64, default: f64) -> f64 {
        self.value(t).scalar_or(default)
    }

    /// Interpolate between keyframes `i` and `i + 1` at `t`, with
    /// `keyframes[i].time < t < keyframes[i + 1].time`.
    fn interpolate_segment(&self, i: usize, t: f64) -> Value {
        let k0 = &self.keyframes[i];
        let k1 = &self.keyframes[i + 1];

        if k0.out_type == Interpolation::Hold || k1.in_type == Interpolation::Hold {
            return k0.value.clone();
        }
        if k0.value.kind() != k1.value.kind() {
            tracing::trace!(time = t, "keyframe value kinds differ; holding");
            return k0.value.clone();
        }

        let dt = k1.time - k0.time;
        if k0.out_type == Interpolation::Linear && k1.in_type == Interpolation::Linear {
            return k0.value.lerp(&k1.value, (t - k0.time) / dt);
        }

        let out_ease = (k0.out_type == Interpolation::Bezier).then(|| self.effective_out_ease(i));
        let in_ease = (k1.in_type == Interpolation::Bezier).then(|| self.effective_in_ease(i + 1));

        match (&k0.value, &k1.value) {
            (Value::Scalar(v0), Value::Scalar(v1)) => {
                let curve = ease_curve((k0.time, *v0), (k1.time, *v1), out_ease, in_ease, 1.0);
                Value::Scalar(curve.value_at(t))
            }
            (a, b) => {
                // Ease along normalized progress; handle heights are measured
                // against the distance between the two values.
                let distance = a.distance(b);
                let scale = if distance > 0.0 { 1.0 / distance } else { 0.0 };
                let curve = ease_curve((k0.time, 0.0), (k1.time, 1.0), out_ease, in_ease, scale);
                a.lerp(b, curve.value_at(t))
            }
        }
    }

    fn effective_out_ease(&self, i: usize) -> Ease {
        let kf = &self.keyframes[i];
        if kf.auto_bezier {
            return self.auto_ease(i);
        }
        if kf.continuous {
            return Ease::new(kf.in_ease.speed, kf.out_ease.influence);
        }
        kf.out_ease
    }

    fn effective_in_ease(&self, i: usize) -> Ease {
        let kf = &self.keyframes[i];
        if kf.auto_bezier {
            return self.auto_ease(i);
        }
        kf.in_ease
    }

    /// Auto-Bezier handle: the slope through the neighboring keyframes for
    /// scalar properties, flat at the ends and for other value kinds.
    fn auto_ease(&self, i: usize) -> Ease {
        let prev = i.checked_sub(1).and_then(|p| self.keyframes.get(p));
        let next = self.keyframes.get(i + 1);
        let speed = match (prev, next) {
            (Some(p), Some(n)) if n.time > p.time => match (&p.value, &n.value) {
                (Value::Scalar(a), Value::Scalar(b)) => (b - a) / (n.time - p.time),
                _ => 0.0,
            },
            _ => 0.0,
        };
        Ease::new(speed, AUTO_BEZIER_INFLUENCE)
    }
}

/// Build the (time, value) cubic between two keyframes.
///
/// `None` for an ease means that side is Linear. `speed_scale` converts speeds
/// from value units into the curve's value axis.
fn ease_curve(
    p0: (f64, f64),
    p3: (f64, f64),
    out_ease: Option<Ease>,
    in_ease: Option<Ease>,
    speed_scale: f64,
) -> TimeCurve {
    let dt = p3.0 - p0.0;
    let chord_slope = (p3.1 - p0.1) / dt;

    let out_infl = out_ease.map_or(LINEAR_HANDLE_FRACTION, |e| e.influence_fraction());
    let in_infl = in_ease.map_or(LINEAR_HANDLE_FRACTION, |e| e.influence_fraction());

    let out_slope = out_ease.map_or(chord_slope, |e| e.speed() * speed_scale);
    let in_slope = in_ease.map_or(chord_slope, |e| e.speed() * speed_scale);

    let out_dx = out_infl * dt;
    let in_dx = in_infl * dt;
    TimeCurve {
        p0,
        p1: (p0.0 + out_dx, p0.1 + out_slope * out_dx),
        p2: (p3.0 - in_dx, p3.1 - in_slope * in_dx),
        p3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathValue;
    use common::geometry::Point;

    fn scalar(p: &AnimatedProperty, t: f64) -> f64 {
        p.value(t).as_scalar().unwrap()
    }

    #[test]
    fn test_static_value_without_keyframes() {
        let p = AnimatedProperty::constant(42.0);
        for t in [-10.0, 0.0, 0.5, 1e9] {
            assert_eq!(p.value(t), Value::Scalar(42.0));
        }
    }

    #[test]
    fn test_clamps_outside_range() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(1.0, 10.0),
            Keyframe::linear(2.0, 20.0),
        ]);
        assert_eq!(scalar(&p, -5.0), 10.0);
        assert_eq!(scalar(&p, 1.0), 10.0);
        assert_eq!(scalar(&p, 2.0), 20.0);
        assert_eq!(scalar(&p, 99.0), 20.0);
    }

    #[test]
    fn test_linear_midpoint_is_exact() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, 0.1),
            Keyframe::linear(1.0, 0.7),
        ]);
        assert_eq!(scalar(&p, 0.5), (0.1 + 0.7) / 2.0);

        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(2.0, -4.3),
            Keyframe::linear(4.0, 8.9),
        ]);
        assert_eq!(scalar(&p, 3.0), (-4.3 + 8.9) / 2.0);

        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, [0.3, 1.1]),
            Keyframe::linear(1.0, [0.9, -2.7]),
        ]);
        assert_eq!(
            p.value(0.5),
            Value::Vector(smallvec::smallvec![(0.3 + 0.9) / 2.0, (1.1 - 2.7) / 2.0])
        );
    }

    #[test]
    fn test_overlapping_influences_keep_handle_lengths() {
        let curve = ease_curve(
            (0.0, 0.0),
            (2.0, 10.0),
            Some(Ease::new(0.0, 80.0)),
            Some(Ease::new(0.0, 90.0)),
            1.0,
        );
        assert!((curve.p1.0 - 1.6).abs() < 1e-12);
        assert!((curve.p2.0 - 0.2).abs() < 1e-12);

        let p = AnimatedProperty::animated(vec![
            Keyframe::bezier(0.0, 0.0, Ease::new(0.0, 80.0), Ease::new(0.0, 80.0)),
            Keyframe::bezier(2.0, 10.0, Ease::new(0.0, 90.0), Ease::new(0.0, 90.0)),
        ]);
        let mut previous = scalar(&p, 0.0);
        for i in 1..=40 {
            let v = scalar(&p, i as f64 * 0.05);
            assert!(v >= previous - 1e-9);
            previous = v;
        }
        assert_eq!(previous, 10.0);
    }

    #[test]
    fn test_hold_keeps_first_value() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::hold(0.0, 1.0),
            Keyframe::linear(1.0, 5.0),
        ]);
        for t in [0.0, 0.25, 0.5, 0.999] {
            assert_eq!(scalar(&p, t), 1.0);
        }
        assert_eq!(scalar(&p, 1.0), 5.0);
    }

    #[test]
    fn test_hold_on_incoming_side() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, 1.0),
            Keyframe::linear(1.0, 5.0).with_in(Interpolation::Hold, Ease::default()),
        ]);
        assert_eq!(scalar(&p, 0.75), 1.0);
    }

    #[test]
    fn test_later_tie_wins_at_exact_time() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, 0.0),
            Keyframe::linear(1.0, 10.0),
            Keyframe::linear(1.0, 20.0),
            Keyframe::linear(2.0, 30.0),
        ]);
        assert_eq!(scalar(&p, 1.0), 20.0);
        assert_eq!(scalar(&p, 1.5), 25.0);
    }

    #[test]
    fn test_bezier_ease_in_out() {
        let ease = Ease::new(0.0, 33.0);
        let p = AnimatedProperty::animated(vec![
            Keyframe::bezier(0.0, 0.0, ease, ease),
            Keyframe::bezier(1.0, 100.0, ease, ease),
        ]);
        let mid = scalar(&p, 0.5);
        assert!((mid - 50.0).abs() < 1e-4, "mid {mid}");
        assert!(scalar(&p, 0.1) < 10.0);
        assert!(scalar(&p, 0.9) > 90.0);
    }

    #[test]
    fn test_bezier_speed_matches_linear() {
        // Handles along the chord reproduce linear motion.
        let ease = Ease::new(100.0, 33.333);
        let p = AnimatedProperty::animated(vec![
            Keyframe::bezier(0.0, 0.0, ease, ease),
            Keyframe::bezier(1.0, 100.0, ease, ease),
        ]);
        for i in 1..10 {
            let t = i as f64 / 10.0;
            assert!((scalar(&p, t) - t * 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_mixed_linear_and_bezier_sides() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, 0.0),
            Keyframe::linear(1.0, 10.0).with_in(Interpolation::Bezier, Ease::new(0.0, 75.0)),
        ]);
        let v = scalar(&p, 0.9);
        // Decelerating into the last keyframe: ahead of linear.
        assert!(v > 9.0 && v < 10.0, "value {v}");
        let early = scalar(&p, 0.01);
        assert!(early > 0.0 && early < 0.5, "value {early}");
    }

    #[test]
    fn test_missing_influence_degenerates_to_endpoint_handles() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::bezier(0.0, 0.0, Ease::default(), Ease::new(500.0, f64::NAN)),
            Keyframe::bezier(1.0, 10.0, Ease::default(), Ease::default()),
        ]);
        let v = scalar(&p, 0.5);
        assert!((v - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_vector_ease_uses_normalized_progress() {
        let ease = Ease::new(0.0, 50.0);
        let p = AnimatedProperty::animated(vec![
            Keyframe::bezier(0.0, [0.0, 0.0], ease, ease),
            Keyframe::bezier(2.0, [30.0, 40.0], ease, ease),
        ]);
        let Value::Vector(v) = p.value(1.0) else {
            panic!("expected vector");
        };
        assert!((v[0] - 15.0).abs() < 1e-4);
        assert!((v[1] - 20.0).abs() < 1e-4);
    }

    #[test]
    fn test_path_keyframes_interpolate_per_vertex() {
        let a = PathValue::rectangle(0.0, 0.0, 10.0, 10.0);
        let b = PathValue::rectangle(0.0, 0.0, 20.0, 20.0);
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, a),
            Keyframe::linear(1.0, b),
        ]);
        let path = p.value(0.5);
        let path = path.as_path().unwrap();
        assert_eq!(path.vertices[2], Point::new(15.0, 15.0));
    }

    #[test]
    fn test_mismatched_kinds_hold() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, 1.0),
            Keyframe::linear(1.0, [2.0, 3.0]),
        ]);
        assert_eq!(p.value(0.5), Value::Scalar(1.0));
    }

    #[test]
    fn test_auto_bezier_follows_neighbor_slope() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, 0.0),
            Keyframe::bezier(1.0, 10.0, Ease::default(), Ease::default()).with_auto_bezier(),
            Keyframe::linear(2.0, 20.0),
        ]);
        // A straight line through all three keyframes stays straight.
        assert!((scalar(&p, 0.5) - 5.0).abs() < 0.05);
        assert!((scalar(&p, 1.5) - 15.0).abs() < 0.05);
    }

    #[test]
    fn test_continuous_mirrors_incoming_speed() {
        let kf = Keyframe::bezier(1.0, 10.0, Ease::new(10.0, 33.0), Ease::new(-50.0, 33.0)).with_continuous();
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, 0.0),
            kf,
            Keyframe::linear(2.0, 20.0),
        ]);
        assert!((scalar(&p, 1.5) - 15.0).abs() < 0.5);
    }

    #[test]
    fn test_from_unsorted_is_stable() {
        let p = AnimatedProperty::from_unsorted(
            Value::Scalar(0.0),
            vec![
                Keyframe::linear(2.0, 2.0),
                Keyframe::linear(1.0, 10.0),
                Keyframe::linear(1.0, 11.0),
                Keyframe::linear(f64::NAN, 99.0),
            ],
        );
        let times: Vec<f64> = p.keyframes.iter().map(|k| k.time).collect();
        assert_eq!(times, vec![1.0, 1.0, 2.0]);
        assert_eq!(scalar(&p, 1.0), 11.0);
    }

    #[test]
    fn test_json_forms() {
        let p: AnimatedProperty = serde_json::from_str("100").unwrap();
        assert_eq!(p, AnimatedProperty::constant(100.0));

        let json = r#"{"keyframes": [{"time": 1, "value": 100}, {"time": 0, "value": 0}]}"#;
        let p: AnimatedProperty = serde_json::from_str(json).unwrap();
        assert_eq!(p.keyframes.len(), 2);
        assert_eq!(scalar(&p, 0.5), 50.0);
    }

    #[test]
    fn test_nan_time_is_total() {
        let p = AnimatedProperty::animated(vec![
            Keyframe::linear(0.0, 3.0),
            Keyframe::linear(1.0, 4.0),
        ]);
        assert_eq!(scalar(&p, f64::NAN), 3.0);
    }
}
