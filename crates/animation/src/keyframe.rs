//! Keyframes and their easing handles.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// How a keyframe's value changes on one side of the keyframe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    #[default]
    Linear,
    Bezier,
    Hold,
}

/// Temporal ease handle.
///
/// `speed` is in value units per second; `influence` is the handle length as
/// a percentage (0 - 100) of the interval to the neighboring keyframe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ease {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub influence: f64,
}

impl Ease {
    pub const fn new(speed: f64, influence: f64) -> Self {
        Self { speed, influence }
    }

    /// Influence as a fraction in `[0, 1]`. Non-finite or negative input is 0.
    pub fn influence_fraction(&self) -> f64 {
        if self.influence.is_finite() && self.influence > 0.0 {
            (self.influence / 100.0).min(1.0)
        } else {
            0.0
        }
    }

    /// Speed with non-finite input replaced by 0.
    pub fn speed(&self) -> f64 {
        if self.speed.is_finite() {
            self.speed
        } else {
            0.0
        }
    }
}

/// A single keyframe of an animated property.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in seconds.
    pub time: f64,
    pub value: Value,
    #[serde(default)]
    pub in_ease: Ease,
    #[serde(default)]
    pub out_ease: Ease,
    #[serde(default)]
    pub in_type: Interpolation,
    #[serde(default)]
    pub out_type: Interpolation,
    /// Outgoing speed follows the incoming speed.
    #[serde(default)]
    pub continuous: bool,
    /// Ease speeds are derived from the neighboring keyframes.
    #[serde(default)]
    pub auto_bezier: bool,
}

impl Keyframe {
    /// A keyframe with linear interpolation on both sides.
    pub fn linear(time: f64, value: impl Into<Value>) -> Self {
        Self {
            time,
            value: value.into(),
            in_ease: Ease::default(),
            out_ease: Ease::default(),
            in_type: Interpolation::Linear,
            out_type: Interpolation::Linear,
            continuous: false,
            auto_bezier: false,
        }
    }

    /// A keyframe whose value holds until the next keyframe.
    pub fn hold(time: f64, value: impl Into<Value>) -> Self {
        Self {
            in_type: Interpolation::Hold,
            out_type: Interpolation::Hold,
            ..Self::linear(time, value)
        }
    }

    /// A keyframe with Bezier easing on both sides.
    pub fn bezier(time: f64, value: impl Into<Value>, in_ease: Ease, out_ease: Ease) -> Self {
        Self {
            in_ease,
            out_ease,
            in_type: Interpolation::Bezier,
            out_type: Interpolation::Bezier,
            ..Self::linear(time, value)
        }
    }

    /// Set incoming interpolation and ease.
    pub fn with_in(mut self, kind: Interpolation, ease: Ease) -> Self {
        self.in_type = kind;
        self.in_ease = ease;
        self
    }

    /// Set outgoing interpolation and ease.
    pub fn with_out(mut self, kind: Interpolation, ease: Ease) -> Self {
        self.out_type = kind;
        self.out_ease = ease;
        self
    }

    /// Mark the keyframe as auto-Bezier.
    pub fn with_auto_bezier(mut self) -> Self {
        self.auto_bezier = true;
        self
    }

    /// Mark the keyframe as continuous.
    pub fn with_continuous(mut self) -> Self {
        self.continuous = true;
        self
    }
}
