//! Animatable values.

use crate::path::PathValue;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inline storage for vector values (positions, scales, colors).
pub type VectorValue = SmallVec<[f64; 4]>;

/// A value an animated property can take.
///
/// In JSON a scalar is a bare number, a vector is an array of numbers, and a
/// path is an object with `vertices`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Vector(VectorValue),
    Path(PathValue),
}

/// The kind of a [`Value`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Scalar,
    Vector,
    Path,
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(0.0)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Scalar(v)
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Value::Vector(SmallVec::from_slice(v))
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(v: [f64; N]) -> Self {
        Value::Vector(SmallVec::from_slice(&v))
    }
}

impl From<PathValue> for Value {
    fn from(v: PathValue) -> Self {
        Value::Path(v)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Scalar(_) => ValueKind::Scalar,
            Value::Vector(_) => ValueKind::Vector,
            Value::Path(_) => ValueKind::Path,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&PathValue> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Scalar payload, or the first component of a vector, or `default`.
    pub fn scalar_or(&self, default: f64) -> f64 {
        match self {
            Value::Scalar(v) => *v,
            Value::Vector(v) => v.first().copied().unwrap_or(default),
            Value::Path(_) => default,
        }
    }

    /// Component `index`. Scalars broadcast to every component.
    pub fn component_or(&self, index: usize, default: f64) -> f64 {
        match self {
            Value::Scalar(v) => *v,
            Value::Vector(v) => v.get(index).copied().unwrap_or(default),
            Value::Path(_) => default,
        }
    }

    /// Linear blend towards `other` at `t`.
    ///
    /// Vectors are zero-padded to the longer length; paths blend per vertex.
    /// Values of different kinds do not blend: `self` is returned.
    pub fn lerp(&self, other: &Value, t: f64) -> Value {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar((1.0 - t) * a + t * b),
            (Value::Vector(a), Value::Vector(b)) => {
                let len = a.len().max(b.len());
                Value::Vector(
                    (0..len)
                        .map(|i| {
                            let x = a.get(i).copied().unwrap_or(0.0);
                            let y = b.get(i).copied().unwrap_or(0.0);
                            (1.0 - t) * x + t * y
                        })
                        .collect(),
                )
            }
            (Value::Path(a), Value::Path(b)) => Value::Path(a.interpolate(b, t)),
            _ => self.clone(),
        }
    }

    /// Euclidean distance between two values of the same kind.
    ///
    /// Paths have no meaningful distance and report `1.0` so that easing runs
    /// on normalized progress. Mismatched kinds report `0.0`.
    pub fn distance(&self, other: &Value) -> f64 {
        match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => (b - a).abs(),
            (Value::Vector(a), Value::Vector(b)) => {
                let len = a.len().max(b.len());
                (0..len)
                    .map(|i| {
                        let d = b.get(i).copied().unwrap_or(0.0) - a.get(i).copied().unwrap_or(0.0);
                        d * d
                    })
                    .sum::<f64>()
                    .sqrt()
            }
            (Value::Path(_), Value::Path(_)) => 1.0,
            _ => 0.0,
        }
    }
}
