//! Effect instances attached to layers.

use animation::{AnimatedProperty, Value};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// One entry in a layer's effect chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Plugin identifier, e.g. `"box-blur"`.
    pub identifier: String,
    /// Positional parameters; meaning is defined by the plugin.
    #[serde(default)]
    pub parameters: Vec<AnimatedProperty>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl Effect {
    pub fn new(identifier: impl Into<String>, parameters: Vec<AnimatedProperty>) -> Self {
        Self {
            identifier: identifier.into(),
            parameters,
            enabled: true,
        }
    }

    /// Convenience for effects whose parameters are all constant scalars.
    pub fn with_constants(identifier: impl Into<String>, values: &[f64]) -> Self {
        Self::new(
            identifier,
            values.iter().map(|&v| AnimatedProperty::constant(v)).collect(),
        )
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Evaluate every parameter at `time`.
    pub fn evaluate(&self, time: f64) -> EffectParams {
        EffectParams(self.parameters.iter().map(|p| p.value(time)).collect())
    }
}

/// Parameter values of one effect at one time.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectParams(pub SmallVec<[Value; 4]>);

impl EffectParams {
    pub fn new(values: impl IntoIterator<Item = Value>) -> Self {
        Self(values.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    /// Scalar parameter at `index`, or `default` when absent, non-scalar or
    /// not finite.
    pub fn scalar(&self, index: usize, default: f64) -> f64 {
        match self.0.get(index).and_then(Value::as_scalar) {
            Some(v) if v.is_finite() => v,
            _ => default,
        }
    }
}

impl From<&[f64]> for EffectParams {
    fn from(values: &[f64]) -> Self {
        Self::new(values.iter().map(|&v| Value::Scalar(v)))
    }
}
