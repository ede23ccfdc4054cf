//! Keyframe evaluation for animated compositor properties.
//!
//! An [`AnimatedProperty`] is a sparse set of [`Keyframe`]s. Evaluating it at a
//! time is a pure, total function: it never fails and always returns the same
//! [`Value`] for the same input. Supported interpolation:
//! - linear
//! - hold (stepped)
//! - cubic Bezier easing with speed/influence handles
//!
//! Multi-vertex path values are interpolated vertex by vertex through
//! [`PathValue::interpolate`].

pub mod bezier;
pub mod keyframe;
pub mod path;
pub mod property;
pub mod value;

pub use keyframe::{Ease, Interpolation, Keyframe};
pub use path::PathValue;
pub use property::AnimatedProperty;
pub use value::{Value, ValueKind};
