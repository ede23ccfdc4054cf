//! Post-effects applied to rendered layer surfaces.
//!
//! Effects are looked up by identifier in an [`EffectRegistry`] and run in
//! order by an [`EffectRunner`], which ping-pongs between two surfaces.
//! Unknown identifiers pass the image through unchanged.

pub mod box_blur;
pub mod directional_blur;
pub mod effect;
pub mod plugin;
pub mod registry;
pub mod runner;

pub use box_blur::BoxBlur;
pub use directional_blur::DirectionalBlur;
pub use effect::{Effect, EffectParams};
pub use plugin::{EffectContext, EffectPlugin};
pub use registry::EffectRegistry;
pub use runner::EffectRunner;
