//! Layer stack compositor.
//!
//! Renders a [`Composition`] at a given time by walking its layers bottom to
//! top. Each layer goes through:
//! - content rasterization and masks
//! - track-matte attenuation
//! - its effect chain
//! - blending onto the running accumulator
//!
//! Rendering is deterministic: the same composition and time always produce
//! the same pixels.

pub mod composition;
pub mod compositor;
pub mod config;
pub mod content;
pub mod images;
pub mod layer;
pub mod pool;
pub mod stack;

pub use self::compositor::{Compositor, CompositorStats};
pub use composition::Composition;
pub use config::CompositorConfig;
pub use content::LayerRenderer;
pub use images::ImageStore;
pub use layer::{Layer, LayerContent, LayerId, LayerTransform, Mask, TrackMatte};
pub use stack::{plan, MatteSource, PlannedLayer, RenderUnit, StackPlan};

pub use animation::{AnimatedProperty, Keyframe, PathValue, Value};
pub use common::{Color, CompositorError, CompositorResult};
pub use effects::{Effect, EffectPlugin, EffectRegistry};
pub use render::{AlphaMode, BlendMode, MatteMode, Surface};

/// Render `comp` at `time` with a default compositor.
///
/// Convenient for one-off frames. Callers rendering sequences should keep a
/// [`Compositor`] to reuse its surfaces.
pub fn render_frame(comp: &Composition, time: f64) -> CompositorResult<Surface> {
    let mut compositor = Compositor::new(CompositorConfig::default())?;
    Ok(compositor.render_frame(comp, time)?.clone())
}
