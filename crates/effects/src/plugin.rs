//! The effect plugin interface.

use crate::effect::EffectParams;
use common::error::CompositorResult;
use render::Surface;

/// Per-invocation state handed to a plugin.
#[derive(Clone, Copy, Debug)]
pub struct EffectContext<'a> {
    /// Composition time in seconds.
    pub time: f64,
    /// Parameters evaluated at `time`.
    pub params: &'a EffectParams,
}

/// A post-effect that reads one premultiplied surface and writes another.
///
/// `src` and `dst` always have the same size. Implementations must write every
/// pixel of `dst` and must not depend on its previous contents.
pub trait EffectPlugin: Send + Sync {
    /// Stable identifier used for lookup.
    fn identifier(&self) -> &str;

    fn apply(&self, ctx: &EffectContext<'_>, src: &Surface, dst: &mut Surface) -> CompositorResult<()>;
}
