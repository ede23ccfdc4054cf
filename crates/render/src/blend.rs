//! Layer blending onto a premultiplied accumulator.

use crate::surface::{unpremultiply, AlphaMode, Pixel, Surface};
use common::error::CompositorResult;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Blend mode for compositing a layer onto what lies beneath it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Add,
    Darken,
    Lighten,
}

impl BlendMode {
    /// Blend one straight color channel. `cb` is the base, `cs` the layer.
    #[inline]
    pub fn blend_channel(self, cb: f32, cs: f32) -> f32 {
        match self {
            BlendMode::Normal => cs,
            BlendMode::Multiply => cb * cs,
            BlendMode::Screen => cb + cs - cb * cs,
            BlendMode::Overlay => {
                if cb <= 0.5 {
                    2.0 * cb * cs
                } else {
                    1.0 - 2.0 * (1.0 - cb) * (1.0 - cs)
                }
            }
            BlendMode::Add => (cb + cs).min(1.0),
            BlendMode::Darken => cb.min(cs),
            BlendMode::Lighten => cb.max(cs),
        }
    }
}

/// Blend a premultiplied layer sample onto a premultiplied base sample.
///
/// The blend function sees straight colors. Where the base is only partly
/// covered, the layer color shows through in proportion to the missing base
/// alpha, so an opaque base reduces to `mix(base, B(base, layer), a)`.
#[inline]
pub fn blend_pixel(base: Pixel, layer: Pixel, opacity: f32, mode: BlendMode) -> Pixel {
    let a = (layer[3] * opacity).clamp(0.0, 1.0);
    if a <= 0.0 {
        return base;
    }

    let src = unpremultiply(layer);
    let dst = unpremultiply(base);
    let ab = base[3].clamp(0.0, 1.0);

    let mut out = [0.0; 4];
    for c in 0..3 {
        let cs = src[c].clamp(0.0, 1.0);
        let mixed = if mode == BlendMode::Normal {
            cs
        } else {
            let b = mode.blend_channel(dst[c], cs);
            (1.0 - ab) * cs + ab * b
        };
        out[c] = base[c] * (1.0 - a) + mixed * a;
    }
    out[3] = a + ab * (1.0 - a);
    out
}

/// Composite `layer` over `base` into `out`.
///
/// All three surfaces must share a size and be premultiplied. `out` must not
/// alias `base`; callers ping-pong two accumulators.
pub fn composite(
    base: &Surface,
    layer: &Surface,
    opacity: f32,
    mode: BlendMode,
    out: &mut Surface,
) -> CompositorResult<()> {
    base.check_same_size(layer)?;
    base.check_same_size(out)?;
    base.require_alpha(AlphaMode::Premultiplied)?;
    layer.require_alpha(AlphaMode::Premultiplied)?;
    out.require_alpha(AlphaMode::Premultiplied)?;

    let opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) } else { 0.0 };
    out.pixels_mut()
        .par_iter_mut()
        .zip(base.pixels().par_iter())
        .zip(layer.pixels().par_iter())
        .for_each(|((o, &b), &l)| *o = blend_pixel(b, l, opacity, mode));
    Ok(())
}
