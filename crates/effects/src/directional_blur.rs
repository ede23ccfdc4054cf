//! Motion-style blur along a single direction.
//!
//! Parameters: `[angle_degrees, length_px]`. Each output pixel averages
//! [`TAPS`] bilinear samples spread evenly over a segment of `length_px`
//! centered on the pixel. Angles are clockwise from +x on a y-down raster.

use crate::plugin::{EffectContext, EffectPlugin};
use common::error::CompositorResult;
use common::geometry::Vec2;
use rayon::prelude::*;
use render::{AlphaMode, EdgeMode, Surface};

pub const IDENTIFIER: &str = "directional-blur";

/// Samples per output pixel.
pub const TAPS: usize = 33;

#[derive(Clone, Copy, Debug, Default)]
pub struct DirectionalBlur;

impl EffectPlugin for DirectionalBlur {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn apply(&self, ctx: &EffectContext<'_>, src: &Surface, dst: &mut Surface) -> CompositorResult<()> {
        src.check_same_size(dst)?;
        src.require_alpha(AlphaMode::Premultiplied)?;

        let angle = ctx.params.scalar(0, 0.0);
        let length = ctx.params.scalar(1, 0.0);
        if length == 0.0 || src.width() == 0 {
            return dst.copy_from(src);
        }

        let dir = Vec2::from_angle_degrees(angle) * length;
        let offsets: Vec<Vec2> = (0..TAPS)
            .map(|i| dir * (i as f64 / (TAPS - 1) as f64 - 0.5))
            .collect();
        let inv = 1.0 / TAPS as f32;
        let width = src.width() as usize;

        dst.pixels_mut()
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let cy = y as f64 + 0.5;
                for (x, out) in row.iter_mut().enumerate() {
                    let cx = x as f64 + 0.5;
                    let mut sum = [0.0f32; 4];
                    for offset in &offsets {
                        let s = src.sample_bilinear(cx + offset.x, cy + offset.y, EdgeMode::Extend);
                        for c in 0..4 {
                            sum[c] += s[c];
                        }
                    }
                    *out = sum.map(|v| v * inv);
                }
            });
        Ok(())
    }
}
