//! Separable box blur.
//!
//! Parameters, by position:
//! 0. radius in pixels (default 0)
//! 1. iterations, clamped to `1..=3` (default 1)
//! 2. axis: 0 = both, 1 = horizontal only, 2 = vertical only (default 0)
//! 3. edge: 0 = wrap around, 1 = extend the edge pixel (default 1)
//!
//! Accumulation happens on premultiplied samples so transparent neighbours
//! contribute no color and edges do not darken.

use crate::plugin::{EffectContext, EffectPlugin};
use common::error::CompositorResult;
use rayon::prelude::*;
use render::{AlphaMode, EdgeMode, Pixel, Surface};

pub const IDENTIFIER: &str = "box-blur";

const MAX_ITERATIONS: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Both,
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct BoxBlur;

impl BoxBlur {
    fn radius(value: f64, width: u32, height: u32) -> usize {
        let limit = width.max(height) as f64;
        value.round().clamp(0.0, limit) as usize
    }
}

impl EffectPlugin for BoxBlur {
    fn identifier(&self) -> &str {
        IDENTIFIER
    }

    fn apply(&self, ctx: &EffectContext<'_>, src: &Surface, dst: &mut Surface) -> CompositorResult<()> {
        src.check_same_size(dst)?;
        src.require_alpha(AlphaMode::Premultiplied)?;

        let radius = Self::radius(ctx.params.scalar(0, 0.0), src.width(), src.height());
        let iterations = (ctx.params.scalar(1, 1.0).round().max(1.0) as u32).min(MAX_ITERATIONS);
        let axis = match ctx.params.scalar(2, 0.0).round() as i64 {
            1 => Axis::Horizontal,
            2 => Axis::Vertical,
            _ => Axis::Both,
        };
        let edge = if ctx.params.scalar(3, 1.0).round() as i64 == 0 {
            EdgeMode::Wrap
        } else {
            EdgeMode::Extend
        };

        dst.copy_from(src)?;
        if radius == 0 || src.width() == 0 || src.height() == 0 {
            return Ok(());
        }

        let mut scratch = Surface::premultiplied(src.width(), src.height());
        for _ in 0..iterations {
            match axis {
                Axis::Both => {
                    horizontal_pass(dst, &mut scratch, radius, edge);
                    vertical_pass(&scratch, dst, radius, edge);
                }
                Axis::Horizontal => {
                    horizontal_pass(dst, &mut scratch, radius, edge);
                    dst.copy_from(&scratch)?;
                }
                Axis::Vertical => {
                    vertical_pass(dst, &mut scratch, radius, edge);
                    dst.copy_from(&scratch)?;
                }
            }
        }
        Ok(())
    }
}

#[inline]
fn average(samples: impl Iterator<Item = Pixel>, count: usize) -> Pixel {
    let mut sum = [0.0f32; 4];
    for s in samples {
        for c in 0..4 {
            sum[c] += s[c];
        }
    }
    let inv = 1.0 / count as f32;
    sum.map(|v| v * inv)
}

fn horizontal_pass(src: &Surface, dst: &mut Surface, radius: usize, edge: EdgeMode) {
    let width = src.width() as usize;
    let r = radius as i64;
    dst.pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let samples = (-r..=r).map(|k| src.sample(x as i64 + k, y as i64, edge));
                *out = average(samples, 2 * radius + 1);
            }
        });
}

fn vertical_pass(src: &Surface, dst: &mut Surface, radius: usize, edge: EdgeMode) {
    let width = src.width() as usize;
    let r = radius as i64;
    dst.pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let samples = (-r..=r).map(|k| src.sample(x as i64, y as i64 + k, edge));
                *out = average(samples, 2 * radius + 1);
            }
        });
}
