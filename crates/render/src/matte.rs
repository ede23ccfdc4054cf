//! Mask and track-matte attenuation.
//!
//! A matte is a surface whose alpha or luminance decides how much of another
//! surface survives. The coverage factor is low-pass filtered with a 3x3
//! binomial kernel before it is applied, which softens stair-stepping along
//! hard matte edges.

use crate::surface::{AlphaMode, Pixel, Surface};
use common::color::LUMA_WEIGHTS;
use common::error::CompositorResult;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Which matte channel drives coverage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatteMode {
    #[default]
    Alpha,
    Luma,
}

/// Binomial weights; the 3x3 kernel is their outer product over 16.
const KERNEL: [f32; 3] = [1.0, 2.0, 1.0];

#[inline]
fn coverage(px: Pixel, alpha: AlphaMode, mode: MatteMode) -> f32 {
    let f = match mode {
        MatteMode::Alpha => px[3],
        MatteMode::Luma => {
            let luma = LUMA_WEIGHTS[0] * px[0] + LUMA_WEIGHTS[1] * px[1] + LUMA_WEIGHTS[2] * px[2];
            match alpha {
                AlphaMode::Premultiplied => luma,
                AlphaMode::Straight => luma * px[3],
            }
        }
    };
    f.clamp(0.0, 1.0)
}

/// Per-pixel coverage of `matte`, optionally filtered.
fn coverage_map(matte: &Surface, mode: MatteMode, filter: bool) -> Vec<f32> {
    let alpha = matte.alpha_mode();
    let raw: Vec<f32> = matte
        .pixels()
        .par_iter()
        .map(|&px| coverage(px, alpha, mode))
        .collect();
    if !filter {
        return raw;
    }

    let w = matte.width() as usize;
    let h = matte.height() as usize;
    let mut filtered = vec![0.0; raw.len()];
    filtered
        .par_chunks_mut(w.max(1))
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let mut sum = 0.0;
                for (ky, wy) in KERNEL.iter().enumerate() {
                    let sy = (y + ky).saturating_sub(1).min(h - 1);
                    for (kx, wx) in KERNEL.iter().enumerate() {
                        let sx = (x + kx).saturating_sub(1).min(w - 1);
                        sum += wx * wy * raw[sy * w + sx];
                    }
                }
                *out = sum / 16.0;
            }
        });
    filtered
}

/// Attenuate premultiplied `content` by `matte` in place.
pub fn apply_matte_in_place(
    content: &mut Surface,
    matte: &Surface,
    mode: MatteMode,
    inverted: bool,
    edge_filter: bool,
) -> CompositorResult<()> {
    content.check_same_size(matte)?;
    content.require_alpha(AlphaMode::Premultiplied)?;

    let coverage = coverage_map(matte, mode, edge_filter);
    content
        .pixels_mut()
        .par_iter_mut()
        .zip(coverage.par_iter())
        .for_each(|(px, &f)| {
            let m = if inverted { 1.0 - f } else { f };
            for c in px.iter_mut() {
                *c *= m;
            }
        });
    Ok(())
}

/// Return a copy of `content` attenuated by `matte`, with the edge filter on.
///
/// Straight color is untouched; only coverage changes.
pub fn apply_matte(
    content: &Surface,
    matte: &Surface,
    mode: MatteMode,
    inverted: bool,
) -> CompositorResult<Surface> {
    let mut out = content.clone();
    apply_matte_in_place(&mut out, matte, mode, inverted, true)?;
    Ok(out)
}
