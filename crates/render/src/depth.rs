//! Depth-sorted compositing of 3D layer groups.
//!
//! Every member of a group is rendered to its own surface. Resolving then
//! walks each pixel's fragments from farthest to nearest so that occlusion is
//! correct regardless of stack order.

use crate::blend::{blend_pixel, BlendMode};
use crate::surface::{AlphaMode, Surface};
use common::error::CompositorResult;
use rayon::prelude::*;
use smallvec::SmallVec;

/// One rendered member of a 3D group.
#[derive(Clone, Copy, Debug)]
pub struct DepthFragment<'a> {
    pub surface: &'a Surface,
    /// Camera-space depth. Larger is farther away.
    pub z: f32,
    /// Layer opacity in `0..=1`.
    pub opacity: f32,
    pub blend: BlendMode,
}

/// Composite `fragments` over `base` into `out`.
///
/// Each fragment blends with its own mode against whatever lies behind it,
/// starting from `base`. Equal depths keep stack order, the later fragment
/// drawing on top. If `out` carries a depth buffer it receives the depth of
/// the nearest visible fragment, or infinity where nothing was drawn.
pub fn resolve_depth(base: &Surface, fragments: &[DepthFragment<'_>], out: &mut Surface) -> CompositorResult<()> {
    base.require_alpha(AlphaMode::Premultiplied)?;
    out.require_alpha(AlphaMode::Premultiplied)?;
    out.check_same_size(base)?;
    for fragment in fragments {
        out.check_same_size(fragment.surface)?;
        fragment.surface.require_alpha(AlphaMode::Premultiplied)?;
    }

    let mut order: Vec<usize> = (0..fragments.len()).collect();
    order.sort_by(|&a, &b| fragments[b].z.total_cmp(&fragments[a].z));

    let width = out.width().max(1) as usize;
    let (pixels, depth) = out.pixels_and_depth_mut();
    let resolve_row = |y: usize, row: &mut [[f32; 4]], depth_row: Option<&mut [f32]>| {
        let mut nearest: SmallVec<[f32; 64]> = SmallVec::from_elem(f32::INFINITY, row.len());
        for (x, px) in row.iter_mut().enumerate() {
            let i = y * width + x;
            let mut acc = base.pixels()[i];
            for &f in &order {
                let fragment = &fragments[f];
                let sample = fragment.surface.pixels()[i];
                if sample[3] * fragment.opacity <= 0.0 {
                    continue;
                }
                acc = blend_pixel(acc, sample, fragment.opacity, fragment.blend);
                nearest[x] = nearest[x].min(fragment.z);
            }
            *px = acc;
        }
        if let Some(depth_row) = depth_row {
            depth_row.copy_from_slice(&nearest);
        }
    };

    match depth {
        Some(depth) => pixels
            .par_chunks_mut(width)
            .zip(depth.par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (row, d))| resolve_row(y, row, Some(d))),
        None => pixels
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| resolve_row(y, row, None)),
    }
    Ok(())
}
