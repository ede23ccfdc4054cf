//! Software rendering primitives for the compositor.
//!
//! Everything here works on [`Surface`]s: owned `f32` RGBA buffers with an
//! explicit alpha convention. The kernels are per-pixel and run row-parallel
//! with rayon; no kernel reduces across pixels, so output does not depend on
//! scheduling.

pub mod blend;
pub mod depth;
pub mod matte;
pub mod raster;
pub mod surface;

pub use blend::{composite, BlendMode};
pub use depth::{resolve_depth, DepthFragment};
pub use matte::{apply_matte, apply_matte_in_place, MatteMode};
pub use raster::{rasterize, LocalContent};
pub use surface::{AlphaMode, EdgeMode, Pixel, Surface};
