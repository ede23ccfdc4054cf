//! Offscreen color buffers.

use common::color::Color;
use common::error::{CompositorError, CompositorResult};
use rayon::prelude::*;
use std::fmt;

/// One RGBA sample. Whether color is premultiplied is tracked by the owning
/// [`Surface`].
pub type Pixel = [f32; 4];

/// Alpha convention of a surface's color channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaMode {
    /// Color channels are multiplied by alpha.
    Premultiplied,
    /// Color channels are independent of alpha.
    Straight,
}

impl AlphaMode {
    pub fn name(self) -> &'static str {
        match self {
            AlphaMode::Premultiplied => "premultiplied",
            AlphaMode::Straight => "straight",
        }
    }
}

impl fmt::Display for AlphaMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How samples outside the surface are resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeMode {
    /// Wrap around to the opposite edge.
    Wrap,
    /// Repeat the nearest edge pixel.
    Extend,
    /// Outside samples are transparent.
    Transparent,
}

/// An owned RGBA `f32` buffer with an optional depth buffer.
#[derive(Clone, PartialEq)]
pub struct Surface {
    width: u32,
    height: u32,
    alpha: AlphaMode,
    pixels: Vec<Pixel>,
    depth: Option<Vec<f32>>,
}

impl fmt::Debug for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Surface")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("alpha", &self.alpha)
            .field("depth", &self.depth.is_some())
            .finish()
    }
}

impl Surface {
    /// Create a transparent surface.
    pub fn new(width: u32, height: u32, alpha: AlphaMode) -> Self {
        Self {
            width,
            height,
            alpha,
            pixels: vec![[0.0; 4]; width as usize * height as usize],
            depth: None,
        }
    }

    /// Create a transparent premultiplied surface.
    pub fn premultiplied(width: u32, height: u32) -> Self {
        Self::new(width, height, AlphaMode::Premultiplied)
    }

    /// Create a surface from raw samples. `pixels.len()` must be `width * height`.
    pub fn from_pixels(width: u32, height: u32, alpha: AlphaMode, pixels: Vec<Pixel>) -> CompositorResult<Self> {
        if pixels.len() != width as usize * height as usize {
            return Err(CompositorError::render(format!(
                "{} samples for a {}x{} surface",
                pixels.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            alpha,
            pixels,
            depth: None,
        })
    }

    /// Create a straight-alpha surface from 8-bit RGBA bytes.
    pub fn from_rgba8(width: u32, height: u32, bytes: &[u8]) -> CompositorResult<Self> {
        let pixels = bytes
            .chunks_exact(4)
            .map(|c| Color::from_rgba8(c[0], c[1], c[2], c[3]).to_array())
            .collect();
        Self::from_pixels(width, height, AlphaMode::Straight, pixels)
    }

    /// Attach a depth buffer cleared to "infinitely far".
    pub fn with_depth(mut self) -> Self {
        self.depth = Some(vec![f32::INFINITY; self.pixels.len()]);
        self
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn alpha_mode(&self) -> AlphaMode {
        self.alpha
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [Pixel] {
        &mut self.pixels
    }

    pub fn depth(&self) -> Option<&[f32]> {
        self.depth.as_deref()
    }

    /// Mutable color and depth at once.
    pub fn pixels_and_depth_mut(&mut self) -> (&mut [Pixel], Option<&mut [f32]>) {
        (&mut self.pixels, self.depth.as_deref_mut())
    }

    /// Fail unless `other` has the same dimensions.
    pub fn check_same_size(&self, other: &Surface) -> CompositorResult<()> {
        if self.size() != other.size() {
            return Err(CompositorError::size_mismatch(self.size(), other.size()));
        }
        Ok(())
    }

    /// Fail unless the surface uses `mode`.
    pub fn require_alpha(&self, mode: AlphaMode) -> CompositorResult<()> {
        if self.alpha != mode {
            return Err(CompositorError::AlphaModeMismatch {
                expected: mode.name(),
                actual: self.alpha.name(),
            });
        }
        Ok(())
    }

    /// Destroy and recreate at a new size. Contents become transparent.
    pub fn resize(&mut self, width: u32, height: u32) {
        let has_depth = self.depth.is_some();
        *self = Surface::new(width, height, self.alpha);
        if has_depth {
            self.depth = Some(vec![f32::INFINITY; self.pixels.len()]);
        }
    }

    /// Clear to transparent and reset depth.
    pub fn clear(&mut self) {
        self.pixels.fill([0.0; 4]);
        if let Some(depth) = &mut self.depth {
            depth.fill(f32::INFINITY);
        }
    }

    /// Fill with a straight-alpha color, converting to this surface's convention.
    pub fn fill(&mut self, color: Color) {
        let px = match self.alpha {
            AlphaMode::Premultiplied => color.premultiplied(),
            AlphaMode::Straight => color.to_array(),
        };
        self.pixels.fill(px);
    }

    /// Copy contents and alpha convention from a same-sized surface.
    pub fn copy_from(&mut self, other: &Surface) -> CompositorResult<()> {
        self.check_same_size(other)?;
        self.pixels.copy_from_slice(&other.pixels);
        self.alpha = other.alpha;
        Ok(())
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get pixel at position. Out of bounds reads are transparent.
    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        if x >= self.width || y >= self.height {
            return [0.0; 4];
        }
        self.pixels[self.index(x, y)]
    }

    /// Set pixel at position. Out of bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, px: Pixel) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = self.index(x, y);
        self.pixels[i] = px;
    }

    /// Straight-alpha color at position.
    pub fn color_at(&self, x: u32, y: u32) -> Color {
        let px = self.get_pixel(x, y);
        match self.alpha {
            AlphaMode::Premultiplied => Color::from_premultiplied(px),
            AlphaMode::Straight => Color::from(px),
        }
    }

    /// Sample at integer coordinates with the given edge handling.
    #[inline]
    pub fn sample(&self, x: i64, y: i64, edge: EdgeMode) -> Pixel {
        let (w, h) = (i64::from(self.width), i64::from(self.height));
        if w == 0 || h == 0 {
            return [0.0; 4];
        }
        let (sx, sy) = match edge {
            EdgeMode::Wrap => (x.rem_euclid(w), y.rem_euclid(h)),
            EdgeMode::Extend => (x.clamp(0, w - 1), y.clamp(0, h - 1)),
            EdgeMode::Transparent => {
                if x < 0 || y < 0 || x >= w || y >= h {
                    return [0.0; 4];
                }
                (x, y)
            }
        };
        self.pixels[sy as usize * self.width as usize + sx as usize]
    }

    /// Bilinear sample at continuous coordinates (pixel centers at `+0.5`).
    pub fn sample_bilinear(&self, x: f64, y: f64, edge: EdgeMode) -> Pixel {
        let fx = x - 0.5;
        let fy = y - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = (fx - x0) as f32;
        let ty = (fy - y0) as f32;
        let (x0, y0) = (x0 as i64, y0 as i64);

        let p00 = self.sample(x0, y0, edge);
        let p10 = self.sample(x0 + 1, y0, edge);
        let p01 = self.sample(x0, y0 + 1, edge);
        let p11 = self.sample(x0 + 1, y0 + 1, edge);

        let mut out = [0.0; 4];
        for c in 0..4 {
            let top = p00[c] + (p10[c] - p00[c]) * tx;
            let bottom = p01[c] + (p11[c] - p01[c]) * tx;
            out[c] = top + (bottom - top) * ty;
        }
        out
    }

    /// Convert straight color to premultiplied in place.
    pub fn premultiply(&mut self) {
        if self.alpha == AlphaMode::Premultiplied {
            return;
        }
        self.pixels.par_iter_mut().for_each(|px| {
            px[0] *= px[3];
            px[1] *= px[3];
            px[2] *= px[3];
        });
        self.alpha = AlphaMode::Premultiplied;
    }

    /// Convert premultiplied color to straight in place.
    pub fn unpremultiply(&mut self) {
        if self.alpha == AlphaMode::Straight {
            return;
        }
        self.pixels.par_iter_mut().for_each(|px| *px = unpremultiply(*px));
        self.alpha = AlphaMode::Straight;
    }

    /// Quantize to 8-bit straight RGBA, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 4);
        for &px in &self.pixels {
            let color = match self.alpha {
                AlphaMode::Premultiplied => Color::from_premultiplied(px),
                AlphaMode::Straight => Color::from(px),
            };
            out.extend_from_slice(&color.to_rgba8());
        }
        out
    }
}

/// Straight color from a premultiplied sample. Transparent samples become zero.
#[inline]
pub fn unpremultiply(px: Pixel) -> Pixel {
    if px[3] <= 0.0 {
        return [0.0; 4];
    }
    let inv = 1.0 / px[3];
    [px[0] * inv, px[1] * inv, px[2] * inv, px[3]]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_converts_convention() {
        let mut s = Surface::premultiplied(2, 2);
        s.fill(Color::rgba(1.0, 0.5, 0.0, 0.5));
        assert_eq!(s.get_pixel(1, 1), [0.5, 0.25, 0.0, 0.5]);
        assert_eq!(s.color_at(1, 1), Color::rgba(1.0, 0.5, 0.0, 0.5));
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut s = Surface::premultiplied(2, 2);
        s.set_pixel(5, 5, [1.0; 4]);
        assert_eq!(s.get_pixel(5, 5), [0.0; 4]);
    }

    #[test]
    fn test_edge_modes() {
        let mut s = Surface::premultiplied(3, 1);
        s.set_pixel(0, 0, [0.1, 0.0, 0.0, 1.0]);
        s.set_pixel(2, 0, [0.3, 0.0, 0.0, 1.0]);
        assert_eq!(s.sample(-1, 0, EdgeMode::Wrap)[0], 0.3);
        assert_eq!(s.sample(-1, 0, EdgeMode::Extend)[0], 0.1);
        assert_eq!(s.sample(-1, 0, EdgeMode::Transparent), [0.0; 4]);
        assert_eq!(s.sample(4, 0, EdgeMode::Wrap)[0], s.sample(1, 0, EdgeMode::Wrap)[0]);
    }

    #[test]
    fn test_bilinear_center_is_exact() {
        let mut s = Surface::premultiplied(2, 1);
        s.set_pixel(0, 0, [0.0, 0.0, 0.0, 1.0]);
        s.set_pixel(1, 0, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(s.sample_bilinear(0.5, 0.5, EdgeMode::Extend)[0], 0.0);
        assert_eq!(s.sample_bilinear(1.0, 0.5, EdgeMode::Extend)[0], 0.5);
    }

    #[test]
    fn test_alpha_checks() {
        let a = Surface::premultiplied(2, 2);
        let b = Surface::new(2, 3, AlphaMode::Straight);
        assert!(a.check_same_size(&b).is_err());
        assert!(b.require_alpha(AlphaMode::Premultiplied).is_err());
        assert!(a.require_alpha(AlphaMode::Premultiplied).is_ok());
    }

    #[test]
    fn test_premultiply_round_trip() {
        let mut s = Surface::from_rgba8(1, 1, &[255, 0, 0, 128]).unwrap();
        s.premultiply();
        assert_eq!(s.alpha_mode(), AlphaMode::Premultiplied);
        s.unpremultiply();
        assert_eq!(s.to_rgba8(), vec![255, 0, 0, 128]);
    }

    #[test]
    fn test_resize_recreates() {
        let mut s = Surface::premultiplied(2, 2).with_depth();
        s.fill(Color::RED);
        s.resize(4, 3);
        assert_eq!(s.size(), (4, 3));
        assert_eq!(s.pixels().len(), 12);
        assert_eq!(s.get_pixel(0, 0), [0.0; 4]);
        assert_eq!(s.depth().map(|d| d.len()), Some(12));
    }
}
