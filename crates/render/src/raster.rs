//! Supersampled rasterization of layer content.
//!
//! Content is described in its own local space. [`rasterize`] maps every
//! covered output pixel back through the inverse layer transform and averages
//! a regular grid of samples inside it.

use crate::surface::{AlphaMode, Pixel, Surface};
use common::error::{CompositorError, CompositorResult};
use common::geometry::{Point, Rect, Transform2D};
use rayon::prelude::*;

/// Something that can be sampled in layer-local space.
pub trait LocalContent: Sync {
    /// Local-space extent. Samples outside it are transparent.
    fn bounds(&self) -> Rect;

    /// Premultiplied color at a local point.
    fn sample(&self, point: Point) -> Pixel;
}

/// Axis-aligned rectangle from the local origin.
#[derive(Clone, Copy, Debug)]
pub struct SolidRect {
    pub width: f64,
    pub height: f64,
    /// Premultiplied fill.
    pub color: Pixel,
}

impl LocalContent for SolidRect {
    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width.max(0.0), self.height.max(0.0))
    }

    fn sample(&self, point: Point) -> Pixel {
        if self.bounds().contains_point(point) {
            self.color
        } else {
            [0.0; 4]
        }
    }
}

/// A flattened polygon filled with the nonzero winding rule.
#[derive(Clone, Debug)]
pub struct PolygonFill {
    points: Vec<Point>,
    bounds: Rect,
    color: Pixel,
}

impl PolygonFill {
    /// `color` is premultiplied.
    pub fn new(points: Vec<Point>, color: Pixel) -> Self {
        let bounds = Rect::from_points(points.iter().copied());
        Self {
            points,
            bounds,
            color,
        }
    }

    /// Nonzero winding number of the closed polygon around `p`.
    pub fn winding(&self, p: Point) -> i32 {
        let n = self.points.len();
        if n < 3 {
            return 0;
        }
        let mut winding = 0;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            let side = (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y);
            if a.y <= p.y {
                if b.y > p.y && side > 0.0 {
                    winding += 1;
                }
            } else if b.y <= p.y && side < 0.0 {
                winding -= 1;
            }
        }
        winding
    }
}

impl LocalContent for PolygonFill {
    fn bounds(&self) -> Rect {
        self.bounds
    }

    fn sample(&self, point: Point) -> Pixel {
        if self.winding(point) != 0 {
            self.color
        } else {
            [0.0; 4]
        }
    }
}

/// A bitmap placed at the local origin, one unit per pixel, sampled nearest.
#[derive(Clone, Copy, Debug)]
pub struct ImageContent<'a> {
    pub image: &'a Surface,
}

impl LocalContent for ImageContent<'_> {
    fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.image.width()), f64::from(self.image.height()))
    }

    fn sample(&self, point: Point) -> Pixel {
        if !self.bounds().contains_point(point) {
            return [0.0; 4];
        }
        let px = self.image.get_pixel(point.x.floor() as u32, point.y.floor() as u32);
        match self.image.alpha_mode() {
            AlphaMode::Premultiplied => px,
            AlphaMode::Straight => [px[0] * px[3], px[1] * px[3], px[2] * px[3], px[3]],
        }
    }
}

/// Rasterize `content` into premultiplied `target` through `to_target`.
///
/// Pixels the content cannot reach are left untouched. A transform that
/// cannot be inverted is an error so the caller can drop the layer.
pub fn rasterize(
    target: &mut Surface,
    content: &dyn LocalContent,
    to_target: &Transform2D,
    supersample: u32,
) -> CompositorResult<()> {
    target.require_alpha(AlphaMode::Premultiplied)?;
    let inverse = to_target
        .inverse()
        .ok_or_else(|| CompositorError::render("layer transform is not invertible"))?;

    let local = content.bounds();
    if local.is_empty() {
        return Ok(());
    }
    let surface_rect = Rect::new(0.0, 0.0, f64::from(target.width()), f64::from(target.height()));
    let Some(covered) = to_target.transform_rect(local).intersection(&surface_rect) else {
        tracing::trace!("Content lies outside the target; nothing to draw");
        return Ok(());
    };

    let x0 = covered.x.floor().max(0.0) as usize;
    let y0 = covered.y.floor().max(0.0) as usize;
    let x1 = (covered.right().ceil() as usize).min(target.width() as usize);
    let y1 = (covered.bottom().ceil() as usize).min(target.height() as usize);
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    let ss = supersample.max(1);
    let step = 1.0 / f64::from(ss);
    let weight = 1.0 / (ss * ss) as f32;
    let width = target.width() as usize;

    target
        .pixels_mut()
        .par_chunks_mut(width)
        .enumerate()
        .skip(y0)
        .take(y1 - y0)
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate().take(x1).skip(x0) {
                let mut acc = [0.0f32; 4];
                for sy in 0..ss {
                    let py = y as f64 + (f64::from(sy) + 0.5) * step;
                    for sx in 0..ss {
                        let px = x as f64 + (f64::from(sx) + 0.5) * step;
                        let p = inverse.transform_point(Point::new(px, py));
                        let s = content.sample(p);
                        for c in 0..4 {
                            acc[c] += s[c];
                        }
                    }
                }
                if acc[3] > 0.0 {
                    *out = acc.map(|v| v * weight);
                }
            }
        });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_solid() {
        let mut s = Surface::premultiplied(4, 4);
        let rect = SolidRect {
            width: 2.0,
            height: 2.0,
            color: [1.0, 0.0, 0.0, 1.0],
        };
        rasterize(&mut s, &rect, &Transform2D::identity(), 2).unwrap();
        assert_eq!(s.get_pixel(0, 0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(s.get_pixel(1, 1), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(s.get_pixel(2, 2), [0.0; 4]);
    }

    #[test]
    fn test_translated_half_pixel_is_partial() {
        let mut s = Surface::premultiplied(4, 1);
        let rect = SolidRect {
            width: 1.0,
            height: 1.0,
            color: [1.0; 4],
        };
        rasterize(&mut s, &rect, &Transform2D::translation(0.5, 0.0), 2).unwrap();
        assert!((s.get_pixel(0, 0)[3] - 0.5).abs() < 1e-6);
        assert!((s.get_pixel(1, 0)[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_winding() {
        let square = PolygonFill::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(4.0, 0.0),
                Point::new(4.0, 4.0),
                Point::new(0.0, 4.0),
            ],
            [1.0; 4],
        );
        assert_ne!(square.winding(Point::new(2.0, 2.0)), 0);
        assert_eq!(square.winding(Point::new(5.0, 2.0)), 0);
    }

    #[test]
    fn test_triangle_fill() {
        let mut s = Surface::premultiplied(8, 8);
        let tri = PolygonFill::new(
            vec![Point::new(0.0, 0.0), Point::new(8.0, 0.0), Point::new(0.0, 8.0)],
            [0.0, 0.0, 1.0, 1.0],
        );
        rasterize(&mut s, &tri, &Transform2D::identity(), 1).unwrap();
        assert_eq!(s.get_pixel(1, 1), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(s.get_pixel(6, 6), [0.0; 4]);
    }

    #[test]
    fn test_degenerate_transform_is_error() {
        let mut s = Surface::premultiplied(2, 2);
        let rect = SolidRect {
            width: 1.0,
            height: 1.0,
            color: [1.0; 4],
        };
        assert!(rasterize(&mut s, &rect, &Transform2D::scale(0.0, 1.0), 1).is_err());
    }

    #[test]
    fn test_image_nearest_and_premultiplied() {
        let image = Surface::from_rgba8(2, 1, &[255, 0, 0, 255, 0, 255, 0, 0]).unwrap();
        let mut s = Surface::premultiplied(2, 1);
        rasterize(&mut s, &ImageContent { image: &image }, &Transform2D::identity(), 1).unwrap();
        assert_eq!(s.get_pixel(0, 0), [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(s.get_pixel(1, 0), [0.0; 4]);
    }

    #[test]
    fn test_offscreen_content_is_skipped() {
        let mut s = Surface::premultiplied(2, 2);
        let rect = SolidRect {
            width: 1.0,
            height: 1.0,
            color: [1.0; 4],
        };
        rasterize(&mut s, &rect, &Transform2D::translation(10.0, 10.0), 1).unwrap();
        assert!(s.pixels().iter().all(|p| *p == [0.0; 4]));
    }
}
