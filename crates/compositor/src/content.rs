//! Rendering a single layer's content and masks.

use crate::config::CompositorConfig;
use crate::images::ImageStore;
use crate::layer::{Layer, LayerContent, LayerTransform};
use crate::pool::SurfacePool;
use common::color::Color;
use common::error::{CompositorError, CompositorResult};
use common::geometry::{Point, Transform2D};
use rayon::prelude::*;
use render::raster::{ImageContent, PolygonFill, SolidRect};
use render::{apply_matte_in_place, rasterize, MatteMode, Surface};

/// Closest a 3D layer may come to the camera plane, in pixels.
const NEAR_PLANE: f64 = 1e-3;

impl LayerTransform {
    /// Local-to-composition matrix at `time`, before any 3D projection.
    pub fn matrix_at(&self, time: f64) -> Transform2D {
        let anchor = self.anchor.value(time);
        let position = self.position.value(time);
        let scale = self.scale.value(time);
        let rotation = self.rotation.scalar_at(time, 0.0);

        let sx = scale.component_or(0, 100.0) / 100.0;
        let sy = scale.component_or(1, 100.0) / 100.0;
        Transform2D::translation(-anchor.component_or(0, 0.0), -anchor.component_or(1, 0.0))
            .then(&Transform2D::scale(sx, sy))
            .then(&Transform2D::rotation_degrees(rotation))
            .then(&Transform2D::translation(
                position.component_or(0, 0.0),
                position.component_or(1, 0.0),
            ))
    }

    /// Camera-space depth at `time`. Larger is farther away.
    pub fn depth_at(&self, time: f64) -> f64 {
        match self.position.value(time) {
            animation::Value::Vector(v) => v.get(2).copied().unwrap_or(0.0),
            _ => 0.0,
        }
    }
}

/// Renders layers into frame-sized surfaces.
pub struct LayerRenderer<'a> {
    config: &'a CompositorConfig,
    images: &'a ImageStore,
    center: Point,
}

impl<'a> LayerRenderer<'a> {
    pub fn new(config: &'a CompositorConfig, images: &'a ImageStore, center: Point) -> Self {
        Self { config, images, center }
    }

    /// Local-to-frame transform of `layer` at `time`.
    ///
    /// 3D layers are scaled about the frame center by `zoom / (zoom + z)`.
    pub fn placement(&self, layer: &Layer, time: f64) -> CompositorResult<Transform2D> {
        let mut m = layer.transform.matrix_at(time);
        if layer.is_3d {
            let zoom = self.config.camera_zoom;
            let distance = zoom + layer.transform.depth_at(time);
            if !distance.is_finite() || distance < NEAR_PLANE {
                return Err(CompositorError::render(format!(
                    "layer {} is behind the camera",
                    layer.label()
                )));
            }
            let p = zoom / distance;
            m = m
                .then(&Transform2D::translation(-self.center.x, -self.center.y))
                .then(&Transform2D::scale(p, p))
                .then(&Transform2D::translation(self.center.x, self.center.y));
        }
        let finite = [m.m11, m.m12, m.m21, m.m22, m.m31, m.m32].iter().all(|v| v.is_finite());
        if !finite {
            return Err(CompositorError::render(format!(
                "layer {} has a non-finite transform",
                layer.label()
            )));
        }
        Ok(m)
    }

    /// Draw `layer`'s content into the cleared `target` and apply its masks.
    /// Opacity is not applied.
    pub fn render(
        &self,
        layer: &Layer,
        time: f64,
        target: &mut Surface,
        pool: &mut SurfacePool,
    ) -> CompositorResult<()> {
        let to_frame = self.placement(layer, time)?;
        self.render_content(layer, time, &to_frame, target)?;
        self.apply_masks(layer, time, &to_frame, target, pool)
    }

    /// Render `layer` for use as a track matte: content and masks, scaled by
    /// the layer's opacity. Effects are not applied to matte sources.
    pub fn render_matte_source(
        &self,
        layer: &Layer,
        time: f64,
        target: &mut Surface,
        pool: &mut SurfacePool,
    ) -> CompositorResult<()> {
        self.render(layer, time, target, pool)?;
        let opacity = layer.opacity_at(time);
        if opacity < 1.0 {
            target.pixels_mut().par_iter_mut().for_each(|px| {
                for c in px.iter_mut() {
                    *c *= opacity;
                }
            });
        }
        Ok(())
    }

    fn render_content(
        &self,
        layer: &Layer,
        time: f64,
        to_frame: &Transform2D,
        target: &mut Surface,
    ) -> CompositorResult<()> {
        let ss = self.config.supersample;
        match &layer.content {
            LayerContent::Null => Ok(()),
            LayerContent::Solid { color, width, height } => {
                let rect = SolidRect {
                    width: *width,
                    height: *height,
                    color: color.clamped().premultiplied(),
                };
                rasterize(target, &rect, to_frame, ss)
            }
            LayerContent::Shape { path, fill } => {
                let path = path.value(time);
                let Some(path) = path.as_path() else {
                    tracing::trace!(layer = %layer.label(), "Shape path is not a path value");
                    return Ok(());
                };
                let fill = fill.value(time);
                let color = Color::rgba(
                    fill.component_or(0, 1.0) as f32,
                    fill.component_or(1, 1.0) as f32,
                    fill.component_or(2, 1.0) as f32,
                    fill.component_or(3, 1.0) as f32,
                );
                let polygon = PolygonFill::new(
                    path.flatten(self.config.curve_segments),
                    color.clamped().premultiplied(),
                );
                rasterize(target, &polygon, to_frame, ss)
            }
            LayerContent::Image { source } => {
                let image = self
                    .images
                    .get(source)
                    .ok_or_else(|| CompositorError::missing_source(format!("image '{}'", source)))?;
                rasterize(target, &ImageContent { image: &image }, to_frame, ss)
            }
        }
    }

    fn apply_masks(
        &self,
        layer: &Layer,
        time: f64,
        to_frame: &Transform2D,
        target: &mut Surface,
        pool: &mut SurfacePool,
    ) -> CompositorResult<()> {
        for mask in &layer.masks {
            let opacity = mask.opacity.scalar_at(time, 100.0) / 100.0;
            let opacity = if opacity.is_finite() { opacity.clamp(0.0, 1.0) as f32 } else { 0.0 };

            let mut matte = pool.acquire();
            let path = mask.path.value(time);
            let drawn = match path.as_path() {
                Some(path) => {
                    let coverage = PolygonFill::new(path.flatten(self.config.curve_segments), [opacity; 4]);
                    rasterize(&mut matte, &coverage, to_frame, self.config.supersample)
                }
                None => Ok(()),
            };
            let result = drawn.and_then(|_| {
                apply_matte_in_place(
                    target,
                    &matte,
                    MatteMode::Alpha,
                    mask.inverted,
                    self.config.matte_edge_filter,
                )
            });
            pool.release(matte);
            result?;
        }
        Ok(())
    }
}
