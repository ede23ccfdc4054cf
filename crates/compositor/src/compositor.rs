//! Main compositor implementation.

use crate::composition::Composition;
use crate::config::CompositorConfig;
use crate::content::LayerRenderer;
use crate::images::ImageStore;
use crate::pool::SurfacePool;
use crate::stack::{self, MatteSource, PlannedLayer, RenderUnit};
use common::error::{CompositorError, CompositorResult};
use effects::{EffectRegistry, EffectRunner};
use render::{apply_matte_in_place, composite, resolve_depth, BlendMode, DepthFragment, Surface};
use std::sync::Arc;
use std::time::Instant;

/// Compositor statistics for the last frame.
#[derive(Clone, Debug, Default)]
pub struct CompositorStats {
    /// Layers drawn, matte sources excluded.
    pub layers_rendered: u32,
    /// Units blended onto the accumulator.
    pub units_composited: u32,
    /// 3D groups resolved.
    pub groups_resolved: u32,
    /// Layers dropped because they failed to render.
    pub layers_failed: u32,
    /// Frame time in milliseconds.
    pub render_time_ms: f32,
}

/// Renders compositions frame by frame.
///
/// Holds every surface a frame needs so that repeated calls at one size do
/// not reallocate. Each call is independent of the previous one.
pub struct Compositor {
    config: CompositorConfig,
    /// Ping-pong accumulators; `front` holds the latest result.
    accumulators: [Surface; 2],
    front: usize,
    runner: EffectRunner,
    images: ImageStore,
    pool: SurfacePool,
    thread_pool: Option<rayon::ThreadPool>,
    stats: CompositorStats,
}

impl Compositor {
    /// Create a compositor with the built-in effects.
    pub fn new(config: CompositorConfig) -> CompositorResult<Self> {
        Self::with_registry(config, Arc::new(EffectRegistry::with_builtin()))
    }

    /// Create a compositor with a caller-provided effect registry.
    pub fn with_registry(config: CompositorConfig, registry: Arc<EffectRegistry>) -> CompositorResult<Self> {
        config.validate()?;
        let thread_pool = match config.threads {
            Some(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("compositor-{}", i))
                    .build()
                    .map_err(|e| CompositorError::invalid_config(e.to_string()))?,
            ),
            None => None,
        };
        tracing::info!(
            supersample = config.supersample,
            threads = ?config.threads,
            "Compositor created"
        );

        Ok(Self {
            accumulators: [Surface::premultiplied(0, 0), Surface::premultiplied(0, 0)],
            front: 0,
            runner: EffectRunner::new(registry, 0, 0),
            images: ImageStore::new(),
            pool: SurfacePool::new(0, 0),
            thread_pool,
            stats: CompositorStats::default(),
            config,
        })
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<EffectRegistry> {
        self.runner.registry()
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// Make an image available to image layers under `name`.
    pub fn insert_image(&self, name: impl Into<String>, image: Surface) {
        self.images.insert(name, image);
    }

    /// Statistics of the last rendered frame.
    pub fn stats(&self) -> &CompositorStats {
        &self.stats
    }

    /// The last rendered frame, premultiplied.
    pub fn frame(&self) -> &Surface {
        &self.accumulators[self.front]
    }

    /// Render `comp` at `time` seconds.
    ///
    /// Invalid composition sizes and frame rates fail before any drawing.
    /// Layers that fail to render are left out and the frame completes.
    pub fn render_frame(&mut self, comp: &Composition, time: f64) -> CompositorResult<&Surface> {
        comp.validate(self.config.max_surface_dimension)?;
        self.prepare(comp.width, comp.height);

        let thread_pool = self.thread_pool.take();
        let result = match &thread_pool {
            Some(pool) => pool.install(|| self.render_units(comp, time)),
            None => self.render_units(comp, time),
        };
        self.thread_pool = thread_pool;
        result?;
        Ok(&self.accumulators[self.front])
    }

    /// Recreate surfaces when the frame size changes.
    fn prepare(&mut self, width: u32, height: u32) {
        if self.accumulators[0].size() == (width, height) {
            return;
        }
        tracing::debug!(width, height, "Resizing compositor surfaces");
        for surface in &mut self.accumulators {
            surface.resize(width, height);
        }
        self.pool.resize(width, height);
        self.runner.resize(width, height);
    }

    fn render_units(&mut self, comp: &Composition, time: f64) -> CompositorResult<()> {
        let start = Instant::now();
        self.stats = CompositorStats::default();

        let plan = stack::plan(comp, time);
        self.front = 0;
        self.accumulators[0].fill(comp.background);

        for unit in &plan.units {
            match unit {
                RenderUnit::Layer(planned) => self.composite_layer(comp, time, planned)?,
                RenderUnit::Group(members) => self.composite_group(comp, time, members)?,
            }
        }

        self.stats.render_time_ms = start.elapsed().as_secs_f32() * 1000.0;
        tracing::debug!(
            time,
            units = plan.units.len(),
            mattes = plan.consumed.len(),
            failed = self.stats.layers_failed,
            "Frame rendered"
        );
        Ok(())
    }

    /// Log and count a layer failure, or pass on configuration errors.
    fn skip_failed(&mut self, comp: &Composition, planned: &PlannedLayer, error: CompositorError) -> CompositorResult<()> {
        if error.is_configuration() {
            return Err(error);
        }
        tracing::warn!(
            layer = %comp.layers[planned.index].label(),
            error = %error,
            "Layer failed to render; leaving it out"
        );
        self.stats.layers_failed += 1;
        Ok(())
    }

    fn composite_layer(&mut self, comp: &Composition, time: f64, planned: &PlannedLayer) -> CompositorResult<()> {
        let layer = &comp.layers[planned.index];
        let opacity = layer.opacity_at(time);
        if opacity <= 0.0 {
            return Ok(());
        }
        let surface = match self.render_layer(comp, time, planned) {
            Ok(surface) => surface,
            Err(e) => return self.skip_failed(comp, planned, e),
        };
        let result = blend_onto(
            &mut self.accumulators,
            &mut self.front,
            &surface,
            opacity,
            layer.blend_mode,
        );
        self.pool.release(surface);
        result?;
        self.stats.units_composited += 1;
        Ok(())
    }

    fn composite_group(&mut self, comp: &Composition, time: f64, members: &[PlannedLayer]) -> CompositorResult<()> {
        let mut rendered: Vec<(Surface, &PlannedLayer)> = Vec::with_capacity(members.len());
        for planned in members {
            match self.render_layer(comp, time, planned) {
                Ok(surface) => rendered.push((surface, planned)),
                Err(e) => {
                    if let Err(e) = self.skip_failed(comp, planned, e) {
                        for (surface, _) in rendered {
                            self.pool.release(surface);
                        }
                        return Err(e);
                    }
                }
            }
        }

        let fragments: Vec<DepthFragment<'_>> = rendered
            .iter()
            .map(|(surface, planned)| {
                let layer = &comp.layers[planned.index];
                DepthFragment {
                    surface,
                    z: layer.transform.depth_at(time) as f32,
                    opacity: layer.opacity_at(time),
                    blend: layer.blend_mode,
                }
            })
            .collect();
        let result = resolve_onto(&mut self.accumulators, &mut self.front, &fragments);
        drop(fragments);
        for (surface, _) in rendered {
            self.pool.release(surface);
        }
        result?;
        self.stats.groups_resolved += 1;
        self.stats.units_composited += 1;
        Ok(())
    }

    /// Content, masks, track matte and effects of one layer.
    fn render_layer(&mut self, comp: &Composition, time: f64, planned: &PlannedLayer) -> CompositorResult<Surface> {
        let mut surface = self.pool.acquire();
        match self.render_layer_into(comp, time, planned, &mut surface) {
            Ok(()) => {
                self.stats.layers_rendered += 1;
                Ok(surface)
            }
            Err(e) => {
                self.pool.release(surface);
                Err(e)
            }
        }
    }

    fn render_layer_into(
        &mut self,
        comp: &Composition,
        time: f64,
        planned: &PlannedLayer,
        surface: &mut Surface,
    ) -> CompositorResult<()> {
        let layer = &comp.layers[planned.index];
        let renderer = LayerRenderer::new(&self.config, &self.images, comp.center());
        renderer.render(layer, time, surface, &mut self.pool)?;

        if let (Some(source), Some(track)) = (planned.matte, &layer.track_matte) {
            match source {
                MatteSource::Layer(index) => {
                    let matte_layer = &comp.layers[index];
                    let mut matte = self.pool.acquire();
                    if let Err(e) = renderer.render_matte_source(matte_layer, time, &mut matte, &mut self.pool) {
                        if e.is_configuration() {
                            self.pool.release(matte);
                            return Err(e);
                        }
                        tracing::warn!(
                            layer = %layer.label(),
                            matte = %matte_layer.label(),
                            error = %e,
                            "Track matte failed to render; treating it as empty"
                        );
                        matte.clear();
                    }
                    let result = apply_matte_in_place(
                        surface,
                        &matte,
                        track.mode,
                        track.inverted,
                        self.config.matte_edge_filter,
                    );
                    self.pool.release(matte);
                    result?;
                }
                MatteSource::Empty => {
                    if !track.inverted {
                        surface.clear();
                    }
                }
            }
        }

        if layer.has_active_effects() {
            let output = self.runner.run_at(surface, &layer.effects, time)?;
            surface.copy_from(output)?;
        }
        Ok(())
    }
}

/// Resolve a 3D group over the front accumulator, writing the back one, and swap.
fn resolve_onto(accumulators: &mut [Surface; 2], front: &mut usize, fragments: &[DepthFragment<'_>]) -> CompositorResult<()> {
    let (first, second) = accumulators.split_at_mut(1);
    let (base, out) = if *front == 0 {
        (&first[0], &mut second[0])
    } else {
        (&second[0], &mut first[0])
    };
    resolve_depth(base, fragments, out)?;
    *front = 1 - *front;
    Ok(())
}

/// Blend `layer` onto the front accumulator, writing the back one, and swap.
fn blend_onto(
    accumulators: &mut [Surface; 2],
    front: &mut usize,
    layer: &Surface,
    opacity: f32,
    mode: BlendMode,
) -> CompositorResult<()> {
    let (first, second) = accumulators.split_at_mut(1);
    let (base, out) = if *front == 0 {
        (&first[0], &mut second[0])
    } else {
        (&second[0], &mut first[0])
    };
    composite(base, layer, opacity, mode, out)?;
    *front = 1 - *front;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Layer, LayerTransform};
    use animation::{AnimatedProperty, Keyframe};
    use common::color::Color;
    use effects::Effect;
    use render::MatteMode;

    fn compositor() -> Compositor {
        Compositor::new(CompositorConfig::default().with_matte_edge_filter(false)).unwrap()
    }

    fn full(id: u32, color: Color) -> Layer {
        Layer::solid(id, color, 8.0, 8.0)
    }

    fn close(a: Color, b: Color) -> bool {
        (a.r - b.r).abs() < 1e-5 && (a.g - b.g).abs() < 1e-5 && (a.b - b.b).abs() < 1e-5 && (a.a - b.a).abs() < 1e-5
    }

    #[test]
    fn test_opacity_ramp_over_black() {
        let comp = Composition::new(8, 8, 30.0)
            .with_background(Color::BLACK)
            .with_layer(full(1, Color::RED).with_opacity(AnimatedProperty::animated(vec![
                Keyframe::linear(0.0, 0.0),
                Keyframe::linear(1.0, 100.0),
            ])));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.5).unwrap();
        assert!(close(frame.color_at(4, 4), Color::rgba(0.5, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_multiply_over_red() {
        let comp = Composition::new(8, 8, 30.0)
            .with_layer(full(1, Color::RED))
            .with_layer(full(2, Color::rgb(0.5, 0.5, 0.5)).with_z_order(1).with_blend_mode(BlendMode::Multiply));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(3, 3), Color::rgba(0.5, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_zero_opacity_layer_is_noop() {
        let background = Color::rgb(0.1, 0.2, 0.3);
        let comp = Composition::new(8, 8, 30.0)
            .with_background(background)
            .with_layer(full(1, Color::WHITE).with_opacity(AnimatedProperty::constant(0.0)));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(0, 0), background));
        assert_eq!(compositor.stats().units_composited, 0);
    }

    #[test]
    fn test_stack_order_follows_z_order() {
        let comp = Composition::new(8, 8, 30.0)
            .with_layer(full(1, Color::RED).with_z_order(5))
            .with_layer(full(2, Color::BLUE).with_z_order(1));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(4, 4), Color::RED));
    }

    #[test]
    fn test_deterministic_across_thread_counts() {
        let comp = Composition::new(16, 12, 24.0)
            .with_background(Color::BLACK)
            .with_layer(
                Layer::solid(1, Color::rgb(0.9, 0.4, 0.1), 6.0, 5.0)
                    .with_transform(
                        LayerTransform::at_position(8.0, 6.0)
                            .with_anchor(3.0, 2.5)
                            .with_rotation(AnimatedProperty::constant(30.0)),
                    )
                    .with_effect(Effect::with_constants("box-blur", &[1.0, 2.0])),
            )
            .with_layer(
                Layer::solid(2, Color::rgb(0.2, 0.3, 0.8), 16.0, 4.0)
                    .with_z_order(1)
                    .with_blend_mode(BlendMode::Screen)
                    .with_effect(Effect::with_constants("directional-blur", &[20.0, 4.0])),
            );

        let mut single = Compositor::new(CompositorConfig::default().with_threads(1)).unwrap();
        let mut multi = Compositor::new(CompositorConfig::default().with_threads(3)).unwrap();
        let a = single.render_frame(&comp, 0.25).unwrap().clone();
        let b = multi.render_frame(&comp, 0.25).unwrap().clone();
        let c = multi.render_frame(&comp, 0.25).unwrap().clone();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_missing_image_renders_transparent() {
        let comp = Composition::new(8, 8, 30.0)
            .with_background(Color::BLACK)
            .with_layer(Layer::image(1, "missing"))
            .with_layer(full(2, Color::GREEN).with_z_order(1).with_opacity(AnimatedProperty::constant(50.0)));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(2, 2), Color::rgba(0.0, 0.5, 0.0, 1.0)));
        assert_eq!(compositor.stats().layers_failed, 1);
    }

    #[test]
    fn test_inserted_image_is_drawn() {
        let comp = Composition::new(4, 4, 30.0).with_layer(Layer::image(1, "px"));
        let mut compositor = compositor();
        compositor.insert_image("px", Surface::from_rgba8(1, 1, &[255, 255, 0, 255]).unwrap());
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(0, 0), Color::rgb(1.0, 1.0, 0.0)));
        assert_eq!(frame.color_at(1, 1).a, 0.0);
    }

    #[test]
    fn test_invalid_composition_is_error() {
        let mut compositor = compositor();
        let err = compositor
            .render_frame(&Composition::new(0, 8, 30.0), 0.0)
            .unwrap_err();
        assert!(matches!(err, CompositorError::InvalidCompositionSize { .. }));
        assert!(compositor.render_frame(&Composition::new(8, 8, -1.0), 0.0).is_err());
    }

    #[test]
    fn test_track_matte_alpha() {
        let comp = Composition::new(8, 8, 30.0)
            .with_background(Color::BLACK)
            .with_layer(Layer::solid(1, Color::RED, 4.0, 8.0))
            .with_layer(full(2, Color::WHITE).with_z_order(1).with_track_matte(1, MatteMode::Alpha, false));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(1, 4), Color::WHITE));
        assert!(close(frame.color_at(6, 4), Color::BLACK));
    }

    #[test]
    fn test_track_matte_luma_inverted() {
        let comp = Composition::new(8, 8, 30.0)
            .with_background(Color::BLACK)
            .with_layer(Layer::solid(1, Color::WHITE, 4.0, 8.0))
            .with_layer(full(2, Color::BLUE).with_z_order(1).with_track_matte(1, MatteMode::Luma, true));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(1, 4), Color::BLACK));
        assert!(close(frame.color_at(6, 4), Color::BLUE));
    }

    #[test]
    fn test_inactive_matte_target_hides_layer() {
        let comp = Composition::new(8, 8, 30.0)
            .with_layer(full(1, Color::WHITE).with_time_range(2.0, 3.0))
            .with_layer(full(2, Color::RED).with_z_order(1).with_track_matte(1, MatteMode::Alpha, false));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert_eq!(frame.color_at(4, 4).a, 0.0);

        let frame = compositor.render_frame(&comp, 2.5).unwrap();
        assert!(close(frame.color_at(4, 4), Color::RED));
    }

    #[test]
    fn test_disabled_matte_layer_shapes_consumer() {
        let comp = Composition::new(8, 8, 30.0)
            .with_background(Color::BLACK)
            .with_layer(Layer::solid(1, Color::WHITE, 4.0, 8.0).disabled())
            .with_layer(full(2, Color::RED).with_z_order(1).with_track_matte(1, MatteMode::Alpha, false));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(1, 4), Color::RED));
        assert!(close(frame.color_at(6, 4), Color::BLACK));
    }

    #[test]
    fn test_3d_group_resolves_depth() {
        let near = full(1, Color::RED)
            .three_d()
            .with_transform(LayerTransform::default().with_position(AnimatedProperty::constant([0.0, 0.0, -10.0])));
        let far = full(2, Color::BLUE)
            .three_d()
            .with_z_order(1)
            .with_transform(LayerTransform::default().with_position(AnimatedProperty::constant([0.0, 0.0, 10.0])));
        let comp = Composition::new(8, 8, 30.0).with_layer(near).with_layer(far);
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(4, 4), Color::RED));
        assert_eq!(compositor.stats().groups_resolved, 1);
    }

    #[test]
    fn test_3d_layer_keeps_blend_mode_over_lower_layers() {
        let grey = full(2, Color::rgb(0.5, 0.5, 0.5))
            .three_d()
            .with_z_order(1)
            .with_blend_mode(BlendMode::Multiply);
        let comp = Composition::new(8, 8, 30.0).with_layer(full(1, Color::RED)).with_layer(grey);
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(3, 3), Color::rgba(0.5, 0.0, 0.0, 1.0)));
        assert_eq!(compositor.stats().groups_resolved, 1);
    }

    #[test]
    fn test_unknown_effect_passes_through() {
        let comp = Composition::new(8, 8, 30.0)
            .with_layer(full(1, Color::GREEN).with_effect(Effect::with_constants("no-such-effect", &[3.0])));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        assert!(close(frame.color_at(0, 0), Color::GREEN));
    }

    #[test]
    fn test_effect_applies() {
        let comp = Composition::new(8, 8, 30.0)
            .with_layer(Layer::solid(1, Color::WHITE, 4.0, 8.0).with_effect(Effect::with_constants("box-blur", &[1.0, 1.0, 1.0])));
        let mut compositor = compositor();
        let frame = compositor.render_frame(&comp, 0.0).unwrap();
        let edge = frame.get_pixel(4, 4)[3];
        assert!(edge > 0.0 && edge < 1.0);
    }

    #[test]
    fn test_resize_between_frames() {
        let mut compositor = compositor();
        compositor.render_frame(&Composition::new(8, 8, 30.0), 0.0).unwrap();
        let frame = compositor.render_frame(&Composition::new(4, 2, 30.0), 0.0).unwrap();
        assert_eq!(frame.size(), (4, 2));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(Compositor::new(CompositorConfig::default().with_supersample(0)).is_err());
    }
}
