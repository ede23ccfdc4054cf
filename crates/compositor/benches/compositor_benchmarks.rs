//! Compositor benchmarks.

use animation::{AnimatedProperty, Keyframe, PathValue};
use common::color::Color;
use common::geometry::Point;
use compositor::{Composition, Compositor, CompositorConfig, Effect, Layer, LayerTransform};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use render::{BlendMode, MatteMode};

fn scene(width: u32, height: u32) -> Composition {
    let (w, h) = (f64::from(width), f64::from(height));
    Composition::new(width, height, 30.0)
        .with_duration(2.0)
        .with_background(Color::BLACK)
        .with_layer(Layer::solid(1, Color::rgb(0.1, 0.2, 0.4), w, h))
        .with_layer(
            Layer::shape(2, PathValue::ellipse(Point::new(w / 2.0, h / 2.0), w / 4.0, h / 4.0), Color::RED)
                .with_z_order(1)
                .with_opacity(AnimatedProperty::animated(vec![
                    Keyframe::linear(0.0, 0.0),
                    Keyframe::linear(2.0, 100.0),
                ])),
        )
        .with_layer(
            Layer::solid(3, Color::WHITE, w / 2.0, h)
                .with_z_order(2)
                .with_blend_mode(BlendMode::Screen)
                .with_track_matte(2, MatteMode::Alpha, false),
        )
        .with_layer(
            Layer::solid(4, Color::GREEN, w / 3.0, h / 3.0)
                .with_z_order(3)
                .with_transform(
                    LayerTransform::at_position(w / 2.0, h / 2.0)
                        .with_anchor(w / 6.0, h / 6.0)
                        .with_rotation(AnimatedProperty::animated(vec![
                            Keyframe::linear(0.0, 0.0),
                            Keyframe::linear(2.0, 360.0),
                        ])),
                )
                .with_effect(Effect::with_constants("box-blur", &[4.0, 2.0])),
        )
}

/// Benchmark full frame rendering.
fn bench_render_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_frame");

    for &(width, height) in &[(320u32, 180u32), (1280, 720)] {
        let comp = scene(width, height);
        let mut compositor = Compositor::new(CompositorConfig::draft()).expect("valid config");
        group.bench_with_input(BenchmarkId::new("draft", format!("{}x{}", width, height)), &comp, |b, comp| {
            b.iter(|| {
                let frame = compositor.render_frame(black_box(comp), black_box(0.75)).expect("render");
                black_box(frame.width())
            })
        });
    }

    group.finish();
}

/// Benchmark keyframe evaluation.
fn bench_keyframe_evaluation(c: &mut Criterion) {
    let keyframes: Vec<Keyframe> = (0..64)
        .map(|i| Keyframe::linear(i as f64 * 0.5, (i % 7) as f64 * 10.0))
        .collect();
    let property = AnimatedProperty::animated(keyframes);

    c.bench_function("keyframe_value", |b| {
        b.iter(|| {
            let mut sum = 0.0;
            for i in 0..256 {
                sum += property.scalar_at(black_box(i as f64 * 0.123), 0.0);
            }
            black_box(sum)
        })
    });
}

/// Benchmark path interpolation.
fn bench_path_interpolation(c: &mut Criterion) {
    let a = PathValue::ellipse(Point::new(0.0, 0.0), 50.0, 50.0);
    let b = PathValue::rectangle(-40.0, -40.0, 80.0, 80.0);

    c.bench_function("path_interpolate", |bench| {
        bench.iter(|| black_box(a.interpolate(black_box(&b), 0.37)))
    });
}

criterion_group!(
    benches,
    bench_render_frame,
    bench_keyframe_evaluation,
    bench_path_interpolation,
);
criterion_main!(benches);
