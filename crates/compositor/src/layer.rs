//! Composition layers.

use animation::{AnimatedProperty, PathValue, Value};
use common::color::Color;
use effects::Effect;
use render::{BlendMode, MatteMode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a layer within a composition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayerId(pub u32);

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a layer draws, in its local coordinate space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LayerContent {
    /// Draws nothing. Useful as a matte placeholder.
    Null,
    /// A filled rectangle from the local origin.
    Solid { color: Color, width: f64, height: f64 },
    /// A filled path. `fill` is an RGBA vector in `0..=1`.
    Shape {
        path: AnimatedProperty,
        #[serde(default = "default_fill")]
        fill: AnimatedProperty,
    },
    /// A bitmap looked up by name in the compositor's image store.
    Image { source: String },
}

fn default_fill() -> AnimatedProperty {
    AnimatedProperty::constant([1.0, 1.0, 1.0, 1.0])
}

/// Animated placement of a layer.
///
/// Applied as: move the anchor to the origin, scale, rotate, then move to
/// the position.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerTransform {
    /// Local-space pivot, `[x, y]`.
    pub anchor: AnimatedProperty,
    /// Composition-space position, `[x, y]` or `[x, y, z]`.
    pub position: AnimatedProperty,
    /// Percent, `[sx, sy]` or a single uniform value.
    pub scale: AnimatedProperty,
    /// Degrees, clockwise.
    pub rotation: AnimatedProperty,
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self {
            anchor: AnimatedProperty::constant([0.0, 0.0]),
            position: AnimatedProperty::constant([0.0, 0.0, 0.0]),
            scale: AnimatedProperty::constant([100.0, 100.0]),
            rotation: AnimatedProperty::constant(0.0),
        }
    }
}

impl LayerTransform {
    pub fn at_position(x: f64, y: f64) -> Self {
        Self {
            position: AnimatedProperty::constant([x, y, 0.0]),
            ..Self::default()
        }
    }

    pub fn with_anchor(mut self, x: f64, y: f64) -> Self {
        self.anchor = AnimatedProperty::constant([x, y]);
        self
    }

    pub fn with_position(mut self, position: AnimatedProperty) -> Self {
        self.position = position;
        self
    }

    pub fn with_scale(mut self, scale: AnimatedProperty) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rotation(mut self, rotation: AnimatedProperty) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Pairing of a layer with the layer whose pixels attenuate it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackMatte {
    pub target: LayerId,
    #[serde(default)]
    pub mode: MatteMode,
    #[serde(default)]
    pub inverted: bool,
}

/// A path mask in layer-local space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mask {
    pub path: AnimatedProperty,
    /// Percent.
    #[serde(default = "full_opacity")]
    pub opacity: AnimatedProperty,
    #[serde(default)]
    pub inverted: bool,
}

impl Mask {
    pub fn new(path: PathValue) -> Self {
        Self {
            path: AnimatedProperty::constant(path),
            opacity: full_opacity(),
            inverted: false,
        }
    }

    pub fn inverted(mut self) -> Self {
        self.inverted = true;
        self
    }
}

fn full_opacity() -> AnimatedProperty {
    AnimatedProperty::constant(100.0)
}

fn enabled_default() -> bool {
    true
}

fn out_point_default() -> f64 {
    f64::MAX
}

/// A compositing layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub id: LayerId,
    /// Stack position. Lower values are drawn first.
    #[serde(default)]
    pub z_order: i32,
    #[serde(default)]
    pub name: String,
    pub content: LayerContent,
    #[serde(default)]
    pub transform: LayerTransform,
    /// Percent, `0..=100`.
    #[serde(default = "full_opacity")]
    pub opacity: AnimatedProperty,
    #[serde(default)]
    pub blend_mode: BlendMode,
    #[serde(default)]
    pub is_3d: bool,
    #[serde(default)]
    pub track_matte: Option<TrackMatte>,
    #[serde(default)]
    pub masks: Vec<Mask>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// First visible time, inclusive.
    #[serde(default)]
    pub in_point: f64,
    /// End of visibility, exclusive.
    #[serde(default = "out_point_default")]
    pub out_point: f64,
}

impl Layer {
    pub fn new(id: u32, content: LayerContent) -> Self {
        Self {
            id: LayerId(id),
            z_order: 0,
            name: String::new(),
            content,
            transform: LayerTransform::default(),
            opacity: full_opacity(),
            blend_mode: BlendMode::Normal,
            is_3d: false,
            track_matte: None,
            masks: Vec::new(),
            effects: Vec::new(),
            enabled: true,
            in_point: 0.0,
            out_point: out_point_default(),
        }
    }

    /// A solid rectangle layer.
    pub fn solid(id: u32, color: Color, width: f64, height: f64) -> Self {
        Self::new(id, LayerContent::Solid { color, width, height })
    }

    /// A filled shape layer.
    pub fn shape(id: u32, path: PathValue, fill: Color) -> Self {
        Self::new(
            id,
            LayerContent::Shape {
                path: AnimatedProperty::constant(path),
                fill: AnimatedProperty::constant(Value::from(fill.to_array().map(f64::from))),
            },
        )
    }

    pub fn image(id: u32, source: impl Into<String>) -> Self {
        Self::new(id, LayerContent::Image { source: source.into() })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    pub fn with_transform(mut self, transform: LayerTransform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_opacity(mut self, opacity: AnimatedProperty) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_blend_mode(mut self, mode: BlendMode) -> Self {
        self.blend_mode = mode;
        self
    }

    pub fn three_d(mut self) -> Self {
        self.is_3d = true;
        self
    }

    pub fn with_track_matte(mut self, target: u32, mode: MatteMode, inverted: bool) -> Self {
        self.track_matte = Some(TrackMatte {
            target: LayerId(target),
            mode,
            inverted,
        });
        self
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.masks.push(mask);
        self
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_time_range(mut self, in_point: f64, out_point: f64) -> Self {
        self.in_point = in_point;
        self.out_point = out_point;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether the layer takes part in the frame at `time`.
    pub fn is_active_at(&self, time: f64) -> bool {
        self.enabled && self.in_range_at(time)
    }

    /// Whether `time` falls inside the layer's in/out range.
    pub fn in_range_at(&self, time: f64) -> bool {
        self.in_point <= time && time < self.out_point
    }

    /// Opacity at `time` as a fraction in `0..=1`.
    pub fn opacity_at(&self, time: f64) -> f32 {
        let percent = self.opacity.scalar_at(time, 100.0);
        if !percent.is_finite() {
            return 0.0;
        }
        (percent / 100.0).clamp(0.0, 1.0) as f32
    }

    /// Whether any effect in the chain would run.
    pub fn has_active_effects(&self) -> bool {
        self.effects.iter().any(|e| e.enabled)
    }

    /// Display label for logs.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.id.to_string()
        } else {
            format!("{} ({})", self.name, self.id)
        }
    }
}
