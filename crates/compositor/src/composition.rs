//! Composition: the frame size, timing and layer list.

use crate::layer::{Layer, LayerId};
use common::color::Color;
use common::error::{CompositorError, CompositorResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A complete scene to render.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub width: u32,
    pub height: u32,
    /// Frames per second.
    pub frame_rate: f64,
    /// Length in seconds.
    #[serde(default)]
    pub duration: f64,
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default)]
    pub layers: Vec<Layer>,
}

fn default_background() -> Color {
    Color::TRANSPARENT
}

impl Composition {
    pub fn new(width: u32, height: u32, frame_rate: f64) -> Self {
        Self {
            width,
            height,
            frame_rate,
            duration: 0.0,
            background: default_background(),
            layers: Vec::new(),
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn with_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Parse a composition from JSON.
    pub fn from_json(json: &str) -> CompositorResult<Self> {
        serde_json::from_str(json).map_err(|e| CompositorError::parse(e.to_string()))
    }

    /// Read and parse a composition file.
    pub fn from_path(path: impl AsRef<Path>) -> CompositorResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> CompositorResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CompositorError::parse(e.to_string()))
    }

    /// Reject sizes and frame rates that cannot be rendered.
    pub fn validate(&self, max_dimension: u32) -> CompositorResult<()> {
        if self.width == 0 || self.height == 0 || self.width > max_dimension || self.height > max_dimension {
            return Err(CompositorError::InvalidCompositionSize {
                width: self.width,
                height: self.height,
            });
        }
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(CompositorError::InvalidFrameRate(self.frame_rate));
        }
        Ok(())
    }

    /// Time in seconds of frame `frame`.
    pub fn frame_time(&self, frame: u64) -> f64 {
        frame as f64 / self.frame_rate
    }

    /// Number of whole frames in the duration.
    pub fn frame_count(&self) -> u64 {
        if !self.duration.is_finite() || self.duration <= 0.0 || !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return 0;
        }
        (self.duration * self.frame_rate).ceil() as u64
    }

    /// First layer with `id`.
    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// Composition center, the 3D camera's optical axis.
    pub fn center(&self) -> common::geometry::Point {
        common::geometry::Point::new(f64::from(self.width) / 2.0, f64::from(self.height) / 2.0)
    }
}
