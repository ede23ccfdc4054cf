//! Compositor configuration.

use common::error::{CompositorError, CompositorResult};
use serde::Deserialize;

/// Compositor configuration.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Samples per pixel along each axis when rasterizing layer content.
    pub supersample: u32,
    /// Whether matte coverage is smoothed with a 3x3 binomial filter.
    pub matte_edge_filter: bool,
    /// Camera distance in pixels for projecting 3D layers.
    pub camera_zoom: f64,
    /// Line pieces per cubic span when flattening shapes and masks.
    pub curve_segments: usize,
    /// Worker threads for pixel kernels. `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Largest accepted composition width or height.
    pub max_surface_dimension: u32,
}

impl CompositorConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fast previews: no supersampling, coarse curves.
    pub fn draft() -> Self {
        Self {
            supersample: 1,
            curve_segments: 8,
            ..Self::default()
        }
    }

    /// Final output: 4x4 supersampling, fine curves.
    pub fn final_quality() -> Self {
        Self {
            supersample: 4,
            curve_segments: 32,
            ..Self::default()
        }
    }

    /// Set supersampling factor.
    pub fn with_supersample(mut self, supersample: u32) -> Self {
        self.supersample = supersample;
        self
    }

    /// Set matte edge filtering.
    pub fn with_matte_edge_filter(mut self, enabled: bool) -> Self {
        self.matte_edge_filter = enabled;
        self
    }

    /// Set camera zoom.
    pub fn with_camera_zoom(mut self, zoom: f64) -> Self {
        self.camera_zoom = zoom;
        self
    }

    /// Set curve flattening resolution.
    pub fn with_curve_segments(mut self, segments: usize) -> Self {
        self.curve_segments = segments;
        self
    }

    /// Set worker thread count.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Set maximum surface dimension.
    pub fn with_max_surface_dimension(mut self, max: u32) -> Self {
        self.max_surface_dimension = max;
        self
    }

    /// Check that every field is usable.
    pub fn validate(&self) -> CompositorResult<()> {
        if !(1..=16).contains(&self.supersample) {
            return Err(CompositorError::invalid_config(format!(
                "supersample must be in 1..=16, got {}",
                self.supersample
            )));
        }
        if !self.camera_zoom.is_finite() || self.camera_zoom <= 0.0 {
            return Err(CompositorError::invalid_config(format!(
                "camera_zoom must be positive, got {}",
                self.camera_zoom
            )));
        }
        if self.curve_segments == 0 {
            return Err(CompositorError::invalid_config("curve_segments must be at least 1"));
        }
        if self.threads == Some(0) {
            return Err(CompositorError::invalid_config("threads must be at least 1"));
        }
        if self.max_surface_dimension == 0 {
            return Err(CompositorError::invalid_config("max_surface_dimension must be at least 1"));
        }
        Ok(())
    }
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            supersample: 2,
            matte_edge_filter: true,
            camera_zoom: 1000.0,
            curve_segments: 16,
            threads: None,
            max_surface_dimension: 16384,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompositorConfig::default();
        assert_eq!(config.supersample, 2);
        assert!(config.matte_edge_filter);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        assert_eq!(CompositorConfig::draft().supersample, 1);
        assert_eq!(CompositorConfig::final_quality().supersample, 4);
        assert!(CompositorConfig::draft().validate().is_ok());
        assert!(CompositorConfig::final_quality().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CompositorConfig::new()
            .with_supersample(3)
            .with_camera_zoom(500.0)
            .with_threads(2)
            .with_matte_edge_filter(false);
        assert_eq!(config.supersample, 3);
        assert_eq!(config.camera_zoom, 500.0);
        assert_eq!(config.threads, Some(2));
        assert!(!config.matte_edge_filter);
    }

    #[test]
    fn test_validation_errors() {
        assert!(CompositorConfig::new().with_supersample(0).validate().is_err());
        assert!(CompositorConfig::new().with_camera_zoom(0.0).validate().is_err());
        assert!(CompositorConfig::new().with_threads(0).validate().is_err());
        assert!(CompositorConfig::new().with_curve_segments(0).validate().is_err());
        assert!(CompositorConfig::new()
            .with_max_surface_dimension(0)
            .validate()
            .unwrap_err()
            .is_configuration());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CompositorConfig = serde_json::from_str(r#"{ "supersample": 3, "threads": 4 }"#).unwrap();
        assert_eq!(config.supersample, 3);
        assert_eq!(config.threads, Some(4));
        assert_eq!(config.camera_zoom, 1000.0);
    }
}
