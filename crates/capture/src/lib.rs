//! Offline frame capture.
//!
//! Steps a composition through time at its frame rate and writes every
//! rendered frame as a PNG file.

use common::error::CompositorError;
use compositor::{Composition, Compositor, LayerContent};
use render::Surface;
use std::collections::BTreeSet;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capture errors.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Compositor error: {0}")]
    Compositor(#[from] CompositorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid frame range: {0}")]
    InvalidRange(String),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// Capture configuration.
#[derive(Clone, Debug)]
pub struct CaptureConfig {
    /// Directory receiving the PNG sequence.
    pub output_dir: PathBuf,
    /// First frame to render.
    pub start_frame: u64,
    /// Frame to stop before. Defaults to the end of the composition.
    pub end_frame: Option<u64>,
    /// Upper bound on the number of frames written.
    pub max_frames: Option<u64>,
    /// Directory image layer sources are resolved against.
    pub assets_dir: Option<PathBuf>,
}

impl CaptureConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            start_frame: 0,
            end_frame: None,
            max_frames: None,
            assets_dir: None,
        }
    }

    pub fn with_start(mut self, frame: u64) -> Self {
        self.start_frame = frame;
        self
    }

    pub fn with_end(mut self, frame: u64) -> Self {
        self.end_frame = Some(frame);
        self
    }

    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    pub fn with_assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.assets_dir = Some(dir.into());
        self
    }
}

/// Result of a capture run.
#[derive(Clone, Debug)]
pub struct CaptureSummary {
    pub frames_written: u64,
    pub elapsed: Duration,
}

/// Drives a [`Compositor`] across a frame range.
pub struct FrameCapture {
    compositor: Compositor,
    config: CaptureConfig,
}

impl FrameCapture {
    pub fn new(compositor: Compositor, config: CaptureConfig) -> Self {
        Self { compositor, config }
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    /// Frames to render for `comp`. A composition without duration yields
    /// a single frame.
    pub fn frame_range(&self, comp: &Composition) -> CaptureResult<Range<u64>> {
        let start = self.config.start_frame;
        let end = self
            .config
            .end_frame
            .unwrap_or_else(|| comp.frame_count().max(start.saturating_add(1)));
        if end <= start {
            return Err(CaptureError::InvalidRange(format!("{}..{}", start, end)));
        }
        let end = match self.config.max_frames {
            Some(max) => end.min(start.saturating_add(max)),
            None => end,
        };
        Ok(start..end)
    }

    /// Output path of `frame`.
    pub fn frame_path(&self, frame: u64) -> PathBuf {
        self.config.output_dir.join(format!("frame_{:05}.png", frame))
    }

    /// Load every image referenced by `comp` from the assets directory.
    ///
    /// Missing or unreadable files are logged and skipped; those layers render
    /// transparent.
    pub fn load_assets(&self, comp: &Composition) -> usize {
        let Some(dir) = &self.config.assets_dir else {
            return 0;
        };
        let sources: BTreeSet<&str> = comp
            .layers
            .iter()
            .filter_map(|layer| match &layer.content {
                LayerContent::Image { source } => Some(source.as_str()),
                _ => None,
            })
            .collect();

        let mut loaded = 0;
        for source in sources {
            let path = dir.join(source);
            match load_image(&path) {
                Ok(surface) => {
                    debug!(source, width = surface.width(), height = surface.height(), "Loaded image");
                    self.compositor.insert_image(source, surface);
                    loaded += 1;
                }
                Err(e) => warn!(source, path = %path.display(), error = %e, "Failed to load image"),
            }
        }
        loaded
    }

    /// Render and write every frame in range.
    pub fn run(&mut self, comp: &Composition) -> CaptureResult<CaptureSummary> {
        let start = Instant::now();
        let range = self.frame_range(comp)?;
        std::fs::create_dir_all(&self.config.output_dir)?;
        self.load_assets(comp);

        info!(
            frames = range.end - range.start,
            width = comp.width,
            height = comp.height,
            fps = comp.frame_rate,
            "Capturing"
        );

        let mut written = 0;
        for frame in range {
            let time = comp.frame_time(frame);
            let path = self.frame_path(frame);
            let surface = self.compositor.render_frame(comp, time)?;
            write_png(surface, &path)?;
            debug!(frame, time, path = %path.display(), "Frame written");
            written += 1;
        }

        let summary = CaptureSummary {
            frames_written: written,
            elapsed: start.elapsed(),
        };
        info!(
            frames = summary.frames_written,
            seconds = summary.elapsed.as_secs_f64(),
            "Capture complete"
        );
        Ok(summary)
    }
}

/// Decode an image file into a straight-alpha surface.
pub fn load_image(path: &Path) -> CaptureResult<Surface> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(Surface::from_rgba8(width, height, rgba.as_raw())?)
}

/// Write a surface as an 8-bit straight-alpha PNG.
pub fn write_png(surface: &Surface, path: &Path) -> CaptureResult<()> {
    let image = image::RgbaImage::from_raw(surface.width(), surface.height(), surface.to_rgba8())
        .ok_or_else(|| CompositorError::render("frame buffer size does not match its dimensions"))?;
    image.save_with_format(path, image::ImageFormat::Png)?;
    Ok(())
}
