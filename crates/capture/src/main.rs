//! framecap - render a composition to a PNG sequence.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use capture::{CaptureConfig, FrameCapture};
use common::color::Color;
use compositor::{Composition, Compositor, CompositorConfig};

/// Render a composition to a PNG sequence
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Composition JSON file
    composition: PathBuf,

    /// Output directory
    #[arg(short, long)]
    out: PathBuf,

    /// First frame to render
    #[arg(long, default_value = "0")]
    start: u64,

    /// Frame to stop before (defaults to the composition's end)
    #[arg(long)]
    end: Option<u64>,

    /// Maximum number of frames to render
    #[arg(long)]
    frames: Option<u64>,

    /// Worker threads for pixel kernels
    #[arg(long)]
    threads: Option<usize>,

    /// Use draft quality
    #[arg(long)]
    draft: bool,

    /// Compositor configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory image sources are loaded from
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Override the background color (hex, e.g. "#000000")
    #[arg(long)]
    background: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("framecap v{}", capture::VERSION);

    // Build configuration
    let mut config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str::<CompositorConfig>(&json)
                .with_context(|| format!("parsing config {}", path.display()))?
        }
        None if args.draft => CompositorConfig::draft(),
        None => CompositorConfig::final_quality(),
    };
    if args.draft {
        config.supersample = 1;
    }
    if let Some(threads) = args.threads {
        config = config.with_threads(threads);
    }

    let mut comp = Composition::from_path(&args.composition)
        .with_context(|| format!("loading composition {}", args.composition.display()))?;
    if let Some(hex) = &args.background {
        comp.background = Color::from_hex(hex).with_context(|| format!("invalid background color {hex:?}"))?;
    }
    info!(
        "Loaded {} ({}x{}, {} layers)",
        args.composition.display(),
        comp.width,
        comp.height,
        comp.layers.len()
    );

    let mut capture_config = CaptureConfig::new(&args.out).with_start(args.start);
    if let Some(end) = args.end {
        capture_config = capture_config.with_end(end);
    }
    if let Some(frames) = args.frames {
        capture_config = capture_config.with_max_frames(frames);
    }
    match &args.assets {
        Some(dir) => capture_config = capture_config.with_assets_dir(dir),
        None => {
            if let Some(parent) = args.composition.parent() {
                capture_config = capture_config.with_assets_dir(parent);
            }
        }
    }

    let compositor = Compositor::new(config)?;
    let mut capture = FrameCapture::new(compositor, capture_config);
    let summary = capture.run(&comp)?;

    info!(
        "Wrote {} frames to {} in {:.2}s",
        summary.frames_written,
        args.out.display(),
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
