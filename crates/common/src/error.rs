//! Common error types.

use thiserror::Error;

/// Error type for the compositor crates.
///
/// Only configuration problems and per-unit render failures are represented
/// here; malformed animation data is always recovered locally.
#[derive(Error, Debug)]
pub enum CompositorError {
    #[error("Invalid composition size: {width}x{height}")]
    InvalidCompositionSize { width: u32, height: u32 },

    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    #[error("Surface size mismatch: expected {expected:?}, got {actual:?}")]
    SurfaceSizeMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Alpha mode mismatch: expected {expected}, got {actual}")]
    AlphaModeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Missing source: {0}")]
    MissingSource(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type CompositorResult<T> = Result<T, CompositorError>;

impl CompositorError {
    pub fn size_mismatch(expected: (u32, u32), actual: (u32, u32)) -> Self {
        Self::SurfaceSizeMismatch { expected, actual }
    }

    pub fn missing_source(msg: impl Into<String>) -> Self {
        Self::MissingSource(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Whether this error is a caller contract violation that must abort
    /// rendering rather than degrade a single unit.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidCompositionSize { .. }
                | Self::InvalidFrameRate(_)
                | Self::SurfaceSizeMismatch { .. }
                | Self::AlphaModeMismatch { .. }
                | Self::InvalidConfig(_)
        )
    }
}
