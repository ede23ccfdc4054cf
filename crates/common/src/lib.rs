//! Common types shared across the compositor crates.

pub mod color;
pub mod geometry;
pub mod error;

pub use color::Color;
pub use geometry::{Point, Rect, Transform2D, Vec2};
pub use error::{CompositorError, CompositorResult};
