//! Color representation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Straight-alpha RGBA color with floating point components (0.0 - 1.0).
#[derive(Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    #[serde(default = "opaque")]
    pub a: f32,
}

fn opaque() -> f32 {
    1.0
}

/// Rec. 601 luma weights, shared by luma mattes.
pub const LUMA_WEIGHTS: [f32; 3] = [0.299, 0.587, 0.114];

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const BLUE: Color = Color::rgb(0.0, 0.0, 1.0);

    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    #[inline]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create color from 8-bit components.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::rgba(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }

    /// Parse color from hex string (e.g., "#ff0000", "#f00", "#ff000080").
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        if !hex.is_ascii() {
            return None;
        }
        let digit = |s: &str| u8::from_str_radix(s, 16).ok();

        match hex.len() {
            3 | 4 => {
                let mut c = [255u8; 4];
                for (i, slot) in c.iter_mut().enumerate().take(hex.len()) {
                    *slot = digit(&hex[i..i + 1])? * 17;
                }
                Some(Self::from_rgba8(c[0], c[1], c[2], c[3]))
            }
            6 | 8 => {
                let mut c = [255u8; 4];
                for (i, slot) in c.iter_mut().enumerate().take(hex.len() / 2) {
                    *slot = digit(&hex[i * 2..i * 2 + 2])?;
                }
                Some(Self::from_rgba8(c[0], c[1], c[2], c[3]))
            }
            _ => None,
        }
    }

    /// Build a color from a premultiplied `[r, g, b, a]` sample.
    pub fn from_premultiplied(px: [f32; 4]) -> Self {
        if px[3] <= 0.0 {
            return Color::TRANSPARENT;
        }
        Self::rgba(px[0] / px[3], px[1] / px[3], px[2] / px[3], px[3])
    }

    /// Premultiplied `[r, g, b, a]`.
    #[inline]
    pub fn premultiplied(&self) -> [f32; 4] {
        [self.r * self.a, self.g * self.a, self.b * self.a, self.a]
    }

    /// Straight `[r, g, b, a]`.
    #[inline]
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Quantize to 8-bit straight RGBA.
    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }

    #[inline]
    pub fn luma(&self) -> f32 {
        self.r * LUMA_WEIGHTS[0] + self.g * LUMA_WEIGHTS[1] + self.b * LUMA_WEIGHTS[2]
    }

    /// Component-wise clamp into the displayable range.
    pub fn clamped(&self) -> Color {
        Color::rgba(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Color::rgba(c[0], c[1], c[2], c[3])
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.to_rgba8();
        if a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_hex() {
        assert_eq!(Color::from_hex("#ff0000"), Some(Color::RED));
        assert_eq!(Color::from_hex("#f00"), Some(Color::RED));
        assert_eq!(Color::from_hex("00ff00"), Some(Color::GREEN));
        assert_eq!(Color::from_hex("#ffffff80").map(|c| c.to_rgba8()), Some([255, 255, 255, 128]));
        assert_eq!(Color::from_hex("#12"), None);
        assert_eq!(Color::from_hex("#zzzzzz"), None);
    }

    #[test]
    fn test_premultiply_round_trip() {
        let c = Color::rgba(1.0, 0.5, 0.25, 0.5);
        assert_eq!(c.premultiplied(), [0.5, 0.25, 0.125, 0.5]);
        assert_eq!(Color::from_premultiplied(c.premultiplied()), c);
        assert_eq!(Color::from_premultiplied([0.3, 0.3, 0.3, 0.0]), Color::TRANSPARENT);
    }

    #[test]
    fn test_luma() {
        assert!((Color::WHITE.luma() - 1.0).abs() < 1e-6);
        assert_eq!(Color::BLACK.luma(), 0.0);
    }
}
