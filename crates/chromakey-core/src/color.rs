//! Linear-light color types and the Rec. 2020 luma/chroma transform.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Rec. 2020 luma weight for red.
pub const KR: f32 = 0.2627;
/// Rec. 2020 luma weight for green.
pub const KG: f32 = 0.6780;
/// Rec. 2020 luma weight for blue.
pub const KB: f32 = 0.0593;
/// Cb normalization, `2 * (1 - KB)`.
pub const CB_SCALE: f32 = 1.8814;
/// Cr normalization, `2 * (1 - KR)`.
pub const CR_SCALE: f32 = 1.4746;

/// RGBA color with 32-bit float components, linear light.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Pod, Zeroable)]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new color from RGBA components.
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create a color from RGB with alpha = 1.0.
    #[inline]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Same color with a different alpha.
    #[inline]
    pub const fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Scale the color channels, alpha untouched.
    #[inline]
    pub fn scale_rgb(self, k: f32) -> Self {
        Self {
            r: self.r * k,
            g: self.g * k,
            b: self.b * k,
            a: self.a,
        }
    }

    /// Rec. 2020 luma of the linear RGB channels.
    #[inline]
    pub fn luminance(self) -> f32 {
        KR * self.r + KG * self.g + KB * self.b
    }

    /// RGB channels as an array.
    #[inline]
    pub fn to_rgb_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const RED: Self = Self::new(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Self = Self::new(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Self = Self::new(0.0, 0.0, 1.0, 1.0);
}

/// Luma/chroma triple. Chroma components lie in [-0.5, 0.5] for RGB in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct YCbCr {
    pub y: f32,
    pub cb: f32,
    pub cr: f32,
}

impl YCbCr {
    #[inline]
    pub const fn new(y: f32, cb: f32, cr: f32) -> Self {
        Self { y, cb, cr }
    }

    /// Non-constant-luminance Rec. 2020 transform of a linear RGB color.
    /// Alpha is ignored.
    #[inline]
    pub fn from_rgb(c: Color) -> Self {
        let y = c.luminance();
        Self {
            y,
            cb: (c.b - y) / CB_SCALE,
            cr: (c.r - y) / CR_SCALE,
        }
    }

    /// Inverse of [`YCbCr::from_rgb`], alpha = 1.
    #[inline]
    pub fn to_rgb(self) -> Color {
        let r = self.y + CR_SCALE * self.cr;
        let b = self.y + CB_SCALE * self.cb;
        let g = (self.y - KR * r - KB * b) / KG;
        Color::rgb(r, g, b)
    }
}
