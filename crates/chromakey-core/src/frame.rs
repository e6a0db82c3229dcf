//! Frame buffers for images in CPU memory.
//!
//! A [`FrameBuffer`] owns interleaved samples of one bit depth and one
//! component layout, addressed in pixel coordinates relative to its
//! `bounds`. Processing code borrows typed views ([`ImageView`],
//! [`ImageViewMut`]) and converts samples to `f32` at the boundary, so the
//! math runs once for every bit depth.

use std::fmt;

use bytemuck::Pod;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::{KeyerError, Result};
use crate::geometry::RectI;

/// Storage type of one channel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BitDepth {
    /// 8-bit unsigned normalized
    U8,
    /// 16-bit unsigned normalized
    U16,
    /// 32-bit float
    F32,
}

impl BitDepth {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::U8 => "8u",
            Self::U16 => "16u",
            Self::F32 => "32f",
        })
    }
}

/// Channel layout of a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Components {
    /// Single channel (masks)
    Alpha,
    Rgb,
    Rgba,
}

impl Components {
    /// Samples per pixel.
    #[inline]
    pub fn count(self) -> usize {
        match self {
            Self::Alpha => 1,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

impl fmt::Display for Components {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Alpha => "A",
            Self::Rgb => "RGB",
            Self::Rgba => "RGBA",
        })
    }
}

/// Bit depth plus component layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelFormat {
    pub depth: BitDepth,
    pub components: Components,
}

impl PixelFormat {
    pub const fn new(depth: BitDepth, components: Components) -> Self {
        Self { depth, components }
    }

    pub const RGBA_F32: Self = Self::new(BitDepth::F32, Components::Rgba);
    pub const RGB_F32: Self = Self::new(BitDepth::F32, Components::Rgb);
    pub const ALPHA_F32: Self = Self::new(BitDepth::F32, Components::Alpha);
    pub const RGBA_U16: Self = Self::new(BitDepth::U16, Components::Rgba);
    pub const RGB_U16: Self = Self::new(BitDepth::U16, Components::Rgb);
    pub const ALPHA_U16: Self = Self::new(BitDepth::U16, Components::Alpha);
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.components, self.depth)
    }
}

/// Owned sample storage, one variant per bit depth.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
}

impl SampleData {
    pub fn depth(&self) -> BitDepth {
        match self {
            Self::U8(_) => BitDepth::U8,
            Self::U16(_) => BitDepth::U16,
            Self::F32(_) => BitDepth::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn zeroed(depth: BitDepth, len: usize) -> Self {
        match depth {
            BitDepth::U8 => Self::U8(vec![0; len]),
            BitDepth::U16 => Self::U16(vec![0; len]),
            BitDepth::F32 => Self::F32(vec![0.0; len]),
        }
    }
}

/// A channel sample type with normalized `f32` conversion.
pub trait Sample: Pod + Send + Sync + 'static {
    const DEPTH: BitDepth;

    /// Normalized value; integer types map their full range onto [0, 1].
    fn to_f32(self) -> f32;

    /// Inverse of [`Sample::to_f32`]. Integer types clamp and round.
    fn from_f32(v: f32) -> Self;

    fn slice(data: &SampleData) -> Option<&[Self]>;

    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]>;

    fn wrap(samples: Vec<Self>) -> SampleData;
}

impl Sample for u8 {
    const DEPTH: BitDepth = BitDepth::U8;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 255.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    fn slice(data: &SampleData) -> Option<&[Self]> {
        match data {
            SampleData::U8(v) => Some(v),
            _ => None,
        }
    }

    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
        match data {
            SampleData::U8(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(samples: Vec<Self>) -> SampleData {
        SampleData::U8(samples)
    }
}

impl Sample for u16 {
    const DEPTH: BitDepth = BitDepth::U16;

    #[inline]
    fn to_f32(self) -> f32 {
        self as f32 / 65535.0
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        (v.clamp(0.0, 1.0) * 65535.0).round() as u16
    }

    fn slice(data: &SampleData) -> Option<&[Self]> {
        match data {
            SampleData::U16(v) => Some(v),
            _ => None,
        }
    }

    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
        match data {
            SampleData::U16(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(samples: Vec<Self>) -> SampleData {
        SampleData::U16(samples)
    }
}

impl Sample for f32 {
    const DEPTH: BitDepth = BitDepth::F32;

    #[inline]
    fn to_f32(self) -> f32 {
        self
    }

    #[inline]
    fn from_f32(v: f32) -> Self {
        v
    }

    fn slice(data: &SampleData) -> Option<&[Self]> {
        match data {
            SampleData::F32(v) => Some(v),
            _ => None,
        }
    }

    fn slice_mut(data: &mut SampleData) -> Option<&mut [Self]> {
        match data {
            SampleData::F32(v) => Some(v),
            _ => None,
        }
    }

    fn wrap(samples: Vec<Self>) -> SampleData {
        SampleData::F32(samples)
    }
}

/// Decode one pixel's samples into a color.
///
/// `Alpha` pixels land in the alpha channel; `Rgb` pixels are opaque.
#[inline]
pub fn decode_pixel<T: Sample>(px: &[T]) -> Color {
    match px.len() {
        1 => Color::new(0.0, 0.0, 0.0, px[0].to_f32()),
        3 => Color::rgb(px[0].to_f32(), px[1].to_f32(), px[2].to_f32()),
        _ => Color::new(
            px[0].to_f32(),
            px[1].to_f32(),
            px[2].to_f32(),
            px[3].to_f32(),
        ),
    }
}

/// Encode a color into one pixel's samples; inverse of [`decode_pixel`].
#[inline]
pub fn encode_pixel<T: Sample>(px: &mut [T], c: Color) {
    match px.len() {
        1 => px[0] = T::from_f32(c.a),
        3 => {
            px[0] = T::from_f32(c.r);
            px[1] = T::from_f32(c.g);
            px[2] = T::from_f32(c.b);
        }
        _ => {
            px[0] = T::from_f32(c.r);
            px[1] = T::from_f32(c.g);
            px[2] = T::from_f32(c.b);
            px[3] = T::from_f32(c.a);
        }
    }
}

/// An image in CPU memory.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    bounds: RectI,
    components: Components,
    /// Samples per row
    stride: usize,
    data: SampleData,
}

impl FrameBuffer {
    /// Create a zero-filled frame covering `bounds`.
    pub fn new(bounds: RectI, format: PixelFormat) -> Self {
        let stride = bounds.width() as usize * format.components.count();
        let data = SampleData::zeroed(format.depth, stride * bounds.height() as usize);
        Self {
            bounds,
            components: format.components,
            stride,
            data,
        }
    }

    /// Wrap tightly packed interleaved samples.
    pub fn from_samples<T: Sample>(
        bounds: RectI,
        components: Components,
        samples: Vec<T>,
    ) -> Result<Self> {
        let stride = bounds.width() as usize * components.count();
        let expected = stride * bounds.height() as usize;
        if samples.len() != expected {
            return Err(KeyerError::BufferSize {
                expected,
                got: samples.len(),
            });
        }
        Ok(Self {
            bounds,
            components,
            stride,
            data: T::wrap(samples),
        })
    }

    /// Create a frame by evaluating `f` at every pixel coordinate.
    pub fn from_fn(
        bounds: RectI,
        format: PixelFormat,
        mut f: impl FnMut(i32, i32) -> Color,
    ) -> Self {
        let mut frame = Self::new(bounds, format);
        for y in bounds.y1..bounds.y2 {
            for x in bounds.x1..bounds.x2 {
                frame.set_pixel(x, y, f(x, y));
            }
        }
        frame
    }

    /// Create a frame filled with one color.
    pub fn solid(bounds: RectI, format: PixelFormat, color: Color) -> Self {
        Self::from_fn(bounds, format, |_, _| color)
    }

    #[inline]
    pub fn bounds(&self) -> RectI {
        self.bounds
    }

    #[inline]
    pub fn components(&self) -> Components {
        self.components
    }

    #[inline]
    pub fn depth(&self) -> BitDepth {
        self.data.depth()
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        PixelFormat::new(self.depth(), self.components)
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Total memory usage of the samples in bytes.
    pub fn memory_size(&self) -> usize {
        self.data.len() * self.depth().bytes_per_sample()
    }

    /// Borrow typed samples; `None` when `T` is not this frame's depth.
    pub fn view<T: Sample>(&self) -> Option<ImageView<'_, T>> {
        Some(ImageView {
            bounds: self.bounds,
            components: self.components,
            stride: self.stride,
            data: T::slice(&self.data)?,
        })
    }

    /// Borrow typed samples mutably; `None` when `T` is not this frame's depth.
    pub fn view_mut<T: Sample>(&mut self) -> Option<ImageViewMut<'_, T>> {
        Some(ImageViewMut {
            bounds: self.bounds,
            components: self.components,
            stride: self.stride,
            data: T::slice_mut(&mut self.data)?,
        })
    }

    fn offset(&self, x: i32, y: i32) -> Option<usize> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        let row = (y - self.bounds.y1) as usize * self.stride;
        Some(row + (x - self.bounds.x1) as usize * self.components.count())
    }

    /// Read one pixel as a normalized color.
    pub fn pixel(&self, x: i32, y: i32) -> Option<Color> {
        let i = self.offset(x, y)?;
        let n = self.components.count();
        Some(match &self.data {
            SampleData::U8(v) => decode_pixel(&v[i..i + n]),
            SampleData::U16(v) => decode_pixel(&v[i..i + n]),
            SampleData::F32(v) => decode_pixel(&v[i..i + n]),
        })
    }

    /// Write one pixel. Coordinates outside the bounds are ignored.
    pub fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        let Some(i) = self.offset(x, y) else {
            return;
        };
        let n = self.components.count();
        match &mut self.data {
            SampleData::U8(v) => encode_pixel(&mut v[i..i + n], color),
            SampleData::U16(v) => encode_pixel(&mut v[i..i + n], color),
            SampleData::F32(v) => encode_pixel(&mut v[i..i + n], color),
        }
    }
}

/// Read-only typed view of a frame.
#[derive(Debug, Clone, Copy)]
pub struct ImageView<'a, T> {
    bounds: RectI,
    components: Components,
    stride: usize,
    data: &'a [T],
}

impl<'a, T: Sample> ImageView<'a, T> {
    #[inline]
    pub fn bounds(&self) -> RectI {
        self.bounds
    }

    #[inline]
    pub fn components(&self) -> Components {
        self.components
    }

    /// Samples of pixel `(x, y)`. The caller guarantees the coordinate is
    /// inside the bounds.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> &'a [T] {
        let n = self.components.count();
        let i = (y - self.bounds.y1) as usize * self.stride + (x - self.bounds.x1) as usize * n;
        &self.data[i..i + n]
    }

    /// Samples of row `y`, starting at column `x1`.
    #[inline]
    pub fn row(&self, y: i32) -> &'a [T] {
        let start = (y - self.bounds.y1) as usize * self.stride;
        &self.data[start..start + self.stride]
    }
}

/// Mutable typed view of a frame.
#[derive(Debug)]
pub struct ImageViewMut<'a, T> {
    bounds: RectI,
    components: Components,
    stride: usize,
    data: &'a mut [T],
}

impl<'a, T: Sample> ImageViewMut<'a, T> {
    #[inline]
    pub fn bounds(&self) -> RectI {
        self.bounds
    }

    #[inline]
    pub fn components(&self) -> Components {
        self.components
    }

    /// Samples per row.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// All samples, row-major.
    #[inline]
    pub fn samples_mut(&mut self) -> &mut [T] {
        self.data
    }
}
