//! ChromaKey Core - Foundation types for the keyer
//!
//! This crate provides the fundamental types used throughout ChromaKey:
//! - Linear-light colors and the Rec. 2020 luma/chroma transform
//! - Frame buffers, bit depths and component layouts
//! - Integer pixel rectangles (buffer bounds, render windows)
//! - The error taxonomy shared by every stage

pub mod color;
pub mod error;
pub mod frame;
pub mod geometry;

pub use color::{Color, YCbCr};
pub use error::{KeyerError, Result};
pub use frame::{
    decode_pixel, encode_pixel, BitDepth, Components, FrameBuffer, ImageView, ImageViewMut,
    PixelFormat, Sample, SampleData,
};
pub use geometry::RectI;
