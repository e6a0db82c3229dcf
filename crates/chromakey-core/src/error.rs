//! Error types for ChromaKey.

use thiserror::Error;

use crate::frame::PixelFormat;
use crate::geometry::RectI;

/// Main error type for keying operations.
///
/// Every variant except `Io`, `Decode` and `Encode` is a precondition
/// failure detected before any destination pixel is written.
#[derive(Error, Debug)]
pub enum KeyerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("{clip} clip format {got} does not match destination format {expected}")]
    FormatMismatch {
        clip: &'static str,
        expected: PixelFormat,
        got: PixelFormat,
    },

    #[error("{clip} clip must be a single-channel {expected} mask, got {got}")]
    MaskFormat {
        clip: &'static str,
        expected: PixelFormat,
        got: PixelFormat,
    },

    #[error("{clip} clip bounds {bounds:?} do not cover render window {window:?}")]
    WindowOutOfBounds {
        clip: &'static str,
        window: RectI,
        bounds: RectI,
    },

    #[error("Buffer size mismatch: expected {expected} samples, got {got}")]
    BufferSize { expected: usize, got: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Decoder error: {0}")]
    Decode(String),

    #[error("Encoder error: {0}")]
    Encode(String),
}

/// Result type alias for keying operations.
pub type Result<T> = std::result::Result<T, KeyerError>;
