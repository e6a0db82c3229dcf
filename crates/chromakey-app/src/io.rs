//! PNG loading and saving.
//!
//! Every clip is brought to 16 bits: color clips become RGBA, masks become
//! single-channel alpha frames.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chromakey_core::{Components, FrameBuffer, KeyerError, PixelFormat, RectI, Result};
use tracing::{debug, warn};

/// A decoded PNG widened to 16-bit samples.
struct Decoded {
    width: u32,
    height: u32,
    channels: usize,
    samples: Vec<u16>,
}

fn decode(path: &Path) -> Result<Decoded> {
    let mut decoder = png::Decoder::new(BufReader::new(File::open(path)?));
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder
        .read_info()
        .map_err(|e| KeyerError::Decode(format!("{}: {e}", path.display())))?;

    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|e| KeyerError::Decode(format!("{}: {e}", path.display())))?;
    let bytes = &buf[..info.buffer_size()];

    let channels = match info.color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => {
            return Err(KeyerError::Decode(format!(
                "{}: palette was not expanded",
                path.display()
            )))
        }
    };

    let samples = match info.bit_depth {
        png::BitDepth::Sixteen => bytes
            .chunks_exact(2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
            .collect(),
        png::BitDepth::Eight => {
            warn!(path = %path.display(), "8-bit image widened to 16 bits");
            bytes.iter().map(|&b| u16::from(b) * 257).collect()
        }
        depth => {
            return Err(KeyerError::UnsupportedFormat(format!(
                "{}: {depth:?} bit PNG",
                path.display()
            )))
        }
    };

    debug!(
        path = %path.display(),
        width = info.width,
        height = info.height,
        channels,
        "Decoded PNG"
    );
    Ok(Decoded {
        width: info.width,
        height: info.height,
        channels,
        samples,
    })
}

/// Load a color clip as a 16-bit RGBA frame. Images without alpha are opaque.
pub fn load_clip(path: &Path) -> Result<FrameBuffer> {
    let img = decode(path)?;
    let mut rgba = Vec::with_capacity(img.samples.len() / img.channels * 4);
    for px in img.samples.chunks_exact(img.channels) {
        let [r, g, b, a] = match *px {
            [v] => [v, v, v, u16::MAX],
            [v, a] => [v, v, v, a],
            [r, g, b] => [r, g, b, u16::MAX],
            [r, g, b, a] => [r, g, b, a],
            _ => layout_error(img.channels)?,
        };
        rgba.extend_from_slice(&[r, g, b, a]);
    }
    FrameBuffer::from_samples(
        RectI::from_size(img.width, img.height),
        Components::Rgba,
        rgba,
    )
}

/// Load a mask as a 16-bit alpha frame.
///
/// Images with an alpha channel contribute their alpha; others contribute
/// their first channel.
pub fn load_mask(path: &Path) -> Result<FrameBuffer> {
    let img = decode(path)?;
    let pick = match img.channels {
        2 => 1,
        4 => 3,
        _ => 0,
    };
    let alpha = img
        .samples
        .chunks_exact(img.channels)
        .map(|px| px[pick])
        .collect();
    FrameBuffer::from_samples(
        RectI::from_size(img.width, img.height),
        Components::Alpha,
        alpha,
    )
}

fn layout_error(channels: usize) -> Result<[u16; 4]> {
    Err(KeyerError::Decode(format!("unexpected {channels}-channel layout")))
}

/// Write a 16-bit RGBA frame as PNG.
pub fn save_rgba16(path: &Path, frame: &FrameBuffer) -> Result<()> {
    let view = frame.view::<u16>().filter(|_| frame.format() == PixelFormat::RGBA_U16);
    let Some(view) = view else {
        return Err(KeyerError::UnsupportedFormat(format!(
            "PNG output needs {}, got {}",
            PixelFormat::RGBA_U16,
            frame.format()
        )));
    };

    let bounds = frame.bounds();
    let mut bytes = Vec::with_capacity(frame.memory_size());
    for y in bounds.y1..bounds.y2 {
        for v in view.row(y) {
            bytes.extend_from_slice(&v.to_be_bytes());
        }
    }

    let file = BufWriter::new(File::create(path)?);
    let mut encoder = png::Encoder::new(file, bounds.width(), bounds.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Sixteen);
    let encode_err = |e: png::EncodingError| KeyerError::Encode(format!("{}: {e}", path.display()));
    let mut writer = encoder.write_header().map_err(encode_err)?;
    writer.write_image_data(&bytes).map_err(encode_err)?;
    writer.finish().map_err(encode_err)?;
    Ok(())
}
