//! Render entry point: validate the clips, then key every pixel of a window.

use chromakey_core::{
    decode_pixel, encode_pixel, BitDepth, Components, FrameBuffer, ImageView, KeyerError,
    PixelFormat, RectI, Result, Sample,
};
use rayon::prelude::*;
use tracing::debug;

use crate::chroma_key::{KeySetup, KeyerParams, PixelQuad};

/// Windows with at least this many pixels are split across the rayon pool.
pub const PARALLEL_THRESHOLD: usize = 64 * 1024;

/// Optional input clips for one render call.
#[derive(Debug, Clone, Copy)]
pub struct RenderArgs<'a> {
    pub window: RectI,
    pub source: Option<&'a FrameBuffer>,
    pub background: Option<&'a FrameBuffer>,
    pub inside_mask: Option<&'a FrameBuffer>,
    pub outside_mask: Option<&'a FrameBuffer>,
}

impl<'a> RenderArgs<'a> {
    pub fn new(window: RectI) -> Self {
        Self {
            window,
            source: None,
            background: None,
            inside_mask: None,
            outside_mask: None,
        }
    }

    pub fn source(mut self, frame: &'a FrameBuffer) -> Self {
        self.source = Some(frame);
        self
    }

    pub fn background(mut self, frame: &'a FrameBuffer) -> Self {
        self.background = Some(frame);
        self
    }

    pub fn inside_mask(mut self, frame: &'a FrameBuffer) -> Self {
        self.inside_mask = Some(frame);
        self
    }

    pub fn outside_mask(mut self, frame: &'a FrameBuffer) -> Self {
        self.outside_mask = Some(frame);
        self
    }

    /// Render these clips into `dst`.
    pub fn render(&self, dst: &mut FrameBuffer, params: &KeyerParams) -> Result<()> {
        render_window(
            self.window,
            self.source,
            self.background,
            self.inside_mask,
            self.outside_mask,
            dst,
            params,
        )
    }
}

/// Key `window` of the source over the background into `dst`.
///
/// Every precondition is checked before the first pixel is written:
/// - `dst` must be 16-bit or float, RGB or RGBA;
/// - source and background must share the destination's format;
/// - masks must be single-channel at the destination's depth;
/// - every supplied buffer must cover the window.
///
/// Absent clips are not errors. On success every pixel of `window` in
/// `dst` has been written and nothing outside it has been touched.
pub fn render_window(
    window: RectI,
    source: Option<&FrameBuffer>,
    background: Option<&FrameBuffer>,
    inside_mask: Option<&FrameBuffer>,
    outside_mask: Option<&FrameBuffer>,
    dst: &mut FrameBuffer,
    params: &KeyerParams,
) -> Result<()> {
    let format = dst.format();
    if format.components == Components::Alpha {
        return Err(KeyerError::UnsupportedFormat(format!(
            "destination must be RGB or RGBA, got {format}"
        )));
    }
    if format.depth == BitDepth::U8 {
        return Err(KeyerError::UnsupportedFormat(format!(
            "8-bit images are not linear, got {format}"
        )));
    }
    check_image("Source", source, format)?;
    check_image("Background", background, format)?;
    let mask_format = PixelFormat::new(format.depth, Components::Alpha);
    check_mask("InsideMask", inside_mask, mask_format)?;
    check_mask("OutsideMask", outside_mask, mask_format)?;
    for (clip, frame) in [
        ("Output", Some(&*dst)),
        ("Source", source),
        ("Background", background),
        ("InsideMask", inside_mask),
        ("OutsideMask", outside_mask),
    ] {
        if let Some(frame) = frame {
            check_covers(clip, frame, window)?;
        }
    }

    if window.is_empty() {
        return Ok(());
    }
    let setup = KeySetup::new(params);
    debug!(
        ?window,
        format = %format,
        mode = ?params.output_mode,
        source = source.is_some(),
        background = background.is_some(),
        "Rendering chroma key window"
    );

    match format.depth {
        BitDepth::U16 => process::<u16>(
            &setup,
            window,
            source,
            background,
            inside_mask,
            outside_mask,
            dst,
        ),
        BitDepth::F32 => process::<f32>(
            &setup,
            window,
            source,
            background,
            inside_mask,
            outside_mask,
            dst,
        ),
        BitDepth::U8 => Err(KeyerError::UnsupportedFormat(format!(
            "no 8-bit render path for {format}"
        ))),
    }
}

fn check_image(
    clip: &'static str,
    frame: Option<&FrameBuffer>,
    expected: PixelFormat,
) -> Result<()> {
    match frame {
        Some(frame) if frame.format() != expected => Err(KeyerError::FormatMismatch {
            clip,
            expected,
            got: frame.format(),
        }),
        _ => Ok(()),
    }
}

fn check_mask(
    clip: &'static str,
    frame: Option<&FrameBuffer>,
    expected: PixelFormat,
) -> Result<()> {
    match frame {
        Some(frame) if frame.format() != expected => Err(KeyerError::MaskFormat {
            clip,
            expected,
            got: frame.format(),
        }),
        _ => Ok(()),
    }
}

fn check_covers(clip: &'static str, frame: &FrameBuffer, window: RectI) -> Result<()> {
    if frame.bounds().covers(window) {
        Ok(())
    } else {
        Err(KeyerError::WindowOutOfBounds {
            clip,
            window,
            bounds: frame.bounds(),
        })
    }
}

/// Typed read access to the input clips.
struct Clips<'a, T> {
    source: Option<ImageView<'a, T>>,
    background: Option<ImageView<'a, T>>,
    inside_mask: Option<ImageView<'a, T>>,
    outside_mask: Option<ImageView<'a, T>>,
}

impl<'a, T: Sample> Clips<'a, T> {
    #[inline]
    fn quad(&self, x: i32, y: i32) -> PixelQuad {
        PixelQuad {
            source: self.source.map(|v| decode_pixel(v.pixel(x, y))),
            background: self.background.map(|v| decode_pixel(v.pixel(x, y))),
            inside_mask: self.inside_mask.map_or(0.0, |m| m.pixel(x, y)[0].to_f32()),
            outside_mask: self.outside_mask.map_or(0.0, |m| m.pixel(x, y)[0].to_f32()),
        }
    }
}

fn typed<'a, T: Sample>(
    clip: &'static str,
    frame: Option<&'a FrameBuffer>,
) -> Result<Option<ImageView<'a, T>>> {
    frame
        .map(|f| {
            f.view::<T>().ok_or_else(|| {
                KeyerError::UnsupportedFormat(format!("{clip} clip is not {}", T::DEPTH))
            })
        })
        .transpose()
}

fn process<T: Sample>(
    setup: &KeySetup,
    window: RectI,
    source: Option<&FrameBuffer>,
    background: Option<&FrameBuffer>,
    inside_mask: Option<&FrameBuffer>,
    outside_mask: Option<&FrameBuffer>,
    dst: &mut FrameBuffer,
) -> Result<()> {
    let clips = Clips {
        source: typed::<T>("Source", source)?,
        background: typed::<T>("Background", background)?,
        inside_mask: typed::<T>("InsideMask", inside_mask)?,
        outside_mask: typed::<T>("OutsideMask", outside_mask)?,
    };
    let mut out = dst.view_mut::<T>().ok_or_else(|| {
        KeyerError::UnsupportedFormat(format!("Output clip is not {}", T::DEPTH))
    })?;

    let bounds = out.bounds();
    let n = out.components().count();
    let stride = out.stride();
    let first_row = (window.y1 - bounds.y1) as usize;
    let rows = window.height() as usize;
    let start = (window.x1 - bounds.x1) as usize * n;
    let end = start + window.width() as usize * n;

    let render_row = |(i, row): (usize, &mut [T])| {
        let y = window.y1 + i as i32;
        for (j, px) in row[start..end].chunks_exact_mut(n).enumerate() {
            let quad = clips.quad(window.x1 + j as i32, y);
            encode_pixel(px, setup.process(&quad));
        }
    };

    let samples = out.samples_mut();
    if window.area() >= PARALLEL_THRESHOLD {
        samples
            .par_chunks_mut(stride)
            .skip(first_row)
            .take(rows)
            .enumerate()
            .for_each(render_row);
    } else {
        samples
            .chunks_mut(stride)
            .skip(first_row)
            .take(rows)
            .enumerate()
            .for_each(render_row);
    }
    Ok(())
}
