//! Integration tests for window rendering.
//!
//! Exercises chromakey-core frame buffers through chromakey-effects'
//! render entry point and host effect adapter.

use chromakey_core::{BitDepth, Color, Components, FrameBuffer, KeyerError, PixelFormat, RectI};
use chromakey_effects::{
    render_window, ChromaKeyEffect, ImageEffect, KeyerParams, OutputMode, ParamValue,
    ParamValues, RenderArgs, SourceAlpha, PARALLEL_THRESHOLD,
};

// ── Helpers ────────────────────────────────────────────────────

/// A green screen with a reddish subject disc and a soft spill ramp.
fn shot(bounds: RectI, format: PixelFormat) -> FrameBuffer {
    let cx = (bounds.x1 + bounds.x2) as f32 * 0.5;
    let cy = (bounds.y1 + bounds.y2) as f32 * 0.5;
    let r = bounds.width().min(bounds.height()) as f32 * 0.3;
    FrameBuffer::from_fn(bounds, format, |x, y| {
        let d = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
        if d < r {
            Color::new(0.8, 0.4, 0.3, 1.0)
        } else {
            let t = ((d - r) / r).min(1.0);
            Color::new(0.3 * (1.0 - t), 0.5 + 0.4 * t, 0.2, 0.9)
        }
    })
}

fn backdrop(bounds: RectI, format: PixelFormat) -> FrameBuffer {
    FrameBuffer::from_fn(bounds, format, |x, y| {
        Color::rgb((x & 7) as f32 / 7.0, 0.25, (y & 3) as f32 / 3.0)
    })
}

fn stripes(bounds: RectI, depth: BitDepth, period: i32) -> FrameBuffer {
    FrameBuffer::from_fn(bounds, PixelFormat::new(depth, Components::Alpha), |x, _| {
        Color::new(0.0, 0.0, 0.0, (x.rem_euclid(period)) as f32 / period as f32)
    })
}

fn render_whole_and_tiled(
    bounds: RectI,
    format: PixelFormat,
    tile_rows: u32,
    params: &KeyerParams,
) -> (FrameBuffer, FrameBuffer) {
    let src = shot(bounds, format);
    let bg = backdrop(bounds, format);
    let inside = stripes(bounds, format.depth, 13);
    let outside = stripes(bounds, format.depth, 29);
    let args = RenderArgs::new(bounds)
        .source(&src)
        .background(&bg)
        .inside_mask(&inside)
        .outside_mask(&outside);

    let mut whole = FrameBuffer::new(bounds, format);
    args.render(&mut whole, params).unwrap();

    let mut tiled = FrameBuffer::new(bounds, format);
    for band in bounds.split_rows(tile_rows) {
        RenderArgs { window: band, ..args }
            .render(&mut tiled, params)
            .unwrap();
    }
    (whole, tiled)
}

// ── Tiling & parallel dispatch ────────────────────────────────

#[test]
fn tiled_render_matches_whole_window_f32() {
    let bounds = RectI::new(-20, 7, 44, 55);
    let (whole, tiled) =
        render_whole_and_tiled(bounds, PixelFormat::RGBA_F32, 5, &KeyerParams::default());
    assert_eq!(whole, tiled);
}

#[test]
fn tiled_render_matches_whole_window_u16() {
    let bounds = RectI::from_size(37, 23);
    let params = KeyerParams {
        output_mode: OutputMode::Premultiplied,
        source_alpha: SourceAlpha::Normal,
        ..Default::default()
    };
    let (whole, tiled) = render_whole_and_tiled(bounds, PixelFormat::RGB_U16, 4, &params);
    assert_eq!(whole, tiled);
}

#[test]
fn parallel_render_matches_sequential_tiles() {
    let bounds = RectI::from_size(320, 256);
    assert!(bounds.area() >= PARALLEL_THRESHOLD);
    let (whole, tiled) =
        render_whole_and_tiled(bounds, PixelFormat::RGBA_F32, 16, &KeyerParams::default());
    assert!(bounds.split_rows(16).iter().all(|b| b.area() < PARALLEL_THRESHOLD));
    assert_eq!(whole, tiled);
}

// ── Bit depths ────────────────────────────────────────────────

#[test]
fn u16_and_f32_renders_agree() {
    let bounds = RectI::from_size(48, 32);
    // Zero suppression angle keeps the output continuous in the input.
    let params = KeyerParams {
        suppression_angle: 0.0,
        ..Default::default()
    };
    let (f32_out, _) = render_whole_and_tiled(bounds, PixelFormat::RGBA_F32, 8, &params);
    let (u16_out, _) = render_whole_and_tiled(bounds, PixelFormat::RGBA_U16, 8, &params);

    for y in bounds.y1..bounds.y2 {
        for x in bounds.x1..bounds.x2 {
            let a = f32_out.pixel(x, y).unwrap();
            let b = u16_out.pixel(x, y).unwrap();
            for (u, v) in [(a.r, b.r), (a.g, b.g), (a.b, b.b), (a.a, b.a)] {
                let u = u.clamp(0.0, 1.0);
                assert!((u - v).abs() < 2e-3, "({x}, {y}): {a:?} vs {b:?}");
            }
        }
    }
}

#[test]
fn premultiplied_over_alpha_is_unpremultiplied() {
    let bounds = RectI::from_size(24, 24);
    let src = shot(bounds, PixelFormat::RGBA_F32);
    let bg = backdrop(bounds, PixelFormat::RGBA_F32);
    let args = RenderArgs::new(bounds).source(&src).background(&bg);

    let mut pre = FrameBuffer::new(bounds, PixelFormat::RGBA_F32);
    let mut unpre = FrameBuffer::new(bounds, PixelFormat::RGBA_F32);
    for (mode, dst) in [
        (OutputMode::Premultiplied, &mut pre),
        (OutputMode::Unpremultiplied, &mut unpre),
    ] {
        let params = KeyerParams {
            output_mode: mode,
            ..Default::default()
        };
        args.render(dst, &params).unwrap();
    }

    for y in 0..24 {
        for x in 0..24 {
            let p = pre.pixel(x, y).unwrap();
            let u = unpre.pixel(x, y).unwrap();
            assert_eq!(p.a, u.a);
            if p.a > 1e-3 {
                assert!((p.r / p.a - u.r).abs() < 1e-4);
                assert!((p.g / p.a - u.g).abs() < 1e-4);
                assert!((p.b / p.a - u.b).abs() < 1e-4);
            }
        }
    }
}

// ── Error precedence ──────────────────────────────────────────

#[test]
fn destination_format_is_checked_first() {
    let bounds = RectI::from_size(4, 4);
    let src = FrameBuffer::new(bounds, PixelFormat::RGB_F32);
    let mut dst = FrameBuffer::new(bounds, PixelFormat::ALPHA_F32);
    let err = render_window(
        RectI::from_size(8, 8),
        Some(&src),
        None,
        None,
        None,
        &mut dst,
        &KeyerParams::default(),
    );
    assert!(matches!(err, Err(KeyerError::UnsupportedFormat(_))));
}

#[test]
fn format_mismatch_precedes_window_check() {
    let bounds = RectI::from_size(4, 4);
    let src = FrameBuffer::new(RectI::from_size(2, 2), PixelFormat::RGBA_U16);
    let mut dst = FrameBuffer::solid(bounds, PixelFormat::RGBA_F32, Color::RED);
    let before = dst.clone();
    let params = KeyerParams::default();
    let err = render_window(bounds, Some(&src), None, None, None, &mut dst, &params);
    match err {
        Err(KeyerError::FormatMismatch {
            clip,
            expected,
            got,
        }) => {
            assert_eq!(clip, "Source");
            assert_eq!(expected, PixelFormat::RGBA_F32);
            assert_eq!(got, PixelFormat::RGBA_U16);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(dst, before);
}

#[test]
fn mask_layout_precedes_window_check() {
    let bounds = RectI::from_size(4, 4);
    let src = FrameBuffer::new(bounds, PixelFormat::RGBA_F32);
    let mask = FrameBuffer::new(RectI::from_size(1, 1), PixelFormat::RGB_F32);
    let mut dst = FrameBuffer::solid(bounds, PixelFormat::RGBA_F32, Color::RED);
    let before = dst.clone();
    let err = render_window(
        bounds,
        Some(&src),
        None,
        None,
        Some(&mask),
        &mut dst,
        &KeyerParams::default(),
    );
    assert!(matches!(
        err,
        Err(KeyerError::MaskFormat {
            clip: "OutsideMask",
            ..
        })
    ));
    assert_eq!(dst, before);
}

#[test]
fn short_background_is_out_of_bounds() {
    let bounds = RectI::from_size(4, 4);
    let src = FrameBuffer::new(bounds, PixelFormat::RGBA_F32);
    let bg = FrameBuffer::new(RectI::from_size(4, 3), PixelFormat::RGBA_F32);
    let mut dst = FrameBuffer::solid(bounds, PixelFormat::RGBA_F32, Color::RED);
    let before = dst.clone();
    let params = KeyerParams::default();
    let err = render_window(bounds, Some(&src), Some(&bg), None, None, &mut dst, &params);
    assert!(matches!(
        err,
        Err(KeyerError::WindowOutOfBounds {
            clip: "Background",
            ..
        })
    ));
    assert_eq!(dst, before);
}

// ── Configuration ─────────────────────────────────────────────

#[test]
fn partial_json_config_keeps_defaults() {
    let params: KeyerParams =
        serde_json::from_str(r#"{ "acceptance_angle": 60.0, "output_mode": "premultiplied" }"#)
            .unwrap();
    assert_eq!(params.acceptance_angle, 60.0);
    assert_eq!(params.output_mode, OutputMode::Premultiplied);
    assert_eq!(params.key_color, [0.0, 1.0, 0.0]);
    assert_eq!(params.suppression_angle, 10.0);
    assert_eq!(params.source_alpha, SourceAlpha::Ignore);
}

#[test]
fn blue_screen_preset_keys_blue_only() {
    let bounds = RectI::from_size(2, 1);
    let src = FrameBuffer::from_fn(bounds, PixelFormat::RGBA_F32, |x, _| {
        if x == 0 {
            Color::BLUE
        } else {
            Color::GREEN
        }
    });
    let bg = FrameBuffer::solid(bounds, PixelFormat::RGBA_F32, Color::WHITE);
    let mut dst = FrameBuffer::new(bounds, PixelFormat::RGBA_F32);
    RenderArgs::new(bounds)
        .source(&src)
        .background(&bg)
        .render(&mut dst, &KeyerParams::blue_screen())
        .unwrap();

    assert!(dst.pixel(0, 0).unwrap().a < 1e-5);
    assert_eq!(dst.pixel(1, 0).unwrap().a, 1.0);
}

#[test]
fn effect_accepts_choice_indices_and_labels() {
    let effect = ChromaKeyEffect::new();
    let bounds = RectI::from_size(3, 3);
    let src = FrameBuffer::solid(bounds, PixelFormat::RGBA_F32, Color::new(0.6, 0.2, 0.2, 0.5));
    let bg = FrameBuffer::solid(bounds, PixelFormat::RGBA_F32, Color::BLACK);
    let args = RenderArgs::new(bounds).source(&src).background(&bg);

    let mut by_label = ParamValues::new();
    by_label.insert("output_mode".into(), ParamValue::Choice("Unpremultiplied".into()));
    by_label.insert("source_alpha".into(), ParamValue::Choice("Normal".into()));
    let mut by_index = ParamValues::new();
    by_index.insert("output_mode".into(), ParamValue::Int(2));
    by_index.insert("source_alpha".into(), ParamValue::Int(2));

    let mut a = FrameBuffer::new(bounds, PixelFormat::RGBA_F32);
    let mut b = FrameBuffer::new(bounds, PixelFormat::RGBA_F32);
    effect.render(&args, &mut a, &by_label).unwrap();
    effect.render(&args, &mut b, &by_index).unwrap();
    assert_eq!(a, b);
    // Reddish source is untouched by a green key; Normal passes its alpha through.
    assert_eq!(a.pixel(1, 1), Some(Color::new(0.6, 0.2, 0.2, 0.5)));
}
