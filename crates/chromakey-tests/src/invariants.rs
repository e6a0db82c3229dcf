//! Property tests for the per-pixel keyer.

use chromakey_core::Color;
use chromakey_effects::{
    non_additive_mix, KeyBranch, KeySetup, KeyerParams, OutputMode, PixelQuad, SourceAlpha,
};
use proptest::prelude::*;

fn unit() -> impl Strategy<Value = f32> {
    0.0f32..=1.0
}

fn color() -> impl Strategy<Value = Color> {
    (unit(), unit(), unit(), unit()).prop_map(|(r, g, b, a)| Color::new(r, g, b, a))
}

/// Mask samples, including out-of-range and non-finite values.
fn mask() -> impl Strategy<Value = f32> {
    prop_oneof![
        4 => unit(),
        1 => -2.0f32..3.0,
        1 => Just(f32::NAN),
        1 => Just(f32::INFINITY),
    ]
}

fn params() -> impl Strategy<Value = KeyerParams> {
    (
        (unit(), unit(), unit()),
        0.0f32..=175.0,
        0.0f32..=175.0,
        prop::sample::select(OutputMode::ALL.to_vec()),
        prop::sample::select(SourceAlpha::ALL.to_vec()),
    )
        .prop_map(|((r, g, b), acceptance, suppression, output_mode, source_alpha)| {
            KeyerParams {
                key_color: [r, g, b],
                acceptance_angle: acceptance,
                suppression_angle: suppression,
                output_mode,
                source_alpha,
            }
        })
}

fn quad() -> impl Strategy<Value = PixelQuad> {
    (
        prop::option::weighted(0.9, color()),
        prop::option::weighted(0.9, color()),
        mask(),
        mask(),
    )
        .prop_map(|(source, background, inside, outside)| {
            PixelQuad::new(source, background).with_masks(inside, outside)
        })
}

proptest! {
    #[test]
    fn alpha_stays_in_unit_range(params in params(), quad in quad()) {
        let setup = KeySetup::new(&params);
        let out = setup.process(&quad);
        prop_assert!((0.0..=1.0).contains(&out.a), "alpha {}", out.a);
        prop_assert!(out.r.is_finite() && out.g.is_finite() && out.b.is_finite());
    }

    #[test]
    fn mixer_output_is_clamped(key in -5.0f32..5.0, inside in mask(), outside in mask()) {
        let kbg = non_additive_mix(key, inside, outside);
        prop_assert!((0.0..=1.0).contains(&kbg));
    }

    #[test]
    fn full_outside_mask_shows_background(
        params in params(),
        src in color(),
        bg in color(),
        inside in mask(),
    ) {
        let setup = KeySetup::new(&params);
        let quad = PixelQuad::new(Some(src), Some(bg)).with_masks(inside, 1.0);
        let keyed = setup.background_key(&quad);
        prop_assert_eq!(keyed.kbg, 1.0);
        prop_assert_eq!(keyed.branch, KeyBranch::OutsideMask);
    }

    #[test]
    fn full_inside_mask_keeps_foreground(params in params(), src in color(), bg in color()) {
        let params = KeyerParams { source_alpha: SourceAlpha::Ignore, ..params };
        let setup = KeySetup::new(&params);
        let quad = PixelQuad::new(Some(src), Some(bg)).with_masks(1.0, 0.0);
        let keyed = setup.background_key(&quad);
        prop_assert_eq!(keyed.kbg, 0.0);
        prop_assert_eq!(keyed.branch, KeyBranch::InsideMask);
    }

    #[test]
    fn missing_clips_short_circuit(
        params in params(),
        c in color(),
        inside in mask(),
        outside in mask(),
    ) {
        let setup = KeySetup::new(&params);

        let no_source = PixelQuad::new(None, Some(c)).with_masks(inside, outside);
        let keyed = setup.background_key(&no_source);
        prop_assert_eq!(keyed.kbg, 1.0);
        prop_assert_eq!(keyed.branch, KeyBranch::NoSource);
        prop_assert_eq!(setup.process(&PixelQuad::new(None, Some(c))).a, 0.0);

        let no_background = PixelQuad::new(Some(c), None).with_masks(inside, outside);
        let keyed = setup.background_key(&no_background);
        prop_assert_eq!(keyed.branch, KeyBranch::NoBackground);
        prop_assert_eq!(keyed.foreground, c.with_alpha(1.0));
        if params.source_alpha != SourceAlpha::Normal {
            prop_assert_eq!(keyed.kbg, 0.0);
        }
    }

    #[test]
    fn key_color_is_fully_keyed(
        (r, g, b) in (unit(), unit(), unit()),
        acceptance in 10.0f32..=175.0,
    ) {
        let key = Color::rgb(r, g, b);
        let ycc = chromakey_core::YCbCr::from_rgb(key);
        prop_assume!(ycc.cb.hypot(ycc.cr) > 0.01);

        let setup = KeySetup::new(&KeyerParams {
            key_color: [r, g, b],
            acceptance_angle: acceptance,
            ..Default::default()
        });
        let keyed = setup.background_key(&PixelQuad::new(Some(key), Some(Color::WHITE)));
        prop_assert!((keyed.kbg - 1.0).abs() < 1e-3, "kbg {}", keyed.kbg);
    }

    #[test]
    fn premultiplied_is_unpremultiplied_times_alpha(params in params(), quad in quad()) {
        let with_mode = |output_mode| KeyerParams { output_mode, ..params.clone() };
        let pre = KeySetup::new(&with_mode(OutputMode::Premultiplied)).process(&quad);
        let unpre = KeySetup::new(&with_mode(OutputMode::Unpremultiplied)).process(&quad);
        prop_assert_eq!(pre.a, unpre.a);
        prop_assert!((pre.r - unpre.r * unpre.a).abs() < 1e-5);
        prop_assert!((pre.g - unpre.g * unpre.a).abs() < 1e-5);
        prop_assert!((pre.b - unpre.b * unpre.a).abs() < 1e-5);
    }
}
