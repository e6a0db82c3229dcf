//! Chroma keying (green/blue screen) in rotated chroma space.
//!
//! After Keith Jack, "Video Demystified" (1996), pp. 214-222: the Cb/Cr
//! plane is rotated so the key hue lies on the X axis, pixels inside the
//! acceptance cone around that axis get a key strength, the strength is
//! combined with the garbage mattes, and the key color is subtracted from
//! the foreground.
//!
//! Everything here is a pure function of a [`KeySetup`] and one
//! [`PixelQuad`]; [`crate::render`] maps it over a window.

use chromakey_core::{Color, KeyerError, Result, YCbCr};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{ParamValue, ParamValues};

/// Smallest accepted angle, degrees.
pub const ANGLE_MIN: f32 = 0.0;
/// Largest accepted angle, degrees.
pub const ANGLE_MAX: f32 = 175.0;
pub const DEFAULT_ACCEPTANCE_ANGLE: f32 = 90.0;
pub const DEFAULT_SUPPRESSION_ANGLE: f32 = 10.0;

/// Key chroma lengths at or below this are treated as neutral gray.
/// The f32 luma weights leave about 1e-8 of chroma on exact grays.
const NEUTRAL_CHROMA: f32 = 1e-6;

/// How the destination color is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Source color, alpha is the foreground key. For multi-pass keying.
    Intermediate,
    /// Suppressed foreground multiplied by alpha.
    Premultiplied,
    /// Suppressed foreground, not multiplied.
    Unpremultiplied,
    /// Suppressed foreground over the background.
    #[default]
    Composite,
}

impl OutputMode {
    pub const ALL: [Self; 4] = [
        Self::Intermediate,
        Self::Premultiplied,
        Self::Unpremultiplied,
        Self::Composite,
    ];

    /// Host-facing choice label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Intermediate => "Intermediate",
            Self::Premultiplied => "Premultiplied",
            Self::Unpremultiplied => "Unpremultiplied",
            Self::Composite => "Composite",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Self::Intermediate => {
                "Color is the source color. Alpha is the foreground key. Use for multi-pass keying."
            }
            Self::Premultiplied => {
                "Color is the source color after key color suppression, multiplied by alpha. Alpha is the foreground key."
            }
            Self::Unpremultiplied => {
                "Color is the source color after key color suppression. Alpha is the foreground key."
            }
            Self::Composite => {
                "Color is the composite of source and background. Alpha is the foreground key."
            }
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label().eq_ignore_ascii_case(label))
    }
}

/// Whether the source image's own alpha takes part in keying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceAlpha {
    #[default]
    Ignore,
    /// Source alpha is max-combined with the inside mask.
    AddToInsideMask,
    /// Foreground key is multiplied by source alpha.
    Normal,
}

impl SourceAlpha {
    pub const ALL: [Self; 3] = [Self::Ignore, Self::AddToInsideMask, Self::Normal];

    pub fn label(self) -> &'static str {
        match self {
            Self::Ignore => "Ignore",
            Self::AddToInsideMask => "Add to Inside Mask",
            Self::Normal => "Normal",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Self::Ignore => "Ignore the source alpha.",
            Self::AddToInsideMask => "Source alpha is added to the inside mask.",
            Self::Normal => "Foreground key is multiplied by source alpha.",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.label().eq_ignore_ascii_case(label))
    }
}

/// Parameters for chroma key extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyerParams {
    /// Key color, linear RGB
    pub key_color: [f32; 3],
    /// Acceptance angle (alpha), degrees
    pub acceptance_angle: f32,
    /// Suppression angle (beta), degrees. Use no more than a third of alpha.
    pub suppression_angle: f32,
    pub output_mode: OutputMode,
    pub source_alpha: SourceAlpha,
}

impl Default for KeyerParams {
    fn default() -> Self {
        Self {
            key_color: [0.0, 1.0, 0.0],
            acceptance_angle: DEFAULT_ACCEPTANCE_ANGLE,
            suppression_angle: DEFAULT_SUPPRESSION_ANGLE,
            output_mode: OutputMode::default(),
            source_alpha: SourceAlpha::default(),
        }
    }
}

impl KeyerParams {
    /// Green screen default.
    pub fn green_screen() -> Self {
        Self::default()
    }

    /// Blue screen default.
    pub fn blue_screen() -> Self {
        Self {
            key_color: [0.0, 0.0, 1.0],
            ..Default::default()
        }
    }

    /// Check user-facing ranges. The kernel itself accepts any value.
    pub fn validate(&self) -> Result<()> {
        if self.key_color.iter().any(|c| !c.is_finite()) {
            return Err(KeyerError::InvalidParameter(format!(
                "key_color must be finite, got {:?}",
                self.key_color
            )));
        }
        for (name, angle) in [
            ("acceptance_angle", self.acceptance_angle),
            ("suppression_angle", self.suppression_angle),
        ] {
            if !(ANGLE_MIN..=ANGLE_MAX).contains(&angle) {
                return Err(KeyerError::InvalidParameter(format!(
                    "{name} must be within [{ANGLE_MIN}, {ANGLE_MAX}] degrees, got {angle}"
                )));
            }
        }
        if self.suppression_angle * 3.0 > self.acceptance_angle {
            warn!(
                acceptance = self.acceptance_angle,
                suppression = self.suppression_angle,
                "Suppression angle exceeds a third of the acceptance angle"
            );
        }
        Ok(())
    }

    /// Build parameters from a host parameter set.
    ///
    /// Missing entries keep their defaults. Choices accept either the
    /// option label or its index.
    pub fn from_values(values: &ParamValues) -> Result<Self> {
        let mut params = Self::default();
        if let Some(v) = values.get("key_color") {
            params.key_color = match v {
                ParamValue::Color([r, g, b, _]) => [*r, *g, *b],
                other => return Err(mistyped("key_color", other)),
            };
        }
        if let Some(v) = values.get("acceptance_angle") {
            params.acceptance_angle = float_value("acceptance_angle", v)?;
        }
        if let Some(v) = values.get("suppression_angle") {
            params.suppression_angle = float_value("suppression_angle", v)?;
        }
        if let Some(v) = values.get("output_mode") {
            params.output_mode =
                choice_value("output_mode", v, &OutputMode::ALL, OutputMode::from_label)?;
        }
        if let Some(v) = values.get("source_alpha") {
            params.source_alpha =
                choice_value("source_alpha", v, &SourceAlpha::ALL, SourceAlpha::from_label)?;
        }
        Ok(params)
    }
}

fn mistyped(name: &str, value: &ParamValue) -> KeyerError {
    KeyerError::InvalidParameter(format!("{name}: unexpected value {value:?}"))
}

fn float_value(name: &str, value: &ParamValue) -> Result<f32> {
    match value {
        ParamValue::Float(v) => Ok(*v),
        ParamValue::Int(v) => Ok(*v as f32),
        other => Err(mistyped(name, other)),
    }
}

fn choice_value<T: Copy>(
    name: &str,
    value: &ParamValue,
    options: &[T],
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T> {
    let found = match value {
        ParamValue::Choice(label) => parse(label.as_str()),
        ParamValue::Int(i) => usize::try_from(*i).ok().and_then(|i| options.get(i).copied()),
        _ => None,
    };
    found.ok_or_else(|| mistyped(name, value))
}

/// Clamp a mask sample to [0, 1]. NaN reads as 0.
#[inline]
pub fn clamp_mask(v: f32) -> f32 {
    v.max(0.0).min(1.0)
}

/// Non-additive mix of a normalized key with the garbage mattes.
///
/// The inside mask caps the key at `1 - inside`, then the outside mask
/// floors it at `outside`; the outside mask is applied last and wins.
/// The result is always in [0, 1].
#[inline]
pub fn non_additive_mix(key: f32, inside: f32, outside: f32) -> f32 {
    let inside = clamp_mask(inside);
    let outside = clamp_mask(outside);
    clamp_mask(key).min(1.0 - inside).max(outside)
}

/// Inputs at one output position. Absent clips are `None`, absent masks 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelQuad {
    pub source: Option<Color>,
    pub background: Option<Color>,
    pub inside_mask: f32,
    pub outside_mask: f32,
}

impl PixelQuad {
    pub fn new(source: Option<Color>, background: Option<Color>) -> Self {
        Self {
            source,
            background,
            ..Default::default()
        }
    }

    pub fn with_masks(self, inside_mask: f32, outside_mask: f32) -> Self {
        Self {
            inside_mask,
            outside_mask,
            ..self
        }
    }
}

/// Which rule decided the background contribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyBranch {
    /// No source: pure background.
    NoSource,
    /// No background to key against: pure foreground.
    NoBackground,
    /// Outside mask dominates the inside mask.
    OutsideMask,
    /// Fully inside the inside mask.
    InsideMask,
    /// Key generator, mixer and suppressor ran.
    Keyed,
}

/// Background contribution and foreground color for one pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyed {
    /// Fraction of background visible, in [0, 1]. Alpha is `1 - kbg`.
    pub kbg: f32,
    /// Foreground color after key suppression, opaque.
    pub foreground: Color,
    pub branch: KeyBranch,
}

/// Per-pass constants derived from the key color and angles.
///
/// Built once per render, then shared read-only by every worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeySetup {
    /// Unit (cos, sin) of the key hue in the Cb/Cr plane.
    pub key_axis: Vec2,
    /// X coordinate of the key color itself; always > 0.
    pub key_chroma: f32,
    /// Luma of the key color.
    pub key_luma: f32,
    /// tan(alpha / 2)
    pub tan_acceptance: f32,
    /// tan(beta / 2)
    pub tan_suppression: f32,
    pub output_mode: OutputMode,
    pub source_alpha: SourceAlpha,
}

impl KeySetup {
    pub fn new(params: &KeyerParams) -> Self {
        let [r, g, b] = params.key_color;
        let key = YCbCr::from_rgb(Color::rgb(r, g, b));
        let chroma = Vec2::new(key.cb, key.cr);
        let norm = chroma.length();
        let (key_axis, norm) = if norm > NEUTRAL_CHROMA && norm.is_finite() {
            (chroma / norm, norm)
        } else {
            warn!(key_color = ?params.key_color, "Key color has no chroma, keying along Cb");
            (Vec2::X, 1.0)
        };

        let setup = Self {
            key_axis,
            key_chroma: 2.0 * norm,
            key_luma: key.y,
            tan_acceptance: half_angle_tan(params.acceptance_angle),
            tan_suppression: half_angle_tan(params.suppression_angle),
            output_mode: params.output_mode,
            source_alpha: params.source_alpha,
        };
        debug!(
            cos_key = setup.key_axis.x,
            sin_key = setup.key_axis.y,
            key_chroma = setup.key_chroma,
            tan_acceptance = setup.tan_acceptance,
            "Key setup"
        );
        setup
    }

    /// Rotate a pixel's chroma, scaled to ±1, into key-aligned (X, Z).
    /// X measures alignment with the key hue, Z deviation from it.
    #[inline]
    pub fn rotate(&self, ycc: YCbCr) -> Vec2 {
        let c = Vec2::new(ycc.cb, ycc.cr) * 2.0;
        Vec2::new(self.key_axis.dot(c), self.key_axis.perp_dot(c))
    }

    /// Key generator: raw foreground key strength `Kfg >= 0`.
    ///
    /// Zero outside the acceptance cone, otherwise `X - |Z| / tan(alpha/2)`.
    #[inline]
    pub fn key_strength(&self, xz: Vec2) -> f32 {
        let x = xz.x;
        let z = xz.y.abs();
        if x <= 0.0 || z > x * self.tan_acceptance {
            return 0.0;
        }
        if z == 0.0 {
            // also covers tan(alpha/2) == 0
            x
        } else {
            x - z / self.tan_acceptance
        }
    }

    /// Foreground suppressor.
    ///
    /// Moves the pixel back to the acceptance-cone boundary (`X -= Kfg`),
    /// darkens it by the key's share of luma, and zeroes residual chroma
    /// inside the suppression cone.
    pub fn suppress(&self, source: Color, ycc: YCbCr, xz: Vec2, kfg: f32) -> Color {
        if kfg.is_nan() || kfg <= 0.0 {
            return source.with_alpha(1.0);
        }
        let key = clamp_mask(kfg / self.key_chroma);
        let residual = if xz.y.abs() <= xz.x * self.tan_suppression {
            Vec2::ZERO
        } else {
            Vec2::new(xz.x - kfg, xz.y)
        };
        let chroma = self.key_axis.rotate(residual) * 0.5;
        YCbCr::new((ycc.y - key * self.key_luma).max(0.0), chroma.x, chroma.y).to_rgb()
    }

    /// Resolve the background contribution for one pixel.
    ///
    /// Rules are tried in order: no source, no background, outside mask
    /// dominates, fully inside, then the keyer proper.
    pub fn background_key(&self, quad: &PixelQuad) -> Keyed {
        let Some(source) = quad.source else {
            return Keyed {
                kbg: 1.0,
                foreground: Color::BLACK,
                branch: KeyBranch::NoSource,
            };
        };
        let source_alpha = clamp_mask(source.a);
        let mut inside = clamp_mask(quad.inside_mask);
        let outside = clamp_mask(quad.outside_mask);
        if self.source_alpha == SourceAlpha::AddToInsideMask {
            inside = inside.max(source_alpha);
        }

        let opaque = source.with_alpha(1.0);
        let mut keyed = if quad.background.is_none() {
            Keyed {
                kbg: 0.0,
                foreground: opaque,
                branch: KeyBranch::NoBackground,
            }
        } else if outside > 0.0 && outside >= 1.0 - inside {
            Keyed {
                kbg: 1.0,
                foreground: opaque,
                branch: KeyBranch::OutsideMask,
            }
        } else if inside >= 1.0 {
            Keyed {
                kbg: 0.0,
                foreground: opaque,
                branch: KeyBranch::InsideMask,
            }
        } else {
            let ycc = YCbCr::from_rgb(source);
            let xz = self.rotate(ycc);
            let kfg = self.key_strength(xz);
            Keyed {
                kbg: non_additive_mix(kfg / self.key_chroma, inside, outside),
                foreground: self.suppress(source, ycc, xz, kfg),
                branch: KeyBranch::Keyed,
            }
        };

        if self.source_alpha == SourceAlpha::Normal {
            keyed.kbg = 1.0 - (1.0 - keyed.kbg) * source_alpha;
        }
        keyed
    }

    /// Output compositor: assemble the destination pixel for the output mode.
    /// Alpha is always `1 - kbg`.
    pub fn composite(&self, quad: &PixelQuad, keyed: &Keyed) -> Color {
        let alpha = 1.0 - keyed.kbg;
        let rgb = match self.output_mode {
            OutputMode::Intermediate => quad.source.unwrap_or(Color::BLACK),
            OutputMode::Premultiplied => keyed.foreground.scale_rgb(alpha),
            OutputMode::Unpremultiplied => keyed.foreground,
            OutputMode::Composite => {
                let bg = quad.background.unwrap_or(Color::BLACK);
                let fg = keyed.foreground.scale_rgb(alpha);
                Color::rgb(
                    fg.r + bg.r * keyed.kbg,
                    fg.g + bg.g * keyed.kbg,
                    fg.b + bg.b * keyed.kbg,
                )
            }
        };
        rgb.with_alpha(alpha)
    }

    /// Key one pixel: `(setup, quad) -> output pixel`.
    #[inline]
    pub fn process(&self, quad: &PixelQuad) -> Color {
        self.composite(quad, &self.background_key(quad))
    }
}

fn half_angle_tan(degrees: f32) -> f32 {
    (degrees.to_radians() * 0.5).tan()
}
