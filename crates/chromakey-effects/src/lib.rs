//! ChromaKey Effects - the keyer and its render pipeline
//!
//! Provides the per-pixel chroma key math, the window renderer that
//! drives it over frame buffers, and a host-facing effect adapter with
//! parameter descriptors.

pub mod chroma_key;
pub mod render;

use chromakey_core::{FrameBuffer, Result};
use serde::{Deserialize, Serialize};

pub use chroma_key::{
    clamp_mask, non_additive_mix, KeyBranch, KeySetup, Keyed, KeyerParams, OutputMode, PixelQuad,
    SourceAlpha,
};
pub use render::{render_window, RenderArgs, PARALLEL_THRESHOLD};

/// Effect parameter types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Float(f32),
    Int(i32),
    Color([f32; 4]),
    /// Option label of a choice parameter
    Choice(String),
}

/// Effect parameter descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamDescriptor {
    pub name: String,
    pub display_name: String,
    pub hint: String,
    pub default: ParamValue,
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    /// Option labels, in index order. Empty unless the parameter is a choice.
    pub options: Vec<String>,
}

impl ParamDescriptor {
    fn new(name: &str, display_name: &str, hint: &str, default: ParamValue) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            hint: hint.into(),
            default,
            min: None,
            max: None,
            options: Vec::new(),
        }
    }

    fn range(mut self, min: ParamValue, max: ParamValue) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    fn options<'a>(mut self, labels: impl IntoIterator<Item = &'a str>) -> Self {
        self.options = labels.into_iter().map(String::from).collect();
        self
    }
}

/// Collection of parameter values.
pub type ParamValues = std::collections::HashMap<String, ParamValue>;

/// Trait for image effects rendered on the CPU.
pub trait ImageEffect: Send + Sync {
    /// Get the effect name.
    fn name(&self) -> &str;

    /// Get parameter descriptors.
    fn params(&self) -> &[ParamDescriptor];

    /// Render `args.window` into `dst`.
    fn render(&self, args: &RenderArgs<'_>, dst: &mut FrameBuffer, values: &ParamValues)
        -> Result<()>;
}

/// Chroma key (green/blue screen) effect adapter.
pub struct ChromaKeyEffect {
    params: Vec<ParamDescriptor>,
}

impl Default for ChromaKeyEffect {
    fn default() -> Self {
        Self::new()
    }
}

impl ChromaKeyEffect {
    pub fn new() -> Self {
        use chroma_key::{
            ANGLE_MAX, ANGLE_MIN, DEFAULT_ACCEPTANCE_ANGLE, DEFAULT_SUPPRESSION_ANGLE,
        };

        let defaults = KeyerParams::default();
        let [r, g, b] = defaults.key_color;
        Self {
            params: vec![
                ParamDescriptor::new(
                    "key_color",
                    "Key Color",
                    "Color of the screen to remove, in linear light.",
                    ParamValue::Color([r, g, b, 1.0]),
                ),
                ParamDescriptor::new(
                    "acceptance_angle",
                    "Acceptance Angle",
                    "Colors within this angle of the key color are (partly) keyed out. \
                     Larger angles take in more of the color wheel.",
                    ParamValue::Float(DEFAULT_ACCEPTANCE_ANGLE),
                )
                .range(ParamValue::Float(ANGLE_MIN), ParamValue::Float(ANGLE_MAX)),
                ParamDescriptor::new(
                    "suppression_angle",
                    "Suppression Angle",
                    "Colors within this angle of the key color have their key \
                     component removed. Should be much smaller than the acceptance angle.",
                    ParamValue::Float(DEFAULT_SUPPRESSION_ANGLE),
                )
                .range(ParamValue::Float(ANGLE_MIN), ParamValue::Float(ANGLE_MAX)),
                ParamDescriptor::new(
                    "output_mode",
                    "Output Mode",
                    &OutputMode::ALL
                        .iter()
                        .map(|m| format!("{}: {}", m.label(), m.hint()))
                        .collect::<Vec<_>>()
                        .join("\n"),
                    ParamValue::Choice(defaults.output_mode.label().into()),
                )
                .options(OutputMode::ALL.iter().map(|m| m.label())),
                ParamDescriptor::new(
                    "source_alpha",
                    "Source Alpha",
                    &SourceAlpha::ALL
                        .iter()
                        .map(|m| format!("{}: {}", m.label(), m.hint()))
                        .collect::<Vec<_>>()
                        .join("\n"),
                    ParamValue::Choice(defaults.source_alpha.label().into()),
                )
                .options(SourceAlpha::ALL.iter().map(|m| m.label())),
            ],
        }
    }
}

impl ImageEffect for ChromaKeyEffect {
    fn name(&self) -> &str {
        "Chroma Key"
    }

    fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    fn render(
        &self,
        args: &RenderArgs<'_>,
        dst: &mut FrameBuffer,
        values: &ParamValues,
    ) -> Result<()> {
        let params = KeyerParams::from_values(values)?;
        params.validate()?;
        args.render(dst, &params)
    }
}
