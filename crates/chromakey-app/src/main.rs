//! ChromaKey - command-line chroma keyer
//!
//! Keys a PNG source over an optional background and writes a 16-bit RGBA
//! PNG.

mod io;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chromakey_core::{FrameBuffer, PixelFormat};
use chromakey_effects::{KeyerParams, OutputMode, RenderArgs, SourceAlpha};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chromakey")]
#[command(about = "Key a green or blue screen out of an image")]
struct Cli {
    /// Foreground image shot against the screen (PNG)
    source: PathBuf,

    /// Output PNG file path
    #[arg(short, long)]
    output: PathBuf,

    /// Image shown where the screen is keyed out (PNG)
    #[arg(short, long)]
    background: Option<PathBuf>,

    /// Mask of areas that are always foreground (PNG)
    #[arg(long)]
    inside_mask: Option<PathBuf>,

    /// Mask of areas that are always background (PNG)
    #[arg(long)]
    outside_mask: Option<PathBuf>,

    /// Keyer parameters as JSON; flags override individual fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Key color as linear R,G,B (e.g. "0,1,0")
    #[arg(short, long, value_parser = parse_rgb)]
    key: Option<[f32; 3]>,

    /// Acceptance angle in degrees (0-175)
    #[arg(short, long)]
    acceptance: Option<f32>,

    /// Suppression angle in degrees (0-175)
    #[arg(short, long)]
    suppression: Option<f32>,

    /// Output mode: intermediate, premultiplied, unpremultiplied or composite
    #[arg(short, long, value_parser = parse_mode)]
    mode: Option<OutputMode>,

    /// Source alpha handling: ignore, add-to-inside-mask or normal
    #[arg(long, value_parser = parse_source_alpha)]
    source_alpha: Option<SourceAlpha>,

    /// Log render details
    #[arg(short, long)]
    verbose: bool,
}

fn parse_rgb(s: &str) -> Result<[f32; 3], String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>().map_err(|e| format!("{p:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    <[f32; 3]>::try_from(parts).map_err(|p| format!("expected 3 components, got {}", p.len()))
}

/// Accept host labels as well as dashed or snake-case spellings.
fn choice_label(s: &str) -> String {
    s.replace(['-', '_'], " ")
}

fn parse_mode(s: &str) -> Result<OutputMode, String> {
    OutputMode::from_label(&choice_label(s)).ok_or_else(|| format!("unknown output mode {s:?}"))
}

fn parse_source_alpha(s: &str) -> Result<SourceAlpha, String> {
    SourceAlpha::from_label(&choice_label(s))
        .ok_or_else(|| format!("unknown source alpha policy {s:?}"))
}

impl Cli {
    fn params(&self) -> Result<KeyerParams> {
        let mut params = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => KeyerParams::default(),
        };
        if let Some(key) = self.key {
            params.key_color = key;
        }
        if let Some(a) = self.acceptance {
            params.acceptance_angle = a;
        }
        if let Some(s) = self.suppression {
            params.suppression_angle = s;
        }
        if let Some(mode) = self.mode {
            params.output_mode = mode;
        }
        if let Some(policy) = self.source_alpha {
            params.source_alpha = policy;
        }
        params.validate().context("Invalid keyer parameters")?;
        Ok(params)
    }
}

fn load_optional(
    path: Option<&PathBuf>,
    load: fn(&std::path::Path) -> chromakey_core::Result<FrameBuffer>,
) -> Result<Option<FrameBuffer>> {
    path.map(|p| load(p).with_context(|| format!("Failed to load {}", p.display())))
        .transpose()
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let params = cli.params()?;
    info!(?params, "ChromaKey starting");

    let source = io::load_clip(&cli.source)
        .with_context(|| format!("Failed to load {}", cli.source.display()))?;
    let background = load_optional(cli.background.as_ref(), io::load_clip)?;
    let inside_mask = load_optional(cli.inside_mask.as_ref(), io::load_mask)?;
    let outside_mask = load_optional(cli.outside_mask.as_ref(), io::load_mask)?;

    let window = source.bounds();
    let mut args = RenderArgs::new(window).source(&source);
    if let Some(bg) = &background {
        args = args.background(bg);
    }
    if let Some(mask) = &inside_mask {
        args = args.inside_mask(mask);
    }
    if let Some(mask) = &outside_mask {
        args = args.outside_mask(mask);
    }

    let mut output = FrameBuffer::new(window, PixelFormat::RGBA_U16);
    let start = Instant::now();
    args.render(&mut output, &params).context("Render failed")?;
    info!(
        width = window.width(),
        height = window.height(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Keyed frame"
    );

    io::save_rgba16(&cli.output, &output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    info!(path = %cli.output.display(), "Wrote output");
    Ok(())
}
