//! etcher: turn a photograph into engraving-ready PNGs.
//!
//! Runs the raster pipeline on one image file and writes the grayscale,
//! dither, sketch and line-art outputs next to each other, each with the
//! engraving resolution embedded. Useful for:
//!
//! - Trying material presets on a photo before engraving
//! - Tuning tone, background and beam parameters
//! - Checking output statistics (`--stats`)
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin etcher -- [OPTIONS] <IMAGE_PATH>
//! ```
//!
//! Logging goes to stderr and honours `RUST_LOG` (default `info`).

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use etcher_pipeline::{
    FaceRegion, ImageStats, LineSource, Material, OutputKey, ParameterBundle, Pipeline,
    ResampleFilter, SizeField, StaticRegions,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Convert a photograph into engraving-ready rasters.
///
/// Writes `<stem>_<output>.png` for each output into the output
/// directory. Material presets set a starting point; individual flags
/// override the preset.
#[derive(Parser)]
#[command(name = "etcher", version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Directory to write outputs into.
    #[arg(long, short, default_value = ".")]
    out_dir: PathBuf,

    /// Material preset (default, wood, metal, leather, stone).
    #[arg(long, default_value_t = Material::Default)]
    preset: Material,

    /// Brightness (0-3, 1 = unchanged; shifts every tone up or down). Overrides the preset.
    #[arg(long)]
    brightness: Option<f32>,

    /// Contrast factor (0-3). Overrides the preset.
    #[arg(long)]
    contrast: Option<f32>,

    /// Gamma (0.01-10).
    #[arg(long, default_value_t = ParameterBundle::DEFAULT_GAMMA)]
    gamma: f32,

    /// Invert tones after adjustment.
    #[arg(long)]
    invert: bool,

    /// Background cleaning strength (0-100). Overrides the preset.
    #[arg(long)]
    background_strength: Option<f32>,

    /// Face smoothing kernel size in pixels. Overrides the preset.
    #[arg(long)]
    face_radius: Option<u32>,

    /// Sketch blur depth in pixels. Overrides the preset.
    #[arg(long)]
    sketch_depth: Option<u32>,

    /// Laser beam width in millimeters (0-1). Overrides the preset.
    #[arg(long)]
    beam_strength: Option<f32>,

    /// Dither strength (0-1); higher lets more midtones through as white.
    #[arg(long, default_value_t = ParameterBundle::DEFAULT_DITHER_STRENGTH)]
    dither_strength: f32,

    /// Line-art source (gray, sketch).
    #[arg(long, default_value_t = LineSource::default())]
    line_source: LineSource,

    /// Engraving width in millimeters.
    #[arg(long, default_value_t = ParameterBundle::DEFAULT_WIDTH_MM)]
    width_mm: f64,

    /// Engraving resolution in dots per inch.
    #[arg(long, default_value_t = ParameterBundle::DEFAULT_DPI)]
    dpi: f64,

    /// Resample filter (nearest, triangle, catmull-rom, gaussian, lanczos3).
    #[arg(long, default_value_t = ResampleFilter::default())]
    filter: ResampleFilter,

    /// Size edit applied after loading, as FIELD=VALUE.
    ///
    /// FIELD is one of width_mm, height_mm, dpi, px_width. Repeatable;
    /// edits apply in order and each one is authoritative for its field.
    #[arg(long = "size", value_parser = parse_size_edit)]
    size_edits: Vec<(SizeField, String)>,

    /// Edit width and height independently instead of following the
    /// image's aspect ratio.
    #[arg(long)]
    unlock_aspect: bool,

    /// Face region in source pixels, as X,Y,W,H. Repeatable.
    #[arg(long = "face", value_parser = parse_face)]
    faces: Vec<FaceRegion>,

    /// Only write these outputs (grayscale, dither, sketch, line_art).
    /// Repeatable; all outputs by default.
    #[arg(long)]
    only: Vec<OutputKey>,

    /// Print statistics of every output as JSON.
    #[arg(long)]
    stats: bool,

    /// Full parameter bundle as a JSON string.
    ///
    /// When provided, the preset and all other parameter flags are
    /// ignored. Missing fields take their defaults.
    #[arg(long)]
    params_json: Option<String>,
}

/// Parse `X,Y,W,H` into a [`FaceRegion`].
fn parse_face(raw: &str) -> Result<FaceRegion, String> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<u32>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid face region '{raw}': {e}"))?;
    match parts.as_slice() {
        &[x, y, w, h] => Ok(FaceRegion::new(x, y, w, h)),
        _ => Err(format!("face region '{raw}' must be X,Y,W,H")),
    }
}

/// Parse `FIELD=VALUE`. The value is kept raw; invalid numbers are
/// ignored by the size resolver.
fn parse_size_edit(raw: &str) -> Result<(SizeField, String), String> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("size edit '{raw}' must be FIELD=VALUE"))?;
    Ok((field.trim().parse()?, value.to_owned()))
}

/// Build a [`ParameterBundle`] from CLI arguments.
///
/// If `--params-json` is provided, the JSON is parsed directly and the
/// preset and individual parameter flags are ignored. Otherwise the
/// preset is the base and each given flag overrides it.
fn params_from_cli(cli: &Cli) -> Result<ParameterBundle, String> {
    if let Some(ref json) = cli.params_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --params-json: {e}"));
    }

    let base = cli.preset.bundle();
    Ok(ParameterBundle {
        brightness: cli.brightness.unwrap_or(base.brightness),
        contrast: cli.contrast.unwrap_or(base.contrast),
        gamma: cli.gamma,
        invert: cli.invert,
        background_strength: cli.background_strength.unwrap_or(base.background_strength),
        face_radius: cli.face_radius.unwrap_or(base.face_radius),
        sketch_depth: cli.sketch_depth.unwrap_or(base.sketch_depth),
        beam_strength: cli.beam_strength.unwrap_or(base.beam_strength),
        dither_strength: cli.dither_strength,
        line_source: cli.line_source,
        width_mm: cli.width_mm,
        dpi: cli.dpi,
        resample_filter: cli.filter,
    })
}

/// `<out_dir>/<stem>_<key>.png`
fn output_path(out_dir: &Path, image_path: &Path, key: OutputKey) -> PathBuf {
    let stem = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("etcher");
    out_dir.join(format!("{stem}_{key}.png"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let params = match params_from_cli(&cli) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    info!(
        path = %cli.image_path.display(),
        bytes = image_bytes.len(),
        "loaded image"
    );

    let decoded = match Pipeline::new(image_bytes, params).decode() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Pipeline error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let lock = !cli.unlock_aspect;
    let size = cli
        .size_edits
        .iter()
        .fold(*decoded.size(), |size, (field, raw)| size.apply_edit(*field, raw, lock));
    info!(
        width_mm = size.width_mm,
        height_mm = size.height_mm,
        dpi = size.dpi,
        px_width = size.px_width,
        px_height = size.px_height,
        "resolved size"
    );

    let detector = (!cli.faces.is_empty()).then(|| StaticRegions(cli.faces.clone()));
    let outputs = decoded
        .with_size(size)
        .resize()
        .smooth_faces(detector.as_ref().map(|d| d as &dyn etcher_pipeline::FaceDetector))
        .tone()
        .derive()
        .into_outputs();

    if let Err(e) = std::fs::create_dir_all(&cli.out_dir) {
        eprintln!("Error creating {}: {e}", cli.out_dir.display());
        return ExitCode::FAILURE;
    }

    let wanted = |key: OutputKey| cli.only.is_empty() || cli.only.contains(&key);
    let mut failed = false;

    for (key, raster) in outputs.iter().filter(|&(key, _)| wanted(key)) {
        if cli.stats {
            match serde_json::to_string(&ImageStats::of(raster, size.dpi)) {
                Ok(json) => println!("{{\"output\":\"{key}\",\"stats\":{json}}}"),
                Err(e) => warn!(output = %key, error = %e, "failed to serialize stats"),
            }
        }

        let path = output_path(&cli.out_dir, &cli.image_path, key);
        let written = etcher_export::to_png(raster, size.dpi)
            .map_err(|e| e.to_string())
            .and_then(|bytes| {
                std::fs::write(&path, &bytes)
                    .map(|()| bytes.len())
                    .map_err(|e| e.to_string())
            });
        match written {
            Ok(len) => info!(output = %key, path = %path.display(), bytes = len, "wrote output"),
            Err(e) => {
                eprintln!("Error writing {key} to {}: {e}", path.display());
                failed = true;
            }
        }
    }

    if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
