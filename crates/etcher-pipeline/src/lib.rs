//! etcher-pipeline: Pure raster transform pipeline (sans-IO).
//!
//! Turns a photograph into four engraving-ready rasters:
//! resample -> face smoothing -> tone -> {background clean -> sketch,
//! dither, line art}.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! byte slices and returns rasters. Encoding and the filesystem live in
//! `etcher-export` and the `etcher` binary.

pub mod blur;
pub mod canny;
pub mod dither;
pub mod face;
pub mod grayscale;
pub mod line_art;
pub mod params;
pub mod pipeline;
pub mod presets;
pub mod resample;
pub mod session;
pub mod size;
pub mod sketch;
pub mod stats;
pub mod tone;
pub mod types;

pub use face::{FaceDetector, StaticRegions};
pub use line_art::{LineArtInput, LineSource};
pub use params::ParameterBundle;
pub use pipeline::Pipeline;
pub use presets::Material;
pub use resample::ResampleFilter;
pub use session::{RunTicket, Session};
pub use size::{SizeField, SizeSpec};
pub use stats::ImageStats;
pub use tone::Tone;
pub use types::{
    Dimensions, FaceRegion, GrayImage, OutputKey, OutputSet, PipelineError, Raster, RgbaImage,
};

/// Run the full pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP), the parameters for this
/// run and an optional face detector, and returns the four outputs at the
/// pixel size resolved from `params.width_mm` and `params.dpi`.
///
/// # Pipeline steps
///
/// 1. Decode and resolve the target size
/// 2. Resample to the target size
/// 3. Smooth detected faces (skipped without a detector)
/// 4. Grayscale and tone adjustment
/// 5. Background clean and sketch
/// 6. Floyd–Steinberg dither
/// 7. Line art from the chosen source
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized. Nothing is produced when decoding fails.
pub fn process(
    image_bytes: &[u8],
    params: &ParameterBundle,
    detector: Option<&dyn FaceDetector>,
) -> Result<OutputSet, PipelineError> {
    Ok(Pipeline::new(image_bytes.to_vec(), *params)
        .decode()?
        .resize()
        .smooth_faces(detector)
        .tone()
        .derive()
        .into_outputs())
}
