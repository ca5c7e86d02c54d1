//! PNG serialization of output rasters.
//!
//! Every PNG carries the resolution in its `pHYs` chunk (pixels per
//! meter), so engraving software places the image at the intended
//! physical size without further input.
//!
//! Layouts:
//!
//! | raster                          | PNG                   |
//! |---------------------------------|-----------------------|
//! | opaque, only 0 and 255          | 1-bit grayscale       |
//! | opaque, any values              | 8-bit grayscale       |
//! | with alpha plane                | 8-bit grayscale+alpha |

use std::io::Cursor;

use etcher_pipeline::{OutputKey, OutputSet, Raster};
use tracing::{debug, warn};

/// Meters per inch.
const METERS_PER_INCH: f64 = 0.0254;

/// Errors that can occur while encoding a raster.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The PNG encoder rejected the data.
    #[error("failed to encode PNG: {0}")]
    Encode(#[from] png::EncodingError),

    /// The raster has a zero dimension.
    #[error("cannot encode a {width}x{height} raster")]
    InvalidDimensions {
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
    },

    /// The resolution is not a positive finite number.
    #[error("invalid resolution: {0} dpi")]
    InvalidDpi(f64),
}

/// Convert dots per inch to the pixels-per-meter unit used by `pHYs`.
///
/// # Errors
///
/// Returns [`ExportError::InvalidDpi`] for non-positive, non-finite or
/// absurdly large values.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn dpi_to_ppm(dpi: f64) -> Result<u32, ExportError> {
    let ppm = (dpi / METERS_PER_INCH).round();
    if !dpi.is_finite() || dpi <= 0.0 || ppm > f64::from(u32::MAX) {
        return Err(ExportError::InvalidDpi(dpi));
    }
    Ok((ppm as u32).max(1))
}

/// PNG requires both dimensions to be non-zero.
const fn check_dimensions(width: u32, height: u32) -> Result<(), ExportError> {
    if width == 0 || height == 0 {
        return Err(ExportError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// Whether `raster` is opaque and holds only pure black and white.
#[must_use]
pub fn is_bilevel(raster: &Raster) -> bool {
    !raster.has_alpha() && raster.luma().pixels().all(|p| p.0[0] == 0 || p.0[0] == 255)
}

/// Pack a 0/255 plane into 1-bit rows, most significant bit first, with
/// white as 1. Each row is padded to a whole byte.
fn pack_bits(luma: &[u8], width: u32) -> Vec<u8> {
    let width = width as usize;
    let bytes_per_row = width.div_ceil(8);
    let mut packed = Vec::with_capacity(bytes_per_row * (luma.len() / width.max(1)));
    for row in luma.chunks(width.max(1)) {
        for chunk in row.chunks(8) {
            let byte = chunk
                .iter()
                .enumerate()
                .filter(|&(_, &v)| v != 0)
                .fold(0u8, |acc, (i, _)| acc | (0x80 >> i));
            packed.push(byte);
        }
    }
    packed
}

/// Encode one raster as PNG with `dpi` embedded.
///
/// # Errors
///
/// Returns [`ExportError::InvalidDimensions`] for empty rasters,
/// [`ExportError::InvalidDpi`] for unusable resolutions, and
/// [`ExportError::Encode`] if the PNG encoder fails.
pub fn to_png(raster: &Raster, dpi: f64) -> Result<Vec<u8>, ExportError> {
    let dims = raster.dimensions();
    check_dimensions(dims.width, dims.height)?;
    let ppm = dpi_to_ppm(dpi)?;

    let (color, depth, data) = match raster.alpha() {
        Some(alpha) => {
            let interleaved = raster
                .luma()
                .as_raw()
                .iter()
                .zip(alpha.as_raw())
                .flat_map(|(&l, &a)| [l, a])
                .collect();
            (png::ColorType::GrayscaleAlpha, png::BitDepth::Eight, interleaved)
        }
        None if is_bilevel(raster) => (
            png::ColorType::Grayscale,
            png::BitDepth::One,
            pack_bits(raster.luma().as_raw(), dims.width),
        ),
        None => (
            png::ColorType::Grayscale,
            png::BitDepth::Eight,
            raster.luma().as_raw().clone(),
        ),
    };

    let mut buf = Cursor::new(Vec::new());
    {
        let mut encoder = png::Encoder::new(&mut buf, dims.width, dims.height);
        encoder.set_color(color);
        encoder.set_depth(depth);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&data)?;
        writer.finish()?;
    }
    let bytes = buf.into_inner();
    debug!(
        width = dims.width,
        height = dims.height,
        ?color,
        ?depth,
        dpi,
        bytes = bytes.len(),
        "encoded PNG"
    );
    Ok(bytes)
}

/// Encode every output of a run.
///
/// Failures are reported per key; one output failing to encode does not
/// stop the others.
#[must_use]
pub fn to_png_set(outputs: &OutputSet, dpi: f64) -> Vec<(OutputKey, Result<Vec<u8>, ExportError>)> {
    outputs
        .iter()
        .map(|(key, raster)| {
            let result = to_png(raster, dpi);
            if let Err(err) = &result {
                warn!(output = %key, error = %err, "failed to encode output");
            }
            (key, result)
        })
        .collect()
}
