//! Image decoding and grayscale conversion.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP) and produces the RGBA
//! working image plus a flag recording whether the source carried real
//! transparency. [`split`] later turns the RGBA image into a
//! [`Raster`]: a luminance plane plus the alpha plane when one is
//! present.

use image::{DynamicImage, GrayImage, Luma, RgbaImage};

use crate::types::{PipelineError, Raster};

/// A decoded source image.
#[derive(Debug, Clone)]
pub struct Decoded {
    /// The image expanded to 8-bit RGBA.
    pub rgba: RgbaImage,
    /// Whether the encoded source had an alpha channel.
    pub has_alpha: bool,
}

/// Decode raw image bytes into RGBA.
///
/// Supports whatever the `image` crate can decode with the enabled
/// format features.
///
/// # Errors
///
/// Returns [`PipelineError::EmptyInput`] if `bytes` is empty or the
/// image has no pixels.
/// Returns [`PipelineError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<Decoded, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let img: DynamicImage = image::load_from_memory(bytes)?;
    if img.width() == 0 || img.height() == 0 {
        return Err(PipelineError::EmptyInput);
    }
    let has_alpha = img.color().has_alpha();
    Ok(Decoded {
        rgba: img.to_rgba8(),
        has_alpha,
    })
}

/// Rec. 601 luma of one RGB triple, rounded to nearest.
///
/// Integer form of `0.299*R + 0.587*G + 0.114*B`, the weighting used
/// by most photo tools for "convert to grayscale".
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
pub const fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    ((weighted + 500) / 1000) as u8
}

/// Convert an RGBA image to a luminance plane, ignoring alpha.
#[must_use = "returns the grayscale image"]
pub fn to_luma(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}

/// Split an RGBA image into a [`Raster`].
///
/// The alpha plane is kept only when `keep_alpha` is `true`; opaque
/// sources produce an opaque raster so downstream encoders do not emit
/// a constant alpha channel.
#[must_use = "returns the split raster"]
pub fn split(image: &RgbaImage, keep_alpha: bool) -> Raster {
    let luma = to_luma(image);
    if !keep_alpha {
        return Raster::new(luma);
    }
    let alpha = GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[3]])
    });
    Raster::with_alpha(luma, alpha).unwrap_or_else(|| Raster::new(to_luma(image)))
}
