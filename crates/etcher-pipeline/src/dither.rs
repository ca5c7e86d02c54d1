//! Floyd–Steinberg error-diffusion dithering.
//!
//! Reduces an 8-bit gray plane to pure black and white (still stored as
//! 8-bit). Pixels are visited strictly in row-major order; each one is
//! quantized against the strength-dependent threshold and its error is
//! pushed to the unvisited neighbors:
//!
//! ```text
//!            *     7/16
//!   3/16   5/16    1/16
//! ```
//!
//! Error terms that would land outside the image are dropped.

use image::GrayImage;
use tracing::debug;

use crate::types::Raster;

/// Threshold at strength 0.
const THRESHOLD_AT_ZERO: f32 = 160.0;

/// Threshold at strength 1.
const THRESHOLD_AT_ONE: f32 = 90.0;

/// Quantization threshold for a dither strength in `[0, 1]`.
///
/// Linearly interpolated from 160 at strength 0 down to 90 at strength
/// 1. A value quantizes to white when it is at or above the threshold,
/// so higher strengths let more midtones through as white.
///
/// Note the direction: raising the strength makes the output lighter,
/// not darker.
#[must_use]
pub fn threshold(strength: f32) -> f32 {
    let s = if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, 1.0)
    };
    (THRESHOLD_AT_ONE - THRESHOLD_AT_ZERO).mul_add(s, THRESHOLD_AT_ZERO)
}

/// Dither a single gray plane.
#[must_use = "returns the dithered image"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn floyd_steinberg(gray: &GrayImage, strength: f32) -> GrayImage {
    let (width, height) = gray.dimensions();
    let t = threshold(strength);
    debug!(width, height, threshold = t, "applying Floyd-Steinberg dithering");

    let w = width as usize;
    let h = height as usize;
    let mut buffer: Vec<f32> = gray.as_raw().iter().map(|&v| f32::from(v)).collect();

    for y in 0..h {
        for x in 0..w {
            let i = y * w + x;
            let old = buffer[i];
            let new = if old >= t { 255.0 } else { 0.0 };
            buffer[i] = new;
            let error = old - new;
            if error == 0.0 {
                continue;
            }

            if x + 1 < w {
                buffer[i + 1] += error * 7.0 / 16.0;
            }
            if y + 1 < h {
                let below = i + w;
                if x > 0 {
                    buffer[below - 1] += error * 3.0 / 16.0;
                }
                buffer[below] += error * 5.0 / 16.0;
                if x + 1 < w {
                    buffer[below + 1] += error / 16.0;
                }
            }
        }
    }

    let data = buffer.into_iter().map(|v| v as u8).collect();
    GrayImage::from_raw(width, height, data).unwrap_or_else(|| gray.clone())
}

/// Dither a raster, carrying its alpha plane through unchanged.
#[must_use = "returns the dithered raster"]
pub fn dither(gray: &Raster, strength: f32) -> Raster {
    gray.map_luma(|luma| floyd_steinberg(luma, strength))
}
