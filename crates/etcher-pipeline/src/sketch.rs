//! Background cleaner and pencil-sketch synthesizer.
//!
//! The cleaner blends the tone-adjusted gray with an adaptive local
//! threshold of itself, which flattens uneven backgrounds toward white
//! while keeping the subject's midtones. The sketch is then derived from
//! the cleaned base with a blend against its own blurred negative,
//! followed by a strong contrast boost around the image mean.

use image::{GrayImage, Luma};
use tracing::debug;

use crate::blur;
use crate::types::Raster;

/// Upper bound of the background-clean strength scale.
pub const MAX_STRENGTH: f32 = 100.0;

/// Offset subtracted from the local mean before thresholding.
pub const THRESHOLD_OFFSET: f32 = 5.0;

/// Weight of the cleaned base in the sketch blend. The blurred negative
/// gets the remainder.
const BASE_WEIGHT: f32 = 0.7;

/// Contrast factor applied to the blended sketch.
const SKETCH_CONTRAST: f32 = 3.0;

/// Neighborhood size for the adaptive threshold at `strength`:
/// `(11 + (strength / 5) * 2) | 1`, using integer division.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn block_size(strength: f32) -> u32 {
    let steps = clamp_strength(strength) as u32 / 5;
    (11 + steps * 2) | 1
}

fn clamp_strength(strength: f32) -> f32 {
    if strength.is_nan() {
        0.0
    } else {
        strength.clamp(0.0, MAX_STRENGTH)
    }
}

/// Adaptive threshold against a Gaussian-weighted local mean.
///
/// A pixel becomes white when it is brighter than `local_mean - offset`
/// and black otherwise.
#[must_use = "returns the thresholded image"]
pub fn adaptive_threshold(gray: &GrayImage, block: u32, offset: f32) -> GrayImage {
    let mean = blur::gaussian_blur_kernel(gray, block);
    GrayImage::from_fn(gray.width(), gray.height(), |x, y| {
        let px = f32::from(gray.get_pixel(x, y).0[0]);
        let local = f32::from(mean.get_pixel(x, y).0[0]);
        if px > local - offset {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Blend `gray` toward its adaptive threshold by `strength / 100`.
///
/// Strength 0 returns the input unchanged.
#[must_use = "returns the cleaned raster"]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clean_background(gray: &Raster, strength: f32) -> Raster {
    let s = clamp_strength(strength) / MAX_STRENGTH;
    if s <= 0.0 {
        return gray.clone();
    }
    let block = block_size(strength);
    debug!(strength, block, "cleaning background");

    gray.map_luma(|luma| {
        let threshold = adaptive_threshold(luma, block, THRESHOLD_OFFSET);
        let mut out = luma.clone();
        for (dst, th) in out.pixels_mut().zip(threshold.pixels()) {
            let g = f32::from(dst.0[0]);
            let t = f32::from(th.0[0]);
            dst.0[0] = g.mul_add(1.0 - s, t * s).round().clamp(0.0, 255.0) as u8;
        }
        out
    })
}

/// Derive the pencil sketch from a cleaned base.
///
/// `blur_depth` is the kernel size of the blur applied to the negative;
/// it is coerced to an odd integer of at least 1.
#[must_use = "returns the sketch raster"]
pub fn sketch(cleaned: &Raster, blur_depth: u32) -> Raster {
    let kernel = blur::odd_kernel(blur_depth);
    debug!(kernel, "synthesizing sketch");

    cleaned.map_luma(|luma| {
        let mut inverted = luma.clone();
        for pixel in inverted.pixels_mut() {
            pixel.0[0] = 255 - pixel.0[0];
        }
        let blurred = blur::gaussian_blur_kernel(&inverted, kernel);

        let blend: Vec<f32> = luma
            .pixels()
            .zip(blurred.pixels())
            .map(|(base, neg)| {
                f32::from(base.0[0]).mul_add(BASE_WEIGHT, f32::from(neg.0[0]) * (1.0 - BASE_WEIGHT))
            })
            .collect();
        let values = contrast_about_mean(&blend, SKETCH_CONTRAST);
        GrayImage::from_raw(luma.width(), luma.height(), values)
            .unwrap_or_else(|| luma.clone())
    })
}

/// Stretch `values` away from their mean by `factor`, rounding back to
/// 8-bit.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn contrast_about_mean(values: &[f32], factor: f32) -> Vec<u8> {
    if values.is_empty() {
        return Vec::new();
    }
    let sum: f64 = values.iter().map(|&v| f64::from(v)).sum();
    let mean = (sum / values.len() as f64) as f32;
    values
        .iter()
        .map(|&v| (v - mean).mul_add(factor, mean).round().clamp(0.0, 255.0) as u8)
        .collect()
}

/// Run the background cleaner, then derive the sketch from its result.
///
/// Returns `(cleaned, sketch)`.
#[must_use]
pub fn clean_and_sketch(gray: &Raster, strength: f32, blur_depth: u32) -> (Raster, Raster) {
    let cleaned = clean_background(gray, strength);
    let sketched = sketch(&cleaned, blur_depth);
    (cleaned, sketched)
}
