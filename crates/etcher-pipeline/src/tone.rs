//! Tone stage: brightness, contrast, gamma and invert on the luma plane.
//!
//! All four adjustments are folded into one 256-entry lookup table, so
//! the per-pixel cost is a single table read regardless of which
//! adjustments are active. The order is fixed:
//!
//! 1. affine contrast/brightness: `out = clamp(alpha * in + beta)`, with
//!    `alpha` from contrast and `beta` from brightness
//! 2. gamma: `out = 255 * (in / 255) ^ (1 / gamma)`
//! 3. invert: `out = 255 - in`
//!
//! The alpha plane is never touched.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Raster;

/// Smallest usable gamma. Zero, negative and NaN gammas are floored here.
pub const MIN_GAMMA: f32 = 0.01;
const _: () = assert!(MIN_GAMMA > 0.0);

/// Largest gamma accepted; larger values are clamped.
pub const MAX_GAMMA: f32 = 10.0;

/// Upper bound for the brightness and contrast factors.
pub const MAX_FACTOR: f32 = 3.0;

/// Contrast pivots around mid-gray so that changing contrast alone
/// leaves 128 fixed.
const PIVOT: f32 = 128.0;

/// Intensity offset per unit of brightness away from 1.0.
pub const BRIGHTNESS_STEP: f32 = 128.0;

/// Tone controls for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    /// Brightness in `[0, 3]`; 1.0 leaves intensities unchanged. Each
    /// unit away from 1.0 shifts every intensity by [`BRIGHTNESS_STEP`].
    pub brightness: f32,
    /// Contrast factor around mid-gray; 1.0 leaves intensities unchanged.
    pub contrast: f32,
    /// Gamma; values above 1.0 lift shadows, below 1.0 deepen them.
    pub gamma: f32,
    /// Invert the result after all other adjustments.
    pub invert: bool,
}

impl Default for Tone {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            contrast: 1.0,
            gamma: 1.0,
            invert: false,
        }
    }
}

impl Tone {
    /// Return a copy with every field inside its valid range.
    #[must_use]
    pub fn clamped(self) -> Self {
        Self {
            brightness: clamp_factor(self.brightness),
            contrast: clamp_factor(self.contrast),
            gamma: floor_gamma(self.gamma),
            invert: self.invert,
        }
    }

    /// Affine coefficients `(alpha, beta)` for `out = alpha * in + beta`.
    ///
    /// `alpha` is the contrast, stretching around [`PIVOT`]; `beta` adds
    /// the brightness offset on top of the pivot term.
    #[must_use]
    pub fn affine(self) -> (f32, f32) {
        let t = self.clamped();
        let alpha = t.contrast;
        let offset = (t.brightness - 1.0) * BRIGHTNESS_STEP;
        let beta = PIVOT.mul_add(1.0 - t.contrast, offset);
        (alpha, beta)
    }

    /// Build the combined lookup table for this tone setting.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn lut(self) -> [u8; 256] {
        let t = self.clamped();
        let (alpha, beta) = t.affine();
        let gamma = gamma_lut(t.gamma);
        std::array::from_fn(|i| {
            let v = f32::from(u8::try_from(i).unwrap_or(u8::MAX));
            let affine = alpha.mul_add(v, beta).round().clamp(0.0, 255.0) as u8;
            let corrected = gamma[usize::from(affine)];
            if t.invert { 255 - corrected } else { corrected }
        })
    }
}

/// Floor a gamma value to [`MIN_GAMMA`] and cap it at [`MAX_GAMMA`].
#[must_use]
pub fn floor_gamma(gamma: f32) -> f32 {
    if gamma.is_nan() || gamma < MIN_GAMMA {
        MIN_GAMMA
    } else {
        gamma.min(MAX_GAMMA)
    }
}

fn clamp_factor(value: f32) -> f32 {
    if value.is_nan() {
        1.0
    } else {
        value.clamp(0.0, MAX_FACTOR)
    }
}

/// Precompute `255 * (i / 255) ^ (1 / gamma)` for every 8-bit input.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gamma_lut(gamma: f32) -> [u8; 256] {
    let inv = 1.0 / f64::from(floor_gamma(gamma));
    std::array::from_fn(|i| {
        #[allow(clippy::cast_precision_loss)]
        let normalized = i as f64 / 255.0;
        (255.0 * normalized.powf(inv)).round().clamp(0.0, 255.0) as u8
    })
}

/// Apply the tone stage to a raster, returning a new raster.
#[must_use = "returns the tone-adjusted raster"]
pub fn apply_tone(raster: &Raster, tone: Tone) -> Raster {
    let tone = tone.clamped();
    debug!(
        brightness = tone.brightness,
        contrast = tone.contrast,
        gamma = tone.gamma,
        invert = tone.invert,
        "applying tone"
    );
    let lut = tone.lut();
    raster.map_luma(|luma| {
        let mut out = luma.clone();
        for pixel in out.pixels_mut() {
            pixel.0[0] = lut[usize::from(pixel.0[0])];
        }
        out
    })
}
