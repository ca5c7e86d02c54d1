//! Per-run parameter bundle.

use serde::{Deserialize, Serialize};

use crate::line_art::LineSource;
use crate::resample::ResampleFilter;
use crate::sketch;
use crate::tone::Tone;

/// Every control for one pipeline run.
///
/// A bundle is immutable for the duration of a run. Numeric fields are
/// clamped into their documented ranges by [`clamped`](Self::clamped)
/// before any stage reads them; out-of-range values are never an error.
///
/// Missing fields deserialize to their defaults, so partial JSON such as
/// `{"gamma": 1.8}` is a valid bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterBundle {
    /// Brightness in `[0, 3]`; 1.0 is unchanged, other values shift every
    /// intensity additively.
    pub brightness: f32,
    /// Contrast factor in `[0, 3]` around mid-gray; 1.0 is unchanged.
    pub contrast: f32,
    /// Gamma in `[0.01, 10]`; non-positive values are floored.
    pub gamma: f32,
    /// Invert the tone-adjusted gray.
    pub invert: bool,
    /// Background-clean strength in `[0, 100]`; 0 disables cleaning.
    pub background_strength: f32,
    /// Face-smoothing kernel size; coerced to an odd integer ≥ 1.
    pub face_radius: u32,
    /// Sketch blur kernel size; coerced to an odd integer ≥ 1.
    pub sketch_depth: u32,
    /// Beam strength in `[0, 1]`, driving line-art thresholds and
    /// stroke thickness.
    pub beam_strength: f32,
    /// Dither strength in `[0, 1]`.
    pub dither_strength: f32,
    /// Which raster line art is extracted from.
    pub line_source: LineSource,
    /// Physical output width in millimeters.
    pub width_mm: f64,
    /// Output resolution in dots per inch.
    pub dpi: f64,
    /// Filter used to resample the source to the target size.
    pub resample_filter: ResampleFilter,
}

impl ParameterBundle {
    /// Default brightness factor.
    pub const DEFAULT_BRIGHTNESS: f32 = 1.0;
    /// Default contrast factor.
    pub const DEFAULT_CONTRAST: f32 = 1.0;
    /// Default gamma.
    pub const DEFAULT_GAMMA: f32 = 1.0;
    /// Default background-clean strength.
    pub const DEFAULT_BACKGROUND_STRENGTH: f32 = 45.0;
    /// Default face-smoothing kernel size.
    pub const DEFAULT_FACE_RADIUS: u32 = 5;
    /// Default sketch blur kernel size.
    pub const DEFAULT_SKETCH_DEPTH: u32 = 25;
    /// Default beam strength.
    pub const DEFAULT_BEAM_STRENGTH: f32 = 0.4;
    /// Default dither strength.
    pub const DEFAULT_DITHER_STRENGTH: f32 = 0.5;
    /// Default physical width in millimeters.
    pub const DEFAULT_WIDTH_MM: f64 = 100.0;
    /// Default resolution in DPI.
    pub const DEFAULT_DPI: f64 = 250.0;
    /// Upper bound for DPI.
    pub const MAX_DPI: f64 = 10_000.0;
    /// Upper bound for the physical width in millimeters.
    pub const MAX_WIDTH_MM: f64 = 10_000.0;

    /// Return a copy with every numeric field inside its range.
    #[must_use]
    pub fn clamped(self) -> Self {
        let tone = self.tone().clamped();
        Self {
            brightness: tone.brightness,
            contrast: tone.contrast,
            gamma: tone.gamma,
            background_strength: clamp_or(
                self.background_strength,
                0.0,
                sketch::MAX_STRENGTH,
                0.0,
            ),
            beam_strength: clamp_or(self.beam_strength, 0.0, 1.0, Self::DEFAULT_BEAM_STRENGTH),
            dither_strength: clamp_or(
                self.dither_strength,
                0.0,
                1.0,
                Self::DEFAULT_DITHER_STRENGTH,
            ),
            width_mm: positive_or(self.width_mm, Self::MAX_WIDTH_MM, Self::DEFAULT_WIDTH_MM),
            dpi: positive_or(self.dpi, Self::MAX_DPI, Self::DEFAULT_DPI),
            ..self
        }
    }

    /// The tone controls of this bundle.
    #[must_use]
    pub const fn tone(&self) -> Tone {
        Tone {
            brightness: self.brightness,
            contrast: self.contrast,
            gamma: self.gamma,
            invert: self.invert,
        }
    }
}

impl Default for ParameterBundle {
    fn default() -> Self {
        Self {
            brightness: Self::DEFAULT_BRIGHTNESS,
            contrast: Self::DEFAULT_CONTRAST,
            gamma: Self::DEFAULT_GAMMA,
            invert: false,
            background_strength: Self::DEFAULT_BACKGROUND_STRENGTH,
            face_radius: Self::DEFAULT_FACE_RADIUS,
            sketch_depth: Self::DEFAULT_SKETCH_DEPTH,
            beam_strength: Self::DEFAULT_BEAM_STRENGTH,
            dither_strength: Self::DEFAULT_DITHER_STRENGTH,
            line_source: LineSource::default(),
            width_mm: Self::DEFAULT_WIDTH_MM,
            dpi: Self::DEFAULT_DPI,
            resample_filter: ResampleFilter::default(),
        }
    }
}

fn clamp_or(value: f32, min: f32, max: f32, nan: f32) -> f32 {
    if value.is_nan() {
        nan
    } else {
        value.clamp(min, max)
    }
}

/// Keep positive finite values up to `max`; anything else becomes
/// `fallback`.
fn positive_or(value: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value.min(max)
    } else {
        fallback
    }
}
