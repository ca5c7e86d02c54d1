//! Shared types for the etcher raster pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `GrayImage` so downstream crates can reference raster
/// data without depending on `image` directly.
pub use image::GrayImage;

/// Re-export `RgbaImage` so downstream crates can reference the
/// decoded source without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Width divided by height.
    #[must_use]
    pub fn aspect_ratio(self) -> f64 {
        f64::from(self.width) / f64::from(self.height.max(1))
    }

    /// Total number of pixels.
    #[must_use]
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A single-channel 8-bit raster with an optional alpha plane.
///
/// Every stage works on the `luma` plane. The alpha plane is carried
/// alongside unchanged, so transparency in the source survives into
/// every output that does not explicitly drop it. A raster without an
/// alpha plane is opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    luma: GrayImage,
    alpha: Option<GrayImage>,
}

impl Raster {
    /// Create an opaque raster.
    ///
    /// The plane must have at least one pixel; use [`Raster::try_new`]
    /// when that is not already known.
    #[must_use]
    pub fn new(luma: GrayImage) -> Self {
        debug_assert!(!is_empty(&luma), "raster planes must be non-empty");
        Self { luma, alpha: None }
    }

    /// Create an opaque raster, or `None` if the plane has no pixels.
    #[must_use]
    pub fn try_new(luma: GrayImage) -> Option<Self> {
        (!is_empty(&luma)).then(|| Self { luma, alpha: None })
    }

    /// Create a raster with an alpha plane.
    ///
    /// Returns `None` if the two planes differ in size or have no pixels.
    #[must_use]
    pub fn with_alpha(luma: GrayImage, alpha: GrayImage) -> Option<Self> {
        if luma.dimensions() != alpha.dimensions() || is_empty(&luma) {
            return None;
        }
        Some(Self {
            luma,
            alpha: Some(alpha),
        })
    }

    /// The intensity plane.
    #[must_use]
    pub const fn luma(&self) -> &GrayImage {
        &self.luma
    }

    /// The alpha plane, if the source carried one.
    #[must_use]
    pub const fn alpha(&self) -> Option<&GrayImage> {
        self.alpha.as_ref()
    }

    /// Whether an alpha plane is present.
    #[must_use]
    pub const fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Raster dimensions.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.luma.width(),
            height: self.luma.height(),
        }
    }

    /// Produce a new raster whose intensity plane is `f(luma)` and whose
    /// alpha plane is copied unchanged.
    ///
    /// `f` must preserve dimensions; every stage in this crate does.
    #[must_use]
    pub fn map_luma(&self, f: impl FnOnce(&GrayImage) -> GrayImage) -> Self {
        Self {
            luma: f(&self.luma),
            alpha: self.alpha.clone(),
        }
    }

    /// Consume the raster and return its planes.
    #[must_use]
    pub fn into_parts(self) -> (GrayImage, Option<GrayImage>) {
        (self.luma, self.alpha)
    }
}

fn is_empty(plane: &GrayImage) -> bool {
    plane.width() == 0 || plane.height() == 0
}

/// An axis-aligned rectangle reported by a face detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRegion {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl FaceRegion {
    /// Create a new region.
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Scale the region from one pixel grid into another.
    ///
    /// Edges are rounded outward so a scaled region never shrinks
    /// below the area it covered in the source grid.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn scaled(self, from: Dimensions, to: Dimensions) -> Self {
        let sx = f64::from(to.width) / f64::from(from.width.max(1));
        let sy = f64::from(to.height) / f64::from(from.height.max(1));
        let x0 = (f64::from(self.x) * sx).floor();
        let y0 = (f64::from(self.y) * sy).floor();
        let x1 = (f64::from(self.x.saturating_add(self.width)) * sx).ceil();
        let y1 = (f64::from(self.y.saturating_add(self.height)) * sy).ceil();
        Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0).max(0.0) as u32,
            height: (y1 - y0).max(0.0) as u32,
        }
    }

    /// Clip the region to the image bounds.
    ///
    /// Returns `None` when nothing of the region lies inside the image.
    #[must_use]
    pub fn clip_to(self, dimensions: Dimensions) -> Option<Self> {
        if self.x >= dimensions.width || self.y >= dimensions.height {
            return None;
        }
        let width = self.width.min(dimensions.width - self.x);
        let height = self.height.min(dimensions.height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self::new(self.x, self.y, width, height))
    }
}

/// Names of the four rasters produced by every pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKey {
    /// Tone-adjusted grayscale.
    Grayscale,
    /// Floyd–Steinberg halftone.
    Dither,
    /// Dodge-blend pencil sketch.
    Sketch,
    /// Thickened, inverted edge map.
    LineArt,
}

impl OutputKey {
    /// Every key, in presentation order.
    pub const ALL: [Self; 4] = [Self::Grayscale, Self::Dither, Self::Sketch, Self::LineArt];

    /// The stable lowercase name of this output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Grayscale => "grayscale",
            Self::Dither => "dither",
            Self::Sketch => "sketch",
            Self::LineArt => "line_art",
        }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| format!("unknown output '{s}'"))
    }
}

/// The four rasters produced by one pipeline run.
///
/// A new set is built on every run; nothing is carried over from a
/// previous set.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSet {
    /// Tone-adjusted grayscale.
    pub grayscale: Raster,
    /// Floyd–Steinberg halftone.
    pub dither: Raster,
    /// Dodge-blend pencil sketch.
    pub sketch: Raster,
    /// Thickened, inverted edge map.
    pub line_art: Raster,
}

impl OutputSet {
    /// Look up an output by key.
    #[must_use]
    pub const fn get(&self, key: OutputKey) -> &Raster {
        match key {
            OutputKey::Grayscale => &self.grayscale,
            OutputKey::Dither => &self.dither,
            OutputKey::Sketch => &self.sketch,
            OutputKey::LineArt => &self.line_art,
        }
    }

    /// Iterate over every output with its key, in [`OutputKey::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (OutputKey, &Raster)> {
        OutputKey::ALL.into_iter().map(|key| (key, self.get(key)))
    }

    /// Dimensions shared by all four outputs.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        self.grayscale.dimensions()
    }
}

/// Errors that can abort a pipeline run.
///
/// Parameter problems never appear here: out-of-range values are
/// clamped, and missing capabilities turn their stage into a no-op.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty, or decoded to an image with
    /// no pixels.
    #[error("input image data is empty")]
    EmptyInput,
}
