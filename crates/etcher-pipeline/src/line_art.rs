//! Line-art extraction: edge map, square dilation, inversion.
//!
//! The beam-strength value in `[0, 1]` sets the stroke thickness. Edges
//! on gray input come from Canny at fixed thresholds, so the edge set
//! does not depend on the beam and a stronger beam can only thicken
//! lines, never remove them. The result is dark lines on a light
//! background.

use std::fmt;
use std::str::FromStr;

use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::canny;
use crate::types::Raster;

/// Sketch pixels at or below this value count as edges.
pub const SKETCH_EDGE_THRESHOLD: u8 = 110;

/// Canny low threshold for gray input.
pub const CANNY_LOW: f32 = 50.0;

/// Canny high threshold for gray input.
pub const CANNY_HIGH: f32 = 150.0;

/// Which derived raster the edges are taken from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSource {
    /// Canny edges of the tone-adjusted grayscale.
    #[default]
    Gray,
    /// Dark strokes of the pencil sketch.
    Sketch,
}

impl LineSource {
    /// Pair this choice with the matching raster.
    #[must_use]
    pub const fn select<'a>(self, gray: &'a Raster, sketch: &'a Raster) -> LineArtInput<'a> {
        match self {
            Self::Gray => LineArtInput::Gray(gray),
            Self::Sketch => LineArtInput::Sketch(sketch),
        }
    }
}

impl fmt::Display for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gray => f.write_str("gray"),
            Self::Sketch => f.write_str("sketch"),
        }
    }
}

impl FromStr for LineSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gray" | "grey" | "grayscale" => Ok(Self::Gray),
            "sketch" => Ok(Self::Sketch),
            other => Err(format!("unknown line source '{other}' (expected gray or sketch)")),
        }
    }
}

/// The raster line art is extracted from, tagged with how to read it.
#[derive(Debug, Clone, Copy)]
pub enum LineArtInput<'a> {
    /// Tone-adjusted grayscale; edges come from Canny.
    Gray(&'a Raster),
    /// Sketch output; edges are its dark strokes.
    Sketch(&'a Raster),
}

fn clamp_beam(beam: f32) -> f32 {
    if beam.is_nan() { 0.0 } else { beam.clamp(0.0, 1.0) }
}

/// Side of the square dilation kernel: `max(1, floor(beam * 5))`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn kernel_side(beam: f32) -> u32 {
    ((clamp_beam(beam) * 5.0).floor() as u32).max(1)
}

/// Binary edge map of a sketch: 255 where the sketch is at or below
/// [`SKETCH_EDGE_THRESHOLD`].
#[must_use = "returns the binary edge map"]
pub fn sketch_edges(sketch: &GrayImage) -> GrayImage {
    GrayImage::from_fn(sketch.width(), sketch.height(), |x, y| {
        if sketch.get_pixel(x, y).0[0] <= SKETCH_EDGE_THRESHOLD {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Dilate a binary edge map with a `side`×`side` square.
///
/// The anchor sits at `side / 2`, so even sides extend one pixel further
/// up and left than down and right. Runs as two separable max passes.
#[must_use = "returns the dilated edge map"]
pub fn dilate_square(edges: &GrayImage, side: u32) -> GrayImage {
    if side <= 1 {
        return edges.clone();
    }
    let before = i64::from(side / 2);
    let after = i64::from(side) - 1 - before;
    let (w, h) = edges.dimensions();

    let max_in = |img: &GrayImage, x: u32, y: u32, horizontal: bool| {
        let (pos, len) = if horizontal { (x, w) } else { (y, h) };
        let lo = (i64::from(pos) - before).max(0);
        let hi = (i64::from(pos) + after).min(i64::from(len) - 1);
        (lo..=hi)
            .filter_map(|p| u32::try_from(p).ok())
            .map(|p| {
                if horizontal {
                    img.get_pixel(p, y).0[0]
                } else {
                    img.get_pixel(x, p).0[0]
                }
            })
            .max()
            .unwrap_or(0)
    };

    let rows = GrayImage::from_fn(w, h, |x, y| Luma([max_in(edges, x, y, true)]));
    GrayImage::from_fn(w, h, |x, y| Luma([max_in(&rows, x, y, false)]))
}

/// Extract line art from `input` at the given beam strength.
#[must_use = "returns the line-art raster"]
pub fn line_art(input: LineArtInput<'_>, beam: f32) -> Raster {
    let side = kernel_side(beam);
    let (raster, edges) = match input {
        LineArtInput::Gray(gray) => {
            debug!(low = CANNY_LOW, high = CANNY_HIGH, side, "line art from gray");
            (gray, canny::canny(gray.luma(), CANNY_LOW, CANNY_HIGH))
        }
        LineArtInput::Sketch(sketch) => {
            debug!(side, "line art from sketch");
            (sketch, sketch_edges(sketch.luma()))
        }
    };

    let mut thick = dilate_square(&edges, side);
    for pixel in thick.pixels_mut() {
        pixel.0[0] = !pixel.0[0];
    }
    raster.map_luma(|_| thick)
}
