//! Summary statistics of a raster.

use serde::{Deserialize, Serialize};

use crate::types::Raster;

/// Size, intensity range and distribution of a raster's luma plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageStats {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// 1 for opaque rasters, 2 when an alpha plane is carried.
    pub channels: u8,
    /// Darkest luma value.
    pub min: u8,
    /// Brightest luma value.
    pub max: u8,
    /// Mean luma.
    pub mean: f64,
    /// Population standard deviation of luma.
    pub std_dev: f64,
    /// Resolution the raster will be exported at.
    pub dpi: f64,
}

impl ImageStats {
    /// Compute statistics for `raster`, recorded against `dpi`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn of(raster: &Raster, dpi: f64) -> Self {
        let dims = raster.dimensions();
        let luma = raster.luma();

        let mut histogram = [0u64; 256];
        for pixel in luma.pixels() {
            histogram[usize::from(pixel.0[0])] += 1;
        }
        let count = dims.pixel_count();
        let levels = (0u8..=u8::MAX).zip(histogram);

        let min = levels.clone().find(|&(_, n)| n > 0).map_or(0, |(v, _)| v);
        let max = levels.clone().rev().find(|&(_, n)| n > 0).map_or(0, |(v, _)| v);

        let (mean, std_dev) = if count == 0 {
            (0.0, 0.0)
        } else {
            let n = count as f64;
            let sum: f64 = levels
                .clone()
                .map(|(v, c)| f64::from(v) * c as f64)
                .sum();
            let mean = sum / n;
            let var: f64 = levels
                .map(|(v, c)| {
                    let d = f64::from(v) - mean;
                    d * d * c as f64
                })
                .sum::<f64>()
                / n;
            (mean, var.sqrt())
        };

        Self {
            width: dims.width,
            height: dims.height,
            channels: if raster.has_alpha() { 2 } else { 1 },
            min,
            max,
            mean,
            std_dev,
            dpi,
        }
    }
}
