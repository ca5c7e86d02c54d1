//! Resampling to the resolved target size.
//!
//! The working image is resized to exactly the pixel dimensions the size
//! resolver produced, so one output pixel corresponds to one dot at the
//! requested DPI. Resizing happens on the RGBA source, before the
//! grayscale split, so the alpha plane is resampled with the same filter.

use std::fmt;
use std::str::FromStr;

use image::imageops;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Dimensions, RgbaImage};

/// Resampling filter.
///
/// Ordered from fastest/lowest-quality to slowest/highest-quality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResampleFilter {
    /// Nearest-neighbor: fastest, blocky artifacts.
    Nearest,
    /// Bilinear interpolation: fast, decent quality.
    Triangle,
    /// Bicubic (Catmull-Rom): moderate speed, good quality.
    CatmullRom,
    /// Gaussian: moderate speed, smooth output.
    Gaussian,
    /// Lanczos with 3 lobes: slowest, sharpest/best for photos.
    #[default]
    Lanczos3,
}

impl ResampleFilter {
    /// Every filter, fastest first.
    pub const ALL: [Self; 5] = [
        Self::Nearest,
        Self::Triangle,
        Self::CatmullRom,
        Self::Gaussian,
        Self::Lanczos3,
    ];

    /// Convert to the `image` crate's `FilterType`.
    const fn to_image_filter(self) -> imageops::FilterType {
        match self {
            Self::Nearest => imageops::FilterType::Nearest,
            Self::Triangle => imageops::FilterType::Triangle,
            Self::CatmullRom => imageops::FilterType::CatmullRom,
            Self::Gaussian => imageops::FilterType::Gaussian,
            Self::Lanczos3 => imageops::FilterType::Lanczos3,
        }
    }
}

impl fmt::Display for ResampleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("Nearest"),
            Self::Triangle => f.write_str("Triangle"),
            Self::CatmullRom => f.write_str("CatmullRom"),
            Self::Gaussian => f.write_str("Gaussian"),
            Self::Lanczos3 => f.write_str("Lanczos3"),
        }
    }
}

impl FromStr for ResampleFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s.chars().filter(|c| !matches!(c, '-' | '_')).collect();
        Self::ALL
            .into_iter()
            .find(|f| f.to_string().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown resample filter '{s}'"))
    }
}

/// Resize `image` to exactly `target`, ignoring its aspect ratio.
///
/// Returns the image unchanged when it is already at the target size.
#[must_use = "returns the resampled image"]
pub fn resample(image: &RgbaImage, target: Dimensions, filter: ResampleFilter) -> RgbaImage {
    let target = Dimensions {
        width: target.width.max(1),
        height: target.height.max(1),
    };
    if image.dimensions() == (target.width, target.height) {
        return image.clone();
    }
    debug!(
        from_width = image.width(),
        from_height = image.height(),
        to_width = target.width,
        to_height = target.height,
        %filter,
        "resampling"
    );
    imageops::resize(image, target.width, target.height, filter.to_image_filter())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gray_image(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba([128, 128, 128, 255]))
    }

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn default_filter_is_lanczos3() {
        assert_eq!(ResampleFilter::default(), ResampleFilter::Lanczos3);
    }

    #[test]
    fn same_size_is_unchanged() {
        let img = gray_image(40, 30);
        assert_eq!(resample(&img, dims(40, 30), ResampleFilter::Lanczos3), img);
    }

    #[test]
    fn resizes_to_exact_target_ignoring_aspect() {
        let img = gray_image(100, 50);
        let out = resample(&img, dims(30, 60), ResampleFilter::Triangle);
        assert_eq!(out.dimensions(), (30, 60));
    }

    #[test]
    fn upsamples_too() {
        let out = resample(&gray_image(10, 10), dims(25, 25), ResampleFilter::Nearest);
        assert_eq!(out.dimensions(), (25, 25));
    }

    #[test]
    fn zero_target_is_bumped_to_one() {
        let out = resample(&gray_image(10, 10), dims(0, 0), ResampleFilter::Nearest);
        assert_eq!(out.dimensions(), (1, 1));
    }

    #[test]
    fn all_filters_produce_target_size() {
        let img = gray_image(64, 48);
        for filter in ResampleFilter::ALL {
            let out = resample(&img, dims(20, 15), filter);
            assert_eq!(out.dimensions(), (20, 15), "filter {filter}");
        }
    }

    #[test]
    fn filter_names_parse_case_insensitively() {
        assert_eq!("lanczos3".parse::<ResampleFilter>(), Ok(ResampleFilter::Lanczos3));
        assert_eq!("Nearest".parse::<ResampleFilter>(), Ok(ResampleFilter::Nearest));
        assert_eq!("catmull-rom".parse::<ResampleFilter>(), Ok(ResampleFilter::CatmullRom));
        assert!("bogus".parse::<ResampleFilter>().is_err());
    }

    #[test]
    fn serde_round_trip() {
        for filter in ResampleFilter::ALL {
            let json = serde_json::to_string(&filter).unwrap();
            let back: Result<ResampleFilter, _> = serde_json::from_str(&json);
            assert_eq!(back.ok(), Some(filter));
        }
    }
}
