//! Face compositor: localized smoothing inside detected face regions.
//!
//! Detection itself is an external capability behind [`FaceDetector`].
//! When no detector is available the compositor is the identity; it is
//! never a reason to fail a run.
//!
//! Each region is blurred on its own, in the order received, using only
//! pixels inside that rectangle. Overlapping regions are not merged, so
//! pixels in an overlap are smoothed once per region covering them.

use image::imageops;
use tracing::{debug, warn};

use crate::blur;
use crate::grayscale;
use crate::types::{Dimensions, FaceRegion, GrayImage, RgbaImage};

/// A source of face rectangles.
///
/// Implementations receive the grayscale source image and return
/// rectangles in its pixel coordinates.
pub trait FaceDetector {
    /// Detect faces in a grayscale image.
    fn detect_faces(&self, gray: &GrayImage) -> Vec<FaceRegion>;
}

/// A detector that reports a fixed list of regions regardless of the
/// image content. Useful when faces were located by another tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRegions(pub Vec<FaceRegion>);

impl FaceDetector for StaticRegions {
    fn detect_faces(&self, _gray: &GrayImage) -> Vec<FaceRegion> {
        self.0.clone()
    }
}

/// Run `detector` on the grayscale of `source` and map the regions into
/// the working grid.
///
/// Returns an empty list when no detector is available.
#[must_use]
pub fn detect(
    detector: Option<&dyn FaceDetector>,
    source: &RgbaImage,
    working: Dimensions,
) -> Vec<FaceRegion> {
    let Some(detector) = detector else {
        debug!("no face detector available, skipping face smoothing");
        return Vec::new();
    };
    let from = Dimensions {
        width: source.width(),
        height: source.height(),
    };
    let regions = detector.detect_faces(&grayscale::to_luma(source));
    debug!(count = regions.len(), "faces detected");
    regions
        .into_iter()
        .map(|region| region.scaled(from, working))
        .collect()
}

/// Smooth every region of `image` with a Gaussian of kernel size
/// `radius` (coerced to an odd integer ≥ 1).
///
/// Returns a byte-identical copy when `regions` is empty or the kernel
/// resolves to 1. Regions are clipped to the image; regions that lie
/// entirely outside it are skipped.
#[must_use = "returns the composited image"]
pub fn smooth_faces(image: &RgbaImage, regions: &[FaceRegion], radius: u32) -> RgbaImage {
    let kernel = blur::odd_kernel(radius);
    if regions.is_empty() || kernel <= 1 {
        return image.clone();
    }

    let bounds = Dimensions {
        width: image.width(),
        height: image.height(),
    };
    let mut out = image.clone();
    for region in regions {
        let Some(r) = region.clip_to(bounds) else {
            warn!(?region, "face region lies outside the image, skipping");
            continue;
        };
        let roi = imageops::crop_imm(&out, r.x, r.y, r.width, r.height).to_image();
        let smoothed = blur::gaussian_blur_rgba_kernel(&roi, kernel);
        imageops::replace(&mut out, &smoothed, i64::from(r.x), i64::from(r.y));
    }
    debug!(regions = regions.len(), kernel, "face regions smoothed");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Checkerboard so any blur is visible.
    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        })
    }

    #[test]
    fn zero_regions_is_identity() {
        let img = checker(16, 16);
        let out = smooth_faces(&img, &[], 9);
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn unit_kernel_is_identity() {
        let img = checker(16, 16);
        let regions = [FaceRegion::new(0, 0, 16, 16)];
        assert_eq!(smooth_faces(&img, &regions, 0), img);
        assert_eq!(smooth_faces(&img, &regions, 1), img);
    }

    #[test]
    fn smoothing_is_confined_to_region() {
        let img = checker(20, 20);
        let region = FaceRegion::new(5, 5, 6, 6);
        let out = smooth_faces(&img, &[region], 5);

        for y in 0..20 {
            for x in 0..20 {
                let inside = (5..11).contains(&x) && (5..11).contains(&y);
                if !inside {
                    assert_eq!(out.get_pixel(x, y), img.get_pixel(x, y), "changed at ({x},{y})");
                }
            }
        }
        // Inside, the checkerboard should have been pulled toward gray.
        let center = out.get_pixel(8, 8).0[0];
        assert!(
            center > 0 && center < 255,
            "expected smoothed value, got {center}"
        );
    }

    #[test]
    fn even_radius_matches_next_odd() {
        let img = checker(12, 12);
        let regions = [FaceRegion::new(2, 2, 8, 8)];
        assert_eq!(
            smooth_faces(&img, &regions, 4),
            smooth_faces(&img, &regions, 5)
        );
    }

    #[test]
    fn overlapping_regions_smooth_twice() {
        let img = checker(20, 20);
        let a = FaceRegion::new(2, 2, 10, 10);
        let once = smooth_faces(&img, &[a], 5);
        let twice = smooth_faces(&once, &[a], 5);
        assert_eq!(smooth_faces(&img, &[a, a], 5), twice);
    }

    #[test]
    fn region_outside_image_is_skipped() {
        let img = checker(8, 8);
        let out = smooth_faces(&img, &[FaceRegion::new(50, 50, 4, 4)], 5);
        assert_eq!(out, img);
    }

    #[test]
    fn alpha_survives_inside_region() {
        let img = RgbaImage::from_pixel(10, 10, image::Rgba([40, 80, 120, 200]));
        let out = smooth_faces(&img, &[FaceRegion::new(0, 0, 10, 10)], 7);
        for pixel in out.pixels() {
            assert!((i16::from(pixel.0[3]) - 200).abs() <= 1);
        }
    }

    #[test]
    fn missing_detector_yields_no_regions() {
        let source = RgbaImage::new(10, 10);
        let working = Dimensions {
            width: 5,
            height: 5,
        };
        assert!(detect(None, &source, working).is_empty());
    }

    #[test]
    fn static_regions_are_scaled_into_working_grid() {
        let source = RgbaImage::new(100, 100);
        let detector = StaticRegions(vec![FaceRegion::new(20, 40, 10, 10)]);
        let working = Dimensions {
            width: 50,
            height: 50,
        };
        let regions = detect(Some(&detector), &source, working);
        assert_eq!(regions, vec![FaceRegion::new(10, 20, 5, 5)]);
    }
}
