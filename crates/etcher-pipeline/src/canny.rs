//! Canny edge detection.
//!
//! Gaussian smoothing, Sobel gradients, non-maximum suppression along
//! the quantized gradient direction, then hysteresis. Built from
//! `imageproc` primitives rather than `imageproc::edges::canny`, whose
//! hysteresis pass walks off the image border and panics when an edge
//! touches row or column 0
//! (<https://github.com/image-rs/imageproc/issues/705>).

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Minimum allowed Canny threshold.
///
/// A zero low threshold turns every pixel with any gradient into an
/// edge candidate and floods the map.
pub const MIN_THRESHOLD: f32 = 1.0;
const _: () = assert!(MIN_THRESHOLD > 0.0);

/// Pre-smoothing applied before the gradients are taken.
const SIGMA: f32 = 1.4;

/// Detect edges. Returns 255 for edge pixels and 0 elsewhere.
///
/// Both thresholds are floored at [`MIN_THRESHOLD`], and `low` is capped
/// at `high`.
#[must_use = "returns the binary edge map"]
pub fn canny(image: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    let high = if high_threshold.is_nan() {
        MIN_THRESHOLD
    } else {
        high_threshold.max(MIN_THRESHOLD)
    };
    let low = if low_threshold.is_nan() {
        MIN_THRESHOLD
    } else {
        low_threshold.max(MIN_THRESHOLD).min(high)
    };

    let (width, height) = image.dimensions();
    let w = width as usize;
    let h = height as usize;

    let blurred = gaussian_blur_f32(image, SIGMA);
    let gx = horizontal_sobel(&blurred);
    let gy = vertical_sobel(&blurred);
    let magnitude: Vec<f32> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(x, y)| f32::from(x.0[0]).hypot(f32::from(y.0[0])))
        .collect();

    let thinned = non_maximum_suppression(&magnitude, gx.as_raw(), gy.as_raw(), w, h);
    let edges = hysteresis(&thinned, w, h, low, high);
    GrayImage::from_raw(width, height, edges)
        .unwrap_or_else(|| GrayImage::from_pixel(width, height, Luma([0])))
}

/// Keep only pixels that are local maxima across the edge. Border
/// pixels are always suppressed.
fn non_maximum_suppression(g: &[f32], gx: &[i16], gy: &[i16], w: usize, h: usize) -> Vec<f32> {
    let mut out = vec![0.0; g.len()];
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let i = y * w + x;
            let mut angle = f32::from(gy[i]).atan2(f32::from(gx[i])).to_degrees();
            if angle < 0.0 {
                angle += 180.0;
            }
            // Neighbors on either side along the gradient direction.
            let (a, b) = if !(22.5..157.5).contains(&angle) {
                (i - 1, i + 1)
            } else if angle < 67.5 {
                (i + w + 1, i - w - 1)
            } else if angle < 112.5 {
                (i - w, i + w)
            } else {
                (i + w - 1, i - w + 1)
            };
            if g[i] >= g[a] && g[i] >= g[b] {
                out[i] = g[i];
            }
        }
    }
    out
}

/// Promote strong pixels to edges and grow them through 8-connected
/// pixels at or above `low`.
fn hysteresis(thinned: &[f32], w: usize, h: usize, low: f32, high: f32) -> Vec<u8> {
    let mut out = vec![0u8; thinned.len()];
    let mut stack = Vec::new();

    for start in 0..thinned.len() {
        if thinned[start] < high || out[start] != 0 {
            continue;
        }
        out[start] = 255;
        stack.push(start);

        while let Some(i) = stack.pop() {
            let (x, y) = (i % w, i / w);
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let (Some(nx), Some(ny)) =
                        (x.checked_add_signed(dx), y.checked_add_signed(dy))
                    else {
                        continue;
                    };
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let n = ny * w + nx;
                    if out[n] == 0 && thinned[n] >= low {
                        out[n] = 255;
                        stack.push(n);
                    }
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(width: u32, height: u32, at: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, _| if x < at { Luma([0]) } else { Luma([255]) })
    }

    fn edge_count(edges: &GrayImage) -> usize {
        edges.pixels().filter(|p| p.0[0] > 0).count()
    }

    #[test]
    fn uniform_image_has_no_edges() {
        let img = GrayImage::from_pixel(20, 20, Luma([128]));
        assert_eq!(edge_count(&canny(&img, 50.0, 150.0)), 0);
    }

    #[test]
    fn sharp_step_is_detected_near_boundary() {
        let edges = canny(&step(20, 20, 10), 50.0, 150.0);
        assert!(edge_count(&edges) > 0);
        for (x, _, p) in edges.enumerate_pixels() {
            if p.0[0] > 0 {
                assert!((8..=11).contains(&x), "edge far from boundary at x={x}");
            }
        }
    }

    #[test]
    fn output_is_binary_and_sized() {
        let edges = canny(&step(17, 31, 6), 10.0, 30.0);
        assert_eq!(edges.dimensions(), (17, 31));
        assert!(edges.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn edge_touching_the_border_does_not_panic() {
        let img = GrayImage::from_fn(10, 10, |x, _| if x == 1 { Luma([255]) } else { Luma([0]) });
        let _edges = canny(&img, 1.0, 2.0);
    }

    #[test]
    fn tiny_images_are_handled() {
        for (w, h) in [(1, 1), (2, 5), (5, 2)] {
            let edges = canny(&GrayImage::new(w, h), 10.0, 20.0);
            assert_eq!(edges.dimensions(), (w, h));
        }
    }

    #[test]
    fn zero_thresholds_are_floored() {
        let img = step(20, 20, 10);
        assert_eq!(canny(&img, 0.0, 0.0), canny(&img, MIN_THRESHOLD, MIN_THRESHOLD));
        assert_eq!(canny(&img, f32::NAN, f32::NAN), canny(&img, MIN_THRESHOLD, MIN_THRESHOLD));
    }
}
