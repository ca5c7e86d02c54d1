//! Gaussian blur with kernel-size semantics.
//!
//! Wraps [`imageproc::filter::gaussian_blur_f32`], which is driven by
//! sigma. Every blur control in the pipeline is expressed as a kernel
//! size instead (sketch depth, face radius, adaptive-threshold block),
//! so this module coerces raw sizes into valid symmetric kernels and
//! derives sigma from the kernel the same way the common photo tools do
//! when sigma is left at zero.
//!
//! [`gaussian_blur_kernel`] operates on a single grayscale channel.
//! [`gaussian_blur_rgba_kernel`] blurs each R/G/B/A channel of a color
//! image independently.

use image::GrayImage;

use crate::types::RgbaImage;

/// Coerce a raw kernel size into a valid symmetric kernel size.
///
/// The result is always odd and at least 1: zero becomes 1 and even
/// sizes are bumped to the next odd integer.
#[must_use]
pub const fn odd_kernel(size: u32) -> u32 {
    if size == 0 {
        1
    } else if size % 2 == 0 {
        size.saturating_add(1) | 1
    } else {
        size
    }
}

/// Sigma implied by a kernel size when no sigma is given explicitly:
/// `0.3 * ((k - 1) / 2 - 1) + 0.8`.
///
/// Always positive for `k >= 1`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sigma_for_kernel(kernel: u32) -> f32 {
    let k = odd_kernel(kernel) as f32;
    0.3f32.mul_add((k - 1.0).mul_add(0.5, -1.0), 0.8)
}

/// Apply Gaussian blur to a grayscale image.
///
/// Higher `sigma` values produce more smoothing. Non-positive sigma values
/// (zero or negative) return the image unchanged, since `imageproc`'s
/// underlying function panics on `sigma <= 0.0`.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &GrayImage, sigma: f32) -> GrayImage {
    if sigma.is_nan() || sigma <= 0.0 {
        return image.clone();
    }

    imageproc::filter::gaussian_blur_f32(image, sigma)
}

/// Blur a grayscale image with a Gaussian of the given kernel size.
///
/// The size goes through [`odd_kernel`]; a 1×1 kernel is the identity.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur_kernel(image: &GrayImage, kernel: u32) -> GrayImage {
    let kernel = odd_kernel(kernel);
    if kernel <= 1 {
        return image.clone();
    }
    gaussian_blur(image, sigma_for_kernel(kernel))
}

/// Blur an RGBA image with a Gaussian of the given kernel size by
/// blurring each channel independently.
///
/// `imageproc::filter::gaussian_blur_f32` only accepts single-channel
/// images, so this splits the RGBA image into four grayscale images,
/// blurs each, and reassembles. Gaussian blur is linear and
/// per-channel, so the result is the same as blurring in color space.
#[must_use = "returns the blurred RGBA image"]
pub fn gaussian_blur_rgba_kernel(image: &RgbaImage, kernel: u32) -> RgbaImage {
    let kernel = odd_kernel(kernel);
    if kernel <= 1 {
        return image.clone();
    }
    let sigma = sigma_for_kernel(kernel);

    let (w, h) = (image.width(), image.height());

    let channels: [GrayImage; 4] = std::array::from_fn(|c| {
        GrayImage::from_fn(w, h, |x, y| image::Luma([image.get_pixel(x, y).0[c]]))
    });

    let blurred: [GrayImage; 4] = std::array::from_fn(|c| gaussian_blur(&channels[c], sigma));

    RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba([
            blurred[0].get_pixel(x, y).0[0],
            blurred[1].get_pixel(x, y).0[0],
            blurred[2].get_pixel(x, y).0[0],
            blurred[3].get_pixel(x, y).0[0],
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a test image with a sharp black-to-white boundary at x=5.
    fn sharp_edge_image() -> GrayImage {
        GrayImage::from_fn(10, 10, |x, _y| {
            if x < 5 {
                image::Luma([0])
            } else {
                image::Luma([255])
            }
        })
    }

    #[test]
    fn odd_kernel_is_always_odd_and_positive() {
        for raw in 0..200 {
            let k = odd_kernel(raw);
            assert!(k >= 1, "kernel for {raw} was {k}");
            assert_eq!(k % 2, 1, "kernel for {raw} was even: {k}");
            assert!(k >= raw, "kernel for {raw} shrank to {k}");
        }
    }

    #[test]
    fn odd_kernel_bumps_even_sizes() {
        assert_eq!(odd_kernel(0), 1);
        assert_eq!(odd_kernel(1), 1);
        assert_eq!(odd_kernel(4), 5);
        assert_eq!(odd_kernel(5), 5);
        assert_eq!(odd_kernel(u32::MAX - 1), u32::MAX);
    }

    #[test]
    fn sigma_for_kernel_matches_reference_values() {
        // k=3 -> 0.3 * (1 - 1) + 0.8 = 0.8
        assert!((sigma_for_kernel(3) - 0.8).abs() < 1e-6);
        // k=25 -> 0.3 * (12 - 1) + 0.8 = 4.1
        assert!((sigma_for_kernel(25) - 4.1).abs() < 1e-5);
        assert!(sigma_for_kernel(1) > 0.0);
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(img, gaussian_blur(&img, 0.0));
        assert_eq!(img, gaussian_blur(&img, -1.0));
        assert_eq!(img, gaussian_blur(&img, f32::NAN));
    }

    #[test]
    fn unit_kernel_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(img, gaussian_blur_kernel(&img, 0));
        assert_eq!(img, gaussian_blur_kernel(&img, 1));
    }

    #[test]
    fn even_kernel_blurs_like_next_odd() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur_kernel(&img, 6), gaussian_blur_kernel(&img, 7));
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = GrayImage::new(17, 31);
        let blurred = gaussian_blur_kernel(&img, 5);
        assert_eq!(blurred.dimensions(), (17, 31));
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let img = sharp_edge_image();
        let blurred = gaussian_blur_kernel(&img, 9);

        let left_of_edge = blurred.get_pixel(4, 5).0[0];
        let right_of_edge = blurred.get_pixel(5, 5).0[0];

        assert!(
            left_of_edge > 0,
            "expected blur to raise left-of-edge above 0, got {left_of_edge}",
        );
        assert!(
            right_of_edge < 255,
            "expected blur to lower right-of-edge below 255, got {right_of_edge}",
        );
    }

    // ─────── gaussian_blur_rgba_kernel tests ────────────────────────────

    #[test]
    fn rgba_unit_kernel_returns_identical_image() {
        let img = RgbaImage::from_fn(4, 4, |_, _| image::Rgba([100, 150, 200, 255]));
        assert_eq!(img, gaussian_blur_rgba_kernel(&img, 1));
    }

    #[test]
    fn rgba_uniform_unchanged_by_blur() {
        let img = RgbaImage::from_fn(10, 10, |_, _| image::Rgba([100, 150, 200, 250]));
        let blurred = gaussian_blur_rgba_kernel(&img, 5);
        let expected: [u8; 4] = [100, 150, 200, 250];
        for pixel in blurred.pixels() {
            for (c, &exp) in expected.iter().enumerate() {
                let diff = i16::from(pixel.0[c]) - i16::from(exp);
                assert!(
                    diff.abs() <= 1,
                    "channel {c}: expected ~{exp}, got {}",
                    pixel.0[c],
                );
            }
        }
    }

    #[test]
    #[allow(clippy::cast_possible_truncation)]
    fn rgba_blur_matches_per_channel_gray_blur() {
        let img = RgbaImage::from_fn(10, 10, |x, y| {
            image::Rgba([
                ((x * 25) % 256) as u8,
                ((y * 30) % 256) as u8,
                (((x + y) * 20) % 256) as u8,
                255,
            ])
        });
        let rgba_blurred = gaussian_blur_rgba_kernel(&img, 5);

        let (w, h) = (img.width(), img.height());
        for c in 0..4 {
            let chan = GrayImage::from_fn(w, h, |x, y| image::Luma([img.get_pixel(x, y).0[c]]));
            let chan_blurred = gaussian_blur_kernel(&chan, 5);
            for y in 0..h {
                for x in 0..w {
                    assert_eq!(
                        rgba_blurred.get_pixel(x, y).0[c],
                        chan_blurred.get_pixel(x, y).0[0],
                        "mismatch at ({x},{y}) channel {c}",
                    );
                }
            }
        }
    }
}
