//! Physical size resolver.
//!
//! Keeps millimeter dimensions, DPI and pixel dimensions consistent:
//! `px = round(mm / 25.4 * dpi)`. Each edit names the field the user
//! touched; that field is authoritative and the dependent fields are
//! recomputed from it in one pass. Nothing recomputed here is ever fed
//! back as another edit.
//!
//! With the aspect lock on, the height follows the width through the
//! loaded image's aspect ratio. With it off, the two axes are edited
//! independently.
//!
//! Every resolved size fits a pixel budget: at most [`MAX_SIDE_PX`] per
//! side and about [`MAX_PIXELS`] in total. A size over budget keeps its
//! millimeters and has its DPI lowered until it fits.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::Dimensions;

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Longest side a resolved size may have, in pixels.
pub const MAX_SIDE_PX: u32 = 30_000;

/// Pixel area a resolved size may have. Rounding each side can exceed
/// it by at most one row and one column.
pub const MAX_PIXELS: u64 = 50_000_000;

/// Pixel count for a physical length at a resolution, never below one.
#[must_use]
pub fn mm_to_px(mm: f64, dpi: f64) -> u32 {
    round_px(mm / MM_PER_INCH * dpi)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn round_px(px: f64) -> u32 {
    if px.is_finite() {
        px.round().clamp(1.0, f64::from(u32::MAX)) as u32
    } else {
        1
    }
}

/// Physical length of a pixel count at a resolution.
#[must_use]
pub fn px_to_mm(px: u32, dpi: f64) -> f64 {
    f64::from(px) / dpi * MM_PER_INCH
}

/// A fully resolved physical and pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeSpec {
    /// Physical width in millimeters.
    pub width_mm: f64,
    /// Physical height in millimeters.
    pub height_mm: f64,
    /// Resolution in dots per inch.
    pub dpi: f64,
    /// Target width in pixels.
    pub px_width: u32,
    /// Target height in pixels.
    pub px_height: u32,
    /// Width over height of the loaded image.
    pub aspect: f64,
}

/// The field an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeField {
    /// Physical width.
    WidthMm,
    /// Physical height.
    HeightMm,
    /// Resolution.
    Dpi,
    /// Pixel width.
    PixelWidth,
}

impl fmt::Display for SizeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::WidthMm => "width_mm",
            Self::HeightMm => "height_mm",
            Self::Dpi => "dpi",
            Self::PixelWidth => "px_width",
        })
    }
}

impl FromStr for SizeField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "width_mm" => Ok(Self::WidthMm),
            "height_mm" => Ok(Self::HeightMm),
            "dpi" => Ok(Self::Dpi),
            "px_width" => Ok(Self::PixelWidth),
            other => Err(format!("unknown size field '{other}'")),
        }
    }
}

/// Highest DPI at which a `width_mm` x `height_mm` area fits the pixel
/// budget.
#[allow(clippy::cast_precision_loss)]
fn budget_dpi(width_mm: f64, height_mm: f64) -> f64 {
    let (w_in, h_in) = (width_mm / MM_PER_INCH, height_mm / MM_PER_INCH);
    let by_side = f64::from(MAX_SIDE_PX) / w_in.max(h_in);
    let by_area = (MAX_PIXELS as f64 / (w_in * h_in)).sqrt();
    by_side.min(by_area)
}

/// Parse a positive, finite number. Anything else means "no value yet".
fn parse_positive(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

impl SizeSpec {
    /// Size an image of `dimensions` to `width_mm` at `dpi`, with the
    /// height following the image's aspect ratio.
    ///
    /// Non-positive or non-finite `width_mm` and `dpi` fall back to
    /// 1 mm and 1 dpi so the result is always usable.
    #[must_use]
    pub fn for_image(dimensions: Dimensions, width_mm: f64, dpi: f64) -> Self {
        let positive = |v: f64| if v.is_finite() && v > 0.0 { v } else { 1.0 };
        let aspect = positive(dimensions.aspect_ratio());
        Self {
            width_mm: positive(width_mm),
            height_mm: 0.0,
            dpi: positive(dpi),
            px_width: 1,
            px_height: 1,
            aspect,
        }
        .resolve(true)
    }

    /// Recompute the dependent fields with the width as the
    /// authoritative dimension.
    #[must_use]
    pub fn resolve(self, lock: bool) -> Self {
        let height_mm = if lock {
            self.width_mm / self.aspect
        } else {
            self.height_mm
        };
        Self {
            height_mm,
            px_width: mm_to_px(self.width_mm, self.dpi),
            px_height: mm_to_px(height_mm, self.dpi),
            ..self
        }
        .fit_budget()
    }

    /// Lower the DPI, if needed, so the pixel grid fits the budget. The
    /// millimeter dimensions are kept.
    fn fit_budget(self) -> Self {
        let dpi = budget_dpi(self.width_mm, self.height_mm);
        if dpi.is_nan() || dpi >= self.dpi {
            return self;
        }
        debug!(requested = self.dpi, dpi, "resolution lowered to fit pixel budget");
        Self {
            dpi,
            px_width: mm_to_px(self.width_mm, dpi),
            px_height: mm_to_px(self.height_mm, dpi),
            ..self
        }
    }

    /// Apply a textual edit to one field.
    ///
    /// Empty, unparsable, non-positive or non-finite input leaves the
    /// size unchanged.
    #[must_use]
    pub fn apply_edit(self, field: SizeField, raw: &str, lock: bool) -> Self {
        let Some(value) = parse_positive(raw) else {
            debug!(%field, raw, "ignoring incomplete size input");
            return self;
        };
        let next = match field {
            SizeField::WidthMm => Self {
                width_mm: value,
                ..self
            }
            .resolve(lock),
            SizeField::HeightMm => {
                let width_mm = if lock {
                    value * self.aspect
                } else {
                    self.width_mm
                };
                Self {
                    width_mm,
                    height_mm: value,
                    px_width: mm_to_px(width_mm, self.dpi),
                    px_height: mm_to_px(value, self.dpi),
                    ..self
                }
            }
            SizeField::Dpi => Self {
                dpi: value,
                px_width: mm_to_px(self.width_mm, value),
                px_height: mm_to_px(self.height_mm, value),
                ..self
            },
            SizeField::PixelWidth => {
                let px = round_px(value);
                let width_mm = px_to_mm(px, self.dpi);
                let height_mm = if lock {
                    width_mm / self.aspect
                } else {
                    self.height_mm
                };
                Self {
                    width_mm,
                    height_mm,
                    px_width: px,
                    px_height: mm_to_px(height_mm, self.dpi),
                    ..self
                }
            }
        }
        .fit_budget();
        debug!(%field, value, px_width = next.px_width, px_height = next.px_height, "size edited");
        next
    }

    /// Target pixel dimensions.
    #[must_use]
    pub const fn pixels(&self) -> Dimensions {
        Dimensions {
            width: self.px_width,
            height: self.px_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> SizeSpec {
        SizeSpec::for_image(
            Dimensions {
                width: 1000,
                height: 1000,
            },
            100.0,
            250.0,
        )
    }

    fn landscape() -> SizeSpec {
        SizeSpec::for_image(
            Dimensions {
                width: 2000,
                height: 1000,
            },
            100.0,
            250.0,
        )
    }

    #[test]
    fn hundred_mm_at_250_dpi_is_984_px() {
        assert_eq!(mm_to_px(100.0, 250.0), 984);
        assert_eq!(square().px_width, 984);
    }

    #[test]
    fn pixels_back_to_mm_round_trip() {
        let mm = px_to_mm(984, 250.0);
        assert!((mm - 100.0).abs() <= 1.0, "got {mm}");
    }

    #[test]
    fn tiny_sizes_never_reach_zero_pixels() {
        assert_eq!(mm_to_px(0.001, 10.0), 1);
    }

    #[test]
    fn height_follows_aspect() {
        let size = landscape();
        assert!((size.height_mm - 50.0).abs() < 1e-9);
        assert_eq!(size.px_height, 492);
    }

    #[test]
    fn width_edit_recomputes_height_and_pixels() {
        let size = landscape().apply_edit(SizeField::WidthMm, "200", true);
        assert!((size.width_mm - 200.0).abs() < 1e-9);
        assert!((size.height_mm - 100.0).abs() < 1e-9);
        assert_eq!(size.px_width, 1969);
        assert_eq!(size.px_height, 984);
    }

    #[test]
    fn width_edit_unlocked_keeps_height() {
        let size = landscape().apply_edit(SizeField::WidthMm, "200", false);
        assert!((size.height_mm - 50.0).abs() < 1e-9);
        assert_eq!(size.px_height, 492);
    }

    #[test]
    fn height_edit_recomputes_width() {
        let size = landscape().apply_edit(SizeField::HeightMm, "100", true);
        assert!((size.width_mm - 200.0).abs() < 1e-9);
        assert_eq!(size.px_width, 1969);
    }

    #[test]
    fn dpi_edit_touches_only_pixels() {
        let before = square();
        let size = before.apply_edit(SizeField::Dpi, "500", true);
        assert!((size.width_mm - before.width_mm).abs() < f64::EPSILON);
        assert!((size.height_mm - before.height_mm).abs() < f64::EPSILON);
        assert_eq!(size.px_width, 1969);
        assert_eq!(size.px_height, 1969);
    }

    #[test]
    fn pixel_width_edit_recomputes_mm() {
        let size = square().apply_edit(SizeField::PixelWidth, "984", true);
        assert_eq!(size.px_width, 984);
        assert!((size.width_mm - 99.9744).abs() < 1e-3);
        assert_eq!(size.px_height, 984);
    }

    fn within_budget(size: SizeSpec) {
        assert!(size.px_width <= MAX_SIDE_PX, "{size:?}");
        assert!(size.px_height <= MAX_SIDE_PX, "{size:?}");
        let area = u64::from(size.px_width) * u64::from(size.px_height);
        let slack = u64::from(size.px_width) + u64::from(size.px_height) + 1;
        assert!(area <= MAX_PIXELS + slack, "{size:?}");
    }

    #[test]
    fn extreme_aspect_fits_budget() {
        let tall = SizeSpec::for_image(
            Dimensions {
                width: 1,
                height: 10_000,
            },
            100.0,
            250.0,
        );
        within_budget(tall);
        assert_eq!(tall.px_height, MAX_SIDE_PX);
        assert!((tall.width_mm - 100.0).abs() < 1e-9);
        assert!((tall.height_mm - 1_000_000.0).abs() < 1e-6);
        assert!(tall.dpi < 250.0);
    }

    #[test]
    fn largest_size_fits_budget() {
        let huge = SizeSpec::for_image(
            Dimensions {
                width: 100,
                height: 100,
            },
            10_000.0,
            10_000.0,
        );
        within_budget(huge);
        assert_eq!(huge.px_width, mm_to_px(huge.width_mm, huge.dpi));
        assert!((huge.width_mm - 10_000.0).abs() < 1e-9);
    }

    #[test]
    fn edits_cannot_exceed_budget() {
        within_budget(square().apply_edit(SizeField::Dpi, "1000000", true));
        within_budget(square().apply_edit(SizeField::PixelWidth, "900000", true));
        within_budget(square().apply_edit(SizeField::WidthMm, "9999999", true));
        within_budget(landscape().apply_edit(SizeField::HeightMm, "5000000", false));
    }

    #[test]
    fn sizes_within_budget_keep_requested_dpi() {
        let size = square().apply_edit(SizeField::Dpi, "600", true);
        assert!((size.dpi - 600.0).abs() < f64::EPSILON);
        assert_eq!(size.px_width, 2362);
    }

    #[test]
    fn invalid_input_is_no_change() {
        let size = square();
        for raw in ["", "   ", "abc", "0", "-5", "NaN", "inf", "1e400"] {
            for field in [
                SizeField::WidthMm,
                SizeField::HeightMm,
                SizeField::Dpi,
                SizeField::PixelWidth,
            ] {
                assert_eq!(size.apply_edit(field, raw, true), size, "{field} <- {raw:?}");
            }
        }
    }

    #[test]
    fn whitespace_around_numbers_is_accepted() {
        let size = square().apply_edit(SizeField::WidthMm, " 50 ", true);
        assert_eq!(size.px_width, 492);
    }

    #[test]
    fn field_names_round_trip() {
        for field in [
            SizeField::WidthMm,
            SizeField::HeightMm,
            SizeField::Dpi,
            SizeField::PixelWidth,
        ] {
            assert_eq!(field.to_string().parse::<SizeField>(), Ok(field));
        }
    }
}
