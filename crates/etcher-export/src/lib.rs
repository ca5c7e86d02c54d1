//! etcher-export: Pure format serializers (sans-IO)
//!
//! Converts output rasters into PNG bytes with the engraving resolution
//! embedded. Writing the bytes anywhere is left to the caller.

pub mod encode;

pub use encode::{ExportError, dpi_to_ppm, is_bilevel, to_png, to_png_set};
