//! Integration test: run a synthetic portrait through the full pipeline and export every output to PNG.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::Cursor;

use etcher_pipeline::{FaceRegion, Material, OutputKey, ParameterBundle, StaticRegions};
use image::{DynamicImage, ImageEncoder, Rgba, RgbaImage};

/// A dark oval "head" on a light gradient, encoded as PNG.
///
/// With `alpha` of `None` the PNG is written as RGB, so it has no alpha
/// channel at all.
fn portrait_png(width: u32, height: u32, alpha: Option<u8>) -> Vec<u8> {
    let a = alpha.unwrap_or(255);
    let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let dx = (f64::from(x) - cx) / (f64::from(width) / 4.0);
        let dy = (f64::from(y) - cy) / (f64::from(height) / 3.0);
        if dx * dx + dy * dy < 1.0 {
            Rgba([90, 60, 40, a])
        } else {
            let v = u8::try_from(150 + (y * 100) / height).unwrap();
            Rgba([v, v, v, a])
        }
    });
    let (raw, color) = if alpha.is_some() {
        (img.into_raw(), image::ExtendedColorType::Rgba8)
    } else {
        let rgb = DynamicImage::ImageRgba8(img).to_rgb8();
        (rgb.into_raw(), image::ExtendedColorType::Rgb8)
    };
    let mut buf = Vec::new();
    image::codecs::png::PngEncoder::new(&mut buf)
        .write_image(&raw, width, height, color)
        .unwrap();
    buf
}

fn read_info(bytes: &[u8]) -> png::Info<'static> {
    let decoder = png::Decoder::new(Cursor::new(bytes.to_vec()));
    decoder.read_info().unwrap().info().clone()
}

#[test]
fn pipeline_outputs_export_with_resolution() {
    // 25.4 mm at 100 dpi is 100 px wide; the 3:2 source makes it 67 px tall.
    let params = ParameterBundle {
        width_mm: 25.4,
        dpi: 100.0,
        ..ParameterBundle::default()
    };
    let outputs = etcher_pipeline::process(&portrait_png(150, 100, None), &params, None)
        .expect("pipeline should succeed");

    let encoded = etcher_export::to_png_set(&outputs, params.dpi);
    assert_eq!(encoded.len(), OutputKey::ALL.len());

    for (key, result) in encoded {
        let bytes = result.unwrap_or_else(|e| panic!("{key} failed to encode: {e}"));
        let info = read_info(&bytes);
        assert_eq!((info.width, info.height), (100, 67), "{key}");
        let dims = info.pixel_dims.expect("pHYs chunk");
        assert_eq!(dims.xppu, 3937, "{key}");
        assert_eq!(dims.unit, png::Unit::Meter, "{key}");
        assert_eq!(info.color_type, png::ColorType::Grayscale, "{key}");
    }
}

#[test]
fn dither_output_is_one_bit() {
    let params = ParameterBundle {
        width_mm: 10.0,
        dpi: 254.0,
        ..ParameterBundle::default()
    };
    let outputs = etcher_pipeline::process(&portrait_png(80, 80, None), &params, None).unwrap();
    let bytes = etcher_export::to_png(&outputs.dither, params.dpi).unwrap();
    assert_eq!(read_info(&bytes).bit_depth, png::BitDepth::One);

    let back = image::load_from_memory(&bytes).unwrap().to_luma8();
    assert_eq!(&back, outputs.dither.luma());
}

#[test]
fn transparent_source_keeps_alpha_in_export() {
    let params = ParameterBundle {
        width_mm: 10.0,
        dpi: 254.0,
        ..ParameterBundle::default()
    };
    let outputs = etcher_pipeline::process(&portrait_png(40, 40, Some(128)), &params, None).unwrap();
    for (key, raster) in outputs.iter() {
        let bytes = etcher_export::to_png(raster, params.dpi).unwrap();
        assert_eq!(
            read_info(&bytes).color_type,
            png::ColorType::GrayscaleAlpha,
            "{key}"
        );
    }
}

#[test]
fn presets_with_face_regions_export() {
    let png = portrait_png(120, 120, None);
    let detector = StaticRegions(vec![FaceRegion::new(30, 20, 60, 80)]);
    for material in Material::ALL {
        let params = ParameterBundle {
            width_mm: 15.0,
            ..material.bundle()
        };
        let outputs = etcher_pipeline::process(&png, &params, Some(&detector)).unwrap();
        for (key, result) in etcher_export::to_png_set(&outputs, params.dpi) {
            assert!(result.is_ok(), "{material}/{key}");
        }
    }
}
