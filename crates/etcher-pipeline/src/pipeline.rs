//! Staged pipeline: advance one stage at a time, inspecting each
//! intermediate before continuing.
//!
//! [`crate::process`] runs everything in one call. [`Pipeline`] lets the
//! caller drive execution step by step:
//!
//! ```rust
//! # use etcher_pipeline::{ParameterBundle, Pipeline, PipelineError};
//! # fn run(png: Vec<u8>) -> Result<(), PipelineError> {
//! let derived = Pipeline::new(png, ParameterBundle::default())
//!     .decode()?
//!     .resize()
//!     .smooth_faces(None)
//!     .tone()
//!     .derive();
//!
//! let outputs = derived.into_outputs();
//! # Ok(())
//! # }
//! ```
//!
//! Each stage method consumes `self` and returns the next state, carrying
//! forward what later stages still need. Only decoding can fail; every
//! later stage is infallible because parameters were clamped when the
//! pipeline was created.

use std::time::Instant;

use tracing::debug;

use crate::face::{self, FaceDetector};
use crate::line_art;
use crate::params::ParameterBundle;
use crate::size::SizeSpec;
use crate::types::{Dimensions, FaceRegion, OutputSet, PipelineError, Raster, RgbaImage};

/// Run `f` and log how long it took.
fn timed<T>(stage: &'static str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    debug!(stage, elapsed_ms = start.elapsed().as_secs_f64() * 1000.0, "stage finished");
    out
}

/// Entry point for the staged pipeline.
pub struct Pipeline;

impl Pipeline {
    /// Start a pipeline over encoded image bytes.
    ///
    /// The parameters are clamped here, once, so every stage sees the
    /// same in-range values.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(source: Vec<u8>, params: ParameterBundle) -> Pending {
        Pending {
            params: params.clamped(),
            source,
        }
    }
}

// ───────────────────────── Stage 0: Pending ──────────────────────────

/// Pipeline state before anything has been decoded.
#[must_use = "pipeline stages are consumed by advancing — call .decode() to continue"]
pub struct Pending {
    params: ParameterBundle,
    source: Vec<u8>,
}

impl Pending {
    /// The raw source image bytes.
    #[must_use]
    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// The clamped parameters this run will use.
    #[must_use]
    pub const fn params(&self) -> &ParameterBundle {
        &self.params
    }

    /// Decode the source image and resolve the target size.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyInput`] if the source bytes are
    /// empty. Returns [`PipelineError::ImageDecode`] if the image
    /// format is unrecognized or the data is corrupt.
    pub fn decode(self) -> Result<Decoded, PipelineError> {
        let decoded = timed("decode", || crate::grayscale::decode(&self.source))?;
        let source_dims = Dimensions {
            width: decoded.rgba.width(),
            height: decoded.rgba.height(),
        };
        let size = SizeSpec::for_image(source_dims, self.params.width_mm, self.params.dpi);
        debug!(
            width = source_dims.width,
            height = source_dims.height,
            has_alpha = decoded.has_alpha,
            target_width = size.px_width,
            target_height = size.px_height,
            "decoded source"
        );
        Ok(Decoded {
            params: self.params,
            original: decoded.rgba,
            has_alpha: decoded.has_alpha,
            size,
        })
    }
}

// ───────────────────────── Stage 1: Decoded ──────────────────────────

/// Pipeline state after decoding.
#[must_use = "pipeline stages are consumed by advancing — call .resize() to continue"]
pub struct Decoded {
    params: ParameterBundle,
    original: RgbaImage,
    has_alpha: bool,
    size: SizeSpec,
}

impl Decoded {
    /// The decoded source, expanded to RGBA.
    #[must_use]
    pub const fn original(&self) -> &RgbaImage {
        &self.original
    }

    /// Whether the source carried an alpha channel.
    #[must_use]
    pub const fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// The resolved physical and pixel size.
    #[must_use]
    pub const fn size(&self) -> &SizeSpec {
        &self.size
    }

    /// Replace the resolved size, e.g. after [`SizeSpec::apply_edit`].
    pub fn with_size(self, size: SizeSpec) -> Self {
        debug!(
            target_width = size.px_width,
            target_height = size.px_height,
            dpi = size.dpi,
            "size overridden"
        );
        Self { size, ..self }
    }

    /// Resample the source to the resolved pixel size.
    pub fn resize(self) -> Resized {
        let working = timed("resize", || {
            crate::resample::resample(
                &self.original,
                self.size.pixels(),
                self.params.resample_filter,
            )
        });
        Resized {
            params: self.params,
            original: self.original,
            has_alpha: self.has_alpha,
            size: self.size,
            working,
        }
    }
}

// ───────────────────────── Stage 2: Resized ──────────────────────────

/// Pipeline state after resampling to the target size.
#[must_use = "pipeline stages are consumed by advancing — call .smooth_faces() to continue"]
pub struct Resized {
    params: ParameterBundle,
    original: RgbaImage,
    has_alpha: bool,
    size: SizeSpec,
    working: RgbaImage,
}

impl Resized {
    /// The resampled working image.
    #[must_use]
    pub const fn working(&self) -> &RgbaImage {
        &self.working
    }

    /// Detect faces on the source and smooth them in the working image.
    ///
    /// With no detector this stage passes the working image through
    /// unchanged.
    pub fn smooth_faces(self, detector: Option<&dyn FaceDetector>) -> Smoothed {
        let working_dims = Dimensions {
            width: self.working.width(),
            height: self.working.height(),
        };
        let (faces, smoothed) = timed("smooth_faces", || {
            let faces = face::detect(detector, &self.original, working_dims);
            let smoothed = face::smooth_faces(&self.working, &faces, self.params.face_radius);
            (faces, smoothed)
        });
        Smoothed {
            params: self.params,
            has_alpha: self.has_alpha,
            size: self.size,
            faces,
            smoothed,
        }
    }
}

// ───────────────────────── Stage 3: Smoothed ─────────────────────────

/// Pipeline state after face smoothing.
#[must_use = "pipeline stages are consumed by advancing — call .tone() to continue"]
pub struct Smoothed {
    params: ParameterBundle,
    has_alpha: bool,
    size: SizeSpec,
    faces: Vec<FaceRegion>,
    smoothed: RgbaImage,
}

impl Smoothed {
    /// Face regions in working-grid coordinates.
    #[must_use]
    pub fn faces(&self) -> &[FaceRegion] {
        &self.faces
    }

    /// The working image after face smoothing.
    #[must_use]
    pub const fn smoothed(&self) -> &RgbaImage {
        &self.smoothed
    }

    /// Convert to grayscale and apply the tone controls.
    pub fn tone(self) -> Toned {
        let tone = self.params.tone();
        let (gray, toned) = timed("tone", || {
            let gray = crate::grayscale::split(&self.smoothed, self.has_alpha);
            let toned = crate::tone::apply_tone(&gray, tone);
            (gray, toned)
        });
        Toned {
            params: self.params,
            size: self.size,
            gray,
            toned,
        }
    }
}

// ───────────────────────── Stage 4: Toned ────────────────────────────

/// Pipeline state after the tone stage.
#[must_use = "pipeline stages are consumed by advancing — call .derive() to continue"]
pub struct Toned {
    params: ParameterBundle,
    size: SizeSpec,
    gray: Raster,
    toned: Raster,
}

impl Toned {
    /// The grayscale raster before tone adjustment.
    #[must_use]
    pub const fn gray(&self) -> &Raster {
        &self.gray
    }

    /// The tone-adjusted raster.
    #[must_use]
    pub const fn toned(&self) -> &Raster {
        &self.toned
    }

    /// Produce the sketch, dither and line-art outputs.
    pub fn derive(self) -> Derived {
        let p = &self.params;
        let (cleaned, sketch) = timed("sketch", || {
            crate::sketch::clean_and_sketch(&self.toned, p.background_strength, p.sketch_depth)
        });
        let dither = timed("dither", || crate::dither::dither(&self.toned, p.dither_strength));
        let line_art = timed("line_art", || {
            line_art::line_art(p.line_source.select(&self.toned, &sketch), p.beam_strength)
        });
        Derived {
            size: self.size,
            cleaned,
            outputs: OutputSet {
                grayscale: self.toned,
                dither,
                sketch,
                line_art,
            },
        }
    }
}

// ───────────────────────── Stage 5: Derived ──────────────────────────

/// Final pipeline state holding every output.
#[must_use = "call .into_outputs() to take the finished rasters"]
pub struct Derived {
    size: SizeSpec,
    cleaned: Raster,
    outputs: OutputSet,
}

impl Derived {
    /// The background-cleaned base the sketch was derived from.
    #[must_use]
    pub const fn cleaned(&self) -> &Raster {
        &self.cleaned
    }

    /// The four finished outputs.
    #[must_use]
    pub const fn outputs(&self) -> &OutputSet {
        &self.outputs
    }

    /// The resolved physical and pixel size.
    #[must_use]
    pub const fn size(&self) -> &SizeSpec {
        &self.size
    }

    /// Take the outputs.
    #[must_use]
    pub fn into_outputs(self) -> OutputSet {
        self.outputs
    }
}
