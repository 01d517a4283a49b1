//! Delivery-size resolution.
//!
//! Given a selected image, its probes, and the caller's options, decide what
//! file is handed back and with which dimensions and size. The decision runs
//! in two steps:
//!
//! ```text
//! 1. Primary     unknown dims           → pass through
//!                compressed selection   → re-encode at the legacy sample factor
//!                original, ≤ budget     → pass through
//!                original, > budget     → exact resize to the pixel budget
//! 2. Clamp       max width AND height set and exceeded → shrink the delivered file
//! ```
//!
//! Every resample failure degrades to the previous step's result, so
//! [`resolve_delivery`] always produces a record. The `original_*` fields are
//! always the initial probe.

use crate::imaging::{
    DecodeMode, Dimensions, ImageBackend, PIXEL_BUDGET, Quality, SizeProbe, SourceRef,
    clamp_to_max_dimensions, compress_by_factor, probe_dimensions, probe_file_size,
    resize_to_pixel_budget, sample_factor,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A selected image plus its cheap probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub source: SourceRef,
    /// `None` when the header could not be read or reported a zero side.
    pub dimensions: Option<Dimensions>,
    pub size: SizeProbe,
}

impl SourceImage {
    /// Probe dimensions and size of `source` through `backend`.
    pub fn probe(backend: &impl ImageBackend, source: SourceRef) -> Self {
        let dimensions = probe_dimensions(backend, &source);
        let size = probe_file_size(backend, &source);
        Self {
            source,
            dimensions,
            size,
        }
    }
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionOptions {
    pub wants_original: bool,
    /// 0 = unlimited. The clamp only runs when both caps are positive.
    pub max_width: u32,
    pub max_height: u32,
}

/// Per-batch settings for the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySettings {
    pub compress_quality: Quality,
    pub original_resize_quality: Quality,
    pub clamp_quality: Quality,
    pub large_image_threshold: u64,
    /// Directory generated files are written to. Must exist.
    pub output_dir: PathBuf,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            compress_quality: Quality::new(60),
            original_resize_quality: Quality::new(95),
            clamp_quality: Quality::new(90),
            large_image_threshold: crate::imaging::LARGE_IMAGE_THRESHOLD_BYTES,
            output_dir: std::env::temp_dir().join("mediapick"),
        }
    }
}

/// Final answer for one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRecord {
    pub delivery_path: String,
    pub delivery_width: u32,
    pub delivery_height: u32,
    pub delivery_size: u64,
    pub original_path: String,
    pub original_width: u32,
    pub original_height: u32,
    pub original_size: u64,
    /// `true` only when the compress branch produced the delivered file.
    pub compressed: bool,
}

impl DeliveryRecord {
    /// `true` when the delivered file is the untouched source.
    pub fn is_pass_through(&self) -> bool {
        self.delivery_path == self.original_path
    }
}

/// The file currently slated for delivery.
#[derive(Debug, Clone)]
struct Delivered {
    path: String,
    local: Option<PathBuf>,
    dimensions: Dimensions,
    size: u64,
    /// Written by this crate, as opposed to the picked source itself.
    generated: bool,
}

impl Delivered {
    fn generated(image: crate::imaging::GeneratedImage) -> Self {
        Self {
            path: image.path.to_string_lossy().into_owned(),
            local: Some(image.path),
            dimensions: image.dimensions,
            size: image.size,
            generated: true,
        }
    }
}

/// Decide the delivered file for one image. Never fails.
pub fn resolve_delivery(
    backend: &impl ImageBackend,
    source: &SourceImage,
    options: &SelectionOptions,
    settings: &DeliverySettings,
) -> DeliveryRecord {
    let original_dims = source.dimensions.unwrap_or_default();
    let original_path = source.source.to_string();
    let original_size = source.size.reported_bytes();

    let pass_through = || Delivered {
        path: original_path.clone(),
        local: source.source.local_path().map(Path::to_path_buf),
        dimensions: original_dims,
        size: original_size,
        generated: false,
    };

    let Some(dims) = source.dimensions.filter(|d| !d.is_empty()) else {
        log::debug!("{}: dimensions unknown, passing through", source.source);
        return record(&original_path, original_dims, original_size, pass_through(), false);
    };

    let decode = if source.size.is_large(settings.large_image_threshold) {
        DecodeMode::Bounded
    } else {
        DecodeMode::Full
    };

    let (delivered, compressed) = if !options.wants_original {
        let factor = sample_factor(dims.width, dims.height);
        log::debug!(
            "{}: {}x{} compress at factor {factor} ({decode:?})",
            source.source,
            dims.width,
            dims.height
        );
        let result = backend.resolve(&source.source).and_then(|path| {
            compress_by_factor(
                backend,
                &path,
                &settings.output_dir,
                factor,
                settings.compress_quality,
                decode,
            )
        });
        match result {
            Ok(image) => (Delivered::generated(image), true),
            Err(e) => {
                log::warn!("{}: compress failed, delivering original: {e}", source.source);
                (pass_through(), false)
            }
        }
    } else if dims.pixel_count() <= PIXEL_BUDGET {
        log::debug!("{}: original within pixel budget", source.source);
        (pass_through(), false)
    } else {
        log::debug!(
            "{}: original {}x{} exceeds pixel budget",
            source.source,
            dims.width,
            dims.height
        );
        let result = backend.resolve(&source.source).and_then(|path| {
            resize_to_pixel_budget(
                backend,
                &path,
                dims,
                &settings.output_dir,
                PIXEL_BUDGET,
                settings.original_resize_quality,
                decode,
            )
        });
        match result {
            Ok(Some(image)) => (Delivered::generated(image), false),
            Ok(None) => (pass_through(), false),
            Err(e) => {
                log::warn!("{}: budget resize failed, delivering original: {e}", source.source);
                (pass_through(), false)
            }
        }
    };

    let delivered = clamp(backend, delivered, decode, options, settings);
    record(&original_path, original_dims, original_size, delivered, compressed)
}

/// `source_decode` applies when the delivered file is still the source;
/// generated files are always small enough for a full decode.
fn clamp(
    backend: &impl ImageBackend,
    delivered: Delivered,
    source_decode: DecodeMode,
    options: &SelectionOptions,
    settings: &DeliverySettings,
) -> Delivered {
    if options.max_width == 0 || options.max_height == 0 {
        return delivered;
    }
    let Some(local) = delivered.local.as_deref() else {
        log::warn!("{}: cannot clamp unresolvable source", delivered.path);
        return delivered;
    };
    let decode = if delivered.generated {
        DecodeMode::Full
    } else {
        source_decode
    };
    let result = clamp_to_max_dimensions(
        backend,
        local,
        delivered.dimensions,
        &settings.output_dir,
        options.max_width,
        options.max_height,
        settings.clamp_quality,
        decode,
    );
    match result {
        Ok(Some(image)) => {
            log::debug!(
                "{}: clamped to {}x{}",
                delivered.path,
                image.dimensions.width,
                image.dimensions.height
            );
            Delivered::generated(image)
        }
        Ok(None) => delivered,
        Err(e) => {
            log::warn!("{}: clamp failed, keeping unclamped file: {e}", delivered.path);
            delivered
        }
    }
}

fn record(
    original_path: &str,
    original_dims: Dimensions,
    original_size: u64,
    delivered: Delivered,
    compressed: bool,
) -> DeliveryRecord {
    DeliveryRecord {
        delivery_path: delivered.path,
        delivery_width: delivered.dimensions.width,
        delivery_height: delivered.dimensions.height,
        delivery_size: delivered.size,
        original_path: original_path.to_string(),
        original_width: original_dims.width,
        original_height: original_dims.height,
        original_size,
        compressed,
    }
}
