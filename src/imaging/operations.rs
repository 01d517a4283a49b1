//! High-level image operations.
//!
//! These functions combine calculations with backend execution. Each one
//! plans a [`ResampleParams`], runs it through the backend, and measures the
//! written file, returning a [`GeneratedImage`].

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{clamp_to_max, fit_pixel_budget};
use super::params::{DecodeMode, Quality, ResampleParams, ResampleTarget};
use crate::naming::{VariantKind, variant_file_name};
use std::path::{Path, PathBuf};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// A file written by one of the operations below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub path: PathBuf,
    pub dimensions: Dimensions,
    pub size: u64,
}

/// Plan a resample without executing it.
///
/// Useful for testing parameter generation.
pub fn plan_resample(
    kind: VariantKind,
    source: &Path,
    output_dir: &Path,
    target: ResampleTarget,
    quality: Quality,
    decode: DecodeMode,
) -> ResampleParams {
    let file_name = variant_file_name(kind, source, target, quality);
    ResampleParams {
        source: source.to_path_buf(),
        output: output_dir.join(file_name),
        target,
        quality,
        decode,
    }
}

fn execute(backend: &impl ImageBackend, params: &ResampleParams) -> Result<GeneratedImage> {
    let dimensions = backend.resample(params)?;
    let size = std::fs::metadata(&params.output)?.len();
    Ok(GeneratedImage {
        path: params.output.clone(),
        dimensions,
        size,
    })
}

/// Re-encode at `factor` for the compress branch.
pub fn compress_by_factor(
    backend: &impl ImageBackend,
    source: &Path,
    output_dir: &Path,
    factor: u32,
    quality: Quality,
    decode: DecodeMode,
) -> Result<GeneratedImage> {
    let params = plan_resample(
        VariantKind::Compressed,
        source,
        output_dir,
        ResampleTarget::SampleFactor(factor.max(1)),
        quality,
        decode,
    );
    execute(backend, &params)
}

/// Scale an original selection down to `budget` pixels.
///
/// Returns `Ok(None)` when the source already fits the budget.
pub fn resize_to_pixel_budget(
    backend: &impl ImageBackend,
    source: &Path,
    source_dims: Dimensions,
    output_dir: &Path,
    budget: u64,
    quality: Quality,
    decode: DecodeMode,
) -> Result<Option<GeneratedImage>> {
    let Some(target) = fit_pixel_budget(source_dims, budget) else {
        return Ok(None);
    };
    let params = plan_resample(
        VariantKind::OriginalResized,
        source,
        output_dir,
        ResampleTarget::Exact {
            width: target.width,
            height: target.height,
        },
        quality,
        decode,
    );
    execute(backend, &params).map(Some)
}

/// Shrink a delivered image to fit `max_width` x `max_height`.
///
/// Returns `Ok(None)` when no clamp applies (caps unset or already within).
/// `decode` must be [`DecodeMode::Bounded`] whenever `delivered` is a source
/// the size probe classified as large.
#[allow(clippy::too_many_arguments)]
pub fn clamp_to_max_dimensions(
    backend: &impl ImageBackend,
    delivered: &Path,
    delivered_dims: Dimensions,
    output_dir: &Path,
    max_width: u32,
    max_height: u32,
    quality: Quality,
    decode: DecodeMode,
) -> Result<Option<GeneratedImage>> {
    let Some(target) = clamp_to_max(delivered_dims, max_width, max_height) else {
        return Ok(None);
    };
    let params = plan_resample(
        VariantKind::MaxDimensions,
        delivered,
        output_dir,
        ResampleTarget::Exact {
            width: target.width,
            height: target.height,
        },
        quality,
        decode,
    );
    execute(backend, &params).map(Some)
}
