//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::ImageReader::into_dimensions` (header only) |
//! | Decode JPEG | `jpeg-decoder` with DCT scaling (`Decoder::scale`) |
//! | Decode PNG, WebP, TIFF, GIF, BMP | `image` crate, under `image::Limits` when bounded |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//!
//! JPEG sources never go through a full-resolution decode when a smaller
//! target is requested: the decoder picks the smallest IDCT scale (1/8 to 8/8)
//! that still covers the target, and only the remainder is done in software
//! on the already reduced buffer.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::sampled_dimensions;
use super::params::{DecodeMode, ResampleParams, ResampleTarget};
use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageFormat, ImageReader, Limits, RgbImage};
use jpeg_decoder::PixelFormat;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Default allocation cap for bounded decodes (256 MiB).
pub const DEFAULT_BOUNDED_MAX_ALLOC: u64 = 256 * 1024 * 1024;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend {
    bounded_max_alloc: u64,
}

impl RustBackend {
    pub fn new() -> Self {
        Self {
            bounded_max_alloc: DEFAULT_BOUNDED_MAX_ALLOC,
        }
    }

    /// Allocation cap applied to decodes in [`DecodeMode::Bounded`].
    pub fn with_bounded_max_alloc(mut self, bytes: u64) -> Self {
        self.bounded_max_alloc = bytes;
        self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn open_reader(path: &Path) -> Result<ImageReader<BufReader<File>>, BackendError> {
    Ok(ImageReader::open(path)?.with_guessed_format()?)
}

fn is_jpeg(path: &Path) -> Result<bool, BackendError> {
    Ok(open_reader(path)?.format() == Some(ImageFormat::Jpeg))
}

/// Decode a JPEG at the smallest DCT scale that still covers `request`.
fn decode_jpeg_scaled(
    path: &Path,
    request: Dimensions,
    max_alloc: Option<u64>,
) -> Result<DynamicImage, BackendError> {
    let failed =
        |e: jpeg_decoder::Error| BackendError::ProcessingFailed(format!("JPEG decode failed: {e}"));

    let file = File::open(path)?;
    let mut decoder = jpeg_decoder::Decoder::new(BufReader::new(file));
    decoder.read_info().map_err(failed)?;

    let req_w = request.width.clamp(1, u16::MAX as u32) as u16;
    let req_h = request.height.clamp(1, u16::MAX as u32) as u16;
    let (w, h) = decoder.scale(req_w, req_h).map_err(failed)?;
    let (w, h) = (w as u32, h as u32);

    if let Some(limit) = max_alloc {
        let estimated = w as u64 * h as u64 * 4;
        if estimated > limit {
            return Err(BackendError::ProcessingFailed(format!(
                "scaled decode {w}x{h} exceeds allocation cap of {limit} bytes"
            )));
        }
    }

    let pixels = decoder.decode().map_err(failed)?;
    let format = decoder
        .info()
        .map(|info| info.pixel_format)
        .ok_or_else(|| BackendError::ProcessingFailed("JPEG header missing".into()))?;

    let image = match format {
        PixelFormat::L8 => GrayImage::from_raw(w, h, pixels).map(DynamicImage::ImageLuma8),
        PixelFormat::RGB24 => RgbImage::from_raw(w, h, pixels).map(DynamicImage::ImageRgb8),
        PixelFormat::CMYK32 => {
            RgbImage::from_raw(w, h, cmyk_to_rgb(&pixels)).map(DynamicImage::ImageRgb8)
        }
        other => {
            return Err(BackendError::ProcessingFailed(format!(
                "unsupported JPEG pixel format {other:?}"
            )));
        }
    };
    image.ok_or_else(|| BackendError::ProcessingFailed("decoded buffer size mismatch".into()))
}

/// Adobe-style inverted CMYK to RGB.
fn cmyk_to_rgb(cmyk: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(cmyk.len() / 4 * 3);
    for px in cmyk.chunks_exact(4) {
        let k = px[3] as u32;
        rgb.push((px[0] as u32 * k / 255) as u8);
        rgb.push((px[1] as u32 * k / 255) as u8);
        rgb.push((px[2] as u32 * k / 255) as u8);
    }
    rgb
}

/// Decode any other format through the `image` crate.
fn decode_generic(path: &Path, max_alloc: Option<u64>) -> Result<DynamicImage, BackendError> {
    let mut reader = open_reader(path)?;
    if let Some(limit) = max_alloc {
        let mut limits = Limits::default();
        limits.max_alloc = Some(limit);
        reader.limits(limits);
    }
    reader.decode().map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
    })
}

/// Encode as baseline JPEG. Alpha is dropped.
///
/// The encoder writes a temp file next to `path`, which is renamed over
/// `path` only once complete. Readers of `path` see either the previous file
/// or the finished one, and concurrent writers of the same name each replace
/// it whole. The temp file is removed on failure.
fn save_jpeg(img: DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let rgb = DynamicImage::ImageRgb8(img.into_rgb8());
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut partial = tempfile::Builder::new()
        .prefix(".partial-")
        .suffix(".jpg")
        .tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(partial.as_file_mut());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality as u8);
        rgb.write_with_encoder(encoder).map_err(|e| {
            BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e))
        })?;
        writer.flush()?;
    }
    partial.persist(path).map_err(|e| e.error)?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = open_reader(path)?.into_dimensions().map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn resample(&self, params: &ResampleParams) -> Result<Dimensions, BackendError> {
        let source_dims = self.identify(&params.source)?;
        let target = match params.target {
            ResampleTarget::SampleFactor(n) => sampled_dimensions(source_dims, n),
            ResampleTarget::Exact { width, height } => Dimensions {
                width: width.max(1),
                height: height.max(1),
            },
        };
        let max_alloc = match params.decode {
            DecodeMode::Bounded => Some(self.bounded_max_alloc),
            DecodeMode::Full => None,
        };

        let decoded = if is_jpeg(&params.source)? {
            decode_jpeg_scaled(&params.source, target, max_alloc)?
        } else {
            decode_generic(&params.source, max_alloc)?
        };

        let resized = if decoded.width() == target.width && decoded.height() == target.height {
            decoded
        } else {
            decoded.resize_exact(target.width, target.height, FilterType::Lanczos3)
        };

        save_jpeg(resized, &params.output, params.quality.value())?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Quality;
    use crate::test_helpers::{create_corrupt_jpeg, create_test_jpeg, create_test_png};

    fn params(source: &Path, output: &Path, target: ResampleTarget) -> ResampleParams {
        ResampleParams {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            target,
            quality: Quality::new(60),
            decode: DecodeMode::Full,
        }
    }

    #[test]
    fn identify_synthetic_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.jpg");
        create_test_jpeg(&path, 200, 150);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn identify_without_extension_sniffs_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("asset-42");
        create_test_jpeg(&path, 64, 32);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions { width: 64, height: 32 });
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.jpg"));
        assert!(result.is_err());
    }

    #[test]
    fn resample_jpeg_by_sample_factor() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 400, 300);

        let backend = RustBackend::new();
        let written = backend
            .resample(&params(&source, &output, ResampleTarget::SampleFactor(2)))
            .unwrap();

        assert_eq!(written, Dimensions { width: 200, height: 150 });
        assert_eq!(backend.identify(&output).unwrap(), written);
    }

    #[test]
    fn resample_factor_beyond_dct_range() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 1200, 600);

        let backend = RustBackend::new();
        let written = backend
            .resample(&params(&source, &output, ResampleTarget::SampleFactor(12)))
            .unwrap();

        assert_eq!(written, Dimensions { width: 100, height: 50 });
        assert_eq!(backend.identify(&output).unwrap(), written);
    }

    #[test]
    fn resample_factor_one_reencodes_at_full_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 120, 80);

        let written = RustBackend::new()
            .resample(&params(&source, &output, ResampleTarget::SampleFactor(1)))
            .unwrap();
        assert_eq!(written, Dimensions { width: 120, height: 80 });
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }

    #[test]
    fn resample_exact_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 640, 480);

        let backend = RustBackend::new();
        let target = ResampleTarget::Exact { width: 333, height: 250 };
        let written = backend.resample(&params(&source, &output, target)).unwrap();

        assert_eq!(written, Dimensions { width: 333, height: 250 });
        assert_eq!(backend.identify(&output).unwrap(), written);
    }

    #[test]
    fn resample_png_source_to_jpeg() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        let output = tmp.path().join("out.jpg");
        create_test_png(&source, 300, 200);

        let backend = RustBackend::new();
        let written = backend
            .resample(&params(&source, &output, ResampleTarget::SampleFactor(2)))
            .unwrap();

        assert_eq!(written, Dimensions { width: 150, height: 100 });
        assert!(is_jpeg(&output).unwrap());
    }

    #[test]
    fn bounded_decode_respects_allocation_cap() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        let output = tmp.path().join("out.jpg");
        create_test_png(&source, 300, 200);

        let backend = RustBackend::new().with_bounded_max_alloc(1024);
        let mut p = params(&source, &output, ResampleTarget::SampleFactor(1));
        p.decode = DecodeMode::Bounded;

        assert!(backend.resample(&p).is_err());
        assert!(!output.exists());
    }

    #[test]
    fn bounded_jpeg_decode_checks_scaled_size() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 800, 800);

        // 1/8 scale = 100x100 = 40 KB of RGBA, fits in 64 KB; full size does not.
        let backend = RustBackend::new().with_bounded_max_alloc(64 * 1024);
        let mut p = params(&source, &output, ResampleTarget::SampleFactor(8));
        p.decode = DecodeMode::Bounded;
        assert_eq!(backend.resample(&p).unwrap(), Dimensions { width: 100, height: 100 });

        p.target = ResampleTarget::SampleFactor(1);
        assert!(backend.resample(&p).is_err());
    }

    #[test]
    fn resample_corrupt_source_errors() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("broken.jpg");
        let output = tmp.path().join("out.jpg");
        create_corrupt_jpeg(&source);

        let result = RustBackend::new()
            .resample(&params(&source, &output, ResampleTarget::SampleFactor(1)));
        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[test]
    fn resample_replaces_existing_output_whole() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.jpg");
        let output = tmp.path().join("out.jpg");
        create_test_jpeg(&source, 320, 240);
        std::fs::write(&output, b"stale bytes from an earlier run").unwrap();

        let backend = RustBackend::new();
        let written = backend
            .resample(&params(&source, &output, ResampleTarget::SampleFactor(2)))
            .unwrap();

        assert_eq!(backend.identify(&output).unwrap(), written);
        let leftovers: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(".partial-"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn cmyk_conversion_inverts_adobe_values() {
        assert_eq!(cmyk_to_rgb(&[255, 255, 255, 255]), vec![255, 255, 255]);
        assert_eq!(cmyk_to_rgb(&[0, 0, 0, 255]), vec![0, 0, 0]);
        assert_eq!(cmyk_to_rgb(&[255, 0, 255, 255]), vec![255, 0, 255]);
    }
}
