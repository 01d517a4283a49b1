//! Shared test utilities for the mediapick test suite.
//!
//! Provides synthetic image writers and small asset builders so unit tests
//! can exercise the real codec without checked-in fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let path = tmp.path().join("photo.jpg");
//! create_test_jpeg(&path, 640, 480);
//!
//! let asset = image_asset(&path, 1);
//! assert_eq!(asset.mime_type, "image/jpeg");
//! ```

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, Rgb, RgbImage};

use crate::media::{MediaKind, PickedAsset};

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// Write a baseline JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = JpegEncoder::new_with_quality(std::io::BufWriter::new(file), 85);
    encoder.encode_image(&img).unwrap();
}

/// Write a PNG of the given size.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, ImageFormat::Png)
        .unwrap();
}

/// Write bytes that claim to be a JPEG but cannot be decoded.
pub fn create_corrupt_jpeg(path: &Path) {
    std::fs::write(path, [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', 0x00]).unwrap();
}

// =========================================================================
// Asset builders
// =========================================================================

/// An image asset as a picker would report it.
pub fn image_asset(path: &Path, id: u64) -> PickedAsset {
    PickedAsset {
        id,
        kind: MediaKind::Image,
        path: path.to_string_lossy().into_owned(),
        mime_type: "image/jpeg".to_string(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        ..PickedAsset::default()
    }
}

/// A video asset with a known duration.
pub fn video_asset(path: &Path, id: u64, duration_ms: u64) -> PickedAsset {
    PickedAsset {
        id,
        kind: MediaKind::Video,
        path: path.to_string_lossy().into_owned(),
        mime_type: "video/mp4".to_string(),
        duration_ms,
        width: 1920,
        height: 1080,
        ..PickedAsset::default()
    }
}
