//! Picker capability.
//!
//! The picker UI itself is platform code. Everything here talks to it through
//! [`MediaPicker`]: present the constraints, get back the selected assets plus
//! the user's original/compressed choice, or a cancellation. Implementations
//! are swapped per platform; [`FilesystemPicker`] is the headless one used by
//! the CLI and the integration tests.

mod filesystem;
mod request;

pub use filesystem::{FilesystemPicker, classify_extension};
pub use request::{DEFAULT_GRID_COUNT, Language, MAX_SIZE_UNLIMITED, MimeFilter, PickRequest};

use crate::media::PickedAsset;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PickerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Picker unavailable: {0}")]
    Unavailable(String),
    #[error("Picker failed: {0}")]
    Failed(String),
}

/// What the user did with the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerOutcome {
    Selected {
        /// In selection order.
        assets: Vec<PickedAsset>,
        is_original: bool,
    },
    Cancelled,
}

/// A native (or headless) media picker.
pub trait MediaPicker: Send + Sync {
    /// Show the picker and block until the user finishes or cancels.
    fn present(&self, request: &PickRequest) -> Result<PickerOutcome, PickerError>;
}

/// Extracts a still frame from a video.
pub trait ThumbnailGenerator: Send + Sync {
    /// Write a JPEG thumbnail of `video` into `out_dir`. `None` on failure.
    fn thumbnail(&self, video: &Path, out_dir: &Path) -> Option<PathBuf>;
}

/// Thumbnail generator that never produces anything. Records get an empty
/// `videoThumbnailPath`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoThumbnails;

impl ThumbnailGenerator for NoThumbnails {
    fn thumbnail(&self, _video: &Path, _out_dir: &Path) -> Option<PathBuf> {
        None
    }
}
