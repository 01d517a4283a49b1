//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait is the codec boundary: every backend must be able
//! to identify an image (header-only dimension probe) and resample it into a
//! JPEG. Source references are resolved through the backend as well, so a
//! platform backend can map opaque content references onto readable files.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, everything
//! statically linked.

use super::params::ResampleParams;
use super::probe::SourceRef;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Cannot resolve source reference: {0}")]
    Unresolvable(String),
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count, widened so 8000x6000-class sensors never overflow.
    pub fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// `true` when either side is zero (probe returned nothing usable).
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Trait for image processing backends.
///
/// `Sync` is required because the batch processor shares one backend across
/// rayon workers.
pub trait ImageBackend: Sync {
    /// Read image dimensions from the header without decoding pixel data.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode, resample and encode as JPEG. Returns the dimensions actually written.
    fn resample(&self, params: &ResampleParams) -> Result<Dimensions, BackendError>;

    /// Map a source reference to a readable local path.
    ///
    /// The default handles local files and `file://` URIs; platform content
    /// references are unresolvable unless a backend overrides this.
    fn resolve(&self, source: &SourceRef) -> Result<PathBuf, BackendError> {
        match source {
            SourceRef::Local(path) => Ok(path.clone()),
            SourceRef::Content(uri) => Err(BackendError::Unresolvable(uri.clone())),
        }
    }

    /// Open a descriptor on the source, for stat-style probes that must not
    /// read the stream.
    fn open_descriptor(&self, source: &SourceRef) -> Result<File, BackendError> {
        let path = self.resolve(source)?;
        Ok(File::open(path)?)
    }
}
