//! Cheap probes run before any decode: source reference parsing, file size,
//! and header-only dimensions.
//!
//! Both probes degrade instead of failing. An unknown size is treated as
//! *large* so the caller picks the memory-bounded decode path; unknown
//! dimensions make the delivery policy skip resampling entirely.

use super::backend::{Dimensions, ImageBackend};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default size above which a source is decoded under a memory cap (10 MiB).
pub const LARGE_IMAGE_THRESHOLD_BYTES: u64 = 10 * 1024 * 1024;

const CONTENT_SCHEME: &str = "content://";
const FILE_SCHEME: &str = "file://";

/// Where the bytes of a selected asset live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceRef {
    /// A plain local file.
    Local(PathBuf),
    /// An opaque platform content reference (e.g. `content://media/...`).
    Content(String),
}

impl SourceRef {
    /// Parse a picker-supplied path string. `file://` URIs become local paths.
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with(CONTENT_SCHEME) {
            SourceRef::Content(raw.to_string())
        } else if let Some(stripped) = raw.strip_prefix(FILE_SCHEME) {
            SourceRef::Local(PathBuf::from(stripped))
        } else {
            SourceRef::Local(PathBuf::from(raw))
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            SourceRef::Local(path) => Some(path),
            SourceRef::Content(_) => None,
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Local(path) => write!(f, "{}", path.display()),
            SourceRef::Content(uri) => f.write_str(uri),
        }
    }
}

impl From<&Path> for SourceRef {
    fn from(path: &Path) -> Self {
        SourceRef::Local(path.to_path_buf())
    }
}

/// Result of a file size probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeProbe {
    Known(u64),
    /// Size could not be determined; routes as larger than any threshold.
    Unknown,
}

impl SizeProbe {
    /// Byte count used for routing decisions. `Unknown` maps to `u64::MAX`,
    /// which exceeds every configurable threshold.
    pub fn routing_bytes(self) -> u64 {
        match self {
            SizeProbe::Known(bytes) => bytes,
            SizeProbe::Unknown => u64::MAX,
        }
    }

    /// `true` when the source must take the memory-bounded decode path.
    pub fn is_large(self, threshold: u64) -> bool {
        self.routing_bytes() > threshold
    }

    /// Byte count reported to callers; unknown sizes are reported as 0.
    pub fn reported_bytes(self) -> u64 {
        match self {
            SizeProbe::Known(bytes) => bytes,
            SizeProbe::Unknown => 0,
        }
    }
}

/// Byte length of a source without reading it.
///
/// Local files use filesystem metadata. Content references are opened
/// through the backend and stat'ed on the descriptor.
pub fn probe_file_size(backend: &impl ImageBackend, source: &SourceRef) -> SizeProbe {
    let len = match source {
        SourceRef::Local(path) => std::fs::metadata(path).map(|m| m.len()).ok(),
        SourceRef::Content(_) => backend
            .open_descriptor(source)
            .ok()
            .and_then(|file| file.metadata().ok())
            .map(|m| m.len()),
    };
    match len {
        Some(bytes) => SizeProbe::Known(bytes),
        None => {
            log::debug!("size probe failed for {source}, treating as large");
            SizeProbe::Unknown
        }
    }
}

/// Header-only dimension probe. `None` for unreadable, corrupt, or zero-sized
/// sources.
pub fn probe_dimensions(backend: &impl ImageBackend, source: &SourceRef) -> Option<Dimensions> {
    let probed = backend
        .resolve(source)
        .and_then(|path| backend.identify(&path));
    match probed {
        Ok(dims) if !dims.is_empty() => Some(dims),
        Ok(_) => None,
        Err(e) => {
            log::debug!("dimension probe failed for {source}: {e}");
            None
        }
    }
}
