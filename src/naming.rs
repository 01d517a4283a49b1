//! Output file naming for generated images.
//!
//! Every generated file is named `<kind>_<hash>.jpg`. The hash is a SHA-256
//! over the source path and the resample parameters, truncated to 16 hex
//! characters:
//!
//! - `compressed_3f2a….jpg`: compress branch output
//! - `original_resized_91c0….jpg`: pixel-budget resize of an original selection
//! - `maxdim_5d7e….jpg`: max width/height clamp of a delivered image
//!
//! Re-running over the same input overwrites the same file instead of piling
//! up copies, and two variants of one source never share a name.

use crate::imaging::{Quality, ResampleTarget};
use sha2::{Digest, Sha256};
use std::path::Path;

/// What produced a generated file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantKind {
    Compressed,
    OriginalResized,
    MaxDimensions,
}

impl VariantKind {
    pub fn prefix(self) -> &'static str {
        match self {
            VariantKind::Compressed => "compressed",
            VariantKind::OriginalResized => "original_resized",
            VariantKind::MaxDimensions => "maxdim",
        }
    }
}

/// File name for a generated variant of `source`.
pub fn variant_file_name(
    kind: VariantKind,
    source: &Path,
    target: ResampleTarget,
    quality: Quality,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.prefix().as_bytes());
    hasher.update(b"\0");
    hasher.update(source.to_string_lossy().as_bytes());
    hasher.update(b"\0");
    match target {
        ResampleTarget::SampleFactor(n) => {
            hasher.update(b"f");
            hasher.update(n.to_le_bytes());
        }
        ResampleTarget::Exact { width, height } => {
            hasher.update(b"x");
            hasher.update(width.to_le_bytes());
            hasher.update(height.to_le_bytes());
        }
    }
    hasher.update(quality.value().to_le_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{}_{}.jpg", kind.prefix(), &digest[..16])
}
