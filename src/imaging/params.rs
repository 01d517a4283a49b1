//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the delivery policy (which decides whether an image is
//! compressed, resized or passed through) and the [`backend`](super::backend)
//! (which does the actual pixel work). Keeping them apart lets tests run the
//! whole policy against a recording mock.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100). Clamped on construction.
//! - [`ResampleTarget`]: integer sample factor or exact output dimensions.
//! - [`DecodeMode`]: whether the decoder must run under a memory cap.
//! - [`ResampleParams`]: everything one resample needs.

use std::path::PathBuf;

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// How far to shrink the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResampleTarget {
    /// Divide both dimensions by this integer (`1` = full resolution re-encode).
    SampleFactor(u32),
    /// Resize to exactly these dimensions.
    Exact { width: u32, height: u32 },
}

/// Memory policy for the decode step.
///
/// `Bounded` is selected for sources above the large-image threshold,
/// including sources whose size could not be probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    #[default]
    Full,
    Bounded,
}

/// Parameters for a single decode → resample → JPEG encode operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampleParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub target: ResampleTarget,
    pub quality: Quality,
    pub decode: DecodeMode,
}
