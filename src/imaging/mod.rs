//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::ImageReader::into_dimensions` |
//! | **Size probe** | `std::fs::metadata` / descriptor stat |
//! | **Sampled decode** | `jpeg-decoder` DCT scaling |
//! | **Resample → JPEG** | Lanczos3 + `image` JPEG encoder |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Probe**: Source references, size and dimension probes
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod probe;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{
    PIXEL_BUDGET, clamp_to_max, fit_pixel_budget, sample_factor, sampled_dimensions,
};
pub use operations::{
    GeneratedImage, clamp_to_max_dimensions, compress_by_factor, resize_to_pixel_budget,
};
pub use params::{DecodeMode, Quality, ResampleParams, ResampleTarget};
pub use probe::{
    LARGE_IMAGE_THRESHOLD_BYTES, SizeProbe, SourceRef, probe_dimensions, probe_file_size,
};
pub use rust_backend::RustBackend;
