//! Pure calculation functions for delivery dimensions.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! Two resampling strategies live side by side and are intentionally kept
//! independent:
//!
//! - [`sample_factor`] reproduces the legacy compressor's bucket policy used
//!   for non-original (compressed) selections.
//! - [`fit_pixel_budget`] scales oversized original selections down to
//!   [`PIXEL_BUDGET`] total pixels.
//!
//! [`clamp_to_max`] implements the caller's optional max width/height cap,
//! applied after either strategy.

use super::backend::Dimensions;

/// Pixel ceiling applied to original selections only.
pub const PIXEL_BUDGET: u64 = 10_000_000;

// Legacy bucket boundaries. These are compatibility constants shared with
// previously shipped clients, not tunables.
const SMALL_LONG_SIDE: u32 = 1664;
const MEDIUM_LONG_SIDE: u32 = 4990;
const LARGE_LONG_SIDE: u32 = 10240;
const BASE_LONG_SIDE: u32 = 1280;
const SQUARE_ISH_ASPECT: f64 = 0.5625;
const WIDE_ASPECT: f64 = 0.5;

/// Integer downsampling factor for the compress branch.
///
/// Mirrors the legacy compressor's bucketing exactly, including its branch
/// order and the open interval around `4990` (a long side of exactly 4990
/// in the square-ish bucket falls through to `long / 1280`).
///
/// # Examples
/// ```
/// # use mediapick::imaging::sample_factor;
/// assert_eq!(sample_factor(1200, 1600), 1);
/// assert_eq!(sample_factor(2000, 3000), 2);
/// assert_eq!(sample_factor(6000, 8000), 4);
/// assert_eq!(sample_factor(12000, 16000), 12);
/// ```
pub fn sample_factor(src_width: u32, src_height: u32) -> u32 {
    let w = round_up_to_even(src_width);
    let h = round_up_to_even(src_height);
    let long_side = w.max(h);
    let short_side = w.min(h);
    if long_side == 0 {
        return 1;
    }
    let aspect = short_side as f64 / long_side as f64;

    let factor = if aspect <= 1.0 && aspect > SQUARE_ISH_ASPECT {
        if long_side < SMALL_LONG_SIDE {
            1
        } else if long_side < MEDIUM_LONG_SIDE {
            2
        } else if long_side > MEDIUM_LONG_SIDE && long_side < LARGE_LONG_SIDE {
            4
        } else {
            long_side / BASE_LONG_SIDE
        }
    } else if aspect <= SQUARE_ISH_ASPECT && aspect > WIDE_ASPECT {
        (long_side / BASE_LONG_SIDE).max(1)
    } else {
        (long_side as f64 / (BASE_LONG_SIDE as f64 / aspect)).ceil() as u32
    };

    factor.max(1)
}

fn round_up_to_even(value: u32) -> u32 {
    if value % 2 == 1 {
        value.saturating_add(1)
    } else {
        value
    }
}

/// Dimensions after dividing by an integer sample factor (never below 1x1).
pub fn sampled_dimensions(source: Dimensions, factor: u32) -> Dimensions {
    let factor = factor.max(1);
    Dimensions {
        width: (source.width / factor).max(1),
        height: (source.height / factor).max(1),
    }
}

/// Target dimensions that fit `budget` total pixels.
///
/// Returns `None` when the source already fits. Rounding may overshoot the
/// budget by a fraction of a row or column; callers accept that.
pub fn fit_pixel_budget(source: Dimensions, budget: u64) -> Option<Dimensions> {
    let pixels = source.pixel_count();
    if pixels == 0 || pixels <= budget {
        return None;
    }
    let scale = (budget as f64 / pixels as f64).sqrt();
    Some(scale_dimensions(source, scale))
}

/// Target dimensions for the caller's max width/height cap.
///
/// Only active when both caps are positive, and only when the image exceeds
/// at least one of them. Never enlarges.
pub fn clamp_to_max(source: Dimensions, max_width: u32, max_height: u32) -> Option<Dimensions> {
    if max_width == 0 || max_height == 0 || source.width == 0 || source.height == 0 {
        return None;
    }
    if source.width <= max_width && source.height <= max_height {
        return None;
    }
    let scale = (max_width as f64 / source.width as f64)
        .min(max_height as f64 / source.height as f64)
        .min(1.0);
    Some(scale_dimensions(source, scale))
}

fn scale_dimensions(source: Dimensions, scale: f64) -> Dimensions {
    Dimensions {
        width: ((source.width as f64 * scale).round() as u32).max(1),
        height: ((source.height as f64 * scale).round() as u32).max(1),
    }
}
