//! CLI output formatting.
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.
//!
//! # Output Format
//!
//! ## Pick progress
//!
//! ```text
//! Processing 2 assets
//!     001 IMG_0001.jpg
//!         Source: /photos/IMG_0001.jpg
//!         compressed: 2016x1512, 412907 bytes
//!     002 clip.mp4
//!         Source: /photos/clip.mp4
//!         video: 1920x1080, 9120334 bytes
//! Skipped /photos/huge.tif: 2147483648 bytes exceeds limit of 1073741824
//! ```
//!
//! ## Probe
//!
//! ```text
//! /photos/IMG_0001.jpg
//!     Dimensions: 4032x3024 (12.2 MP)
//!     Size: 3120553 bytes
//!     Sample factor: 2
//!     Pixel budget: resize to 3651x2739
//! ```
//!
//! Process lines are emitted in completion order; the index is the asset's
//! position in the selection.

use crate::imaging::{Dimensions, PIXEL_BUDGET, SizeProbe, fit_pixel_budget, sample_factor};
use crate::process::{DeliveryStatus, ProcessEvent};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:03}", pos)
}

fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn status_label(status: DeliveryStatus) -> &'static str {
    match status {
        DeliveryStatus::PassedThrough => "original",
        DeliveryStatus::Compressed => "compressed",
        DeliveryStatus::Resized => "resized",
        DeliveryStatus::Video => "video",
    }
}

// ============================================================================
// Pick progress
// ============================================================================

/// Format a single process progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted { asset_count } => {
            let noun = if *asset_count == 1 { "asset" } else { "assets" };
            vec![format!("Processing {} {}", asset_count, noun)]
        }
        ProcessEvent::AssetSkipped {
            source_path,
            reason,
        } => vec![format!("Skipped {}: {}", source_path, reason)],
        ProcessEvent::AssetProcessed {
            index,
            source_path,
            status,
            width,
            height,
            size,
        } => vec![
            format!(
                "    {} {}",
                format_index(index + 1),
                file_name(source_path)
            ),
            format!("        Source: {}", source_path),
            format!(
                "        {}: {}x{}, {} bytes",
                status_label(*status),
                width,
                height,
                size
            ),
        ],
    }
}

// ============================================================================
// Probe
// ============================================================================

/// Format what the delivery policy would see for one source.
pub fn format_probe(source: &str, dimensions: Option<Dimensions>, size: SizeProbe) -> Vec<String> {
    let mut lines = vec![source.to_string()];

    match size {
        SizeProbe::Known(bytes) => lines.push(format!("    Size: {} bytes", bytes)),
        SizeProbe::Unknown => lines.push("    Size: unknown (treated as large)".to_string()),
    }

    let Some(dims) = dimensions else {
        lines.push("    Dimensions: unknown (passed through)".to_string());
        return lines;
    };

    lines.push(format!(
        "    Dimensions: {}x{} ({:.1} MP)",
        dims.width,
        dims.height,
        dims.pixel_count() as f64 / 1_000_000.0
    ));
    lines.push(format!(
        "    Sample factor: {}",
        sample_factor(dims.width, dims.height)
    ));
    match fit_pixel_budget(dims, PIXEL_BUDGET) {
        Some(target) => lines.push(format!(
            "    Pixel budget: resize to {}x{}",
            target.width, target.height
        )),
        None => lines.push("    Pixel budget: within".to_string()),
    }
    lines
}

pub fn print_probe(source: &str, dimensions: Option<Dimensions>, size: SizeProbe) {
    for line in format_probe(source, dimensions, size) {
        println!("{}", line);
    }
}
