//! The uniform media record handed back to callers.
//!
//! [`PickedAsset`] is what a picker reports for one selection; [`MediaEntity`]
//! is the fixed-schema JSON record built from it. Every schema field is always
//! present: strings default to `""`, numbers to `0`, flags to `false`, so
//! consumers never null-check.

use crate::delivery::DeliveryRecord;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Image or video. Videos are never resampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

/// One asset as reported by a picker, before any processing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickedAsset {
    pub id: u64,
    pub kind: MediaKind,
    /// Raw source reference: local path, `file://` or `content://` URI.
    pub path: String,
    pub mime_type: String,
    /// Picker-reported dimensions; only used for videos.
    pub width: u32,
    pub height: u32,
    pub duration_ms: u64,
    pub file_name: String,
    pub parent_folder_name: String,
    pub bucket_id: i64,
    /// Seconds since the epoch.
    pub date_added: i64,
    pub cut_path: String,
    pub watermark_path: String,
    pub is_cut: bool,
    pub is_camera_source: bool,
    pub is_editor_image: bool,
    pub custom_data: String,
}

/// Per-batch values copied onto every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyContext {
    /// Whether the user chose originals in the picker.
    pub is_original: bool,
    /// Mime filter of the session (0 all, 1 image, 2 video).
    pub choose_model: u8,
}

/// One entry of the JSON array returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaEntity {
    pub id: u64,
    pub original_path: String,
    pub original_size: u64,
    pub original_width: u32,
    pub original_height: u32,
    pub path: String,
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub cut_path: String,
    pub watermark_path: String,
    pub video_thumbnail_path: String,
    pub sandbox_path: String,
    /// Seconds.
    pub duration: u64,
    pub is_checked: bool,
    pub is_cut: bool,
    /// Zero-based selection order.
    pub position: u32,
    /// One-based selection number.
    pub num: u32,
    pub mime_type: String,
    pub choose_model: u8,
    pub is_camera_source: bool,
    pub compressed: bool,
    pub is_original: bool,
    pub file_name: String,
    pub parent_folder_name: String,
    pub bucket_id: i64,
    pub date_added_time: i64,
    pub custom_data: String,
    /// Selection-UI masks; always `false` for delivered assets.
    pub is_max_select_enabled_mask: bool,
    pub is_gallery_enabled_mask: bool,
    pub is_editor_image: bool,
}

/// Milliseconds to whole seconds, rounded to nearest.
pub fn duration_seconds(duration_ms: u64) -> u64 {
    duration_ms.saturating_add(500) / 1000
}

fn file_name_of(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn base_entity(asset: &PickedAsset, index: usize, ctx: &AssemblyContext) -> MediaEntity {
    MediaEntity {
        id: if asset.id == 0 {
            index as u64 + 1
        } else {
            asset.id
        },
        cut_path: asset.cut_path.clone(),
        watermark_path: asset.watermark_path.clone(),
        is_checked: true,
        is_cut: asset.is_cut,
        position: index as u32,
        num: index as u32 + 1,
        choose_model: ctx.choose_model,
        is_camera_source: asset.is_camera_source,
        is_original: ctx.is_original,
        parent_folder_name: asset.parent_folder_name.clone(),
        bucket_id: asset.bucket_id,
        date_added_time: asset.date_added,
        custom_data: asset.custom_data.clone(),
        is_editor_image: asset.is_editor_image,
        ..MediaEntity::default()
    }
}

/// Build the record for an image from its delivery decision.
///
/// `fileName` and `mimeType` describe the delivered file: generated files are
/// always JPEG.
pub fn assemble_image(
    asset: &PickedAsset,
    index: usize,
    delivery: &DeliveryRecord,
    ctx: &AssemblyContext,
) -> MediaEntity {
    let (file_name, mime_type) = if delivery.is_pass_through() {
        let name = if asset.file_name.is_empty() {
            file_name_of(&delivery.original_path)
        } else {
            asset.file_name.clone()
        };
        (name, asset.mime_type.clone())
    } else {
        (file_name_of(&delivery.delivery_path), "image/jpeg".to_string())
    };

    MediaEntity {
        original_path: delivery.original_path.clone(),
        original_size: delivery.original_size,
        original_width: delivery.original_width,
        original_height: delivery.original_height,
        path: delivery.delivery_path.clone(),
        size: delivery.delivery_size,
        width: delivery.delivery_width,
        height: delivery.delivery_height,
        sandbox_path: delivery.delivery_path.clone(),
        compressed: delivery.compressed,
        mime_type,
        file_name,
        ..base_entity(asset, index, ctx)
    }
}

/// Build the record for a video. Videos pass through untouched; only the
/// size probe and the optional thumbnail are added.
pub fn assemble_video(
    asset: &PickedAsset,
    index: usize,
    size: u64,
    thumbnail: Option<&Path>,
    ctx: &AssemblyContext,
) -> MediaEntity {
    let file_name = if asset.file_name.is_empty() {
        file_name_of(&asset.path)
    } else {
        asset.file_name.clone()
    };

    MediaEntity {
        original_path: asset.path.clone(),
        original_size: size,
        original_width: asset.width,
        original_height: asset.height,
        path: asset.path.clone(),
        size,
        width: asset.width,
        height: asset.height,
        sandbox_path: asset.path.clone(),
        video_thumbnail_path: thumbnail
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default(),
        duration: duration_seconds(asset.duration_ms),
        compressed: false,
        mime_type: asset.mime_type.clone(),
        file_name,
        ..base_entity(asset, index, ctx)
    }
}
