//! Headless picker over the local filesystem.
//!
//! Each root is either a file (selected as-is) or a directory (walked in
//! file-name order). Files are classified by extension; anything that is not
//! a known image or video extension is skipped. The request's mime filter,
//! byte cap and selection limit are applied in that order. An empty selection
//! is reported as a cancel, like a user backing out of the native picker.

use super::{MediaPicker, PickRequest, PickerError, PickerOutcome};
use crate::media::{MediaKind, PickedAsset};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("heic", "image/heic"),
    ("heif", "image/heif"),
];

const VIDEO_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("mov", "video/quicktime"),
    ("3gp", "video/3gpp"),
    ("mkv", "video/x-matroska"),
    ("webm", "video/webm"),
    ("avi", "video/x-msvideo"),
];

/// Media kind and mime type for a path, by extension (case-insensitive).
pub fn classify_extension(path: &Path) -> Option<(MediaKind, &'static str)> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let lookup = |table: &[(&str, &'static str)]| {
        table
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, mime)| *mime)
    };
    lookup(IMAGE_EXTENSIONS)
        .map(|mime| (MediaKind::Image, mime))
        .or_else(|| lookup(VIDEO_EXTENSIONS).map(|mime| (MediaKind::Video, mime)))
}

/// Android-style bucket id: the Java `String.hashCode` of the lower-cased
/// parent directory path.
fn bucket_id(dir: &Path) -> i64 {
    let lowered = dir.to_string_lossy().to_lowercase();
    let hash = lowered
        .encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(unit as i32));
    hash as i64
}

/// Picker that "selects" files given on construction.
#[derive(Debug, Clone, Default)]
pub struct FilesystemPicker {
    roots: Vec<PathBuf>,
    original: bool,
}

impl FilesystemPicker {
    pub fn new(roots: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            original: false,
        }
    }

    /// Report the selection as "originals" (the user ticked the original box).
    pub fn original(mut self, original: bool) -> Self {
        self.original = original;
        self
    }

    fn candidates(&self) -> Result<Vec<PathBuf>, PickerError> {
        let mut files = Vec::new();
        for root in &self.roots {
            if !root.exists() {
                return Err(PickerError::Failed(format!(
                    "{} does not exist",
                    root.display()
                )));
            }
            for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(|e| PickerError::Failed(e.to_string()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        }
        Ok(files)
    }
}

fn describe(path: &Path, kind: MediaKind, mime: &str, id: u64) -> Result<PickedAsset, PickerError> {
    let metadata = std::fs::metadata(path)?;
    let date_added = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0);
    let parent = path.parent().unwrap_or(Path::new(""));
    Ok(PickedAsset {
        id,
        kind,
        path: path.to_string_lossy().into_owned(),
        mime_type: mime.to_string(),
        file_name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        parent_folder_name: parent
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        bucket_id: bucket_id(parent),
        date_added,
        ..PickedAsset::default()
    })
}

impl MediaPicker for FilesystemPicker {
    fn present(&self, request: &PickRequest) -> Result<PickerOutcome, PickerError> {
        let max_size = request.effective_max_size();
        let limit = request.max_select_num as usize;
        let mut assets = Vec::new();

        for path in self.candidates()? {
            if assets.len() == limit {
                break;
            }
            let Some((kind, mime)) = classify_extension(&path) else {
                log::debug!("skipping {}: unknown media type", path.display());
                continue;
            };
            if !request.mime_type.allows(kind) {
                continue;
            }
            let size = std::fs::metadata(&path)?.len();
            if size > max_size {
                log::debug!("skipping {}: {size} bytes over limit", path.display());
                continue;
            }
            let id = assets.len() as u64 + 1;
            assets.push(describe(&path, kind, mime, id)?);
        }

        if assets.is_empty() {
            return Ok(PickerOutcome::Cancelled);
        }
        log::info!("selected {} file(s)", assets.len());
        Ok(PickerOutcome::Selected {
            assets,
            is_original: self.original,
        })
    }
}
