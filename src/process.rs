//! Batch processing of a picker selection.
//!
//! Takes the assets the user selected and turns each one into a
//! [`MediaEntity`]. Images go through the delivery policy; videos are
//! measured and optionally thumbnailed.
//!
//! ## Filtering
//!
//! Before any work, assets the picker should not have returned are dropped:
//! kinds outside the request's mime filter, and files whose probed size is
//! over the request's byte cap. Files of unknown size are kept.
//!
//! ## Parallel Processing
//!
//! One task per asset on the current [rayon](https://docs.rs/rayon) pool.
//! Results land in a slot per asset, indexed by selection order, so the
//! output order never depends on completion order. The batch returns only
//! after every task has finished, and no task can fail: per-image problems
//! already degrade to pass-through inside the delivery policy.
//!
//! ## Progress
//!
//! Callers that want live output pass an `mpsc::Sender<ProcessEvent>`;
//! [`crate::output::format_process_event`] renders the events.

use crate::delivery::{
    DeliveryRecord, DeliverySettings, SelectionOptions, SourceImage, resolve_delivery,
};
use crate::imaging::{ImageBackend, SizeProbe, SourceRef, probe_dimensions, probe_file_size};
use crate::media::{
    AssemblyContext, MediaEntity, MediaKind, PickedAsset, assemble_image, assemble_video,
};
use crate::picker::{PickRequest, ThumbnailGenerator};
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How an asset was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Source handed back untouched.
    PassedThrough,
    /// Re-encoded by the compress branch.
    Compressed,
    /// Resized to the pixel budget or the max width/height.
    Resized,
    /// Video, never resampled.
    Video,
}

impl DeliveryStatus {
    fn of(record: &DeliveryRecord) -> Self {
        if record.compressed {
            DeliveryStatus::Compressed
        } else if record.is_pass_through() {
            DeliveryStatus::PassedThrough
        } else {
            DeliveryStatus::Resized
        }
    }
}

/// Progress events emitted during a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// Work is about to start on `asset_count` assets.
    BatchStarted { asset_count: usize },
    /// An asset was dropped before processing.
    AssetSkipped { source_path: String, reason: String },
    /// One asset finished. `index` is its zero-based slot.
    AssetProcessed {
        index: usize,
        source_path: String,
        status: DeliveryStatus,
        width: u32,
        height: u32,
        size: u64,
    },
}

/// The user's selection plus the constraints it was made under.
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub assets: &'a [PickedAsset],
    pub request: &'a PickRequest,
    pub is_original: bool,
}

/// Why an asset should be dropped, if it should.
fn skip_reason(asset: &PickedAsset, size: SizeProbe, request: &PickRequest) -> Option<String> {
    if !request.mime_type.allows(asset.kind) {
        return Some(format!("{:?} not allowed by filter", asset.kind).to_lowercase());
    }
    match size {
        SizeProbe::Known(bytes) if bytes > request.effective_max_size() => Some(format!(
            "{bytes} bytes exceeds limit of {}",
            request.effective_max_size()
        )),
        _ => None,
    }
}

/// Process every asset of `selection` and return one record per kept asset,
/// in selection order.
pub fn process_selection(
    backend: &impl ImageBackend,
    thumbnails: &dyn ThumbnailGenerator,
    selection: Selection<'_>,
    settings: &DeliverySettings,
    progress: Option<Sender<ProcessEvent>>,
) -> Vec<MediaEntity> {
    let request = selection.request;

    let kept: Vec<(&PickedAsset, SizeProbe)> = selection
        .assets
        .iter()
        .filter_map(|asset| {
            let size = probe_file_size(backend, &SourceRef::parse(&asset.path));
            match skip_reason(asset, size, request) {
                Some(reason) => {
                    log::info!("skipping {}: {reason}", asset.path);
                    if let Some(tx) = &progress {
                        tx.send(ProcessEvent::AssetSkipped {
                            source_path: asset.path.clone(),
                            reason,
                        })
                        .ok();
                    }
                    None
                }
                None => Some((asset, size)),
            }
        })
        .collect();

    if let Err(e) = std::fs::create_dir_all(&settings.output_dir) {
        log::warn!(
            "cannot create output directory {}: {e}",
            settings.output_dir.display()
        );
    }

    if let Some(tx) = &progress {
        tx.send(ProcessEvent::BatchStarted {
            asset_count: kept.len(),
        })
        .ok();
    }

    let options = SelectionOptions {
        wants_original: selection.is_original,
        max_width: request.max_width,
        max_height: request.max_height,
    };
    let ctx = AssemblyContext {
        is_original: selection.is_original,
        choose_model: request.mime_type.code(),
    };

    let slots: Mutex<Vec<Option<MediaEntity>>> = Mutex::new(vec![None; kept.len()]);

    rayon::scope(|s| {
        for (index, &(asset, size)) in kept.iter().enumerate() {
            let slots = &slots;
            let options = &options;
            let ctx = &ctx;
            let tx = progress.clone();
            s.spawn(move |_| {
                let (entity, status) = process_asset(
                    backend, thumbnails, asset, index, size, options, ctx, settings,
                );
                if let Some(tx) = tx {
                    tx.send(ProcessEvent::AssetProcessed {
                        index,
                        source_path: asset.path.clone(),
                        status,
                        width: entity.width,
                        height: entity.height,
                        size: entity.size,
                    })
                    .ok();
                }
                slots.lock().unwrap_or_else(PoisonError::into_inner)[index] = Some(entity);
            });
        }
    });

    let entities: Vec<MediaEntity> = slots
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .into_iter()
        .flatten()
        .collect();

    let compressed = entities.iter().filter(|e| e.compressed).count();
    log::info!(
        "processed {} asset(s), {compressed} compressed",
        entities.len()
    );
    entities
}

#[allow(clippy::too_many_arguments)]
fn process_asset(
    backend: &impl ImageBackend,
    thumbnails: &dyn ThumbnailGenerator,
    asset: &PickedAsset,
    index: usize,
    size: SizeProbe,
    options: &SelectionOptions,
    ctx: &AssemblyContext,
    settings: &DeliverySettings,
) -> (MediaEntity, DeliveryStatus) {
    let source = SourceRef::parse(&asset.path);
    match asset.kind {
        MediaKind::Image => {
            let image = SourceImage {
                dimensions: probe_dimensions(backend, &source),
                source,
                size,
            };
            let record = resolve_delivery(backend, &image, options, settings);
            let status = DeliveryStatus::of(&record);
            (assemble_image(asset, index, &record, ctx), status)
        }
        MediaKind::Video => {
            let thumbnail = backend
                .resolve(&source)
                .ok()
                .and_then(|path| thumbnails.thumbnail(&path, &settings.output_dir));
            let entity = assemble_video(
                asset,
                index,
                size.reported_bytes(),
                thumbnail.as_deref(),
                ctx,
            );
            (entity, DeliveryStatus::Video)
        }
    }
}

/// Serialize records into the JSON array string returned to callers.
pub fn to_json_array(entities: &[MediaEntity]) -> Result<String, ProcessError> {
    Ok(serde_json::to_string(entities)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::MockBackend;
    use crate::picker::{MimeFilter, NoThumbnails};
    use crate::test_helpers::{image_asset, video_asset};
    use std::path::{Path, PathBuf};
    use std::sync::mpsc;
    use tempfile::TempDir;

    /// Writes real placeholder files so size probes succeed, and registers
    /// their dimensions with the mock.
    fn setup(tmp: &TempDir, images: &[(&str, u32, u32)]) -> (MockBackend, Vec<PickedAsset>) {
        let mut backend = MockBackend::new();
        let mut assets = Vec::new();
        for (i, (name, w, h)) in images.iter().enumerate() {
            let path = tmp.path().join(name);
            std::fs::write(&path, vec![0u8; 1000]).unwrap();
            backend = backend.with_image(path.clone(), *w, *h);
            assets.push(image_asset(&path, i as u64 + 1));
        }
        (backend, assets)
    }

    fn settings(tmp: &TempDir) -> DeliverySettings {
        DeliverySettings {
            output_dir: tmp.path().join("out"),
            ..DeliverySettings::default()
        }
    }

    struct FixedThumbnail(PathBuf);

    impl ThumbnailGenerator for FixedThumbnail {
        fn thumbnail(&self, _video: &Path, _out_dir: &Path) -> Option<PathBuf> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn records_keep_selection_order() {
        let tmp = TempDir::new().unwrap();
        let (backend, assets) = setup(
            &tmp,
            &[("a.jpg", 4000, 3000), ("b.jpg", 1000, 800), ("c.jpg", 6000, 8000)],
        );
        let request = PickRequest::default();

        let entities = process_selection(
            &backend,
            &NoThumbnails,
            Selection {
                assets: &assets,
                request: &request,
                is_original: false,
            },
            &settings(&tmp),
            None,
        );

        assert_eq!(entities.len(), 3);
        let originals: Vec<_> = entities.iter().map(|e| e.original_path.clone()).collect();
        let expected: Vec<_> = assets.iter().map(|a| a.path.clone()).collect();
        assert_eq!(originals, expected);
        assert_eq!(
            entities.iter().map(|e| e.num).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(entities.iter().all(|e| e.compressed));
        assert!(settings(&tmp).output_dir.is_dir());
    }

    #[test]
    fn failed_image_is_kept_as_pass_through() {
        let tmp = TempDir::new().unwrap();
        let (backend, assets) = setup(
            &tmp,
            &[("a.jpg", 4000, 3000), ("bad.jpg", 4000, 3000), ("c.jpg", 4000, 3000)],
        );
        let backend = backend.failing_on(tmp.path().join("bad.jpg"));
        let request = PickRequest::default();

        let entities = process_selection(
            &backend,
            &NoThumbnails,
            Selection {
                assets: &assets,
                request: &request,
                is_original: false,
            },
            &settings(&tmp),
            None,
        );

        assert_eq!(entities.len(), 3);
        assert!(entities[0].compressed);
        assert!(!entities[1].compressed);
        assert_eq!(entities[1].path, entities[1].original_path);
        assert_eq!((entities[1].width, entities[1].height), (4000, 3000));
        assert!(entities[2].compressed);
    }

    #[test]
    fn filters_by_mime_type_and_size() {
        let tmp = TempDir::new().unwrap();
        let (backend, mut assets) = setup(&tmp, &[("a.jpg", 100, 100)]);
        let clip = tmp.path().join("clip.mp4");
        std::fs::write(&clip, vec![0u8; 10]).unwrap();
        assets.push(video_asset(&clip, 2, 3_000));
        let big = tmp.path().join("big.jpg");
        std::fs::write(&big, vec![0u8; 5000]).unwrap();
        assets.push(image_asset(&big, 3));

        let request = PickRequest {
            mime_type: MimeFilter::Image,
            max_size: 2000,
            max_select_num: 9,
            ..PickRequest::default()
        };
        let (tx, rx) = mpsc::channel();

        let entities = process_selection(
            &backend,
            &NoThumbnails,
            Selection {
                assets: &assets,
                request: &request,
                is_original: true,
            },
            &settings(&tmp),
            Some(tx),
        );

        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].original_path, assets[0].path);
        assert_eq!(entities[0].choose_model, 1);

        let events: Vec<ProcessEvent> = rx.iter().collect();
        let skipped = events
            .iter()
            .filter(|e| matches!(e, ProcessEvent::AssetSkipped { .. }))
            .count();
        assert_eq!(skipped, 2);
        assert!(events.contains(&ProcessEvent::BatchStarted { asset_count: 1 }));
    }

    #[test]
    fn videos_are_measured_not_resampled() {
        let tmp = TempDir::new().unwrap();
        let clip = tmp.path().join("clip.mp4");
        std::fs::write(&clip, vec![0u8; 4321]).unwrap();
        let assets = vec![video_asset(&clip, 1, 61_500)];
        let backend = MockBackend::new();
        let request = PickRequest::default();
        let thumbs = FixedThumbnail(tmp.path().join("thumb.jpg"));

        let entities = process_selection(
            &backend,
            &thumbs,
            Selection {
                assets: &assets,
                request: &request,
                is_original: false,
            },
            &settings(&tmp),
            None,
        );

        assert_eq!(entities.len(), 1);
        let video = &entities[0];
        assert_eq!(video.size, 4321);
        assert_eq!(video.duration, 62);
        assert_eq!((video.width, video.height), (1920, 1080));
        assert!(video.video_thumbnail_path.ends_with("thumb.jpg"));
        assert!(!video.compressed);
        assert!(backend.resample_ops().is_empty());
    }

    #[test]
    fn emits_one_processed_event_per_asset() {
        let tmp = TempDir::new().unwrap();
        let (backend, assets) = setup(&tmp, &[("a.jpg", 3000, 2000), ("b.jpg", 3000, 2000)]);
        let request = PickRequest::default();
        let (tx, rx) = mpsc::channel();

        process_selection(
            &backend,
            &NoThumbnails,
            Selection {
                assets: &assets,
                request: &request,
                is_original: true,
            },
            &settings(&tmp),
            Some(tx),
        );

        let mut indices: Vec<usize> = rx
            .iter()
            .filter_map(|e| match e {
                ProcessEvent::AssetProcessed { index, status, .. } => {
                    assert_eq!(status, DeliveryStatus::PassedThrough);
                    Some(index)
                }
                _ => None,
            })
            .collect();
        indices.sort();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn empty_selection_serializes_to_empty_array() {
        assert_eq!(to_json_array(&[]).unwrap(), "[]");
    }

    #[test]
    fn json_array_uses_camel_case_keys() {
        let json = to_json_array(&[MediaEntity::default()]).unwrap();
        assert!(json.starts_with("[{"));
        assert!(json.contains("\"originalPath\":\"\""));
    }
}
