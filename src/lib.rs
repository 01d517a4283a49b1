//! # Mediapick
//!
//! Normalizes photos and videos chosen in a media picker into uniform JSON
//! records. Images are delivered according to a small policy (compressed,
//! original, or resized to a pixel budget, then optionally clamped to a
//! bounding box); videos are described without re-encoding.
//!
//! # Pipeline
//!
//! ```text
//! 1. Present   picker      →  Vec<PickedAsset>   (user selection, or cancel)
//! 2. Deliver   per asset   →  DeliveryRecord     (pass through / compress / resize, clamp)
//! 3. Assemble  per asset   →  MediaEntity        (schema-shaped record)
//! 4. Encode    records     →  JSON array string  (one reply per call)
//! ```
//!
//! Steps 2 and 3 run in parallel across assets on the rayon pool; the output
//! array keeps selection order regardless of completion order.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | Caller entry point: one pick at a time, exactly one reply per call |
//! | [`picker`] | Picker request options, the `MediaPicker` seam, and a filesystem picker |
//! | [`process`] | Parallel batch processing of a selection into ordered records |
//! | [`delivery`] | The image delivery decision: which variant to produce, and fallbacks |
//! | [`media`] | Picked assets and the serialized `MediaEntity` record |
//! | [`imaging`] | Size/dimension probes, sampling arithmetic, JPEG resampling backends |
//! | [`naming`] | Deterministic file names for generated variants |
//! | [`config`] | `mediapick.toml` loading, validation and stock defaults |
//! | [`output`] | CLI output formatting for progress events and probes |
//!
//! # Design Decisions
//!
//! ## Fallback Instead of Failure
//!
//! A single unreadable image never fails the batch. Every processing failure
//! degrades to delivering the source unchanged, and the record reports size 0
//! when the size could not be determined. The caller always gets one record per
//! accepted asset.
//!
//! ## Bounded Decode for Large Sources
//!
//! Sources above the large-image threshold (10 MiB, or unknown size) are decoded
//! with DCT scaling and a capped allocation limit. A source that cannot be
//! sized is treated as large.
//!
//! ## Content-Addressed Output Names
//!
//! Generated JPEGs are named from a hash of the source path and the encode
//! parameters, see [`naming::variant_file_name`]. Re-picking the same image with
//! the same options replaces the previous variant instead of accumulating
//! copies. Every write goes to a temp file that is renamed into place, so a
//! reader never sees a partially written JPEG, even when one source is selected
//! twice in a batch.

pub mod config;
pub mod delivery;
pub mod imaging;
pub mod media;
pub mod naming;
pub mod output;
pub mod picker;
pub mod process;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
