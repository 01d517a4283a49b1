//! Pick sessions: the caller-facing entry point.
//!
//! A [`PickSession`] presents the picker, processes the selection and answers
//! the caller with a JSON array string, off the caller's thread. Every call
//! ends in exactly one reply:
//!
//! ```text
//! no picker attached         → Err(NO_ACTIVITY)
//! another pick in flight     → Err(PICK_IN_PROGRESS)   (the first pick is untouched)
//! picker failed to present   → Err(PICK_ERROR)
//! user cancelled             → Ok("[]")
//! selection processed        → Ok("[{…}, …]")
//! serialization failed       → Err(RESULT_ERROR)
//! ```
//!
//! The pending reply is a [`Responder`]: sending consumes it, and dropping it
//! unsent replies `RESULT_ERROR`, so no path can answer twice or not at all.

use crate::delivery::DeliverySettings;
use crate::imaging::ImageBackend;
use crate::picker::{MediaPicker, NoThumbnails, PickRequest, PickerOutcome, ThumbnailGenerator};
use crate::process::{ProcessEvent, Selection, process_selection, to_json_array};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use thiserror::Error;

/// Caller-visible failure of a pick call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PickError {
    #[error("No host is available to present the picker")]
    NoHost,
    #[error("Failed to open media picker: {0}")]
    PickFailed(String),
    #[error("Failed to process result: {0}")]
    ResultFailed(String),
    #[error("Another pick call is in progress")]
    InProgress,
}

impl PickError {
    /// Short machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            PickError::NoHost => "NO_ACTIVITY",
            PickError::PickFailed(_) => "PICK_ERROR",
            PickError::ResultFailed(_) => "RESULT_ERROR",
            PickError::InProgress => "PICK_IN_PROGRESS",
        }
    }
}

/// What every pick call eventually receives.
pub type PickResult = Result<String, PickError>;

type ReplyFn = Box<dyn FnOnce(PickResult) + Send>;

/// Marks a pick as in flight until dropped.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The pending reply of one pick call. Answer it with [`Responder::send`].
pub struct Responder {
    reply: Option<ReplyFn>,
    in_flight: Option<InFlight>,
}

impl Responder {
    fn new(reply: ReplyFn, in_flight: InFlight) -> Self {
        Self {
            reply: Some(reply),
            in_flight: Some(in_flight),
        }
    }

    /// Deliver the result. The in-flight slot is released first, so the
    /// reply handler may start the next pick.
    pub fn send(mut self, result: PickResult) {
        self.fulfil(result);
    }

    fn fulfil(&mut self, result: PickResult) {
        if let Some(reply) = self.reply.take() {
            self.in_flight.take();
            reply(result);
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if self.reply.is_some() {
            log::warn!("pick ended without a reply");
            self.fulfil(Err(PickError::ResultFailed(
                "pick ended without producing a result".into(),
            )));
        }
    }
}

/// Loading indicator shown while a selection is processed.
pub trait ProgressIndicator: Send + Sync {
    fn show(&self);
    fn dismiss(&self);
}

/// Shows an indicator on creation and dismisses it on drop, including when
/// processing unwinds.
struct ShownProgress<'a>(&'a dyn ProgressIndicator);

impl<'a> ShownProgress<'a> {
    fn show(indicator: &'a dyn ProgressIndicator) -> Self {
        indicator.show();
        Self(indicator)
    }
}

impl Drop for ShownProgress<'_> {
    fn drop(&mut self) {
        self.0.dismiss();
    }
}

/// Indicator that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressIndicator for NoProgress {
    fn show(&self) {}
    fn dismiss(&self) {}
}

/// Entry point owning the picker, codec and per-batch settings.
pub struct PickSession<B> {
    picker: Option<Arc<dyn MediaPicker>>,
    backend: Arc<B>,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    progress: Arc<dyn ProgressIndicator>,
    events: Option<Sender<ProcessEvent>>,
    settings: DeliverySettings,
    in_flight: Arc<AtomicBool>,
}

impl<B: ImageBackend + Send + 'static> PickSession<B> {
    /// A session with no picker attached. Calls fail with `NO_ACTIVITY`
    /// until [`PickSession::with_picker`] supplies one.
    pub fn new(backend: B, settings: DeliverySettings) -> Self {
        Self {
            picker: None,
            backend: Arc::new(backend),
            thumbnails: Arc::new(NoThumbnails),
            progress: Arc::new(NoProgress),
            events: None,
            settings,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_picker(mut self, picker: impl MediaPicker + 'static) -> Self {
        self.picker = Some(Arc::new(picker));
        self
    }

    pub fn with_thumbnails(mut self, thumbnails: impl ThumbnailGenerator + 'static) -> Self {
        self.thumbnails = Arc::new(thumbnails);
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressIndicator + 'static) -> Self {
        self.progress = Arc::new(progress);
        self
    }

    /// Forward batch progress events to `events`.
    pub fn with_events(mut self, events: Sender<ProcessEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// `true` while a pick is between acceptance and reply.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start a pick. `reply` is called exactly once, from a worker thread
    /// unless the call is rejected up front.
    pub fn pick(&self, request: PickRequest, reply: impl FnOnce(PickResult) + Send + 'static) {
        let Some(picker) = self.picker.clone() else {
            reply(Err(PickError::NoHost));
            return;
        };
        let Some(in_flight) = InFlight::acquire(&self.in_flight) else {
            log::info!("rejecting pick: another pick is in progress");
            reply(Err(PickError::InProgress));
            return;
        };
        let responder = Responder::new(Box::new(reply), in_flight);

        let backend = Arc::clone(&self.backend);
        let thumbnails = Arc::clone(&self.thumbnails);
        let progress = Arc::clone(&self.progress);
        let events = self.events.clone();
        let settings = self.settings.clone();

        let spawned = std::thread::Builder::new()
            .name("mediapick-session".into())
            .spawn(move || {
                let result = run_pick(
                    picker.as_ref(),
                    backend.as_ref(),
                    thumbnails.as_ref(),
                    progress.as_ref(),
                    events,
                    &settings,
                    &request,
                );
                responder.send(result);
            });
        // On spawn failure the closure, and with it the responder, is dropped
        // and replies RESULT_ERROR.
        if let Err(e) = spawned {
            log::warn!("failed to spawn pick worker: {e}");
        }
    }

    /// Parse a loosely typed argument map and start a pick.
    pub fn pick_with_args(
        &self,
        args: &serde_json::Value,
        reply: impl FnOnce(PickResult) + Send + 'static,
    ) {
        self.pick(PickRequest::from_args(args), reply);
    }

    /// Run a pick and wait for its reply.
    pub fn pick_blocking(&self, request: PickRequest) -> PickResult {
        let (tx, rx) = mpsc::channel();
        self.pick(request, move |result| {
            tx.send(result).ok();
        });
        rx.recv().unwrap_or_else(|_| {
            Err(PickError::ResultFailed("pick worker disconnected".into()))
        })
    }
}

fn run_pick(
    picker: &dyn MediaPicker,
    backend: &impl ImageBackend,
    thumbnails: &dyn ThumbnailGenerator,
    progress: &dyn ProgressIndicator,
    events: Option<Sender<ProcessEvent>>,
    settings: &DeliverySettings,
    request: &PickRequest,
) -> PickResult {
    let (assets, is_original) = match picker.present(request) {
        Ok(PickerOutcome::Selected { assets, is_original }) => (assets, is_original),
        Ok(PickerOutcome::Cancelled) => {
            log::info!("pick cancelled");
            return Ok("[]".to_string());
        }
        Err(e) => return Err(PickError::PickFailed(e.to_string())),
    };
    if assets.is_empty() {
        return Ok("[]".to_string());
    }

    let shown = ShownProgress::show(progress);
    let entities = process_selection(
        backend,
        thumbnails,
        Selection {
            assets: &assets,
            request,
            is_original,
        },
        settings,
        events,
    );
    drop(shown);

    to_json_array(&entities).map_err(|e| PickError::ResultFailed(e.to_string()))
}
