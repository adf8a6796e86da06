//! Widget controller: orchestrates loading, rendering and the viewport.
//!
//! ARCHITECTURE
//! ============
//! Each non-empty source text runs one sequence: ensure the engine is loaded,
//! render the text, mount the drawing, then fit (or reset) the viewport.
//! Loading and error state is published on a `watch` channel for the host.
//!
//! TRADE-OFFS
//! ==========
//! Sequences are not cancelled or queued. A change that arrives mid-render
//! starts a second sequence that shares the loader's single in-flight load
//! but renders independently. Every sequence takes a number when it starts,
//! and only the most recently issued one may mount its drawing, set the
//! error, or clear the loading flag. A slow older render therefore cannot
//! overwrite a newer drawing; its result is logged and dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{AfterRender, WidgetConfig};
use crate::consts::GENERIC_ERROR_MESSAGE;
use crate::drawing::{Drawing, Export};
use crate::engine::{RenderEngineAdapter, RenderError};
use crate::error::ErrorCode;
use crate::input::{Handled, InteractionController, WheelDelta};
use crate::loader::{CapabilitySource, LoadError, LoadStatus, ResourceLoader};
use crate::stage::Stage;
use crate::viewport::{Point, Transform, ViewportTransform};

#[cfg(test)]
#[path = "widget_test.rs"]
mod widget_test;

// =============================================================================
// STATUS + ERRORS
// =============================================================================

/// Host-visible widget state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WidgetStatus {
    pub loading: bool,
    pub error: Option<String>,
}

/// Any failure in the load → render sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WidgetError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl WidgetError {
    /// The single human-readable message shown to the user.
    #[must_use]
    pub fn message(&self) -> String {
        let text = self.to_string();
        if text.trim().is_empty() { GENERIC_ERROR_MESSAGE.to_owned() } else { text }
    }
}

impl ErrorCode for WidgetError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Load(e) => e.error_code(),
            Self::Render(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Load(e) => e.retryable(),
            Self::Render(e) => e.retryable(),
        }
    }
}

/// How one `set_source` call ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Empty source: nothing was attempted.
    Skipped,
    /// The drawing was mounted and the viewport moved to `transform`.
    Rendered { transform: Transform },
    /// The sequence failed; `message` is what the host now shows.
    Failed { message: String },
    /// A newer source arrived first; this result was discarded.
    Superseded,
}

// =============================================================================
// CONTROLLER
// =============================================================================

pub struct WidgetController {
    id: Uuid,
    config: WidgetConfig,
    loader: ResourceLoader,
    adapter: RenderEngineAdapter,
    stage: Arc<dyn Stage>,
    viewport: Mutex<ViewportTransform>,
    input: Mutex<InteractionController>,
    /// Currently mounted drawing. Its lock also serializes commits.
    drawing: Mutex<Option<Drawing>>,
    status: watch::Sender<WidgetStatus>,
    /// Number of the most recently issued render sequence.
    issued: AtomicU64,
}

impl WidgetController {
    #[must_use]
    pub fn new(source: Arc<dyn CapabilitySource>, stage: Arc<dyn Stage>, config: WidgetConfig) -> Self {
        let (status, _) = watch::channel(WidgetStatus::default());
        Self {
            id: Uuid::new_v4(),
            viewport: Mutex::new(ViewportTransform::new(Arc::clone(&stage), config.limits)),
            input: Mutex::new(InteractionController::new()),
            loader: ResourceLoader::new(source),
            adapter: RenderEngineAdapter::new(),
            drawing: Mutex::new(None),
            issued: AtomicU64::new(0),
            config,
            stage,
            status,
        }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn status(&self) -> WidgetStatus {
        self.status.borrow().clone()
    }

    /// Receive every status change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WidgetStatus> {
        self.status.subscribe()
    }

    #[must_use]
    pub fn load_status(&self) -> LoadStatus {
        self.loader.status()
    }

    #[must_use]
    pub fn transform(&self) -> Transform {
        self.viewport().transform()
    }

    /// The currently mounted drawing.
    #[must_use]
    pub fn drawing(&self) -> Option<Drawing> {
        self.drawing_slot().clone()
    }

    // --- Source ---

    /// Observe `source` and run a render sequence for its current value and
    /// for every change. Sequences run concurrently; see the module docs.
    pub fn watch_source(self: &Arc<Self>, mut source: watch::Receiver<String>) -> JoinHandle<()> {
        let widget = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let text = source.borrow_and_update().clone();
                let run = Arc::clone(&widget);
                tokio::spawn(async move {
                    run.set_source(&text).await;
                });
                if source.changed().await.is_err() {
                    debug!(widget = %widget.id, "source channel closed");
                    break;
                }
            }
        })
    }

    /// Render `source` and show it. Empty text is ignored.
    pub async fn set_source(&self, source: &str) -> RenderOutcome {
        if source.is_empty() {
            return RenderOutcome::Skipped;
        }

        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        self.status.send_modify(|status| {
            status.loading = true;
            status.error = None;
        });
        let _loading = LoadingGuard { widget: self, seq };
        debug!(widget = %self.id, seq, bytes = source.len(), "render requested");

        match self.run(source).await {
            Ok(drawing) => match self.commit(seq, drawing) {
                Some(transform) => RenderOutcome::Rendered { transform },
                None => self.superseded(seq),
            },
            Err(err) => self.fail(seq, &err),
        }
    }

    async fn run(&self, source: &str) -> Result<Drawing, WidgetError> {
        let capability = self.loader.ensure_ready().await?;
        let drawing = self.adapter.render(&capability, source).await?;
        Ok(drawing)
    }

    /// Mount `drawing` and move the viewport, unless `seq` has been superseded.
    fn commit(&self, seq: u64, drawing: Drawing) -> Option<Transform> {
        let mut slot = self.drawing_slot();
        if !self.is_current(seq) {
            return None;
        }

        let drawing = drawing.responsive();
        self.stage.mount(&drawing);
        let measured = self.stage.measure(&drawing);
        let view_box = drawing.view_box().or(measured);

        let (transform, animated) = {
            let mut viewport = self.viewport();
            match view_box {
                Some(view_box) => viewport.set_drawing(view_box, measured),
                None => viewport.clear_drawing(),
            }
            match self.config.after_render {
                AfterRender::Fit => match viewport.fit_to_container() {
                    Some(transform) => (transform, true),
                    None => (viewport.reset(), false),
                },
                AfterRender::Reset => (viewport.reset(), false),
            }
        };
        if animated {
            self.schedule_transition_clear();
        }

        *slot = Some(drawing);
        info!(widget = %self.id, seq, scale = transform.scale, "drawing rendered");
        Some(transform)
    }

    fn fail(&self, seq: u64, err: &WidgetError) -> RenderOutcome {
        let _slot = self.drawing_slot();
        if !self.is_current(seq) {
            return self.superseded(seq);
        }
        let message = err.message();
        warn!(widget = %self.id, seq, code = err.error_code(), error = %message, "render failed");
        self.status.send_modify(|status| status.error = Some(message.clone()));
        RenderOutcome::Failed { message }
    }

    fn superseded(&self, seq: u64) -> RenderOutcome {
        debug!(widget = %self.id, seq, "discarding superseded render");
        RenderOutcome::Superseded
    }

    fn is_current(&self, seq: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == seq
    }

    // --- Commands ---

    pub fn zoom_in(&self) -> Option<Transform> {
        self.viewport().zoom_in()
    }

    pub fn zoom_out(&self) -> Option<Transform> {
        self.viewport().zoom_out()
    }

    pub fn pan_by(&self, dx: f64, dy: f64) -> Option<Transform> {
        self.viewport().pan_by(dx, dy)
    }

    pub fn reset_view(&self) -> Transform {
        self.viewport().reset()
    }

    pub fn fit_to_container(&self) -> Option<Transform> {
        let transform = self.viewport().fit_to_container();
        if transform.is_some() {
            self.schedule_transition_clear();
        }
        transform
    }

    /// Serialize the mounted drawing for download. `None` before the first render.
    #[must_use]
    pub fn export_svg(&self) -> Option<Export> {
        self.drawing_slot().as_ref().map(Drawing::export)
    }

    // --- Input events ---

    pub fn on_pointer_down(&self, at: Point) -> Handled {
        self.input().pointer_down(at)
    }

    pub fn on_pointer_move(&self, at: Point) -> Handled {
        let mut input = self.input();
        input.pointer_move(at, &mut self.viewport())
    }

    pub fn on_pointer_up(&self) -> Handled {
        self.input().pointer_up()
    }

    pub fn on_pointer_leave(&self) -> Handled {
        self.input().pointer_leave()
    }

    pub fn on_wheel(&self, delta: WheelDelta) -> Handled {
        let mut input = self.input();
        input.wheel(delta, &mut self.viewport())
    }

    // --- Internals ---

    /// Drop the fit animation hint after the configured delay. Outside a
    /// runtime the hint is dropped at once.
    fn schedule_transition_clear(&self) {
        let stage = Arc::clone(&self.stage);
        let delay = self.config.transition;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    stage.clear_transition();
                });
            }
            Err(_) => stage.clear_transition(),
        }
    }

    fn viewport(&self) -> MutexGuard<'_, ViewportTransform> {
        self.viewport.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn input(&self) -> MutexGuard<'_, InteractionController> {
        self.input.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn drawing_slot(&self) -> MutexGuard<'_, Option<Drawing>> {
        self.drawing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the loading flag when a sequence ends, however it ends.
struct LoadingGuard<'a> {
    widget: &'a WidgetController,
    seq: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if self.widget.is_current(self.seq) {
            self.widget.status.send_modify(|status| status.loading = false);
        }
    }
}
