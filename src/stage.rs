//! Presentation layer: where drawings are mounted and transforms applied.
//!
//! The host UI implements [`Stage`] over its own container element. The
//! crate ships [`MemoryStage`], which records everything it is told and can
//! compose the framed view as a standalone SVG document; the CLI writes that
//! out and the tests assert against it.

use std::sync::Mutex;

use crate::drawing::Drawing;
use crate::viewport::{Rect, Size, Transform, Transition};

#[cfg(test)]
#[path = "stage_test.rs"]
mod stage_test;

/// The container a drawing is shown in.
pub trait Stage: Send + Sync {
    /// Current size of the visible container.
    fn viewport_size(&self) -> Size;

    /// Replace whatever is displayed with `drawing`.
    fn mount(&self, drawing: &Drawing);

    /// Measured bounding box of the mounted drawing, when the stage can lay it out.
    fn measure(&self, _drawing: &Drawing) -> Option<Rect> {
        None
    }

    /// Show the drawing under `transform`.
    fn apply_transform(&self, transform: Transform, transition: Transition);

    /// Drop the animated transition hint so later changes apply instantly.
    fn clear_transition(&self);
}

/// Everything a [`MemoryStage`] has been told so far.
#[derive(Debug, Clone, Default)]
pub struct StageSnapshot {
    pub size: Size,
    pub mounted: Option<Drawing>,
    pub mounts: usize,
    pub transform: Transform,
    pub transition: Transition,
    /// Every transform applied, in order.
    pub applied: Vec<(Transform, Transition)>,
    pub measured: Option<Rect>,
}

/// In-memory [`Stage`] with a fixed viewport size.
#[derive(Debug, Default)]
pub struct MemoryStage {
    state: Mutex<StageSnapshot>,
}

impl MemoryStage {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self { state: Mutex::new(StageSnapshot { size, ..StageSnapshot::default() }) }
    }

    /// Change the viewport size, as a container resize would.
    pub fn resize(&self, size: Size) {
        self.lock().size = size;
    }

    /// Report `bbox` from [`Stage::measure`] for every drawing.
    pub fn set_measured(&self, bbox: Option<Rect>) {
        self.lock().measured = bbox;
    }

    #[must_use]
    pub fn snapshot(&self) -> StageSnapshot {
        self.lock().clone()
    }

    /// Render the framed view: a viewport-sized SVG holding the mounted
    /// drawing under the current transform. `None` until something is mounted.
    #[must_use]
    pub fn compose(&self) -> Option<String> {
        let state = self.snapshot();
        let drawing = state.mounted?;

        // Size the nested drawing in view box units so one drawing unit is one
        // viewport pixel before the transform.
        let drawing = match drawing.view_box() {
            Some(vb) => drawing
                .with_root_attr("width", &vb.width.to_string())
                .with_root_attr("height", &vb.height.to_string()),
            None => drawing,
        };
        let markup = drawing.markup();
        let body = markup.find("<svg").map_or(markup, |at| &markup[at..]);

        let Size { width, height } = state.size;
        Some(format!(
            concat!(
                "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">",
                "<g transform=\"{t}\">{body}</g></svg>\n"
            ),
            w = width,
            h = height,
            t = state.transform.to_svg(),
            body = body.trim_end(),
        ))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StageSnapshot> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Stage for MemoryStage {
    fn viewport_size(&self) -> Size {
        self.lock().size
    }

    fn mount(&self, drawing: &Drawing) {
        let mut state = self.lock();
        state.mounted = Some(drawing.clone());
        state.mounts += 1;
    }

    fn measure(&self, _drawing: &Drawing) -> Option<Rect> {
        self.lock().measured
    }

    fn apply_transform(&self, transform: Transform, transition: Transition) {
        let mut state = self.lock();
        state.transform = transform;
        state.transition = transition;
        state.applied.push((transform, transition));
    }

    fn clear_transition(&self) {
        self.lock().transition = Transition::Instant;
    }
}
