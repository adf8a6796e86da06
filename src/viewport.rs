//! Viewport transform: pan/zoom/fit state for the mounted drawing.
//!
//! DESIGN
//! ======
//! The viewport holds a single [`Transform`] and has no modes. Every
//! operation is a transition of that triple, and every transition is pushed
//! to the [`Stage`] immediately. Fit is the only operation applied with an
//! animated transition hint.
//!
//! Pan, zoom and fit need a drawing to act on. Before the first successful
//! render they are silent no-ops returning `None`. Reset always applies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::consts::{
    FIT_MARGIN_X, FIT_MARGIN_Y, FIT_MAX_SCALE, FIT_MIN_PADDING, FIT_PADDING_DIVISOR, MAX_SCALE, MIN_SCALE, ZOOM_STEP,
};
use crate::error::ErrorCode;
use crate::stage::Stage;

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

// =============================================================================
// GEOMETRY
// =============================================================================

/// A point in screen space (CSS pixels).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Width and height of the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// An axis-aligned rectangle in drawing coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Grow by `dx` on the left and right and `dy` above and below.
    #[must_use]
    pub fn expand(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x - dx, y: self.y - dy, width: self.width + 2.0 * dx, height: self.height + 2.0 * dy }
    }

    /// Shift the origin by `(dx, dy)`.
    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..self }
    }
}

/// The drawing's intrinsic coordinate extent.
pub type ViewBox = Rect;

// =============================================================================
// TRANSFORM
// =============================================================================

/// Pan/zoom state applied to the drawing.
///
/// `x` / `y` are the drawing origin's offset in viewport pixels.
/// `scale` is a uniform factor (1.0 = natural size).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, scale: 1.0 };

    /// SVG `transform` attribute value for this state.
    #[must_use]
    pub fn to_svg(&self) -> String {
        format!("translate({} {}) scale({})", self.x, self.y, self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// How the stage should move to a new transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Transition {
    /// Jump straight to the new transform.
    #[default]
    Instant,
    /// Ease into the new transform (used by fit).
    Animated,
}

/// Which way a discrete zoom step goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// Scale bounds and the discrete zoom step.
///
/// Always finite and positive, with `min_scale <= 1 <= max_scale` so the
/// identity transform applied by reset stays inside the bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    min_scale: f64,
    max_scale: f64,
    step: f64,
}

/// Zoom limits rejected by [`ZoomLimits::new`].
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("invalid zoom limits: min {min_scale}, max {max_scale}, step {step}")]
pub struct ZoomLimitsError {
    pub min_scale: f64,
    pub max_scale: f64,
    pub step: f64,
}

impl ErrorCode for ZoomLimitsError {
    fn error_code(&self) -> &'static str {
        "E_ZOOM_LIMITS"
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min_scale: MIN_SCALE, max_scale: MAX_SCALE, step: ZOOM_STEP }
    }
}

impl ZoomLimits {
    /// # Errors
    ///
    /// Returns a [`ZoomLimitsError`] unless every value is finite and
    /// positive and `min_scale <= 1 <= max_scale`.
    pub fn new(min_scale: f64, max_scale: f64, step: f64) -> Result<Self, ZoomLimitsError> {
        let valid = min_scale.is_finite()
            && max_scale.is_finite()
            && step.is_finite()
            && min_scale > 0.0
            && step > 0.0
            && min_scale <= 1.0
            && 1.0 <= max_scale;
        if valid {
            Ok(Self { min_scale, max_scale, step })
        } else {
            Err(ZoomLimitsError { min_scale, max_scale, step })
        }
    }

    #[must_use]
    pub fn min_scale(&self) -> f64 {
        self.min_scale
    }

    #[must_use]
    pub fn max_scale(&self) -> f64 {
        self.max_scale
    }

    #[must_use]
    pub fn step(&self) -> f64 {
        self.step
    }

    #[must_use]
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min_scale, self.max_scale)
    }
}

// =============================================================================
// FIT
// =============================================================================

/// Compute the transform that centers `bbox` inside `viewport` with padding.
///
/// The bounding box is taken relative to the view box origin, grown by
/// [`FIT_MARGIN_X`] / [`FIT_MARGIN_Y`] on each side to cover elements that
/// overflow their measured extent, and padded by a tenth of its size (at
/// least [`FIT_MIN_PADDING`]) per axis. The smaller of the two per-axis
/// scales wins, capped at [`FIT_MAX_SCALE`] and clamped to `limits`.
///
/// Returns `None` when the viewport has no area.
#[must_use]
pub fn fit_transform(viewport: Size, bbox: Rect, view_box: ViewBox, limits: &ZoomLimits) -> Option<Transform> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }

    let expanded = bbox
        .translate(-view_box.x, -view_box.y)
        .expand(FIT_MARGIN_X, FIT_MARGIN_Y);

    let pad_x = (expanded.width / FIT_PADDING_DIVISOR).max(FIT_MIN_PADDING);
    let pad_y = (expanded.height / FIT_PADDING_DIVISOR).max(FIT_MIN_PADDING);

    let scale_x = (viewport.width - 2.0 * pad_x) / (expanded.width + 2.0 * pad_x);
    let scale_y = (viewport.height - 2.0 * pad_y) / (expanded.height + 2.0 * pad_y);
    let scale = limits.clamp(scale_x.min(scale_y).min(FIT_MAX_SCALE));

    Some(Transform {
        x: (viewport.width - expanded.width * scale) / 2.0 - expanded.x * scale,
        y: (viewport.height - expanded.height * scale) / 2.0 - expanded.y * scale,
        scale,
    })
}

// =============================================================================
// VIEWPORT TRANSFORM
// =============================================================================

/// Geometry captured from the mounted drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Content {
    view_box: ViewBox,
    bbox: Rect,
}

/// Owns the current [`Transform`] and pushes every change to the stage.
pub struct ViewportTransform {
    transform: Transform,
    limits: ZoomLimits,
    content: Option<Content>,
    stage: Arc<dyn Stage>,
}

impl ViewportTransform {
    #[must_use]
    pub fn new(stage: Arc<dyn Stage>, limits: ZoomLimits) -> Self {
        Self { transform: Transform::IDENTITY, limits, content: None, stage }
    }

    /// The current transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    #[must_use]
    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Whether a drawing has been captured.
    #[must_use]
    pub fn has_drawing(&self) -> bool {
        self.content.is_some()
    }

    /// Capture the geometry of a freshly mounted drawing.
    ///
    /// `measured` is the drawing's measured bounding box; the view box stands
    /// in for it when the stage cannot measure.
    pub fn set_drawing(&mut self, view_box: ViewBox, measured: Option<Rect>) {
        self.content = Some(Content { view_box, bbox: measured.unwrap_or(view_box) });
    }

    /// Forget the captured drawing. Pan, zoom and fit become no-ops again.
    pub fn clear_drawing(&mut self) {
        self.content = None;
    }

    pub fn zoom_in(&mut self) -> Option<Transform> {
        self.zoom_at(ZoomDirection::In)
    }

    pub fn zoom_out(&mut self) -> Option<Transform> {
        self.zoom_at(ZoomDirection::Out)
    }

    /// Change scale by exactly one step, whatever produced the request.
    pub fn zoom_at(&mut self, direction: ZoomDirection) -> Option<Transform> {
        self.content?;
        let delta = match direction {
            ZoomDirection::In => self.limits.step,
            ZoomDirection::Out => -self.limits.step,
        };
        let scale = self.limits.clamp(self.transform.scale + delta);
        Some(self.apply(Transform { scale, ..self.transform }, Transition::Instant))
    }

    /// Move the drawing by a screen-space delta. Pan is unbounded.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> Option<Transform> {
        self.content?;
        let next = Transform { x: self.transform.x + dx, y: self.transform.y + dy, ..self.transform };
        Some(self.apply(next, Transition::Instant))
    }

    /// Back to `{0, 0, 1}`.
    pub fn reset(&mut self) -> Transform {
        self.apply(Transform::IDENTITY, Transition::Instant)
    }

    /// Center and scale the drawing to fit the stage's current viewport.
    pub fn fit_to_container(&mut self) -> Option<Transform> {
        let content = self.content?;
        let next = fit_transform(self.stage.viewport_size(), content.bbox, content.view_box, &self.limits)?;
        Some(self.apply(next, Transition::Animated))
    }

    fn apply(&mut self, transform: Transform, transition: Transition) -> Transform {
        self.transform = transform;
        self.stage.apply_transform(transform, transition);
        transform
    }
}
