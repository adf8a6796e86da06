//! Shared numeric constants for the widget.

// ── Zoom ────────────────────────────────────────────────────────

/// Smallest allowed drawing scale.
pub const MIN_SCALE: f64 = 0.1;

/// Largest allowed drawing scale.
pub const MAX_SCALE: f64 = 10.0;

/// Scale change applied by one zoom button press or one wheel notch.
pub const ZOOM_STEP: f64 = 0.1;

// ── Fit-to-container ────────────────────────────────────────────

/// Margin added on the left and right of the measured bounding box.
pub const FIT_MARGIN_X: f64 = 20.0;

/// Margin added above and below the measured bounding box.
pub const FIT_MARGIN_Y: f64 = 30.0;

/// Padding is this fraction (1/n) of the expanded dimension.
pub const FIT_PADDING_DIVISOR: f64 = 10.0;

/// Lower bound on the per-axis padding.
pub const FIT_MIN_PADDING: f64 = 10.0;

/// Fit never scales the drawing above its natural size.
pub const FIT_MAX_SCALE: f64 = 1.0;

/// How long the animated transition hint stays on after a fit.
pub const FIT_TRANSITION_MS: u64 = 300;

// ── Export ──────────────────────────────────────────────────────

/// Fixed download name for exported drawings.
pub const EXPORT_FILENAME: &str = "graph.svg";

/// Fallback message when a failure carries no text of its own.
pub const GENERIC_ERROR_MESSAGE: &str = "Error initializing or rendering graph";
