//! Graph rendering widget with an interactive pan/zoom viewport.
//!
//! The widget takes graph-description source text, hands it to an external
//! rendering engine, mounts the resulting SVG drawing on a [`stage::Stage`],
//! and lets the user pan, zoom, fit and export it. The host (a UI toolkit, a
//! CLI, a test) only wires input events and source changes into the
//! [`widget::WidgetController`] and reads back its status.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`widget`] | Orchestration: source changes, loading/error status, commands |
//! | [`loader`] | Single-flight acquisition of the rendering capability |
//! | [`engine`] | Engine handle traits and the disposed-handle retry policy |
//! | [`dot`] | Graphviz `dot` backed capability |
//! | [`viewport`] | Pan/zoom/fit transform state and the fit algorithm |
//! | [`input`] | Pointer/wheel events and the drag state machine |
//! | [`drawing`] | SVG drawing node, declared bounds and export |
//! | [`stage`] | Presentation-layer trait and an in-memory stage |
//! | [`config`] | Environment configuration |
//! | [`error`] | Error codes shared by all error types |
//! | [`consts`] | Shared numeric constants (zoom limits, fit margins, etc.) |

pub mod config;
pub mod consts;
pub mod dot;
pub mod drawing;
pub mod engine;
pub mod error;
pub mod input;
pub mod loader;
pub mod stage;
pub mod viewport;
pub mod widget;

#[cfg(test)]
#[path = "helpers_test.rs"]
pub(crate) mod test_helpers;
