//! Rendering engine seam and the disposed-handle retry policy.
//!
//! ARCHITECTURE
//! ============
//! A [`Capability`] is what the loader hands back once the external engine
//! is available. It constructs [`EngineHandle`]s, and a handle turns source
//! text into a [`Drawing`]. Handles can die under us (the engine's worker
//! process terminates); that shows up as [`EngineError::Disposed`].
//!
//! TRADE-OFFS
//! ==========
//! The adapter keeps one handle and reuses it across renders. A disposed
//! handle is replaced and the render retried exactly once. A second disposal
//! is reported rather than retried, so a permanently broken engine cannot
//! loop.

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::drawing::Drawing;
use crate::error::ErrorCode;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

// =============================================================================
// ERRORS
// =============================================================================

/// Failures reported by an engine handle.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The handle's backing resource is gone; a fresh handle may work.
    #[error("engine handle disposed: {0}")]
    Disposed(String),

    /// The engine rejected the input or produced unusable output.
    #[error("{0}")]
    Render(String),
}

impl ErrorCode for EngineError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Disposed(_) => "E_ENGINE_DISPOSED",
            Self::Render(_) => "E_ENGINE_RENDER",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Disposed(_))
    }
}

/// Failures surfaced by [`RenderEngineAdapter::render`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The engine failed on this source text.
    #[error("{0}")]
    Failed(String),

    /// The replacement handle was disposed too.
    #[error("rendering engine stopped responding: {0}")]
    HandleLost(String),
}

impl ErrorCode for RenderError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "E_RENDER_FAILED",
            Self::HandleLost(_) => "E_RENDER_HANDLE_LOST",
        }
    }
}

// =============================================================================
// CAPABILITY TRAITS
// =============================================================================

/// One live instance of the external renderer.
#[async_trait::async_trait]
pub trait EngineHandle: Send + Sync {
    /// Convert graph-description source into a drawing.
    ///
    /// # Errors
    ///
    /// [`EngineError::Disposed`] when this handle can no longer be used,
    /// [`EngineError::Render`] for anything else.
    async fn render_to_node(&self, source: &str) -> Result<Drawing, EngineError>;
}

/// The loaded rendering capability.
pub trait Capability: Send + Sync {
    /// Human-readable engine name and version.
    fn describe(&self) -> String;

    /// Construct a fresh engine handle.
    fn create_handle(&self) -> Arc<dyn EngineHandle>;
}

/// Shared reference to the loaded capability.
pub type SharedCapability = Arc<dyn Capability>;

// =============================================================================
// ADAPTER
// =============================================================================

/// Holds the current engine handle and applies the retry policy.
#[derive(Default)]
pub struct RenderEngineAdapter {
    handle: Mutex<Option<Arc<dyn EngineHandle>>>,
}

impl RenderEngineAdapter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `source` with the loaded capability.
    ///
    /// Taking the capability by reference means a render can only be issued
    /// once the loader has resolved.
    ///
    /// # Errors
    ///
    /// [`RenderError::Failed`] when the engine rejects the source,
    /// [`RenderError::HandleLost`] when the replacement handle is disposed too.
    pub async fn render(&self, capability: &SharedCapability, source: &str) -> Result<Drawing, RenderError> {
        let handle = self.current_or_create(capability);
        match handle.render_to_node(source).await {
            Ok(drawing) => Ok(drawing),
            Err(EngineError::Render(message)) => Err(RenderError::Failed(message)),
            Err(EngineError::Disposed(reason)) => {
                warn!(%reason, "engine handle disposed; retrying with a fresh handle");
                let fresh = self.replace(capability, &handle);
                match fresh.render_to_node(source).await {
                    Ok(drawing) => Ok(drawing),
                    Err(EngineError::Render(message)) => Err(RenderError::Failed(message)),
                    Err(EngineError::Disposed(reason)) => Err(RenderError::HandleLost(reason)),
                }
            }
        }
    }

    /// Whether a handle is currently held.
    #[must_use]
    pub fn has_handle(&self) -> bool {
        self.lock().is_some()
    }

    fn current_or_create(&self, capability: &SharedCapability) -> Arc<dyn EngineHandle> {
        let mut slot = self.lock();
        match slot.as_ref() {
            Some(handle) => Arc::clone(handle),
            None => {
                debug!(engine = %capability.describe(), "creating engine handle");
                let handle = capability.create_handle();
                *slot = Some(Arc::clone(&handle));
                handle
            }
        }
    }

    /// Swap out `dead` for a new handle. If a concurrent render already
    /// replaced it, reuse that replacement instead of creating another.
    fn replace(&self, capability: &SharedCapability, dead: &Arc<dyn EngineHandle>) -> Arc<dyn EngineHandle> {
        let mut slot = self.lock();
        if let Some(current) = slot.as_ref() {
            if !Arc::ptr_eq(current, dead) {
                return Arc::clone(current);
            }
        }
        let handle = capability.create_handle();
        *slot = Some(Arc::clone(&handle));
        handle
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Arc<dyn EngineHandle>>> {
        self.handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
