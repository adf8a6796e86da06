//! Resource loader: single-flight acquisition of the rendering capability.
//!
//! DESIGN
//! ======
//! The first [`ResourceLoader::ensure_ready`] call starts the load and parks
//! a shared future in [`LoadState::InFlight`]. Every caller, concurrent or
//! later, awaits that same future, and the settled outcome is cached in
//! `Ready` / `Failed` for the rest of the loader's life. A failure is never
//! retried automatically.
//!
//! Loading a capability may require temporary changes to the process
//! environment. Sources hand those back as a [`ShimGuard`] that the loader
//! holds for the duration of the load; dropping it restores everything,
//! whichever way the load went.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use tracing::{debug, error, info};

use crate::engine::SharedCapability;
use crate::error::ErrorCode;

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while acquiring the rendering capability.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// The engine is not installed where the source looked for it.
    #[error("rendering engine not found: {0}")]
    NotFound(String),

    /// The engine is present but could not be brought up.
    #[error("failed to load rendering engine: {0}")]
    Failed(String),
}

impl ErrorCode for LoadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "E_LOAD_NOT_FOUND",
            Self::Failed(_) => "E_LOAD_FAILED",
        }
    }
}

// =============================================================================
// SHIMS
// =============================================================================

type Restore = Box<dyn FnOnce() + Send>;

/// Temporary environment changes made for a load. Restores them, newest
/// first, when dropped.
#[derive(Default)]
pub struct ShimGuard {
    restores: Vec<Restore>,
}

impl ShimGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the undo step for a shim that has just been installed.
    pub fn push(&mut self, restore: impl FnOnce() + Send + 'static) {
        self.restores.push(Box::new(restore));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.restores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.restores.is_empty()
    }
}

impl Drop for ShimGuard {
    fn drop(&mut self) {
        while let Some(restore) = self.restores.pop() {
            restore();
        }
    }
}

// =============================================================================
// CAPABILITY SOURCE
// =============================================================================

/// Where a rendering capability comes from.
#[async_trait::async_trait]
pub trait CapabilitySource: Send + Sync {
    /// A capability already present in the environment, if any. When this
    /// returns `Some`, no load happens.
    fn installed(&self) -> Option<SharedCapability> {
        None
    }

    /// Install whatever temporary shims the load needs.
    fn install_shims(&self) -> ShimGuard {
        ShimGuard::new()
    }

    /// Bring the capability up.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] if the engine is missing or fails to start.
    async fn load(&self) -> Result<SharedCapability, LoadError>;
}

// =============================================================================
// LOADER
// =============================================================================

type LoadOutcome = Result<SharedCapability, LoadError>;
type PendingLoad = Shared<BoxFuture<'static, LoadOutcome>>;

/// Internal load state. Only ever moves forward.
enum LoadState {
    NotStarted,
    InFlight(PendingLoad),
    Ready(SharedCapability),
    Failed(LoadError),
}

/// Observable summary of the loader's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    NotStarted,
    InFlight,
    Ready,
    Failed,
}

/// Acquires the rendering capability at most once.
pub struct ResourceLoader {
    source: Arc<dyn CapabilitySource>,
    state: Mutex<LoadState>,
}

impl ResourceLoader {
    #[must_use]
    pub fn new(source: Arc<dyn CapabilitySource>) -> Self {
        Self { source, state: Mutex::new(LoadState::NotStarted) }
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        match &*self.lock() {
            LoadState::NotStarted => LoadStatus::NotStarted,
            LoadState::InFlight(_) => LoadStatus::InFlight,
            LoadState::Ready(_) => LoadStatus::Ready,
            LoadState::Failed(_) => LoadStatus::Failed,
        }
    }

    /// Resolve the capability, loading it on first use.
    ///
    /// # Errors
    ///
    /// Returns the load's [`LoadError`]. Once a load has failed, every later
    /// call returns that same error.
    pub async fn ensure_ready(&self) -> LoadOutcome {
        let pending = {
            let mut state = self.lock();
            match &*state {
                LoadState::Ready(capability) => return Ok(Arc::clone(capability)),
                LoadState::Failed(err) => return Err(err.clone()),
                LoadState::InFlight(pending) => pending.clone(),
                LoadState::NotStarted => {
                    let pending = start_load(Arc::clone(&self.source));
                    *state = LoadState::InFlight(pending.clone());
                    pending
                }
            }
        };

        let outcome = pending.await;
        self.settle(&outcome);
        outcome
    }

    /// Record the outcome. Only the first caller to get here moves the state.
    fn settle(&self, outcome: &LoadOutcome) {
        let mut state = self.lock();
        if !matches!(*state, LoadState::InFlight(_)) {
            return;
        }
        *state = match outcome {
            Ok(capability) => {
                info!(engine = %capability.describe(), "rendering engine ready");
                LoadState::Ready(Arc::clone(capability))
            }
            Err(err) => {
                error!(error = %err, code = err.error_code(), "rendering engine load failed");
                LoadState::Failed(err.clone())
            }
        };
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn start_load(source: Arc<dyn CapabilitySource>) -> PendingLoad {
    async move {
        if let Some(existing) = source.installed() {
            debug!("rendering engine already installed");
            return Ok(existing);
        }
        let _shims = source.install_shims();
        source.load().await
    }
    .boxed()
    .shared()
}
