//! Graphviz `dot` backed rendering capability.
//!
//! ARCHITECTURE
//! ============
//! Loading runs `<dot> -V` to prove the executable exists and works, then
//! registers the verified capability in a process-wide registry so later
//! loaders for the same program skip straight to it. Each render pipes the
//! source through a fresh `<dot> -Tsvg` process.
//!
//! A render process killed by a signal, or one that cannot be spawned at
//! all, means the handle's backing resource is gone and is reported as
//! [`EngineError::Disposed`]. A normal non-zero exit is dot rejecting the
//! input and carries dot's stderr as the message.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::drawing::Drawing;
use crate::engine::{Capability, EngineError, EngineHandle, SharedCapability};
use crate::loader::{CapabilitySource, LoadError};

#[cfg(test)]
#[path = "dot_test.rs"]
mod dot_test;

/// Capabilities verified so far in this process, keyed by program path.
static REGISTRY: OnceLock<Mutex<Vec<Arc<DotCapability>>>> = OnceLock::new();

fn registry() -> std::sync::MutexGuard<'static, Vec<Arc<DotCapability>>> {
    REGISTRY
        .get_or_init(|| Mutex::new(Vec::new()))
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn registered(program: &Path) -> Option<Arc<DotCapability>> {
    registry().iter().find(|cap| cap.program == program).cloned()
}

fn register(capability: Arc<DotCapability>) -> Arc<DotCapability> {
    let mut reg = registry();
    if let Some(existing) = reg.iter().find(|cap| cap.program == capability.program) {
        return Arc::clone(existing);
    }
    reg.push(Arc::clone(&capability));
    capability
}

// =============================================================================
// SOURCE
// =============================================================================

/// Locates and verifies a Graphviz `dot` executable.
#[derive(Debug, Clone)]
pub struct DotSource {
    program: PathBuf,
    timeout: Duration,
}

impl DotSource {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self { program: program.into(), timeout }
    }
}

#[async_trait::async_trait]
impl CapabilitySource for DotSource {
    fn installed(&self) -> Option<SharedCapability> {
        registered(&self.program).map(|cap| cap as SharedCapability)
    }

    async fn load(&self) -> Result<SharedCapability, LoadError> {
        let program = self.program.display().to_string();
        let output = Command::new(&self.program)
            .arg("-V")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => LoadError::NotFound(program.clone()),
                _ => LoadError::Failed(format!("{program}: {e}")),
            })?;

        if !output.status.success() {
            return Err(LoadError::Failed(format!(
                "{program} -V exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // dot prints its version banner on stderr.
        let version = version_banner(&output.stderr, &output.stdout);
        info!(%program, %version, "graphviz verified");

        let capability: SharedCapability =
            register(Arc::new(DotCapability { program: self.program.clone(), version, timeout: self.timeout }));
        Ok(capability)
    }
}

fn version_banner(stderr: &[u8], stdout: &[u8]) -> String {
    let text = if stderr.iter().all(u8::is_ascii_whitespace) { stdout } else { stderr };
    String::from_utf8_lossy(text).trim().to_owned()
}

// =============================================================================
// CAPABILITY + HANDLE
// =============================================================================

/// A verified `dot` executable.
#[derive(Debug)]
pub struct DotCapability {
    program: PathBuf,
    version: String,
    timeout: Duration,
}

impl Capability for DotCapability {
    fn describe(&self) -> String {
        self.version.clone()
    }

    fn create_handle(&self) -> Arc<dyn EngineHandle> {
        Arc::new(DotHandle { program: self.program.clone(), timeout: self.timeout })
    }
}

/// Renders by running one `dot -Tsvg` process per request.
#[derive(Debug)]
pub struct DotHandle {
    program: PathBuf,
    timeout: Duration,
}

#[async_trait::async_trait]
impl EngineHandle for DotHandle {
    async fn render_to_node(&self, source: &str) -> Result<Drawing, EngineError> {
        let mut child = Command::new(&self.program)
            .arg("-Tsvg")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineError::Disposed(format!("cannot start {}: {e}", self.program.display())))?;

        // Feed stdin while collecting output so a large graph cannot fill the
        // stdout pipe and stall both sides.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A write failure means dot exited early; its status says why.
                if let Err(e) = stdin.write_all(source.as_bytes()).await {
                    debug!(error = %e, "dot closed stdin early");
                }
            }
        };
        let ((), finished) = tokio::join!(feed, tokio::time::timeout(self.timeout, child.wait_with_output()));

        let output = finished
            .map_err(|_| EngineError::Render(format!("render timed out after {}s", self.timeout.as_secs())))?
            .map_err(|e| EngineError::Disposed(format!("lost dot process: {e}")))?;

        drawing_from_output(output.status.code(), output.stdout, &output.stderr)
    }
}

/// Interpret a finished `dot -Tsvg` run.
///
/// `exit_code` is `None` when the process was terminated by a signal.
pub(crate) fn drawing_from_output(exit_code: Option<i32>, stdout: Vec<u8>, stderr: &[u8]) -> Result<Drawing, EngineError> {
    let diagnostics = String::from_utf8_lossy(stderr).trim().to_owned();
    match exit_code {
        None => Err(EngineError::Disposed("dot process terminated by signal".into())),
        Some(0) => {
            let markup = String::from_utf8(stdout).map_err(|e| EngineError::Render(format!("dot output is not UTF-8: {e}")))?;
            Drawing::from_markup(markup).map_err(|e| EngineError::Render(e.to_string()))
        }
        Some(code) if diagnostics.is_empty() => Err(EngineError::Render(format!("dot exited with status {code}"))),
        Some(_) => Err(EngineError::Render(diagnostics)),
    }
}
