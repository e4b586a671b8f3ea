//! Engine invocation.
//!
//! The reference engine is a separately compiled binary. It takes no arguments: it reads
//! the request and writes the result by file name inside its working directory, prints
//! progress on stdout and signals failure through its exit status.

use crate::error::{Result, TsneError};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How often a bounded or cancellable wait checks on the child.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Shared flag that asks a running engine to be killed.
///
/// A token belongs to the runs it is handed to; runs started without one cannot be cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Anything that turns the request file in `workdir` into a result file.
///
/// The subprocess engine is the production implementation; in-process engines that speak
/// the same file protocol can be swapped in.
pub trait Engine {
    /// Run to completion. `verbose` asks for the engine's progress output.
    fn run(&self, workdir: &Path, verbose: bool, cancel: Option<&CancelToken>) -> Result<()>;
}

/// Runs the engine binary as a child process.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    binary: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessEngine {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Block until the child exits, the deadline passes or the run is cancelled.
    fn wait(&self, child: &mut Child, cancel: Option<&CancelToken>) -> Result<ExitStatus> {
        if self.timeout.is_none() && cancel.is_none() {
            return child.wait().map_err(wait_failed);
        }

        let deadline = self.timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(status) = child.try_wait().map_err(wait_failed)? {
                return Ok(status);
            }

            if cancel.is_some_and(CancelToken::is_cancelled) {
                kill(child);
                return Err(TsneError::Cancelled);
            }

            if let (Some(deadline), Some(timeout)) = (deadline, self.timeout) {
                if Instant::now() >= deadline {
                    kill(child);
                    return Err(TsneError::EngineTimeout(timeout));
                }
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Engine for ProcessEngine {
    fn run(&self, workdir: &Path, verbose: bool, cancel: Option<&CancelToken>) -> Result<()> {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            return Err(TsneError::Cancelled);
        }

        // The engine is chatty on stdout; keep our stdout clean for results
        let stdout = if verbose {
            Stdio::from(std::io::stderr())
        } else {
            Stdio::null()
        };

        info!("Starting engine {}", self.binary.display());
        debug!("Engine working directory {}", workdir.display());
        let start = Instant::now();

        let mut child = Command::new(&self.binary)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(stdout)
            .spawn()
            .map_err(|e| {
                TsneError::EngineExecution(format!(
                    "failed to start engine {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        let status = self.wait(&mut child, cancel)?;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        if !status.success() {
            warn!("Engine exited with {} after {}ms", status, elapsed_ms);
            return Err(TsneError::EngineExecution(failure_message(status, verbose)));
        }

        info!("Engine finished in {}ms", elapsed_ms);
        Ok(())
    }
}

/// Kill and reap the child so no zombie outlives the workspace.
fn kill(child: &mut Child) {
    if let Err(e) = child.kill() {
        warn!("Failed to kill engine process {}: {}", child.id(), e);
    }
    if let Err(e) = child.wait() {
        warn!("Failed to reap engine process {}: {}", child.id(), e);
    }
}

fn wait_failed(e: std::io::Error) -> TsneError {
    TsneError::EngineExecution(format!("failed to wait for engine: {}", e))
}

fn failure_message(status: ExitStatus, verbose: bool) -> String {
    let hint = if verbose {
        "refer to the engine output for further details"
    } else {
        "please enable verbose mode and refer to the engine output for further details"
    };
    format!("engine exited with {}, {}", status, hint)
}
