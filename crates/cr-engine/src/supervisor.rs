//! Engine process supervision.
//!
//! The engine uses fixed file names inside its working directory, so a
//! workspace can host only one run at a time. Active workspaces are tracked in
//! a process-wide registry; the entry is released when the run finishes or its
//! handle is dropped.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::{Duration, Instant};

use cr_project::OutputKind;
use cr_script::{BASE_NAME, CompiledScript, LOG_FILE, input_file_name, output_file_name};
use tracing::{debug, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::provision::EngineInstall;

/// Environment variable the engine reads its data directory from.
pub const DATA_PATH_VAR: &str = "CLOUDY_DATA_PATH";

const POLL_SLICE: Duration = Duration::from_millis(25);

fn active_workspaces() -> &'static Mutex<HashSet<PathBuf>> {
    static ACTIVE: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();
    ACTIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Registry entry for a workspace with a live engine.
#[derive(Debug)]
struct WorkspaceLock {
    dir: PathBuf,
}

impl WorkspaceLock {
    fn acquire(dir: &Path) -> EngineResult<Self> {
        let mut active = active_workspaces()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if !active.insert(dir.to_path_buf()) {
            return Err(EngineError::Busy {
                path: dir.to_path_buf(),
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        let mut active = active_workspaces()
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        active.remove(&self.dir);
    }
}

/// Directory the engine runs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Create the directory if needed. The stored path is canonical so two
    /// spellings of one directory share a lock.
    pub fn new(dir: impl AsRef<Path>) -> EngineResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: fs::canonicalize(dir)?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn script_path(&self) -> PathBuf {
        self.file(&input_file_name())
    }

    pub fn log_path(&self) -> PathBuf {
        self.file(LOG_FILE)
    }

    fn write_script(&self, script: &CompiledScript) -> EngineResult<PathBuf> {
        let path = self.script_path();
        let mut file = File::create(&path)?;
        file.write_all(script.render().as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        Ok(path)
    }

    fn clear_outputs(&self) -> EngineResult<()> {
        for kind in OutputKind::ALL {
            let path = self.file(&output_file_name(kind));
            match fs::remove_file(&path) {
                Ok(()) => debug!("Removed stale {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Shared flag asking a running engine to stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How an engine process ended.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    /// Exit status 0. A killed or cancelled process never succeeds.
    pub success: bool,
    pub exit_code: Option<i32>,
    pub cancelled: bool,
    pub elapsed: Duration,
    pub log_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunPoll {
    Running { elapsed: Duration },
    Finished(ProcessOutcome),
}

/// Periodic progress while the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineTick {
    pub elapsed_s: u64,
    /// Indeterminate progress indicator, cycles through 0..100.
    pub pulse_pct: u8,
}

impl EngineTick {
    fn at(elapsed: Duration) -> Self {
        let elapsed_s = elapsed.as_secs();
        Self {
            elapsed_s,
            pulse_pct: (elapsed_s % 100) as u8,
        }
    }
}

/// Launches engine runs against one installation.
#[derive(Debug, Clone)]
pub struct Supervisor {
    install: EngineInstall,
}

impl Supervisor {
    pub fn new(install: EngineInstall) -> Self {
        Self { install }
    }

    pub fn install(&self) -> &EngineInstall {
        &self.install
    }

    /// Write the script, clear stale outputs and start the engine.
    pub fn launch(&self, workspace: &Workspace, script: &CompiledScript) -> EngineResult<RunHandle> {
        self.launch_with_cancel(workspace, script, CancelToken::new())
    }

    pub fn launch_with_cancel(
        &self,
        workspace: &Workspace,
        script: &CompiledScript,
        cancel: CancelToken,
    ) -> EngineResult<RunHandle> {
        let executable = self.install.executable();
        if !executable.is_file() {
            return Err(EngineError::ExecutableMissing {
                path: executable.to_path_buf(),
            });
        }

        let lock = WorkspaceLock::acquire(workspace.path())?;

        let script_path = workspace.write_script(script)?;
        debug!(
            "Wrote {} lines to {}",
            script.len(),
            script_path.display()
        );
        workspace.clear_outputs()?;

        let log_path = workspace.log_path();
        let log = File::create(&log_path)?;
        let log_err = log.try_clone()?;

        let child = Command::new(executable)
            .arg("-r")
            .arg(BASE_NAME)
            .current_dir(workspace.path())
            .env(DATA_PATH_VAR, self.install.data_path_value())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: executable.to_path_buf(),
                source,
            })?;

        info!(
            "Engine started (pid {}) in {}",
            child.id(),
            workspace.path().display()
        );

        Ok(RunHandle {
            child,
            started: Instant::now(),
            log_path,
            cancel,
            outcome: None,
            lock: Some(lock),
        })
    }
}

/// A launched engine process.
#[derive(Debug)]
pub struct RunHandle {
    child: Child,
    started: Instant,
    log_path: PathBuf,
    cancel: CancelToken,
    outcome: Option<ProcessOutcome>,
    lock: Option<WorkspaceLock>,
}

impl RunHandle {
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Check on the process without blocking.
    pub fn poll(&mut self) -> EngineResult<RunPoll> {
        if let Some(outcome) = &self.outcome {
            return Ok(RunPoll::Finished(outcome.clone()));
        }

        if self.cancel.is_cancelled() {
            warn!("Cancelling engine (pid {})", self.child.id());
            match self.child.kill() {
                Ok(()) => {}
                // already exited
                Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
                Err(e) => return Err(e.into()),
            }
            let status = self.child.wait()?;
            return Ok(RunPoll::Finished(self.finish(status.code(), true)));
        }

        match self.child.try_wait()? {
            Some(status) => Ok(RunPoll::Finished(self.finish(status.code(), false))),
            None => Ok(RunPoll::Running {
                elapsed: self.elapsed(),
            }),
        }
    }

    /// Block until the engine exits, calling `on_tick` about once per `interval`.
    pub fn wait_with_progress(
        &mut self,
        interval: Duration,
        mut on_tick: impl FnMut(EngineTick),
    ) -> EngineResult<ProcessOutcome> {
        let mut last_tick = Instant::now();
        loop {
            match self.poll()? {
                RunPoll::Finished(outcome) => return Ok(outcome),
                RunPoll::Running { elapsed } => {
                    if last_tick.elapsed() >= interval {
                        on_tick(EngineTick::at(elapsed));
                        last_tick = Instant::now();
                    }
                }
            }
            thread::sleep(POLL_SLICE.min(interval));
        }
    }

    pub fn wait(&mut self) -> EngineResult<ProcessOutcome> {
        self.wait_with_progress(Duration::from_secs(1), |_| {})
    }

    fn finish(&mut self, exit_code: Option<i32>, cancelled: bool) -> ProcessOutcome {
        let outcome = ProcessOutcome {
            success: !cancelled && exit_code == Some(0),
            exit_code,
            cancelled,
            elapsed: self.elapsed(),
            log_path: self.log_path.clone(),
        };
        info!(
            "Engine finished after {:.1}s (exit code {:?}{})",
            outcome.elapsed.as_secs_f64(),
            exit_code,
            if cancelled { ", cancelled" } else { "" }
        );
        self.lock = None;
        self.outcome = Some(outcome.clone());
        outcome
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        if self.outcome.is_none() {
            // an abandoned run must not keep writing into a released workspace
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_pulse_wraps() {
        assert_eq!(EngineTick::at(Duration::from_secs(42)).pulse_pct, 42);
        assert_eq!(EngineTick::at(Duration::from_secs(250)).pulse_pct, 50);
        assert_eq!(EngineTick::at(Duration::from_millis(999)).elapsed_s, 0);
    }

    #[test]
    fn workspace_lock_is_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let first = WorkspaceLock::acquire(dir.path()).unwrap();
        assert!(matches!(
            WorkspaceLock::acquire(dir.path()),
            Err(EngineError::Busy { .. })
        ));
        drop(first);
        WorkspaceLock::acquire(dir.path()).unwrap();
    }

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn clear_outputs_removes_only_known_files() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path()).unwrap();
        for name in ["temp.out", "temp.ovr", "run.log", "notes.txt"] {
            fs::write(workspace.file(name), "x").unwrap();
        }

        workspace.clear_outputs().unwrap();

        assert!(!workspace.file("temp.out").exists());
        assert!(!workspace.file("temp.ovr").exists());
        assert!(!workspace.file("run.log").exists());
        assert!(workspace.file("notes.txt").exists());
    }
}
