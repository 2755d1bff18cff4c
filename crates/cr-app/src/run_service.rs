//! Run execution service.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Instant;

use cr_engine::{CancelToken, EngineInstall, Supervisor, Workspace};
use cr_project::{SimulationConfig, validate_config};
use cr_results::{
    ExportDir, RunManifest, RunResult, RunSlot, UNKNOWN_VERSION, compute_script_fingerprint,
    engine_version,
};
use cr_script::{SpectralTable, TableRef};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::progress::{EngineProgress, RunProgressEvent, RunStage};
use crate::settings::EngineSettings;

/// Request to execute a run.
pub struct RunRequest<'a> {
    pub config: &'a SimulationConfig,
    pub settings: &'a EngineSettings,
    /// Reuse the fixed shared workspace instead of a fresh per-run directory.
    pub shared_workspace: bool,
    pub cancel: Option<CancelToken>,
}

/// Concise timing summary for a run.
#[derive(Debug, Clone, Default)]
pub struct RunTimingSummary {
    pub provision_time_s: f64,
    pub spectrum_time_s: f64,
    pub compile_time_s: f64,
    pub engine_time_s: f64,
    pub collect_time_s: f64,
    pub total_time_s: f64,
}

/// Response from a run execution.
#[derive(Debug, Clone)]
pub struct RunResponse {
    pub run_id: String,
    pub result: RunResult,
    pub manifest: RunManifest,
    pub workspace: PathBuf,
    pub timing: RunTimingSummary,
}

impl RunResponse {
    /// Version banner from the main output, or a placeholder.
    pub fn engine_version(&self) -> &str {
        self.manifest
            .engine_version
            .as_deref()
            .unwrap_or(UNKNOWN_VERSION)
    }
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: Option<String>,
    engine: Option<EngineProgress>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            engine,
        });
    }
}

pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Make sure the engine is installed and return where it lives.
///
/// Installs are remembered per install directory for the life of the process;
/// a remembered install is discovered again only once its executable is gone.
pub fn install_engine(settings: &EngineSettings) -> AppResult<EngineInstall> {
    static INSTALLS: OnceLock<Mutex<HashMap<PathBuf, EngineInstall>>> = OnceLock::new();
    // held across provisioning so two runs never unpack into one directory
    let mut installs = INSTALLS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(install) = installs.get(&settings.install_dir)
        && install.executable().is_file()
    {
        debug!("Reusing engine at {}", install.executable().display());
        return Ok(install.clone());
    }

    let install = settings.provisioner().ensure_installed()?.clone();
    installs.insert(settings.install_dir.clone(), install.clone());
    Ok(install)
}

/// A run's spectrum table in the engine data directory; removed on drop.
struct InstalledTable {
    path: PathBuf,
}

impl Drop for InstalledTable {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path)
            && e.kind() != io::ErrorKind::NotFound
        {
            warn!("Failed to remove {}: {e}", self.path.display());
        }
    }
}

/// Execute a run.
pub fn execute_run(request: &RunRequest) -> AppResult<RunResponse> {
    execute_run_with_progress(request, None)
}

/// Execute a run and stream progress events.
pub fn execute_run_with_progress(
    request: &RunRequest,
    progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    execute_run_as(&new_run_id(), request, progress_cb)
}

/// Execute a run tracked by a session slot.
///
/// The slot is marked pending before anything else happens; if the run fails
/// before producing a result the slot is reset.
pub fn execute_in_slot(
    slot: &mut RunSlot,
    request: &RunRequest,
    progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let run_id = new_run_id();
    slot.begin(run_id.clone());

    match execute_run_as(&run_id, request, progress_cb) {
        Ok(response) => {
            if !slot.complete(response.result.clone()) {
                warn!("Discarding result of superseded run {run_id}");
            }
            Ok(response)
        }
        Err(e) => {
            slot.clear();
            Err(e)
        }
    }
}

fn execute_run_as(
    run_id: &str,
    request: &RunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<RunResponse> {
    let started = Instant::now();
    let mut timing = RunTimingSummary::default();
    let config = request.config;
    let settings = request.settings;

    validate_config(config)?;

    emit_progress(
        &mut progress_cb,
        RunStage::Provisioning,
        started,
        Some("Checking engine installation".to_string()),
        None,
    );
    let provision_start = Instant::now();
    let install = install_engine(settings)?;
    timing.provision_time_s = provision_start.elapsed().as_secs_f64();

    // the engine resolves table names against its data path
    let mut table_text = None;
    let mut installed_table = None;
    let table_ref = match config.user_table_path() {
        Some(path) => {
            emit_progress(
                &mut progress_cb,
                RunStage::PreparingSpectrum,
                started,
                Some(format!("Normalizing {}", path.display())),
                None,
            );
            let spectrum_start = Instant::now();
            let table = SpectralTable::load(path)?;
            let table_ref = TableRef::for_run(run_id)?;
            let table_path = install.data_dir().join(table_ref.file_name());
            table.write_durable(&table_path)?;
            installed_table = Some(InstalledTable { path: table_path });
            info!(
                "Installed spectrum with {} points ({} duplicates dropped)",
                table.len(),
                table.duplicates_dropped()
            );
            table_text = Some(table.to_engine_text());
            timing.spectrum_time_s = spectrum_start.elapsed().as_secs_f64();
            Some(table_ref)
        }
        None => None,
    };

    emit_progress(
        &mut progress_cb,
        RunStage::CompilingScript,
        started,
        Some("Compiling engine script".to_string()),
        None,
    );
    let compile_start = Instant::now();
    let (script, outputs) = cr_script::compile(config, table_ref.as_ref())?;
    let fingerprint = compute_script_fingerprint(&script, table_text.as_deref());
    timing.compile_time_s = compile_start.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::LaunchingEngine,
        started,
        Some(format!("Launching run {run_id}")),
        None,
    );
    let workspace = Workspace::new(settings.workspace_dir(run_id, request.shared_workspace))?;
    let cancel = request.cancel.clone().unwrap_or_default();
    let supervisor = Supervisor::new(install);
    let mut handle = supervisor.launch_with_cancel(&workspace, &script, cancel)?;

    let engine_start = Instant::now();
    let outcome = handle.wait_with_progress(settings.poll_interval, |tick| {
        emit_progress(
            &mut progress_cb,
            RunStage::RunningEngine,
            started,
            None,
            Some(EngineProgress {
                elapsed_s: tick.elapsed_s,
                pulse_pct: tick.pulse_pct,
            }),
        );
    })?;
    timing.engine_time_s = engine_start.elapsed().as_secs_f64();

    emit_progress(
        &mut progress_cb,
        RunStage::CollectingResults,
        started,
        Some("Reading output files".to_string()),
        None,
    );
    let collect_start = Instant::now();
    let result = cr_engine::collect(run_id, &outcome, &workspace, &outputs)?;
    let manifest = RunManifest::for_result(&result, fingerprint);
    timing.collect_time_s = collect_start.elapsed().as_secs_f64();
    drop(installed_table);

    if result.success {
        info!(
            "Run {run_id} succeeded ({})",
            manifest.engine_version.as_deref().unwrap_or(UNKNOWN_VERSION)
        );
    } else {
        warn!("Run {run_id} {}", result.status_label().to_lowercase());
    }

    timing.total_time_s = started.elapsed().as_secs_f64();
    emit_progress(
        &mut progress_cb,
        RunStage::Completed,
        started,
        Some(result.status_label().to_string()),
        None,
    );

    Ok(RunResponse {
        run_id: run_id.to_string(),
        result,
        manifest,
        workspace: workspace.path().to_path_buf(),
        timing,
    })
}

/// Export a finished run: collected files plus manifest.
pub fn export_response(dir: &Path, response: &RunResponse) -> AppResult<Vec<PathBuf>> {
    Ok(cr_results::export_run(dir, &response.manifest, &response.result)?)
}

/// Load an exported run. Prefer [`RunSlot::restore`] when a malformed
/// export should simply be ignored.
pub fn load_export(dir: &Path) -> AppResult<(RunManifest, RunResult)> {
    Ok(ExportDir::open(dir)?.load()?)
}
