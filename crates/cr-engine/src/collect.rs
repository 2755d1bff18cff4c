//! Result collection.

use std::collections::BTreeMap;
use std::fs;
use std::io;

use cr_results::{RunId, RunResult};
use cr_script::OutputFileMap;
use tracing::debug;

use crate::error::EngineResult;
use crate::supervisor::{ProcessOutcome, Workspace};

/// Read every expected file the run left behind.
///
/// Files that were never written are skipped; any other read failure is an
/// error. Success mirrors the process outcome.
pub fn collect(
    run_id: impl Into<RunId>,
    outcome: &ProcessOutcome,
    workspace: &Workspace,
    outputs: &OutputFileMap,
) -> EngineResult<RunResult> {
    let mut files = BTreeMap::new();

    for (kind, name) in outputs.iter() {
        let path = workspace.file(name);
        match fs::read(&path) {
            Ok(bytes) => {
                files.insert(kind, String::from_utf8_lossy(&bytes).into_owned());
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No {kind} file at {}", path.display());
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(RunResult {
        run_id: run_id.into(),
        success: outcome.success,
        exit_code: outcome.exit_code,
        cancelled: outcome.cancelled,
        elapsed_s: outcome.elapsed.as_secs_f64(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cr_project::OutputKind;
    use std::time::Duration;

    fn outcome(workspace: &Workspace, success: bool) -> ProcessOutcome {
        ProcessOutcome {
            success,
            exit_code: Some(if success { 0 } else { 1 }),
            cancelled: false,
            elapsed: Duration::from_millis(1500),
            log_path: workspace.log_path(),
        }
    }

    #[test]
    fn absent_files_are_omitted() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path()).unwrap();
        let mut outputs = OutputFileMap::default();
        outputs.insert(OutputKind::Overview);
        outputs.insert(OutputKind::Continuum);

        fs::write(workspace.file("temp.out"), "main").unwrap();
        fs::write(workspace.file("temp.ovr"), "overview").unwrap();

        let result = collect("r1", &outcome(&workspace, true), &workspace, &outputs).unwrap();

        assert!(result.success);
        assert_eq!(result.elapsed_s, 1.5);
        assert_eq!(result.main_output(), Some("main"));
        assert_eq!(result.file(OutputKind::Overview), Some("overview"));
        assert!(result.log().is_none());
        assert!(result.file(OutputKind::Continuum).is_none());
        assert_eq!(result.files.len(), 2);
    }

    #[test]
    fn failed_run_keeps_whatever_exists() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path()).unwrap();
        fs::write(workspace.log_path(), b"abort\xff\n").unwrap();

        let result = collect(
            "r2",
            &outcome(&workspace, false),
            &workspace,
            &OutputFileMap::default(),
        )
        .unwrap();

        assert!(!result.success);
        assert_eq!(result.status_label(), "Crashed");
        assert_eq!(result.log(), Some("abort\u{fffd}\n"));
        assert!(result.main_output().is_none());
    }
}
