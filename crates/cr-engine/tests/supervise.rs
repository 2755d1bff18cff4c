//! Supervisor tests against a shell stand-in for the engine.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use cr_engine::{EngineError, EngineInstall, Supervisor, Workspace, collect};
use cr_project::{OutputKind, SimulationConfig};
use cr_script::{CompiledScript, OutputFileMap, ScriptBuilder};
use tempfile::TempDir;

const FAKE_ENGINE: &str = r##"#!/bin/sh
[ "$1" = "-r" ] || { echo "usage: $0 -r base" >&2; exit 2; }
in="$2.in"
[ -f "$in" ] || { echo "missing $in" >&2; exit 3; }
echo "fake engine reading $in"
{
  echo ""
  echo "                       Cloudy 23.01 master"
  echo " data path: $CLOUDY_DATA_PATH"
} > "$2.out"
if grep -q '^save overview' "$in"; then echo "#depth Te" > "$2.ovr"; fi
if grep -q '^title crash' "$in"; then echo "PROBLEM disaster" >&2; exit 1; fi
if grep -q '^title slow' "$in"; then exec sleep 20; fi
exit 0
"##;

/// One installation per test binary; writing the script while other tests
/// spawn children would race with exec.
fn fake_install() -> &'static EngineInstall {
    static INSTALL: OnceLock<(TempDir, EngineInstall)> = OnceLock::new();
    &INSTALL
        .get_or_init(|| {
            let dir = tempfile::tempdir().unwrap();
            let data_dir = dir.path().join("data");
            fs::create_dir_all(&data_dir).unwrap();
            fs::write(data_dir.join("checksums.dat"), "").unwrap();

            let exe = dir.path().join("source").join("cloudy.exe");
            fs::create_dir_all(exe.parent().unwrap()).unwrap();
            fs::write(&exe, FAKE_ENGINE).unwrap();
            fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();

            let install = EngineInstall::new(exe, data_dir);
            (dir, install)
        })
        .1
}

fn script(title: &str) -> CompiledScript {
    let mut builder = ScriptBuilder::new();
    builder.line(format!("title {title}")).line("hden 4.0");
    builder.build()
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[test]
fn successful_run_collects_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path()).unwrap();
    let supervisor = Supervisor::new(fake_install().clone());

    let (script, outputs) = cr_script::compile(&SimulationConfig::default(), None).unwrap();
    let mut handle = supervisor.launch(&workspace, &script).unwrap();
    let outcome = handle.wait().unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.exit_code, Some(0));
    assert!(!outcome.cancelled);
    assert_eq!(outcome.log_path, workspace.log_path());
    assert_eq!(read(&workspace.script_path()), script.render());

    let result = collect("ok", &outcome, &workspace, &outputs).unwrap();
    let main = result.main_output().unwrap();
    assert!(main.contains("Cloudy 23.01 master"));
    let expected_data = format!(" data path: {}", fake_install().data_path_value());
    assert!(main.lines().any(|line| line == expected_data));
    assert_eq!(result.file(OutputKind::Overview), Some("#depth Te\n"));
    assert!(result.file(OutputKind::Continuum).is_none());
    assert!(result.log().unwrap().contains("fake engine reading temp.in"));
}

#[test]
fn relative_install_dir_launches_from_any_workspace() {
    let root = fake_install().data_dir().parent().unwrap();
    let cwd = std::env::current_dir().unwrap();
    let relative: PathBuf = cwd
        .components()
        .skip(1)
        .map(|_| Path::new(".."))
        .collect::<PathBuf>()
        .join(root.strip_prefix("/").unwrap());
    let install = EngineInstall::discover(&relative).unwrap();

    // deep enough that the relative spelling no longer resolves from inside it
    let dir = tempfile::tempdir().unwrap();
    let nested: PathBuf = (0..cwd.components().count() + 2)
        .map(|i| format!("d{i}"))
        .collect();
    let workspace = Workspace::new(dir.path().join(nested)).unwrap();

    let outcome = Supervisor::new(install.clone())
        .launch(&workspace, &script("relative"))
        .unwrap()
        .wait()
        .unwrap();

    assert!(outcome.success);
    let main = read(&workspace.path().join("temp.out"));
    let expected_data = format!(" data path: {}", install.data_path_value());
    assert!(expected_data.contains(" data path: /"));
    assert!(main.lines().any(|line| line == expected_data));
}

#[test]
fn crashed_run_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path()).unwrap();
    let supervisor = Supervisor::new(fake_install().clone());

    let outcome = supervisor
        .launch(&workspace, &script("crash"))
        .unwrap()
        .wait()
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.exit_code, Some(1));

    let result = collect("crash", &outcome, &workspace, &OutputFileMap::default()).unwrap();
    assert!(!result.success);
    assert!(result.log().unwrap().contains("PROBLEM disaster"));
    assert!(result.main_output().is_some());
}

#[test]
fn missing_executable_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path().join("ws")).unwrap();
    let supervisor = Supervisor::new(EngineInstall::new(
        dir.path().join("no/such/cloudy.exe"),
        dir.path(),
    ));

    let err = supervisor.launch(&workspace, &script("x")).unwrap_err();

    assert!(matches!(err, EngineError::ExecutableMissing { .. }));
    assert!(!workspace.log_path().exists());
    assert!(!workspace.script_path().exists());
}

#[test]
fn stale_outputs_are_cleared_before_launch() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path()).unwrap();
    fs::write(workspace.file("temp.hyd"), "old hydrogen").unwrap();
    fs::write(workspace.file("temp.ovr"), "old overview").unwrap();

    let supervisor = Supervisor::new(fake_install().clone());
    let outcome = supervisor
        .launch(&workspace, &script("plain"))
        .unwrap()
        .wait()
        .unwrap();
    assert!(outcome.success);

    let mut outputs = OutputFileMap::default();
    outputs.insert(OutputKind::HydrogenIonization);
    outputs.insert(OutputKind::Overview);
    let result = collect("stale", &outcome, &workspace, &outputs).unwrap();

    assert!(result.file(OutputKind::HydrogenIonization).is_none());
    assert!(result.file(OutputKind::Overview).is_none());
}

#[test]
fn second_run_on_busy_workspace_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path()).unwrap();
    let supervisor = Supervisor::new(fake_install().clone());

    let mut slow = supervisor.launch(&workspace, &script("slow")).unwrap();

    // same directory through a different spelling
    let alias = Workspace::new(dir.path().join(".")).unwrap();
    let err = supervisor.launch(&alias, &script("plain")).unwrap_err();
    assert!(matches!(err, EngineError::Busy { .. }));

    slow.cancel_token().cancel();
    let outcome = slow.wait().unwrap();
    assert!(outcome.cancelled);
    assert!(!outcome.success);

    let outcome = supervisor
        .launch(&workspace, &script("plain"))
        .unwrap()
        .wait()
        .unwrap();
    assert!(outcome.success);
}

#[test]
fn progress_ticks_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path()).unwrap();
    let supervisor = Supervisor::new(fake_install().clone());

    let mut handle = supervisor.launch(&workspace, &script("slow")).unwrap();
    let token = handle.cancel_token();
    let mut ticks = Vec::new();

    let outcome = handle
        .wait_with_progress(Duration::from_millis(10), |tick| {
            ticks.push(tick);
            if ticks.len() == 3 {
                token.cancel();
            }
        })
        .unwrap();

    assert!(outcome.cancelled);
    assert_eq!(ticks.len(), 3);
    assert!(ticks.iter().all(|t| u64::from(t.pulse_pct) == t.elapsed_s % 100));
}

#[test]
fn spawn_failure_releases_workspace() {
    let engine = Supervisor::new(fake_install().clone());
    let dir = tempfile::tempdir().unwrap();
    let exe = dir.path().join("cloudy.exe");
    fs::write(&exe, "not a program").unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o644)).unwrap();

    let workspace = Workspace::new(dir.path().join("ws")).unwrap();
    let broken = Supervisor::new(EngineInstall::new(&exe, dir.path()));
    let err = broken.launch(&workspace, &script("x")).unwrap_err();
    assert!(matches!(err, EngineError::Spawn { .. }));

    let outcome = engine
        .launch(&workspace, &script("plain"))
        .unwrap()
        .wait()
        .unwrap();
    assert!(outcome.success);
}
