//! Provisioning from a locally built engine archive.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cr_engine::{ArchiveFetcher, EngineError, EngineResult, LocalArchive, Provisioner};
use zip::write::SimpleFileOptions;

fn build_archive(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn engine_archive(dir: &Path) -> PathBuf {
    let path = dir.join("upstream.zip");
    build_archive(
        &path,
        &[
            ("cloudy/data/checksums.dat", "abc  file\n"),
            ("cloudy/data/hm12.dat", "background\n"),
            ("cloudy/source/cloudy.exe", "#!/bin/sh\nexit 0\n"),
        ],
    );
    path
}

/// Counts how often the archive is fetched.
struct CountingFetcher {
    inner: LocalArchive,
    calls: Arc<AtomicUsize>,
}

impl ArchiveFetcher for CountingFetcher {
    fn fetch(&self, dest: &Path) -> EngineResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.fetch(dest)
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

#[test]
fn installs_once_and_locates_engine() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = engine_archive(dir.path());
    let install_dir = dir.path().join("cloudy_install");
    let archive_path = dir.path().join("cloudy_linux_ready.zip");
    let calls = Arc::new(AtomicUsize::new(0));

    let mut provisioner = Provisioner::new(
        &install_dir,
        &archive_path,
        CountingFetcher {
            inner: LocalArchive::new(&upstream),
            calls: Arc::clone(&calls),
        },
    );
    assert!(!provisioner.is_installed().unwrap());

    let install = provisioner.ensure_installed().unwrap().clone();
    let root = fs::canonicalize(&install_dir).unwrap();
    assert_eq!(install.executable(), root.join("cloudy/source/cloudy.exe"));
    assert_eq!(install.data_dir(), root.join("cloudy/data"));
    assert!(!archive_path.exists());
    assert!(provisioner.is_installed().unwrap());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(install.executable()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    assert_eq!(provisioner.ensure_installed().unwrap(), &install);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // a fresh provisioner sees the marker and never fetches
    let mut again = Provisioner::new(
        &install_dir,
        &archive_path,
        LocalArchive::new(dir.path().join("gone.zip")),
    );
    assert_eq!(again.ensure_installed().unwrap(), &install);
}

#[test]
fn existing_archive_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("cloudy_linux_ready.zip");
    fs::rename(engine_archive(dir.path()), &archive_path).unwrap();

    let mut provisioner = Provisioner::new(
        dir.path().join("install"),
        &archive_path,
        LocalArchive::new(dir.path().join("missing.zip")),
    );
    provisioner.ensure_installed().unwrap();
    assert!(!archive_path.exists());
}

#[test]
fn archive_without_executable_is_incomplete() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = dir.path().join("upstream.zip");
    build_archive(&upstream, &[("data/checksums.dat", "")]);

    let mut provisioner = Provisioner::new(
        dir.path().join("install"),
        dir.path().join("archive.zip"),
        LocalArchive::new(&upstream),
    );
    let err = provisioner.ensure_installed().unwrap_err();
    assert!(matches!(
        err,
        EngineError::ProvisionIncomplete {
            what: "engine executable",
            ..
        }
    ));
}

#[test]
fn corrupt_archive_fails_to_extract() {
    let dir = tempfile::tempdir().unwrap();
    let upstream = dir.path().join("upstream.zip");
    fs::write(&upstream, "this is not a zip file").unwrap();

    let mut provisioner = Provisioner::new(
        dir.path().join("install"),
        dir.path().join("archive.zip"),
        LocalArchive::new(&upstream),
    );
    let err = provisioner.ensure_installed().unwrap_err();
    assert!(matches!(err, EngineError::ProvisionExtract { .. }));
    assert!(err.is_provisioning());
}

#[test]
fn unreachable_archive_fails_to_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let mut provisioner = Provisioner::new(
        dir.path().join("install"),
        dir.path().join("archive.zip"),
        LocalArchive::new(dir.path().join("nowhere.zip")),
    );
    let err = provisioner.ensure_installed().unwrap_err();
    assert!(matches!(err, EngineError::ProvisionFetch { .. }));
}

#[test]
fn io_failures_during_install_are_provisioning_errors() {
    let dir = tempfile::tempdir().unwrap();
    let archive_path = dir.path().join("cloudy_linux_ready.zip");
    fs::rename(engine_archive(dir.path()), &archive_path).unwrap();
    // a plain file where the install directory should go
    let install_dir = dir.path().join("install");
    fs::write(&install_dir, "occupied").unwrap();

    let mut provisioner = Provisioner::new(
        &install_dir,
        &archive_path,
        LocalArchive::new(dir.path().join("missing.zip")),
    );
    let err = provisioner.ensure_installed().unwrap_err();
    assert!(matches!(err, EngineError::ProvisionIo { .. }), "{err:?}");
    assert!(err.is_provisioning());
}
