//! Engine settings.
//!
//! Defaults point at the current directory; `CLOUDYRUN_*` environment
//! variables override them and the front end may override both.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cr_engine::{
    DEFAULT_ARCHIVE_NAME, DEFAULT_ARCHIVE_URL, DEFAULT_INSTALL_DIR, HttpFetcher, LocalArchive,
    Provisioner,
};

pub const INSTALL_DIR_VAR: &str = "CLOUDYRUN_INSTALL_DIR";
pub const ARCHIVE_URL_VAR: &str = "CLOUDYRUN_ARCHIVE_URL";
pub const WORK_DIR_VAR: &str = "CLOUDYRUN_WORK_DIR";

pub const DEFAULT_WORK_ROOT: &str = "./cloudy_work";

/// Subdirectory of the work root used when runs share one workspace.
pub const SHARED_WORKSPACE: &str = "shared";

#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub install_dir: PathBuf,
    /// Where the downloaded archive is kept until it is unpacked.
    pub archive_path: PathBuf,
    /// `http(s)://` URL, `file://` URL, or a local path to the archive.
    pub archive_source: String,
    pub work_root: PathBuf,
    pub poll_interval: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(DEFAULT_INSTALL_DIR),
            archive_path: PathBuf::from(DEFAULT_ARCHIVE_NAME),
            archive_source: DEFAULT_ARCHIVE_URL.to_string(),
            work_root: PathBuf::from(DEFAULT_WORK_ROOT),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl EngineSettings {
    /// Defaults with overrides from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(dir) = non_empty(INSTALL_DIR_VAR) {
            settings.install_dir = PathBuf::from(dir);
        }
        if let Some(source) = non_empty(ARCHIVE_URL_VAR) {
            settings.archive_source = source;
        }
        if let Some(dir) = non_empty(WORK_DIR_VAR) {
            settings.work_root = PathBuf::from(dir);
        }
        settings
    }

    /// Keep everything under one directory; used by tests and throwaway runs.
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            install_dir: root.join("cloudy_install"),
            archive_path: root.join(DEFAULT_ARCHIVE_NAME),
            work_root: root.join("cloudy_work"),
            ..Self::default()
        }
    }

    pub fn workspace_dir(&self, run_id: &str, shared: bool) -> PathBuf {
        if shared {
            self.work_root.join(SHARED_WORKSPACE)
        } else {
            self.work_root.join(run_id)
        }
    }

    /// Local archive path when the source is not a web URL.
    pub fn local_archive(&self) -> Option<PathBuf> {
        let source = self.archive_source.as_str();
        if let Some(path) = source.strip_prefix("file://") {
            Some(PathBuf::from(path))
        } else if source.starts_with("http://") || source.starts_with("https://") {
            None
        } else {
            Some(PathBuf::from(source))
        }
    }

    pub fn provisioner(&self) -> Provisioner {
        match self.local_archive() {
            Some(path) => Provisioner::new(
                &self.install_dir,
                &self.archive_path,
                LocalArchive::new(path),
            ),
            None => Provisioner::new(
                &self.install_dir,
                &self.archive_path,
                HttpFetcher::new(&self.archive_source),
            ),
        }
    }
}
