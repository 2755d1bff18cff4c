//! Engine provisioning.
//!
//! The engine ships as a prebuilt archive. On first use it is fetched, unpacked
//! into the install directory and searched for the executable and the data
//! directory; later calls reuse the cached [`EngineInstall`].

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::{debug, info};

use crate::error::{EngineError, EngineResult};

pub const DEFAULT_INSTALL_DIR: &str = "./cloudy_install";
pub const DEFAULT_ARCHIVE_NAME: &str = "cloudy_linux_ready.zip";
pub const DEFAULT_ARCHIVE_URL: &str = "https://www.dropbox.com/scl/fi/d8y2x0vvijqupugjrsdyr/cloudy_linux_ready.zip?rlkey=b011qvjfnc7inu2w0uawu0hs5&st=irlslrsz&dl=1";

/// Present in every complete installation; its directory is the data path.
pub const MARKER_FILE: &str = "checksums.dat";

const EXECUTABLE_GLOBS: [&str; 2] = ["**/cloudy.exe", "**/source/source"];

/// Source of the engine archive.
pub trait ArchiveFetcher {
    /// Write the archive to `dest`.
    fn fetch(&self, dest: &Path) -> EngineResult<()>;

    fn describe(&self) -> String;
}

/// Downloads the archive over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    url: String,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(DEFAULT_ARCHIVE_URL)
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, dest: &Path) -> EngineResult<()> {
        info!("Downloading engine archive from {}", self.url);
        let fetch_err = |message: String| EngineError::ProvisionFetch {
            url: self.url.clone(),
            message,
        };

        let response = ureq::get(&self.url)
            .call()
            .map_err(|e| fetch_err(e.to_string()))?;

        // a partial download never lands under the final name
        let partial = dest.with_extension("part");
        let mut file = File::create(&partial)?;
        let bytes = io::copy(&mut response.into_reader(), &mut file)
            .map_err(|e| fetch_err(e.to_string()))?;
        file.sync_all()?;
        fs::rename(&partial, dest)?;

        debug!("Downloaded {bytes} bytes to {}", dest.display());
        Ok(())
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Copies an archive that is already on disk.
#[derive(Debug, Clone)]
pub struct LocalArchive {
    path: PathBuf,
}

impl LocalArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ArchiveFetcher for LocalArchive {
    fn fetch(&self, dest: &Path) -> EngineResult<()> {
        if !self.path.is_file() {
            return Err(EngineError::ProvisionFetch {
                url: self.describe(),
                message: "archive file does not exist".to_string(),
            });
        }
        fs::copy(&self.path, dest)?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Located engine files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInstall {
    executable: PathBuf,
    data_dir: PathBuf,
}

impl EngineInstall {
    pub fn new(executable: impl Into<PathBuf>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            data_dir: data_dir.into(),
        }
    }

    /// Search an unpacked installation for the executable and data directory.
    ///
    /// Both paths are absolute: the engine runs with the workspace as its
    /// current directory.
    pub fn discover(install_dir: &Path) -> EngineResult<Self> {
        let root = fs::canonicalize(install_dir).map_err(|source| EngineError::ProvisionIo {
            dir: install_dir.to_path_buf(),
            source,
        })?;
        let install_dir = root.as_path();
        let marker = find_file(install_dir, &[matcher(&format!("**/{MARKER_FILE}"))?])?
            .ok_or_else(|| EngineError::ProvisionIncomplete {
                dir: install_dir.to_path_buf(),
                what: "data directory",
            })?;
        let data_dir = marker
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| install_dir.to_path_buf());

        let exe_matchers = EXECUTABLE_GLOBS
            .iter()
            .map(|pattern| matcher(pattern))
            .collect::<EngineResult<Vec<_>>>()?;
        let executable =
            find_file(install_dir, &exe_matchers)?.ok_or_else(|| EngineError::ProvisionIncomplete {
                dir: install_dir.to_path_buf(),
                what: "engine executable",
            })?;

        Ok(Self {
            executable,
            data_dir,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Value for the engine's data path variable; the engine expects a
    /// trailing separator.
    pub fn data_path_value(&self) -> String {
        let mut value = self.data_dir.display().to_string();
        if !value.ends_with('/') {
            value.push('/');
        }
        value
    }
}

/// Installs the engine on demand and caches where it ended up.
pub struct Provisioner {
    install_dir: PathBuf,
    archive_path: PathBuf,
    fetcher: Box<dyn ArchiveFetcher + Send + Sync>,
    cached: Option<EngineInstall>,
}

impl Provisioner {
    pub fn new(
        install_dir: impl Into<PathBuf>,
        archive_path: impl Into<PathBuf>,
        fetcher: impl ArchiveFetcher + Send + Sync + 'static,
    ) -> Self {
        Self {
            install_dir: install_dir.into(),
            archive_path: archive_path.into(),
            fetcher: Box::new(fetcher),
            cached: None,
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Whether a previous install left its marker file behind.
    pub fn is_installed(&self) -> EngineResult<bool> {
        has_marker(&self.install_dir)
    }

    /// Make sure the engine is unpacked and runnable; idempotent.
    pub fn ensure_installed(&mut self) -> EngineResult<&EngineInstall> {
        let install = match self.cached.take() {
            Some(install) => install,
            None => self.locate().map_err(|err| match err {
                EngineError::Io(source) => EngineError::ProvisionIo {
                    dir: self.install_dir.clone(),
                    source,
                },
                other => other,
            })?,
        };
        Ok(self.cached.insert(install))
    }

    fn locate(&self) -> EngineResult<EngineInstall> {
        if has_marker(&self.install_dir)? {
            debug!("Engine already present in {}", self.install_dir.display());
        } else {
            self.install()?;
        }

        let install = EngineInstall::discover(&self.install_dir)?;
        make_executable(install.executable())?;
        info!(
            "Engine ready: {} (data {})",
            install.executable().display(),
            install.data_dir().display()
        );
        Ok(install)
    }

    fn install(&self) -> EngineResult<()> {
        if self.archive_path.exists() {
            debug!("Reusing archive {}", self.archive_path.display());
        } else {
            info!("Fetching engine archive from {}", self.fetcher.describe());
            self.fetcher.fetch(&self.archive_path)?;
        }

        fs::create_dir_all(&self.install_dir)?;
        extract_archive(&self.archive_path, &self.install_dir)?;
        fs::remove_file(&self.archive_path)?;
        info!("Engine unpacked into {}", self.install_dir.display());
        Ok(())
    }
}

fn extract_archive(archive: &Path, dest: &Path) -> EngineResult<()> {
    let extract_err = |message: String| EngineError::ProvisionExtract {
        archive: archive.to_path_buf(),
        message,
    };

    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| extract_err(e.to_string()))?;
    debug!("Extracting {} entries", zip.len());
    zip.extract(dest).map_err(|e| extract_err(e.to_string()))
}

fn matcher(pattern: &str) -> EngineResult<GlobMatcher> {
    Ok(Glob::new(pattern)?.compile_matcher())
}

fn has_marker(install_dir: &Path) -> EngineResult<bool> {
    if !install_dir.is_dir() {
        return Ok(false);
    }
    Ok(find_file(install_dir, &[matcher(&format!("**/{MARKER_FILE}"))?])?.is_some())
}

/// First file below `root` (depth-first, entries in name order) whose path
/// relative to `root` matches any of `matchers`.
fn find_file(root: &Path, matchers: &[GlobMatcher]) -> EngineResult<Option<PathBuf>> {
    find_file_recursive(root, root, matchers)
}

fn find_file_recursive(
    root: &Path,
    current_dir: &Path,
    matchers: &[GlobMatcher],
) -> EngineResult<Option<PathBuf>> {
    let mut entries = fs::read_dir(current_dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let entry_path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_file() {
            let relative = entry_path.strip_prefix(root).unwrap_or(&entry_path);
            if matchers.iter().any(|m| m.is_match(relative)) {
                return Ok(Some(entry_path));
            }
        } else if file_type.is_dir()
            && let Some(found) = find_file_recursive(root, &entry_path, matchers)?
        {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> EngineResult<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> EngineResult<()> {
    Ok(())
}
