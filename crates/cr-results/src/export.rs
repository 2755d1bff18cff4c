//! Run export API.
//!
//! An export directory holds one run: `manifest.json` plus one
//! `cloudy_sim.<id>` file per collected output.

use crate::types::{RunManifest, RunResult};
use crate::{ResultsError, ResultsResult};
use cr_project::OutputKind;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";

const EXPORT_STEM: &str = "cloudy_sim";

/// Name an output is exported under, e.g. `cloudy_sim.ovr`.
pub fn export_file_name(kind: OutputKind) -> String {
    format!("{EXPORT_STEM}.{}", kind.id())
}

/// Write a finished run into `dir`, creating it if needed.
pub fn export_run(dir: &Path, manifest: &RunManifest, result: &RunResult) -> ResultsResult<Vec<PathBuf>> {
    ExportDir::new(dir.to_path_buf())?.save(manifest, result)
}

#[derive(Debug, Clone)]
pub struct ExportDir {
    root_dir: PathBuf,
}

impl ExportDir {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Open an existing export without creating anything.
    pub fn open(root_dir: &Path) -> ResultsResult<Self> {
        if !root_dir.join(MANIFEST_FILE).is_file() {
            return Err(ResultsError::ExportNotFound {
                path: root_dir.to_path_buf(),
            });
        }
        Ok(Self {
            root_dir: root_dir.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    pub fn file_path(&self, kind: OutputKind) -> PathBuf {
        self.root_dir.join(export_file_name(kind))
    }

    /// Write every collected file and the manifest; returns the written paths.
    pub fn save(&self, manifest: &RunManifest, result: &RunResult) -> ResultsResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(result.files.len() + 1);

        for (kind, text) in &result.files {
            let path = self.file_path(*kind);
            fs::write(&path, text)?;
            written.push(path);
        }

        // manifest last: its presence marks a complete export
        let manifest_path = self.root_dir.join(MANIFEST_FILE);
        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(&manifest_path, manifest_json)?;
        written.push(manifest_path);

        Ok(written)
    }

    pub fn load_manifest(&self) -> ResultsResult<RunManifest> {
        let manifest_path = self.root_dir.join(MANIFEST_FILE);

        if !manifest_path.exists() {
            return Err(ResultsError::ExportNotFound {
                path: self.root_dir.clone(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Rebuild the result a manifest describes. Every listed file must exist.
    pub fn load(&self) -> ResultsResult<(RunManifest, RunResult)> {
        let manifest = self.load_manifest()?;

        let mut files = BTreeMap::new();
        for &kind in &manifest.files {
            let path = self.file_path(kind);
            if !path.is_file() {
                return Err(ResultsError::MissingFile { kind });
            }
            let bytes = fs::read(&path)?;
            files.insert(kind, String::from_utf8_lossy(&bytes).into_owned());
        }

        let result = RunResult {
            run_id: manifest.run_id.clone(),
            success: manifest.success,
            exit_code: manifest.exit_code,
            cancelled: manifest.cancelled,
            elapsed_s: manifest.elapsed_s,
            files,
        };
        Ok((manifest, result))
    }
}
