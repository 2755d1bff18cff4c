//! Result data types.

use std::collections::BTreeMap;

use cr_project::OutputKind;
use serde::{Deserialize, Serialize};

pub type RunId = String;

/// Everything collected from one finished engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: RunId,
    /// Engine exited with status 0.
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub cancelled: bool,
    pub elapsed_s: f64,
    /// Full text of every expected file that existed when the run ended.
    #[serde(default)]
    pub files: BTreeMap<OutputKind, String>,
}

impl RunResult {
    pub fn file(&self, kind: OutputKind) -> Option<&str> {
        self.files.get(&kind).map(String::as_str)
    }

    pub fn main_output(&self) -> Option<&str> {
        self.file(OutputKind::Main)
    }

    pub fn log(&self) -> Option<&str> {
        self.file(OutputKind::Log)
    }

    /// Files offered for download; the log is diagnostics, not a product.
    pub fn downloads(&self) -> impl Iterator<Item = (OutputKind, &str)> {
        self.files
            .iter()
            .filter(|(kind, _)| **kind != OutputKind::Log)
            .map(|(kind, text)| (*kind, text.as_str()))
    }

    pub fn status_label(&self) -> &'static str {
        if self.success {
            "Succeeded"
        } else if self.cancelled {
            "Cancelled"
        } else {
            "Crashed"
        }
    }
}

/// Metadata written next to exported files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: RunId,
    pub timestamp: String,
    /// SHA-256 of the script (and user table) that produced the run.
    pub fingerprint: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub cancelled: bool,
    pub elapsed_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
    pub files: Vec<OutputKind>,
}

impl RunManifest {
    pub fn for_result(result: &RunResult, fingerprint: String) -> Self {
        Self {
            run_id: result.run_id.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            fingerprint,
            success: result.success,
            exit_code: result.exit_code,
            cancelled: result.cancelled,
            elapsed_s: result.elapsed_s,
            engine_version: result
                .main_output()
                .and_then(crate::version::engine_version)
                .map(str::to_string),
            files: result.files.keys().copied().collect(),
        }
    }
}
