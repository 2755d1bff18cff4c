//! cr-results: collected run output, session state, and exports.

pub mod export;
pub mod hash;
pub mod session;
pub mod types;
pub mod version;

pub use export::{ExportDir, MANIFEST_FILE, export_file_name, export_run};
pub use hash::compute_script_fingerprint;
pub use session::RunSlot;
pub use types::*;
pub use version::{UNKNOWN_VERSION, engine_version};

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Export not found: {path}")]
    ExportNotFound { path: std::path::PathBuf },

    #[error("Export is missing the '{kind}' file")]
    MissingFile { kind: cr_project::OutputKind },
}
