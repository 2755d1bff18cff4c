//! Error types for engine provisioning and supervision.

use std::path::PathBuf;

use thiserror::Error;

/// Errors encountered while installing or running the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine executable not found: {}", path.display())]
    ExecutableMissing { path: PathBuf },

    #[error("Workspace already has an active run: {}", path.display())]
    Busy { path: PathBuf },

    #[error("Failed to launch engine '{}': {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download engine archive from {url}: {message}")]
    ProvisionFetch { url: String, message: String },

    #[error("Failed to unpack engine archive '{}': {message}", archive.display())]
    ProvisionExtract { archive: PathBuf, message: String },

    #[error("Engine installation under '{}' has no {what}", dir.display())]
    ProvisionIncomplete { dir: PathBuf, what: &'static str },

    #[error("Failed to install engine under '{}': {source}", dir.display())]
    ProvisionIo {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid engine pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Errors raised before an engine could be made available at all.
    pub fn is_provisioning(&self) -> bool {
        matches!(
            self,
            Self::ProvisionFetch { .. }
                | Self::ProvisionExtract { .. }
                | Self::ProvisionIncomplete { .. }
                | Self::ProvisionIo { .. }
                | Self::Pattern(_)
        )
    }
}
