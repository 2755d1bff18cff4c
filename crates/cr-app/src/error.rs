//! Error types for the cr-app service layer.

use std::path::PathBuf;

/// Application error type that wraps errors from the backend crates and
/// gives the front end a single error to report.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file: {}", path.display())]
    ConfigFileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write configuration file: {}", path.display())]
    ConfigFileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Configuration validation failed: {0}")]
    Validation(String),

    #[error("Spectrum error: {0}")]
    Spectrum(String),

    #[error("Script compilation failed: {0}")]
    Script(String),

    #[error("Engine installation failed: {0}")]
    Provision(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cr-app operations.
pub type AppResult<T> = Result<T, AppError>;

// Conversions from backend error types
impl From<cr_project::ProjectError> for AppError {
    fn from(err: cr_project::ProjectError) -> Self {
        match err {
            cr_project::ProjectError::Validation(e) => AppError::Validation(e.to_string()),
            other => AppError::Config(other.to_string()),
        }
    }
}

impl From<cr_project::ValidationError> for AppError {
    fn from(err: cr_project::ValidationError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<cr_script::ScriptError> for AppError {
    fn from(err: cr_script::ScriptError) -> Self {
        match err {
            cr_script::ScriptError::EmptySpectrum { .. } => AppError::Spectrum(err.to_string()),
            other => AppError::Script(other.to_string()),
        }
    }
}

impl From<cr_engine::EngineError> for AppError {
    fn from(err: cr_engine::EngineError) -> Self {
        if err.is_provisioning() {
            AppError::Provision(err.to_string())
        } else {
            AppError::Engine(err.to_string())
        }
    }
}

impl From<cr_results::ResultsError> for AppError {
    fn from(err: cr_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
