//! Shared application service layer for cloudyrun.
//!
//! This crate centralizes the workflow behind the front end: configuration
//! handling, engine settings, and run execution with progress reporting.

pub mod config_service;
pub mod error;
pub mod progress;
pub mod run_service;
pub mod settings;

// Re-export key types for convenience
pub use config_service::{
    SpectrumSummary, init_config, load_config, normalize_spectrum, preview_script, save_config,
};
pub use error::{AppError, AppResult};
pub use progress::{EngineProgress, RunProgressEvent, RunStage};
pub use run_service::{
    RunRequest, RunResponse, RunTimingSummary, execute_in_slot, execute_run,
    execute_run_with_progress, export_response, install_engine, load_export, new_run_id,
};
pub use settings::EngineSettings;
