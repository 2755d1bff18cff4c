//! Engine installation and process supervision.
//!
//! Provides:
//! - On-demand provisioning of the engine from a zip archive
//! - Durable script handoff and launch with per-workspace exclusion
//! - Non-blocking polling, cancellation and progress ticks
//! - Collection of the files a run produced

pub mod collect;
pub mod error;
pub mod provision;
pub mod supervisor;

pub use collect::collect;
pub use error::{EngineError, EngineResult};
pub use provision::{
    ArchiveFetcher, DEFAULT_ARCHIVE_NAME, DEFAULT_ARCHIVE_URL, DEFAULT_INSTALL_DIR,
    EngineInstall, HttpFetcher, LocalArchive, MARKER_FILE, Provisioner,
};
pub use supervisor::{
    CancelToken, DATA_PATH_VAR, EngineTick, ProcessOutcome, RunHandle, RunPoll, Supervisor,
    Workspace,
};
