//! cr-script: engine command scripts and user spectrum tables.
//!
//! Turns a [`cr_project::SimulationConfig`] into the ordered command lines the
//! engine interprets, together with the map of files the run is expected to
//! produce, and normalizes uploaded two-column spectra into the table format
//! the engine reads.

pub mod compile;
pub mod error;
pub mod script;
pub mod spectrum;

pub use compile::compile;
pub use error::{ScriptError, ScriptResult};
pub use script::{
    BASE_NAME, CompiledScript, LOG_FILE, OutputFileMap, ScriptBuilder, input_file_name,
    output_file_name,
};
pub use spectrum::{SpectralTable, TableRef, USER_TABLE_FILE};
