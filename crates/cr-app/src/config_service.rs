//! Configuration loading, saving, validation and previews.

use std::path::Path;

use cr_project::{SimulationConfig, validate_config};
use cr_script::{CompiledScript, OutputFileMap, SpectralTable, TableRef};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Load a configuration from a YAML file and validate it.
pub fn load_config(path: &Path) -> AppResult<SimulationConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigFileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: SimulationConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse configuration YAML: {}", e)))?;

    validate_config(&config)?;
    Ok(config)
}

/// Save a configuration to a YAML file. Invalid configurations are refused.
pub fn save_config(path: &Path, config: &SimulationConfig) -> AppResult<()> {
    validate_config(config)?;

    let content = serde_yaml::to_string(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize configuration: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ConfigFileWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Write a configuration holding every default. Existing files are kept.
pub fn init_config(path: &Path) -> AppResult<SimulationConfig> {
    if path.exists() {
        return Err(AppError::InvalidInput(format!(
            "{} already exists",
            path.display()
        )));
    }
    let config = SimulationConfig::default();
    save_config(path, &config)?;
    info!("Wrote default configuration to {}", path.display());
    Ok(config)
}

/// Script the configuration would run with.
///
/// A user spectrum is referenced by its installed name without being read,
/// so previews work before the table exists.
pub fn preview_script(config: &SimulationConfig) -> AppResult<(CompiledScript, OutputFileMap)> {
    validate_config(config)?;
    let table = config.user_table_path().map(|_| TableRef::user_table());
    Ok(cr_script::compile(config, table.as_ref())?)
}

/// Summary of a normalized spectrum.
#[derive(Debug, Clone)]
pub struct SpectrumSummary {
    pub points: usize,
    pub parsed_rows: usize,
    pub duplicates_dropped: usize,
    pub energy_range: (f64, f64),
}

impl SpectrumSummary {
    pub fn of(table: &SpectralTable) -> Self {
        Self {
            points: table.len(),
            parsed_rows: table.parsed_rows(),
            duplicates_dropped: table.duplicates_dropped(),
            energy_range: table.energy_range(),
        }
    }
}

/// Normalize a spectrum file, optionally writing the engine-ready table.
pub fn normalize_spectrum(input: &Path, output: Option<&Path>) -> AppResult<(SpectralTable, SpectrumSummary)> {
    let table = SpectralTable::load(input)?;
    if let Some(output) = output {
        table.write_durable(output)?;
        info!("Wrote {} points to {}", table.len(), output.display());
    }
    let summary = SpectrumSummary::of(&table);
    Ok((table, summary))
}
