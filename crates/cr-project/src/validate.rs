//! Configuration validation logic.

use crate::schema::{Intensity, OutputKind, RadiationSource, SimulationConfig};
use cr_core::{Scale, ScaledValue, ensure_finite};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Output '{kind}' is listed more than once")]
    DuplicateOutput { kind: OutputKind },

    #[error("Output '{kind}' is always collected and cannot be requested")]
    ImplicitOutput { kind: OutputKind },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, v: f64) -> Result<(), ValidationError> {
    ensure_finite(v, "configuration value")
        .map(|_| ())
        .map_err(|_| invalid(field, v, "must be finite"))
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive and finite"))
    }
}

/// Linear magnitudes describe a physical size, so they must be positive.
fn scaled(field: &str, v: &ScaledValue) -> Result<(), ValidationError> {
    match v.scale {
        Scale::Linear => positive(field, v.magnitude),
        Scale::Log => finite(field, v.magnitude),
    }
}

pub fn validate_config(config: &SimulationConfig) -> Result<(), ValidationError> {
    if config.version > crate::schema::CONFIG_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: config.version,
        });
    }

    if config.title.trim().is_empty() {
        return Err(invalid("title", &config.title, "must not be empty"));
    }
    if config.title.chars().any(char::is_control) {
        return Err(invalid(
            "title",
            config.title.escape_debug(),
            "must be a single line without control characters",
        ));
    }

    validate_radiation(&config.radiation)?;

    match &config.intensity {
        Intensity::Luminosity { total } => scaled("intensity.total", total)?,
        Intensity::IonizationParameter { log_u } => finite("intensity.log_u", *log_u)?,
    }

    finite("medium.hden_log", config.medium.hden_log)?;

    scaled("radius.inner", &config.radius.inner)?;
    if let Some(outer) = &config.radius.outer {
        scaled("radius.outer", outer)?;
        if let (Some(inner_log), Some(outer_log)) = (config.radius.inner.log10(), outer.log10())
            && outer_log <= inner_log
        {
            return Err(invalid(
                "radius.outer",
                outer,
                "must be larger than the inner radius",
            ));
        }
    }

    if let Some(column) = config.stops.column_density_log {
        finite("stops.column_density_log", column)?;
    }
    if let Some(t) = config.stops.min_temperature_k {
        positive("stops.min_temperature_k", t)?;
    }

    let cov = config.geometry.covering_factor;
    if !(cov.is_finite() && (0.0..=1.0).contains(&cov)) {
        return Err(invalid(
            "geometry.covering_factor",
            cov,
            "must lie between 0.0 and 1.0",
        ));
    }

    let mut seen = HashSet::new();
    for &kind in &config.outputs {
        if kind.is_implicit() {
            return Err(ValidationError::ImplicitOutput { kind });
        }
        if !seen.insert(kind) {
            return Err(ValidationError::DuplicateOutput { kind });
        }
    }

    Ok(())
}

fn validate_radiation(source: &RadiationSource) -> Result<(), ValidationError> {
    match source {
        RadiationSource::BuiltinAgn => Ok(()),
        RadiationSource::PowerLaw { slope } => finite("radiation.slope", *slope),
        RadiationSource::Blackbody { temperature_k } => {
            positive("radiation.temperature_k", *temperature_k)
        }
        RadiationSource::Background { redshift } => {
            if redshift.is_finite() && *redshift >= 0.0 {
                Ok(())
            } else {
                Err(invalid(
                    "radiation.redshift",
                    redshift,
                    "must be non-negative and finite",
                ))
            }
        }
        RadiationSource::UserTable { path, .. } => {
            if path.as_os_str().is_empty() {
                Err(invalid("radiation.path", "", "must name a spectrum file"))
            } else {
                Ok(())
            }
        }
    }
}
