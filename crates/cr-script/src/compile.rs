//! Compilation of a simulation configuration into an engine script.

use cr_core::fmt_real;
use cr_project::schema::{Intensity, OutputKind, RadiationSource, SimulationConfig};

use crate::error::{ScriptError, ScriptResult};
use crate::script::{CompiledScript, OutputFileMap, ScriptBuilder, output_file_name};
use crate::spectrum::TableRef;

/// Retry budget handed to the engine when failures are tolerated.
pub const FAILURE_BUDGET: u32 = 1000;

/// Compile a configuration into script lines and the expected output files.
///
/// `user_table` must be present when the radiation source is a user table; it
/// names the normalized table already written where the engine will look for it.
///
/// Line order: title, radiation field, intensity, medium, control flags, inner
/// radius, stopping criteria, geometry, save directives. Optional lines that are
/// switched off are left out without reordering the rest.
pub fn compile(
    config: &SimulationConfig,
    user_table: Option<&TableRef>,
) -> ScriptResult<(CompiledScript, OutputFileMap)> {
    let mut script = ScriptBuilder::new();
    let mut outputs = OutputFileMap::default();

    script.line(format!("title {}", config.title.trim()));
    script.line(radiation_line(&config.radiation, user_table)?);
    script.line(intensity_line(&config.intensity));

    let medium = &config.medium;
    script
        .line(format!("hden {}", fmt_real(medium.hden_log)))
        .line(format!("abundances {}", medium.abundances.keyword()))
        .line_if(medium.grains, || "grains ISM".to_string());

    script
        .line_if(config.control.iterate_to_convergence, || {
            "iterate to convergence".to_string()
        })
        .line_if(config.control.tolerate_failures, || {
            format!("failures {FAILURE_BUDGET}")
        });

    script.line(format!("radius {}", config.radius.inner));
    if let Some(outer) = &config.radius.outer {
        script.line(format!("stop radius {outer}"));
    }
    if let Some(column) = config.stops.column_density_log {
        script.line(format!("stop column density {}", fmt_real(column)));
    }
    if let Some(t) = config.stops.min_temperature_k {
        script.line(format!("stop temperature {}", fmt_real(t)));
    }

    if let Some(shape) = config.geometry.shape.keyword() {
        script.line(shape);
    }
    script.line(format!(
        "covering factor {}",
        fmt_real(config.geometry.covering_factor)
    ));

    for kind in OutputKind::AUXILIARY {
        if config.wants_output(kind)
            && let Some(directive) = save_directive(kind)
        {
            outputs.insert(kind);
            script.line(directive);
        }
    }

    Ok((script.build(), outputs))
}

fn radiation_line(source: &RadiationSource, user_table: Option<&TableRef>) -> ScriptResult<String> {
    let line = match source {
        RadiationSource::BuiltinAgn => "table AGN".to_string(),
        RadiationSource::PowerLaw { slope } => format!("table power law {}", fmt_real(*slope)),
        RadiationSource::Blackbody { temperature_k } => {
            format!("table blackbody {}", fmt_real(*temperature_k))
        }
        RadiationSource::Background { redshift } => format!("table HM12 z={}", fmt_real(*redshift)),
        RadiationSource::UserTable { units, .. } => {
            let table = user_table.ok_or(ScriptError::NotReady {
                reason: "user spectrum has not been loaded",
            })?;
            format!(
                "table SED \"{}\" linear {}",
                table.file_name(),
                units.keyword()
            )
        }
    };
    Ok(line)
}

fn intensity_line(intensity: &Intensity) -> String {
    match intensity {
        Intensity::Luminosity { total } => format!("Luminosity total {total}"),
        Intensity::IonizationParameter { log_u } => {
            format!("ionization parameter {}", fmt_real(*log_u))
        }
    }
}

/// Save directive for an auxiliary output; `None` for the implicit kinds.
pub fn save_directive(kind: OutputKind) -> Option<String> {
    let file = output_file_name(kind);
    let directive = match kind {
        OutputKind::Main | OutputKind::Log => return None,
        OutputKind::Overview => format!("save overview \"{file}\" last"),
        OutputKind::Continuum => format!("save continuum \"{file}\" last units Angstroms"),
        OutputKind::Heating => format!("save heating \"{file}\" last"),
        OutputKind::Cooling => format!("save cooling \"{file}\" last"),
        OutputKind::Pressure => format!("save pressure \"{file}\" last"),
        OutputKind::GrainOpacity => format!("save grain opacity \"{file}\" last"),
        OutputKind::HydrogenIonization => format!("save element hydrogen \"{file}\" last"),
    };
    Some(directive)
}
