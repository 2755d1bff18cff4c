//! Simulation configuration schema.

use std::fmt;
use std::path::{Path, PathBuf};

use cr_core::ScaledValue;
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

/// Everything needed to describe one engine run.
///
/// Fields are independent of each other; parameters that only make sense for one
/// branch of a selector live inside that branch's variant, so exactly one radiation
/// source and one intensity mode can be active at a time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    pub version: u32,
    pub title: String,
    pub radiation: RadiationSource,
    pub intensity: Intensity,
    pub medium: MediumDef,
    pub control: ControlDef,
    pub radius: RadiusDef,
    pub stops: StopsDef,
    pub geometry: GeometryDef,
    pub outputs: Vec<OutputKind>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            title: "cloudyrun".to_string(),
            radiation: RadiationSource::default(),
            intensity: Intensity::default(),
            medium: MediumDef::default(),
            control: ControlDef::default(),
            radius: RadiusDef::default(),
            stops: StopsDef::default(),
            geometry: GeometryDef::default(),
            outputs: vec![OutputKind::Overview, OutputKind::Continuum],
        }
    }
}

impl SimulationConfig {
    /// Path of the user spectrum when the radiation source needs one.
    pub fn user_table_path(&self) -> Option<&Path> {
        match &self.radiation {
            RadiationSource::UserTable { path, .. } => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn wants_output(&self, kind: OutputKind) -> bool {
        self.outputs.contains(&kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "type")]
pub enum RadiationSource {
    #[default]
    BuiltinAgn,
    PowerLaw {
        #[serde(default = "default_slope")]
        slope: f64,
    },
    Blackbody {
        #[serde(default = "default_blackbody_k")]
        temperature_k: f64,
    },
    /// Haardt & Madau 2012 metagalactic background.
    Background {
        #[serde(default)]
        redshift: f64,
    },
    UserTable {
        path: PathBuf,
        #[serde(default)]
        units: SedUnits,
    },
}

fn default_slope() -> f64 {
    -1.0
}

fn default_blackbody_k() -> f64 {
    100_000.0
}

/// Meaning of the second column of a user spectrum.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SedUnits {
    /// Energy-weighted flux (nuFnu or nuLnu).
    #[default]
    #[serde(rename = "nuFnu")]
    NuFnu,
    /// Flux density (Fnu or Lnu).
    #[serde(rename = "Fnu")]
    Fnu,
}

impl SedUnits {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::NuFnu => "nuFnu",
            Self::Fnu => "Fnu",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Intensity {
    /// Total bolometric luminosity in erg/s.
    Luminosity {
        #[serde(default = "default_luminosity")]
        total: ScaledValue,
    },
    IonizationParameter {
        #[serde(default = "default_log_u")]
        log_u: f64,
    },
}

impl Default for Intensity {
    fn default() -> Self {
        Self::Luminosity {
            total: default_luminosity(),
        }
    }
}

fn default_luminosity() -> ScaledValue {
    ScaledValue::linear(1.283e44)
}

fn default_log_u() -> f64 {
    -1.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediumDef {
    /// Hydrogen density, log cm^-3.
    pub hden_log: f64,
    pub abundances: AbundanceSet,
    pub grains: bool,
}

impl Default for MediumDef {
    fn default() -> Self {
        Self {
            hden_log: 5.7,
            abundances: AbundanceSet::default(),
            grains: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AbundanceSet {
    #[default]
    Ism,
    Solar,
    Primordial,
    HiiRegion,
}

impl AbundanceSet {
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Ism => "ISM",
            Self::Solar => "Solar",
            Self::Primordial => "Primordial",
            Self::HiiRegion => "H II Region",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ControlDef {
    pub iterate_to_convergence: bool,
    /// Raise the engine's failure budget so a stuck zone does not end the run.
    pub tolerate_failures: bool,
}

impl Default for ControlDef {
    fn default() -> Self {
        Self {
            iterate_to_convergence: true,
            tolerate_failures: true,
        }
    }
}

/// Radial extent in cm.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RadiusDef {
    pub inner: ScaledValue,
    /// Outer radius stop; `None` disables it.
    pub outer: Option<ScaledValue>,
}

impl Default for RadiusDef {
    fn default() -> Self {
        Self {
            inner: ScaledValue::linear(2.953e19),
            outer: Some(ScaledValue::linear(2.953e21)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct StopsDef {
    /// Stop at this column density, log cm^-2.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_density_log: Option<f64>,
    /// Stop when the gas cools below this temperature, K.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_temperature_k: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeometryDef {
    pub shape: GeometryShape,
    pub covering_factor: f64,
}

impl Default for GeometryDef {
    fn default() -> Self {
        Self {
            shape: GeometryShape::default(),
            covering_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum GeometryShape {
    #[default]
    Open,
    Sphere,
    Cylinder,
}

impl GeometryShape {
    /// Engine keyword, `None` for the engine's default open geometry.
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Open => None,
            Self::Sphere => Some("sphere"),
            Self::Cylinder => Some("cylinder"),
        }
    }
}

/// Files an engine run can produce.
///
/// `Main` and `Log` are always expected; the rest are auxiliary files that need an
/// explicit save directive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OutputKind {
    #[serde(rename = "out")]
    Main,
    #[serde(rename = "log")]
    Log,
    #[serde(rename = "ovr")]
    Overview,
    #[serde(rename = "con")]
    Continuum,
    #[serde(rename = "het")]
    Heating,
    #[serde(rename = "col")]
    Cooling,
    #[serde(rename = "pre")]
    Pressure,
    #[serde(rename = "opc")]
    GrainOpacity,
    #[serde(rename = "hyd")]
    HydrogenIonization,
}

impl OutputKind {
    pub const ALL: [OutputKind; 9] = [
        Self::Main,
        Self::Log,
        Self::Overview,
        Self::Continuum,
        Self::Heating,
        Self::Cooling,
        Self::Pressure,
        Self::GrainOpacity,
        Self::HydrogenIonization,
    ];

    pub const AUXILIARY: [OutputKind; 7] = [
        Self::Overview,
        Self::Continuum,
        Self::Heating,
        Self::Cooling,
        Self::Pressure,
        Self::GrainOpacity,
        Self::HydrogenIonization,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::Main => "out",
            Self::Log => "log",
            Self::Overview => "ovr",
            Self::Continuum => "con",
            Self::Heating => "het",
            Self::Cooling => "col",
            Self::Pressure => "pre",
            Self::GrainOpacity => "opc",
            Self::HydrogenIonization => "hyd",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Main => "Main Output",
            Self::Log => "Engine Log",
            Self::Overview => "Overview",
            Self::Continuum => "Continuum",
            Self::Heating => "Heating",
            Self::Cooling => "Cooling",
            Self::Pressure => "Pressure",
            Self::GrainOpacity => "Grain Opacity",
            Self::HydrogenIonization => "Hydrogen Ionization",
        }
    }

    pub const fn is_implicit(self) -> bool {
        matches!(self, Self::Main | Self::Log)
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}
