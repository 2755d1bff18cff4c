use cr_core::ScaledValue;
use cr_project::schema::*;
use cr_project::{ProjectError, load_json, load_yaml, save_json, save_yaml, validate_config};

#[test]
fn roundtrip_yaml_default_config() {
    let config = SimulationConfig::default();
    validate_config(&config).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("default.yaml");

    save_yaml(&path, &config).unwrap();
    let loaded = load_yaml(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn roundtrip_json_user_table_config() {
    let config = SimulationConfig {
        title: "uploaded sed".to_string(),
        radiation: RadiationSource::UserTable {
            path: "spectra/agn.sed".into(),
            units: SedUnits::Fnu,
        },
        intensity: Intensity::IonizationParameter { log_u: -2.5 },
        medium: MediumDef {
            hden_log: 3.0,
            abundances: AbundanceSet::HiiRegion,
            grains: false,
        },
        stops: StopsDef {
            column_density_log: Some(22.0),
            min_temperature_k: Some(3000.0),
        },
        geometry: GeometryDef {
            shape: GeometryShape::Cylinder,
            covering_factor: 0.5,
        },
        outputs: vec![OutputKind::Heating, OutputKind::HydrogenIonization],
        ..SimulationConfig::default()
    };

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.json");

    save_json(&path, &config).unwrap();
    let loaded = load_json(&path).unwrap();

    assert_eq!(config, loaded);
}

#[test]
fn partial_yaml_fills_defaults() {
    let yaml = r#"
title: blackbody test
radiation:
  type: Blackbody
  temperature_k: 50000.0
intensity:
  type: IonizationParameter
medium:
  abundances: solar
radius:
  inner: "19.5"
  outer: ~
outputs: [ovr, pre]
"#;
    let config: SimulationConfig = serde_yaml::from_str(yaml).unwrap();
    validate_config(&config).unwrap();

    assert_eq!(
        config.radiation,
        RadiationSource::Blackbody {
            temperature_k: 50000.0
        }
    );
    assert_eq!(config.intensity, Intensity::IonizationParameter { log_u: -1.0 });
    assert_eq!(config.medium.abundances, AbundanceSet::Solar);
    assert_eq!(config.medium.hden_log, 5.7);
    assert!(config.medium.grains);
    assert_eq!(config.radius.inner, ScaledValue::log(19.5));
    assert_eq!(config.radius.outer, None);
    assert_eq!(config.geometry.covering_factor, 0.1);
    assert_eq!(config.outputs, vec![OutputKind::Overview, OutputKind::Pressure]);
}

#[test]
fn malformed_scaled_value_fails_to_load() {
    let yaml = r#"
radius:
  inner: "2.953E+19 linear; stop zone 1"
"#;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, yaml).unwrap();

    let err = load_yaml(&path).unwrap_err();
    assert!(matches!(err, ProjectError::Yaml(_)));
}

#[test]
fn invalid_config_is_not_saved() {
    let mut config = SimulationConfig::default();
    config.geometry.covering_factor = -0.1;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("invalid.yaml");

    let err = save_yaml(&path, &config).unwrap_err();
    assert!(matches!(err, ProjectError::Validation(_)));
    assert!(!path.exists());
}
