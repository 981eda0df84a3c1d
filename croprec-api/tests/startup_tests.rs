//! Startup tests for croprec-api
//!
//! Tests cover:
//! - Model artifact load failures are fatal
//! - Soil encoding mismatch: warning by default, fatal with strict_encoding
//! - Configuration priority: CLI > environment > TOML > defaults
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate CROPREC_* variables are marked with #[serial].

use std::env;
use std::path::{Path, PathBuf};

use clap::Parser;
use serial_test::serial;
use tempfile::TempDir;

use croprec_api::config::{Args, ServiceConfig};
use croprec_api::load_state;
use croprec_common::artifact::ModelArtifact;
use croprec_common::config::RainfallConfig;
use croprec_common::dataset::embedded_samples;
use croprec_common::forest::ForestConfig;
use croprec_common::{CropClassifier, RainfallProvider, SoilEncoding};

const ENV_VARS: [&str; 4] = [
    "CROPREC_CONFIG",
    "CROPREC_PORT",
    "CROPREC_BIND",
    "CROPREC_MODEL_PATH",
];

fn clear_env() {
    for var in ENV_VARS {
        env::remove_var(var);
    }
}

fn write_artifact(dir: &Path, encoding: SoilEncoding) -> PathBuf {
    let config = ForestConfig {
        n_trees: 5,
        seed: Some(9),
        ..ForestConfig::default()
    };
    let path = dir.join("crop_recommender.json");
    ModelArtifact::train(&embedded_samples(), encoding, config)
        .unwrap()
        .save(&path)
        .unwrap();
    path
}

fn config_for(model_path: PathBuf) -> ServiceConfig {
    ServiceConfig {
        model_path,
        ..ServiceConfig::default()
    }
}

// =============================================================================
// Model loading
// =============================================================================

#[test]
fn test_missing_artifact_is_fatal() {
    let dir = TempDir::new().unwrap();
    let result = load_state(&config_for(dir.path().join("absent.json")));

    let err = result.err().expect("Startup should fail without a model");
    assert!(format!("{:#}", err).contains("absent.json"));
}

#[test]
fn test_corrupt_artifact_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("crop_recommender.json");
    std::fs::write(&path, r#"{"format_version": 1}"#).unwrap();

    assert!(load_state(&config_for(path)).is_err());
}

#[test]
fn test_matching_encoding_loads() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(dir.path(), SoilEncoding::standard());

    let state = load_state(&config_for(path)).expect("Startup should succeed");
    assert_eq!(state.classifier.labels().len(), 35);
    assert!(state.model_info.is_some());
}

#[test]
fn test_encoding_mismatch_warns_by_default() {
    let dir = TempDir::new().unwrap();
    let samples = embedded_samples();
    let legacy = SoilEncoding::category_order(samples.iter().map(|s| s.soil_type.as_str()));
    let path = write_artifact(dir.path(), legacy);

    let state = load_state(&config_for(path)).expect("Mismatch alone should not stop startup");

    // Serving still uses the standard table
    assert_eq!(state.encoder.encode("chalk", "Nairobi", 1.0).soil_code, 5);
}

#[test]
fn test_encoding_mismatch_fatal_when_strict() {
    let dir = TempDir::new().unwrap();
    let samples = embedded_samples();
    let legacy = SoilEncoding::category_order(samples.iter().map(|s| s.soil_type.as_str()));
    let path = write_artifact(dir.path(), legacy);

    let config = ServiceConfig {
        strict_encoding: true,
        ..config_for(path)
    };
    let err = load_state(&config).err().expect("Strict mode should refuse mismatch");
    assert!(format!("{:#}", err).contains("Encoding mismatch"));
}

#[test]
fn test_rainfall_overrides_reach_encoder() {
    let dir = TempDir::new().unwrap();
    let path = write_artifact(dir.path(), SoilEncoding::standard());

    let mut rainfall = RainfallConfig::default();
    rainfall.cities.insert("Nakuru".to_string(), 95.0);
    rainfall.default_mm = 50.0;
    let config = ServiceConfig {
        rainfall,
        ..config_for(path)
    };

    let state = load_state(&config).unwrap();
    assert_eq!(state.encoder.encode("loam", "Nakuru", 1.0).rainfall, 95.0);
    assert_eq!(state.encoder.encode("loam", "Nairobi", 1.0).rainfall, 50.0);
    assert_eq!(config.rainfall.to_table().rainfall_mm("Nakuru"), 95.0);
}

// =============================================================================
// Configuration priority
// =============================================================================

#[test]
#[serial]
fn test_defaults_when_nothing_configured() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("config.toml");

    let args = Args::try_parse_from(["croprec-api", "--config", missing.to_str().unwrap()]).unwrap();
    let config = ServiceConfig::load(&args).unwrap();

    assert_eq!(config.port, 8000);
    assert_eq!(config.bind_address, "127.0.0.1");
    assert_eq!(config.model_path, PathBuf::from("crop_recommender.json"));
}

#[test]
#[serial]
fn test_toml_over_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let toml_path = dir.path().join("config.toml");
    std::fs::write(
        &toml_path,
        "port = 9000\nmodel_path = \"/srv/models/crop.json\"\nstrict_encoding = true\n",
    )
    .unwrap();

    let args = Args::try_parse_from(["croprec-api", "--config", toml_path.to_str().unwrap()]).unwrap();
    let config = ServiceConfig::load(&args).unwrap();

    assert_eq!(config.port, 9000);
    assert_eq!(config.model_path, PathBuf::from("/srv/models/crop.json"));
    assert!(config.strict_encoding);
}

#[test]
#[serial]
fn test_env_over_toml_and_cli_over_env() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let toml_path = dir.path().join("config.toml");
    std::fs::write(&toml_path, "port = 9000\n").unwrap();
    env::set_var("CROPREC_CONFIG", &toml_path);
    env::set_var("CROPREC_PORT", "9100");

    let args = Args::try_parse_from(["croprec-api"]).unwrap();
    assert_eq!(args.config.as_deref(), Some(toml_path.as_path()));
    assert_eq!(ServiceConfig::load(&args).unwrap().port, 9100);

    let args = Args::try_parse_from(["croprec-api", "--port", "9200"]).unwrap();
    assert_eq!(ServiceConfig::load(&args).unwrap().port, 9200);

    clear_env();
}

#[test]
#[serial]
fn test_invalid_toml_is_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let toml_path = dir.path().join("config.toml");
    std::fs::write(&toml_path, "port = [not valid").unwrap();

    let args = Args::try_parse_from(["croprec-api", "--config", toml_path.to_str().unwrap()]).unwrap();
    assert!(ServiceConfig::load(&args).is_err());
}
