//! Heart-Disease Prediction Engine - Main Entry Point
//!
//! Loads the artifact catalog, reports catalog health, and runs the full
//! model ensemble against a patient record supplied as a JSON file.

use anyhow::{Context, Result};
use cardio_ensemble::{AppConfig, ArtifactStore, EnsemblePredictor, PatientRecord};
use std::fs;
use std::path::Path;
use tracing::info;

fn main() -> Result<()> {
    let config_path = "config/config.toml";
    let config = if Path::new(config_path).exists() {
        AppConfig::load()?
    } else {
        AppConfig::default()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Starting heart-disease prediction engine");

    let store = ArtifactStore::load(Path::new(&config.artifacts.dir))?;
    let predictor = EnsemblePredictor::new(store);

    let health = predictor.health();
    info!(
        status = ?health.status,
        models_loaded = health.models_loaded,
        "Artifact catalog ready"
    );

    match std::env::args().nth(1) {
        Some(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read patient record from {path}"))?;
            let record: PatientRecord =
                serde_json::from_str(&raw).context("Failed to parse patient record")?;

            let report = predictor.predict_all(&record);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        None => {
            info!("No patient record supplied, listing available models");
            for key in predictor.model_keys() {
                info!(model = %key, "Model available");
            }
        }
    }

    Ok(())
}
