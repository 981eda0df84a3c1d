//! croprec-train library - offline model training
//!
//! Reads labeled samples, encodes soil types with the selected encoding,
//! fits the random forest and writes the artifact the prediction service
//! loads at startup.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{info, warn};

use croprec_common::artifact::{ModelArtifact, DEFAULT_ARTIFACT_PATH};
use croprec_common::dataset::{EmbeddedDataset, JsonFileSource, SampleSource};
use croprec_common::encoding::SoilEncoding;
use croprec_common::forest::ForestConfig;

/// Soil encoding used to build the training matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum EncodingChoice {
    /// Shared table also used by the prediction service
    #[default]
    Standard,
    /// Codes from the sorted set of soil categories in the training data
    CategoryOrder,
}

/// Everything one training run needs
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub output: PathBuf,
    /// JSON dataset file; None trains on the embedded table
    pub dataset: Option<PathBuf>,
    pub encoding: EncodingChoice,
    pub forest: ForestConfig,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            output: PathBuf::from(DEFAULT_ARTIFACT_PATH),
            dataset: None,
            encoding: EncodingChoice::Standard,
            forest: ForestConfig::default(),
        }
    }
}

/// Outcome of a training run
#[derive(Debug, Clone)]
pub struct TrainReport {
    pub output: PathBuf,
    pub n_samples: usize,
    pub n_labels: usize,
    pub encoding: SoilEncoding,
    /// Diagnostic only; not persisted
    pub training_accuracy: f64,
}

/// Train on the configured samples and write the artifact
pub fn run(options: &TrainOptions) -> Result<TrainReport> {
    let source: Box<dyn SampleSource> = match &options.dataset {
        Some(path) => Box::new(JsonFileSource::new(path)),
        None => Box::new(EmbeddedDataset),
    };
    info!("Loading samples from {}", source.describe());
    let samples = source
        .load()
        .with_context(|| format!("Failed to load {}", source.describe()))?;

    let encoding = match options.encoding {
        EncodingChoice::Standard => SoilEncoding::standard(),
        EncodingChoice::CategoryOrder => {
            let encoding =
                SoilEncoding::category_order(samples.iter().map(|s| s.soil_type.as_str()));
            let standard = SoilEncoding::standard();
            if !encoding.agrees_with(&standard) {
                warn!(
                    "Training with {} codes that differ from the serving table for: {}",
                    encoding,
                    encoding.disagreements(&standard).join(", ")
                );
            }
            encoding
        }
    };
    info!(
        "Training {} trees on {} samples (encoding {})",
        options.forest.n_trees,
        samples.len(),
        encoding
    );

    let artifact = ModelArtifact::train(&samples, encoding, options.forest.clone())
        .context("Failed to fit random forest")?;
    let training_accuracy = artifact.training_accuracy(&samples);
    info!("Training-set accuracy: {:.3}", training_accuracy);

    artifact
        .save(&options.output)
        .with_context(|| format!("Failed to write model to {}", options.output.display()))?;

    Ok(TrainReport {
        output: options.output.clone(),
        n_samples: artifact.n_samples,
        n_labels: artifact.labels.len(),
        encoding: artifact.encoding,
        training_accuracy,
    })
}

/// Fixed line printed after a successful run
pub fn success_message(report: &TrainReport) -> String {
    format!("✅ Model saved as {}", report.output.display())
}
