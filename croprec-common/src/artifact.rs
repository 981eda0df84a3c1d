//! Model artifact: trained forest plus everything needed to query it
//!
//! The artifact carries the soil encoding it was trained with so the serving
//! side can detect a mismatch instead of silently querying with wrong codes.
//! Written once by the trainer, loaded once by the service, never mutated.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{label_set, Sample};
use crate::encoding::{FeatureVector, SoilEncoding, N_FEATURES};
use crate::forest::{ForestConfig, RandomForest};
use crate::{Error, Result};

/// Artifact layout version understood by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Relative path the trainer writes to and the service reads from by default
pub const DEFAULT_ARTIFACT_PATH: &str = "crop_recommender.json";

/// Read-only crop classifier handle shared by all request handlers
pub trait CropClassifier: Send + Sync {
    /// Predicted crop label for an encoded request
    fn classify(&self, features: &FeatureVector) -> &str;

    /// Every label the classifier can return
    fn labels(&self) -> &[String];
}

/// Serialized trained classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    /// Soil codes used to build the training matrix
    pub encoding: SoilEncoding,
    /// Class labels, sorted; the forest predicts indices into this list
    pub labels: Vec<String>,
    pub forest: RandomForest,
    pub trained_at: DateTime<Utc>,
    pub n_samples: usize,
}

impl ModelArtifact {
    /// Fit a forest on `samples`, encoding soil types with `encoding`
    pub fn train(samples: &[Sample], encoding: SoilEncoding, config: ForestConfig) -> Result<Self> {
        let labels = label_set(samples);
        let (x, y) = training_matrix(samples, &encoding, &labels);
        let forest = RandomForest::fit(&x, &y, labels.len(), config)?;

        Ok(Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            encoding,
            labels,
            forest,
            trained_at: Utc::now(),
            n_samples: samples.len(),
        })
    }

    /// Fraction of `samples` whose predicted label equals their own crop
    pub fn training_accuracy(&self, samples: &[Sample]) -> f64 {
        if samples.is_empty() {
            return 0.0;
        }
        let correct = samples
            .iter()
            .filter(|s| self.predict_label(&self.encoding.encode_sample(s)) == s.crop)
            .count();
        correct as f64 / samples.len() as f64
    }

    pub fn predict_label(&self, features: &FeatureVector) -> &str {
        &self.labels[self.forest.predict(&features.as_array())]
    }

    /// Write the artifact to `path`, replacing any previous file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = serde_json::to_vec(self)?;
        std::fs::write(path, &bytes)?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }

    /// Read and validate an artifact
    ///
    /// Fails if the file is missing, not JSON, of another format version, or
    /// structurally inconsistent.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let value: serde_json::Value = serde_json::from_str(&contents)?;

        let version = value
            .get("format_version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| Error::IncompatibleArtifact("missing format_version".to_string()))?;
        if version != u64::from(ARTIFACT_FORMAT_VERSION) {
            return Err(Error::IncompatibleArtifact(format!(
                "format_version {} (expected {})",
                version, ARTIFACT_FORMAT_VERSION
            )));
        }

        let artifact: ModelArtifact = serde_json::from_value(value)?;
        artifact.validate()?;

        info!(
            "Loaded model artifact {} ({} trees, {} labels, encoding {})",
            path.display(),
            artifact.forest.n_trees(),
            artifact.labels.len(),
            artifact.encoding
        );
        Ok(artifact)
    }

    fn validate(&self) -> Result<()> {
        if self.forest.n_features() != N_FEATURES {
            return Err(Error::IncompatibleArtifact(format!(
                "forest expects {} features, encoder produces {}",
                self.forest.n_features(),
                N_FEATURES
            )));
        }
        if self.forest.n_classes() != self.labels.len() {
            return Err(Error::IncompatibleArtifact(format!(
                "forest has {} classes but artifact lists {} labels",
                self.forest.n_classes(),
                self.labels.len()
            )));
        }
        self.forest.validate()
    }

    /// Compare the training encoding against the one used for serving
    pub fn check_encoding(&self, serving: &SoilEncoding) -> Result<()> {
        if self.encoding.agrees_with(serving) {
            return Ok(());
        }
        Err(Error::EncodingMismatch(format!(
            "artifact trained with {} but serving with {}; codes differ for: {}",
            self.encoding,
            serving,
            self.encoding.disagreements(serving).join(", ")
        )))
    }
}

impl CropClassifier for ModelArtifact {
    fn classify(&self, features: &FeatureVector) -> &str {
        self.predict_label(features)
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// Feature rows and label indices for `samples`; `labels` must be sorted
fn training_matrix(
    samples: &[Sample],
    encoding: &SoilEncoding,
    labels: &[String],
) -> (Vec<Vec<f64>>, Vec<usize>) {
    samples
        .iter()
        .filter_map(|s| {
            let label = labels.binary_search(&s.crop).ok()?;
            Some((encoding.encode_sample(s).as_array().to_vec(), label))
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::embedded_samples;

    fn small_forest() -> ForestConfig {
        ForestConfig {
            n_trees: 10,
            seed: Some(3),
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_training_matrix_column_order() {
        let samples = vec![Sample::new("loam", 90.0, 4.2, "Beans")];
        let labels = label_set(&samples);
        let (x, y) = training_matrix(&samples, &SoilEncoding::standard(), &labels);
        assert_eq!(x, vec![vec![2.0, 90.0, 4.2]]);
        assert_eq!(y, vec![0]);
    }

    #[test]
    fn test_train_records_encoding_and_labels() {
        let samples = embedded_samples();
        let artifact = ModelArtifact::train(&samples, SoilEncoding::standard(), small_forest()).unwrap();

        assert_eq!(artifact.format_version, ARTIFACT_FORMAT_VERSION);
        assert_eq!(artifact.encoding, SoilEncoding::standard());
        assert_eq!(artifact.labels.len(), 35);
        assert_eq!(artifact.n_samples, 35);
        assert!(artifact.labels.windows(2).all(|w| w[0] < w[1]));
        assert!(artifact.validate().is_ok());
    }

    #[test]
    fn test_prediction_is_a_training_label() {
        let artifact =
            ModelArtifact::train(&embedded_samples(), SoilEncoding::standard(), small_forest()).unwrap();
        let label = artifact.classify(&FeatureVector::new(2, 120.0, 4.2));
        assert!(artifact.labels().iter().any(|l| l == label));
    }

    #[test]
    fn test_check_encoding() {
        let samples = embedded_samples();
        let legacy = SoilEncoding::category_order(samples.iter().map(|s| s.soil_type.as_str()));
        let artifact = ModelArtifact::train(&samples, legacy, small_forest()).unwrap();

        let err = artifact.check_encoding(&SoilEncoding::standard()).unwrap_err();
        match err {
            Error::EncodingMismatch(msg) => {
                assert!(msg.contains("category-order v1"));
                assert!(msg.contains("chalk"));
                assert!(!msg.contains("loam"));
            }
            other => panic!("unexpected error: {}", other),
        }

        let standard =
            ModelArtifact::train(&samples, SoilEncoding::standard(), small_forest()).unwrap();
        assert!(standard.check_encoding(&SoilEncoding::standard()).is_ok());
    }
}
