//! Training samples and sample sources
//!
//! The embedded table is a stand-in for a real data pipeline. The trainer
//! reads samples through [`SampleSource`], so a file-backed source can be
//! swapped in without touching encoding or training.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// One labeled training example
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub soil_type: String,
    /// Millimeters
    pub rainfall: f64,
    /// Tons per hectare
    pub past_yield: f64,
    pub crop: String,
}

impl Sample {
    pub fn new(
        soil_type: impl Into<String>,
        rainfall: f64,
        past_yield: f64,
        crop: impl Into<String>,
    ) -> Self {
        Self {
            soil_type: soil_type.into(),
            rainfall,
            past_yield,
            crop: crop.into(),
        }
    }
}

/// Anything that can hand the trainer a set of labeled samples
pub trait SampleSource {
    /// Short description for log output
    fn describe(&self) -> String;

    fn load(&self) -> Result<Vec<Sample>>;
}

// (soil, rainfall mm, past yield t/ha, crop)
const EMBEDDED_ROWS: [(&str, f64, f64, &str); 35] = [
    ("clay", 120.0, 3.5, "Maize"),
    ("sandy", 60.0, 2.0, "Cassava"),
    ("loam", 90.0, 4.2, "Beans"),
    ("silt", 80.0, 3.8, "Rice"),
    ("peat", 110.0, 3.9, "Barley"),
    ("chalk", 70.0, 2.5, "Sorghum"),
    ("clay", 130.0, 4.0, "Wheat"),
    ("sandy", 45.0, 1.8, "Sweet Potatoes"),
    ("loam", 85.0, 4.5, "Groundnuts"),
    ("silt", 95.0, 3.6, "Millet"),
    ("peat", 150.0, 4.8, "Tomatoes"),
    ("chalk", 65.0, 2.3, "Onions"),
    ("loam", 100.0, 4.1, "Cabbage"),
    ("sandy", 55.0, 2.2, "Spinach"),
    ("clay", 140.0, 3.9, "Carrots"),
    ("silt", 105.0, 4.0, "Peas"),
    ("peat", 160.0, 5.0, "Lettuce"),
    ("chalk", 50.0, 2.4, "Kales"),
    ("loam", 115.0, 4.4, "Pumpkin"),
    ("sandy", 75.0, 2.8, "Sunflower"),
    ("clay", 135.0, 4.2, "Soybeans"),
    ("silt", 100.0, 3.7, "Coffee"),
    ("peat", 155.0, 4.9, "Tea"),
    ("chalk", 60.0, 2.6, "Bananas"),
    ("loam", 125.0, 4.3, "Pineapple"),
    ("sandy", 85.0, 2.9, "Avocado"),
    ("clay", 145.0, 4.1, "Mango"),
    ("silt", 90.0, 3.5, "Papaya"),
    ("peat", 170.0, 5.1, "Sugarcane"),
    ("chalk", 65.0, 2.7, "Cotton"),
    ("loam", 95.0, 3.8, "Irish Potatoes"),
    ("sandy", 70.0, 2.1, "Garlic"),
    ("clay", 140.0, 4.0, "Chili"),
    ("silt", 100.0, 3.9, "Strawberries"),
    ("peat", 160.0, 4.7, "Beetroot"),
];

/// The built-in example dataset
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedDataset;

impl SampleSource for EmbeddedDataset {
    fn describe(&self) -> String {
        format!("embedded dataset ({} rows)", EMBEDDED_ROWS.len())
    }

    fn load(&self) -> Result<Vec<Sample>> {
        Ok(embedded_samples())
    }
}

/// The embedded example rows as owned samples
pub fn embedded_samples() -> Vec<Sample> {
    EMBEDDED_ROWS
        .iter()
        .map(|&(soil, rainfall, past_yield, crop)| Sample::new(soil, rainfall, past_yield, crop))
        .collect()
}

/// JSON file containing an array of [`Sample`] objects
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SampleSource for JsonFileSource {
    fn describe(&self) -> String {
        format!("JSON dataset {}", self.path.display())
    }

    fn load(&self) -> Result<Vec<Sample>> {
        let contents = std::fs::read_to_string(&self.path)?;
        let samples: Vec<Sample> = serde_json::from_str(&contents)?;
        if samples.is_empty() {
            return Err(Error::Training(format!(
                "dataset {} contains no samples",
                self.path.display()
            )));
        }
        debug!("Loaded {} samples from {}", samples.len(), self.path.display());
        Ok(samples)
    }
}

/// Distinct crop labels, sorted
pub fn label_set(samples: &[Sample]) -> Vec<String> {
    samples
        .iter()
        .map(|s| s.crop.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
