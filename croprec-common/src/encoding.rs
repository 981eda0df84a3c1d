//! Feature encoding
//!
//! Maps raw request/sample fields to the fixed-order numeric vector
//! `(soil_code, rainfall, past_yield)` consumed by the classifier.
//!
//! Training and serving must agree on soil codes or predictions are
//! meaningless. Both sides therefore go through a [`SoilEncoding`], which is
//! named and versioned and travels inside the model artifact.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::dataset::Sample;
use crate::rainfall::{RainfallProvider, StaticRainfallTable};

/// Soil code used for any soil type not present in the encoding table
pub const UNKNOWN_SOIL_CODE: u32 = 0;

/// Number of columns in a [`FeatureVector`]
pub const N_FEATURES: usize = 3;

/// Column names, in vector order
pub const FEATURE_NAMES: [&str; N_FEATURES] = ["soil_type", "rainfall", "past_yield"];

/// Soil types recognized by the standard table, in code order
pub const STANDARD_SOILS: [&str; 6] = ["clay", "sandy", "loam", "silt", "peat", "chalk"];

/// Encoding name for the hand-written serving table
pub const STANDARD_ENCODING: &str = "standard";

/// Encoding name for codes assigned from the sorted set of observed categories
pub const CATEGORY_ORDER_ENCODING: &str = "category-order";

/// Named, versioned soil type → integer code table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoilEncoding {
    pub name: String,
    pub version: u32,
    pub codes: BTreeMap<String, u32>,
}

impl SoilEncoding {
    /// The serving-side table: clay=0, sandy=1, loam=2, silt=3, peat=4, chalk=5
    pub fn standard() -> Self {
        let codes = STANDARD_SOILS
            .iter()
            .enumerate()
            .map(|(code, soil)| (soil.to_string(), code as u32))
            .collect();

        Self {
            name: STANDARD_ENCODING.to_string(),
            version: 1,
            codes,
        }
    }

    /// Codes assigned by enumerating the distinct observed categories in sorted order
    ///
    /// For the embedded dataset this yields chalk=0, clay=1, loam=2, peat=3,
    /// sandy=4, silt=5, which disagrees with [`SoilEncoding::standard`].
    pub fn category_order<'a, I>(categories: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = categories.into_iter().collect();
        let codes = distinct
            .into_iter()
            .enumerate()
            .map(|(code, soil)| (soil.to_string(), code as u32))
            .collect();

        Self {
            name: CATEGORY_ORDER_ENCODING.to_string(),
            version: 1,
            codes,
        }
    }

    /// Code for `soil_type`; unknown values map to [`UNKNOWN_SOIL_CODE`] without error
    pub fn code(&self, soil_type: &str) -> u32 {
        self.codes
            .get(soil_type)
            .copied()
            .unwrap_or(UNKNOWN_SOIL_CODE)
    }

    /// Encode a labeled training sample using its own rainfall value
    pub fn encode_sample(&self, sample: &Sample) -> FeatureVector {
        FeatureVector::new(self.code(&sample.soil_type), sample.rainfall, sample.past_yield)
    }

    /// Soil types whose code differs between `self` and `other`
    ///
    /// A soil present in only one of the tables counts as a difference.
    pub fn disagreements(&self, other: &SoilEncoding) -> Vec<String> {
        let soils: BTreeSet<&String> = self.codes.keys().chain(other.codes.keys()).collect();
        soils
            .into_iter()
            .filter(|soil| self.codes.get(*soil) != other.codes.get(*soil))
            .cloned()
            .collect()
    }

    /// True when both tables assign identical codes to identical soil types
    pub fn agrees_with(&self, other: &SoilEncoding) -> bool {
        self.codes == other.codes
    }
}

impl Default for SoilEncoding {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Display for SoilEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Ordered classifier input: (soil_code, rainfall, past_yield)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub soil_code: u32,
    pub rainfall: f64,
    pub past_yield: f64,
}

impl FeatureVector {
    pub fn new(soil_code: u32, rainfall: f64, past_yield: f64) -> Self {
        Self {
            soil_code,
            rainfall,
            past_yield,
        }
    }

    /// Numeric columns in classifier order
    pub fn as_array(&self) -> [f64; N_FEATURES] {
        [self.soil_code as f64, self.rainfall, self.past_yield]
    }
}

/// Request-side encoder: soil table plus a rainfall source
///
/// Performs no validation. Empty strings, unknown values and negative yields
/// are all encoded.
#[derive(Clone)]
pub struct FeatureEncoder {
    soil: SoilEncoding,
    rainfall: Arc<dyn RainfallProvider>,
}

impl FeatureEncoder {
    pub fn new(soil: SoilEncoding, rainfall: Arc<dyn RainfallProvider>) -> Self {
        Self { soil, rainfall }
    }

    /// Standard soil table with the built-in city rainfall table
    pub fn standard() -> Self {
        Self::new(SoilEncoding::standard(), Arc::new(StaticRainfallTable::builtin()))
    }

    pub fn soil_encoding(&self) -> &SoilEncoding {
        &self.soil
    }

    /// Build the feature vector for one prediction request
    pub fn encode(&self, soil_type: &str, location: &str, past_yield: f64) -> FeatureVector {
        FeatureVector::new(
            self.soil.code(soil_type),
            self.rainfall.rainfall_mm(location),
            past_yield,
        )
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for FeatureEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureEncoder")
            .field("soil", &self.soil)
            .finish_non_exhaustive()
    }
}
